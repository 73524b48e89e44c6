use std::sync::LazyLock;

use crate::video::bitmap::TRANSPARENT_PEN;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Resistor-weighted DAC feeding one colour gun. Each input bit drives a
/// resistor; the output level is the bit's share of the total conductance.
#[derive(Clone, Debug)]
pub struct ResistorDac {
    scale: Vec<f64>,
}

impl ResistorDac {
    /// `ohms[i]` is the resistor on input bit `i`.
    pub fn new(ohms: &[f64]) -> Self {
        let total: f64 = ohms.iter().map(|w| 1.0 / w).sum();
        Self {
            scale: ohms.iter().map(|w| (1.0 / w) / total).collect(),
        }
    }

    pub fn bits(&self) -> usize {
        self.scale.len()
    }

    /// Output level for the low `bits()` bits of `value`.
    pub fn level(&self, value: u8) -> u8 {
        let sum: f64 = self
            .scale
            .iter()
            .enumerate()
            .filter(|(bit, _)| (value >> bit) & 1 != 0)
            .map(|(_, s)| s)
            .sum();
        (sum * 255.0).round().min(255.0) as u8
    }

    /// Output level for every input value in `0..N`.
    pub fn table<const N: usize>(&self) -> [u8; N] {
        std::array::from_fn(|value| self.level(value as u8))
    }
}

/// 1K/470/220 ohm ladder used by the 3-bit guns of palette RAM.
static THREE_BIT: LazyLock<[u8; 8]> =
    LazyLock::new(|| ResistorDac::new(&[1000.0, 470.0, 220.0]).table());

/// 470/220 ohm ladder used by the 2-bit gun.
static TWO_BIT: LazyLock<[u8; 4]> = LazyLock::new(|| ResistorDac::new(&[470.0, 220.0]).table());

/// Byte layout of a palette RAM or PROM entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaletteRamFormat {
    /// Red in bits 0-2, green in bits 3-5, blue in bits 6-7
    /// (1K/470/220 ohm ladders).
    Rgb332,
    /// Blue in bits 0-1, green in bits 2-4, red in bits 5-7.
    Bgr233,
}

impl PaletteRamFormat {
    pub fn decode(self, value: u8) -> Rgb {
        let three = &*THREE_BIT;
        let two = &*TWO_BIT;
        match self {
            PaletteRamFormat::Rgb332 => Rgb::new(
                three[(value & 0x07) as usize],
                three[((value >> 3) & 0x07) as usize],
                two[(value >> 6) as usize],
            ),
            PaletteRamFormat::Bgr233 => Rgb::new(
                three[(value >> 5) as usize],
                three[((value >> 2) & 0x07) as usize],
                two[(value & 0x03) as usize],
            ),
        }
    }
}

/// Pen colours plus the lookup table that turns a graphics element's
/// `(color, pixel)` pair into a pen.
#[derive(Clone, Debug)]
pub struct Palette {
    colors: Vec<Rgb>,
    initial: Vec<Rgb>,
    colortable: Vec<u16>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self {
            initial: colors.clone(),
            colors,
            colortable: Vec::new(),
        }
    }

    /// One pen per PROM byte.
    pub fn from_prom(prom: &[u8], format: PaletteRamFormat) -> Self {
        Self::new(prom.iter().map(|&b| format.decode(b)).collect())
    }

    /// Colour lookup table; an empty table maps lookup index to pen 1:1.
    pub fn with_colortable(mut self, table: Vec<u16>) -> Self {
        self.colortable = table;
        self
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colortable(&self) -> &[u16] {
        &self.colortable
    }

    /// Pen for lookup index `index` (`color_base + color * granularity + pixel`).
    pub fn lookup(&self, index: usize) -> u16 {
        if self.colortable.is_empty() {
            index as u16
        } else {
            self.colortable[index % self.colortable.len()]
        }
    }

    pub fn rgb(&self, pen: u16) -> Rgb {
        if pen == TRANSPARENT_PEN || self.colors.is_empty() {
            return Rgb::BLACK;
        }
        self.colors[pen as usize % self.colors.len()]
    }

    /// Returns true if the pen's colour actually changed.
    pub fn set_color(&mut self, pen: usize, rgb: Rgb) -> bool {
        match self.colors.get_mut(pen) {
            Some(c) if *c != rgb => {
                *c = rgb;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.colors.clone_from(&self.initial);
    }
}
