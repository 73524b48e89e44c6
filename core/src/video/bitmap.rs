use crate::video::palette::Palette;

/// Pen value stored in layer caches for pixels that let lower planes show.
pub const TRANSPARENT_PEN: u16 = u16::MAX;

/// Fixed-size bitmap of palette pens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedBitmap {
    width: usize,
    height: usize,
    pixels: Vec<u16>,
}

impl IndexedBitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, pen: u16) {
        self.pixels[y * self.width + x] = pen;
    }

    /// Set a pixel given signed coordinates; off-bitmap writes are clipped.
    pub fn plot(&mut self, x: i32, y: i32, pen: u16) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = pen;
        }
    }

    pub fn fill(&mut self, pen: u16) {
        self.pixels.fill(pen);
    }

    pub fn copy_from(&mut self, other: &IndexedBitmap) {
        if self.width == other.width && self.height == other.height {
            self.pixels.copy_from_slice(&other.pixels);
        } else {
            *self = other.clone();
        }
    }

    /// Convert to RGB24 through `palette`. Transparent pens render black.
    pub fn to_rgb24(&self, palette: &Palette, buffer: &mut [u8]) {
        for (pen, out) in self.pixels.iter().zip(buffer.chunks_exact_mut(3)) {
            let rgb = palette.rgb(*pen);
            out[0] = rgb.r;
            out[1] = rgb.g;
            out[2] = rgb.b;
        }
    }
}
