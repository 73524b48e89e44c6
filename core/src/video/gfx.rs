use crate::video::bitmap::{IndexedBitmap, TRANSPARENT_PEN};
use crate::video::palette::Palette;

/// Handle to a decoded graphics set owned by the video state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxId(pub usize);

/// Planar graphics ROM layout. All offsets are in bits, MSB-first within
/// each byte; plane 0 supplies the high bit of the pixel value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxLayout {
    pub width: usize,
    pub height: usize,
    pub plane_offsets: Vec<usize>,
    pub x_offsets: Vec<usize>,
    pub y_offsets: Vec<usize>,
    /// Bits from one element to the next.
    pub increment: usize,
}

impl GfxLayout {
    /// Number of whole elements `rom` holds under this layout.
    pub fn element_count(&self, rom: &[u8]) -> usize {
        (rom.len() * 8) / self.increment.max(1)
    }

    pub fn decode(&self, rom: &[u8]) -> GfxSet {
        let count = self.element_count(rom);
        let mut pixels = Vec::with_capacity(count * self.width * self.height);
        for code in 0..count {
            let base = code * self.increment;
            for &yo in &self.y_offsets {
                for &xo in &self.x_offsets {
                    let mut value = 0u8;
                    for &plane in &self.plane_offsets {
                        let bit = base + plane + yo + xo;
                        let byte = rom.get(bit / 8).copied().unwrap_or(0);
                        value = (value << 1) | ((byte >> (7 - bit % 8)) & 1);
                    }
                    pixels.push(value);
                }
            }
        }
        GfxSet::from_pixels(self.width, self.height, pixels)
    }
}

/// Decoded elements (tiles or sprites), one byte per pixel.
#[derive(Clone, Debug)]
pub struct GfxSet {
    width: usize,
    height: usize,
    count: usize,
    pixels: Vec<u8>,
    color_base: usize,
    granularity: usize,
}

impl GfxSet {
    /// Build from already decoded pixels, `width * height` per element.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        let size = (width * height).max(1);
        Self {
            width,
            height,
            count: pixels.len() / size,
            pixels,
            color_base: 0,
            granularity: 4,
        }
    }

    /// Colour codes index the colortable at `base + color * granularity`.
    pub fn with_colors(mut self, base: usize, granularity: usize) -> Self {
        self.color_base = base;
        self.granularity = granularity;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Pixel value; codes past the end wrap.
    pub fn pixel(&self, code: u16, x: usize, y: usize) -> u8 {
        if self.count == 0 {
            return 0;
        }
        let code = code as usize % self.count;
        self.pixels[(code * self.height + y) * self.width + x]
    }

    pub fn lookup_index(&self, color: u16, pixel: u8) -> usize {
        self.color_base + color as usize * self.granularity + pixel as usize
    }
}

/// Which pixels of an element let the layers below show through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transparency {
    #[default]
    Opaque,
    /// A raw pixel value, before colour lookup.
    Pixel(u8),
    /// A pen, after colour lookup (colortable-driven transparency).
    Pen(u16),
}

impl Transparency {
    fn hides(self, pixel: u8, pen: u16) -> bool {
        match self {
            Transparency::Opaque => false,
            Transparency::Pixel(p) => p == pixel,
            Transparency::Pen(p) => p == pen,
        }
    }
}

/// One element placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub code: u16,
    pub color: u16,
    pub flip_x: bool,
    pub flip_y: bool,
    pub x: i32,
    pub y: i32,
}

/// Draw one element, clipped to `dst`. Transparent pixels are skipped, or
/// written as [`TRANSPARENT_PEN`] when `mark_transparent` is set (used for
/// layer caches, which must record holes rather than keep stale pixels).
pub fn draw_gfx(
    dst: &mut IndexedBitmap,
    gfx: &GfxSet,
    palette: &Palette,
    at: &Placement,
    transparency: Transparency,
    mark_transparent: bool,
) {
    for sy in 0..gfx.height {
        let src_y = if at.flip_y { gfx.height - 1 - sy } else { sy };
        for sx in 0..gfx.width {
            let src_x = if at.flip_x { gfx.width - 1 - sx } else { sx };
            let pixel = gfx.pixel(at.code, src_x, src_y);
            let pen = palette.lookup(gfx.lookup_index(at.color, pixel));
            let (x, y) = (at.x + sx as i32, at.y + sy as i32);
            if transparency.hides(pixel, pen) {
                if mark_transparent {
                    dst.plot(x, y, TRANSPARENT_PEN);
                }
            } else {
                dst.plot(x, y, pen);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x2, 2bpp, planes in the two nibbles of each byte, one byte per row.
    fn nibble_layout() -> GfxLayout {
        GfxLayout {
            width: 4,
            height: 2,
            plane_offsets: vec![0, 4],
            x_offsets: vec![0, 1, 2, 3],
            y_offsets: vec![0, 8],
            increment: 16,
        }
    }

    #[test]
    fn planar_decode_msb_first() {
        // Row 0: plane0 = 1000, plane1 = 0001 -> pixels 2,0,0,1
        // Row 1: plane0 = 1111, plane1 = 1111 -> pixels 3,3,3,3
        let set = nibble_layout().decode(&[0x81, 0xFF]);
        assert_eq!(set.count(), 1);
        let row0: Vec<u8> = (0..4).map(|x| set.pixel(0, x, 0)).collect();
        assert_eq!(row0, vec![2, 0, 0, 1]);
        assert_eq!(set.pixel(0, 2, 1), 3);
    }

    #[test]
    fn transparent_pixels_mark_or_skip() {
        let set = GfxSet::from_pixels(2, 1, vec![0, 3]);
        let palette = Palette::new(Vec::new());
        let at = Placement {
            code: 0,
            color: 1,
            flip_x: false,
            flip_y: false,
            x: 0,
            y: 0,
        };
        let mut bmp = IndexedBitmap::new(2, 1);
        bmp.fill(9);
        draw_gfx(&mut bmp, &set, &palette, &at, Transparency::Pixel(0), false);
        assert_eq!(bmp.pixels(), &[9, 7]);
        draw_gfx(&mut bmp, &set, &palette, &at, Transparency::Pixel(0), true);
        assert_eq!(bmp.pixels(), &[TRANSPARENT_PEN, 7]);
    }

    #[test]
    fn flip_and_clip() {
        let set = GfxSet::from_pixels(2, 1, vec![1, 2]);
        let palette = Palette::new(Vec::new());
        let mut bmp = IndexedBitmap::new(2, 1);
        let at = Placement {
            code: 0,
            color: 0,
            flip_x: true,
            flip_y: false,
            x: 1,
            y: 0,
        };
        draw_gfx(&mut bmp, &set, &palette, &at, Transparency::Opaque, false);
        assert_eq!(bmp.pixels(), &[0, 2]);
    }
}
