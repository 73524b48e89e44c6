use crate::video::bitmap::IndexedBitmap;
use crate::video::field;
use crate::video::gfx::{GfxId, Transparency};
use crate::video::tile_cache::DirtyTileCache;

/// Which byte plane of a tile layer an access targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TilePlane {
    Code,
    Attribute,
}

/// How a RAM offset maps to a grid position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CellLayout {
    /// Offset = row * cols + col.
    #[default]
    RowMajor,
    /// Offset = col * rows + row, as on boards whose monitor is rotated.
    ColumnMajor,
}

/// How a (code byte, attribute byte) pair decodes into a drawable cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileFormat {
    /// color = (attr >> color_shift) & color_mask
    pub color_mask: u8,
    pub color_shift: u8,
    /// Extra code bits: ((attr >> bank_shift) & bank_mask) << 8
    pub bank_mask: u8,
    pub bank_shift: u8,
    pub flip_x: u8,
    pub flip_y: u8,
    /// Colour used for every cell when the layer has no attribute plane.
    pub fixed_color: u16,
}

impl Default for TileFormat {
    fn default() -> Self {
        Self {
            color_mask: 0xFF,
            color_shift: 0,
            bank_mask: 0,
            bank_shift: 0,
            flip_x: 0,
            flip_y: 0,
            fixed_color: 0,
        }
    }
}

/// One decoded cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileCell {
    pub code: u16,
    pub color: u16,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl TileFormat {
    pub fn decode(&self, code: u8, attr: Option<u8>) -> TileCell {
        match attr {
            None => TileCell {
                code: code as u16,
                color: self.fixed_color,
                flip_x: false,
                flip_y: false,
            },
            Some(attr) => TileCell {
                code: code as u16 | ((field(attr, self.bank_shift) & self.bank_mask) as u16) << 8,
                color: (field(attr, self.color_shift) & self.color_mask) as u16,
                flip_x: attr & self.flip_x != 0,
                flip_y: attr & self.flip_y != 0,
            },
        }
    }
}

/// A grid of tiles backed by code (and optionally attribute) RAM, rendered
/// incrementally into a private bitmap.
#[derive(Clone, Debug)]
pub struct TileLayer {
    name: String,
    cols: usize,
    rows: usize,
    layout: CellLayout,
    gfx: GfxId,
    format: TileFormat,
    transparency: Transparency,
    codes: Vec<u8>,
    attrs: Option<Vec<u8>>,
    pub(crate) cache: DirtyTileCache,
    pub(crate) bitmap: IndexedBitmap,
    scroll_x: i32,
    scroll_y: i32,
    enabled: bool,
}

impl TileLayer {
    pub fn new(name: &str, cols: usize, rows: usize, gfx: GfxId) -> Self {
        let cells = cols * rows;
        Self {
            name: name.to_string(),
            cols,
            rows,
            layout: CellLayout::default(),
            gfx,
            format: TileFormat::default(),
            transparency: Transparency::Opaque,
            codes: vec![0; cells],
            attrs: None,
            cache: DirtyTileCache::new(cells),
            bitmap: IndexedBitmap::new(0, 0),
            scroll_x: 0,
            scroll_y: 0,
            enabled: true,
        }
    }

    pub fn with_layout(mut self, layout: CellLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Add an attribute plane decoded with `format`.
    pub fn with_attributes(mut self, format: TileFormat) -> Self {
        self.format = format;
        self.attrs = Some(vec![0; self.codes.len()]);
        self
    }

    pub fn with_format(mut self, format: TileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cells(&self) -> usize {
        self.codes.len()
    }

    pub fn gfx(&self) -> GfxId {
        self.gfx
    }

    pub fn transparency(&self) -> Transparency {
        self.transparency
    }

    pub fn cache(&self) -> &DirtyTileCache {
        &self.cache
    }

    pub fn bitmap(&self) -> &IndexedBitmap {
        &self.bitmap
    }

    pub fn scroll(&self) -> (i32, i32) {
        (self.scroll_x, self.scroll_y)
    }

    pub fn set_scroll(&mut self, x: i32, y: i32) {
        self.scroll_x = x;
        self.scroll_y = y;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn plane(&self, plane: TilePlane) -> Option<&Vec<u8>> {
        match plane {
            TilePlane::Code => Some(&self.codes),
            TilePlane::Attribute => self.attrs.as_ref(),
        }
    }

    pub fn read(&self, plane: TilePlane, offset: usize) -> u8 {
        match self.plane(plane) {
            Some(bytes) if !bytes.is_empty() => bytes[offset % bytes.len()],
            _ => 0xFF,
        }
    }

    /// Store a byte and flag its cell. Rewriting the current value is not a
    /// modification and leaves the cache alone. Returns true when the cell
    /// went from clean to dirty.
    pub fn write(&mut self, plane: TilePlane, offset: usize, value: u8) -> bool {
        let bytes = match plane {
            TilePlane::Code => &mut self.codes,
            TilePlane::Attribute => match self.attrs.as_mut() {
                Some(a) => a,
                None => return false,
            },
        };
        if bytes.is_empty() {
            return false;
        }
        let cell = offset % bytes.len();
        if bytes[cell] == value {
            return false;
        }
        bytes[cell] = value;
        self.cache.mark_dirty(cell)
    }

    pub fn cell(&self, cell: usize) -> TileCell {
        let code = self.codes[cell];
        let attr = self.attrs.as_ref().map(|a| a[cell]);
        self.format.decode(code, attr)
    }

    /// Grid position of a cell, before screen flip.
    pub fn position(&self, cell: usize) -> (usize, usize) {
        match self.layout {
            CellLayout::RowMajor => (cell % self.cols, cell / self.cols),
            CellLayout::ColumnMajor => (cell / self.rows, cell % self.rows),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.codes.fill(0);
        if let Some(attrs) = self.attrs.as_mut() {
            attrs.fill(0);
        }
        self.cache.clear();
        self.scroll_x = 0;
        self.scroll_y = 0;
        self.enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_write_is_not_a_modification() {
        let mut layer = TileLayer::new("fg", 32, 32, GfxId(0));
        assert!(layer.write(TilePlane::Code, 5, 0x10));
        layer.cache.take_dirty();
        assert!(!layer.write(TilePlane::Code, 5, 0x10));
        assert_eq!(layer.cache().dirty_count(), 0);
    }

    #[test]
    fn attribute_plane_decodes_color_flip_and_bank() {
        let format = TileFormat {
            color_mask: 0x0F,
            bank_mask: 0x01,
            bank_shift: 4,
            flip_x: 0x40,
            flip_y: 0x80,
            ..TileFormat::default()
        };
        let mut layer = TileLayer::new("bg", 4, 4, GfxId(0)).with_attributes(format);
        layer.write(TilePlane::Code, 3, 0x22);
        layer.write(TilePlane::Attribute, 3, 0x53);
        assert_eq!(
            layer.cell(3),
            TileCell {
                code: 0x122,
                color: 3,
                flip_x: true,
                flip_y: false,
            }
        );
    }

    #[test]
    fn shift_past_byte_width_reads_zero() {
        let format = TileFormat {
            bank_mask: 0x01,
            bank_shift: 8,
            color_mask: 0xFF,
            color_shift: 9,
            ..TileFormat::default()
        };
        let cell = format.decode(0x01, Some(0xFF));
        assert_eq!(cell.code, 0x01);
        assert_eq!(cell.color, 0);
    }

    #[test]
    fn column_major_positions() {
        let layer = TileLayer::new("bg", 32, 28, GfxId(0)).with_layout(CellLayout::ColumnMajor);
        assert_eq!(layer.position(0), (0, 0));
        assert_eq!(layer.position(29), (1, 1));
    }

    #[test]
    fn attribute_write_without_plane_is_ignored() {
        let mut layer = TileLayer::new("fg", 2, 2, GfxId(0));
        assert!(!layer.write(TilePlane::Attribute, 0, 1));
        assert_eq!(layer.read(TilePlane::Attribute, 0), 0xFF);
    }
}
