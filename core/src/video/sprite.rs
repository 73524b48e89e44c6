use crate::memory::BlockId;
use crate::video::field;
use crate::video::gfx::{GfxId, Transparency};

/// Order in which sprite RAM entries are composited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawOrder {
    /// Entry 0 is the front-most sprite: entries are drawn last to first.
    #[default]
    FrontToBack,
    /// Entry 0 is the back-most sprite: entries are drawn first to last.
    BackToFront,
}

/// A flag bit inside a sprite entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldBit {
    pub byte: usize,
    pub mask: u8,
}

impl FieldBit {
    pub const fn new(byte: usize, mask: u8) -> Self {
        Self { byte, mask }
    }
}

/// Byte layout of one sprite RAM entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteFormat {
    pub entry_size: usize,
    pub count: usize,
    pub x_byte: usize,
    pub y_byte: usize,
    pub code_byte: usize,
    pub attr_byte: usize,
    /// code = (raw >> code_shift) & code_mask
    pub code_mask: u8,
    pub code_shift: u8,
    pub color_mask: u8,
    pub color_shift: u8,
    pub flip_x: Option<FieldBit>,
    pub flip_y: Option<FieldBit>,
    /// Screen x = x_base + x_sign * raw (x_sign is +1 or -1).
    pub x_base: i32,
    pub x_sign: i32,
    pub y_base: i32,
    pub y_sign: i32,
}

impl Default for SpriteFormat {
    fn default() -> Self {
        Self {
            entry_size: 4,
            count: 0,
            x_byte: 3,
            y_byte: 0,
            code_byte: 1,
            attr_byte: 2,
            code_mask: 0xFF,
            code_shift: 0,
            color_mask: 0xFF,
            color_shift: 0,
            flip_x: None,
            flip_y: None,
            x_base: 0,
            x_sign: 1,
            y_base: 0,
            y_sign: 1,
        }
    }
}

/// One sprite, decoded fresh from sprite RAM every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteEntry {
    pub x: i32,
    pub y: i32,
    pub code: u16,
    pub color: u16,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl SpriteFormat {
    /// Decode entry `index` from sprite RAM. Bytes past the end of `ram`
    /// read as zero.
    pub fn decode(&self, ram: &[u8], index: usize) -> SpriteEntry {
        let base = index * self.entry_size;
        let byte = |i: usize| ram.get(base + i).copied().unwrap_or(0);
        let bit = |f: Option<FieldBit>| f.is_some_and(|f| byte(f.byte) & f.mask != 0);
        SpriteEntry {
            x: self.x_base + self.x_sign * byte(self.x_byte) as i32,
            y: self.y_base + self.y_sign * byte(self.y_byte) as i32,
            code: (field(byte(self.code_byte), self.code_shift) & self.code_mask) as u16,
            color: (field(byte(self.attr_byte), self.color_shift) & self.color_mask) as u16,
            flip_x: bit(self.flip_x),
            flip_y: bit(self.flip_y),
        }
    }
}

/// Sprite plane: where its RAM lives and how to draw it.
#[derive(Clone, Copy, Debug)]
pub struct SpriteLayer {
    pub block: BlockId,
    pub offset: usize,
    pub format: SpriteFormat,
    pub gfx: GfxId,
    pub transparency: Transparency,
}
