//! Tile layers, sprites and the compositor.

pub mod bitmap;
pub mod compositor;
pub mod exchange;
pub mod gfx;
pub mod palette;
pub mod sprite;
pub mod tile_cache;
pub mod tilemap;

pub use bitmap::{IndexedBitmap, TRANSPARENT_PEN};
pub use compositor::{CompositeStats, LayerId, Plane, TileDraw, Video};
pub use exchange::{FramePublisher, FrameReceiver, frame_channel};
pub use gfx::{GfxId, GfxLayout, GfxSet, Placement, Transparency, draw_gfx};
pub use palette::{Palette, PaletteRamFormat, ResistorDac, Rgb};
pub use sprite::{DrawOrder, FieldBit, SpriteEntry, SpriteFormat, SpriteLayer};
pub use tile_cache::DirtyTileCache;
pub use tilemap::{CellLayout, TileCell, TileFormat, TileLayer, TilePlane};

/// Bits of `value` starting at `shift`. Shifting a byte by 8 or more yields 0.
pub(crate) fn field(value: u8, shift: u8) -> u8 {
    value.checked_shr(shift.into()).unwrap_or(0)
}
