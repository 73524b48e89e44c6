use crate::error::{Error, Result};
use crate::memory::Memory;
use crate::video::bitmap::{IndexedBitmap, TRANSPARENT_PEN};
use crate::video::gfx::{GfxId, GfxSet, Placement, draw_gfx};
use crate::video::palette::{Palette, PaletteRamFormat};
use crate::video::sprite::{DrawOrder, SpriteLayer};
use crate::video::tilemap::{TileCell, TileLayer, TilePlane};

/// Handle to a tile layer owned by [`Video`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerId(pub usize);

/// Compositing step, bottom to top.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    Layer(LayerId),
    Sprites,
}

/// A cell redrawn into a layer cache during the last composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileDraw {
    pub layer: LayerId,
    pub cell: usize,
    pub code: u16,
    pub color: u16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositeStats {
    pub tiles_redrawn: usize,
    pub sprites_drawn: usize,
    pub full_redraw: bool,
}

/// Render one cell into its layer's cache bitmap.
fn draw_cell(
    layer: &mut TileLayer,
    gfx: &GfxSet,
    palette: &Palette,
    flip: bool,
    cell: usize,
) -> TileCell {
    let tile = layer.cell(cell);
    let (mut col, mut row) = layer.position(cell);
    if flip {
        col = layer.cols() - 1 - col;
        row = layer.rows() - 1 - row;
    }
    let at = Placement {
        code: tile.code,
        color: tile.color,
        flip_x: tile.flip_x != flip,
        flip_y: tile.flip_y != flip,
        x: (col * gfx.width()) as i32,
        y: (row * gfx.height()) as i32,
    };
    let transparency = layer.transparency();
    draw_gfx(&mut layer.bitmap, gfx, palette, &at, transparency, true);
    tile
}

/// Video state of a board: graphics, palette, tile layers, sprites and the
/// output bitmap.
pub struct Video {
    width: usize,
    height: usize,
    palette: Palette,
    palette_ram: Vec<u8>,
    gfx: Vec<GfxSet>,
    layers: Vec<TileLayer>,
    sprites: Option<SpriteLayer>,
    planes: Vec<Plane>,
    background: u16,
    flip: bool,
    sprite_order: DrawOrder,
    invalidated: bool,
    frame: IndexedBitmap,
    draws: Vec<TileDraw>,
}

impl Video {
    pub fn new(width: usize, height: usize, palette: Palette) -> Self {
        Self {
            width,
            height,
            palette,
            palette_ram: Vec::new(),
            gfx: Vec::new(),
            layers: Vec::new(),
            sprites: None,
            planes: Vec::new(),
            background: 0,
            flip: false,
            sprite_order: DrawOrder::default(),
            invalidated: false,
            frame: IndexedBitmap::new(width, height),
            draws: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn add_gfx(&mut self, set: GfxSet) -> GfxId {
        self.gfx.push(set);
        GfxId(self.gfx.len() - 1)
    }

    pub fn gfx(&self, id: GfxId) -> Option<&GfxSet> {
        self.gfx.get(id.0)
    }

    /// Register a tile layer and append it to the plane order.
    pub fn add_layer(&mut self, mut layer: TileLayer) -> Result<LayerId> {
        let gfx = self
            .gfx
            .get(layer.gfx().0)
            .ok_or(Error::UnknownGfx(layer.gfx().0))?;
        layer.bitmap = IndexedBitmap::new(layer.cols() * gfx.width(), layer.rows() * gfx.height());
        // Bring the cache in line with the (zeroed) tile RAM without
        // counting it as a redraw.
        for cell in 0..layer.cells() {
            draw_cell(&mut layer, gfx, &self.palette, self.flip, cell);
        }
        let id = LayerId(self.layers.len());
        log::debug!(
            "tile layer \"{}\": {}x{} cells",
            layer.name(),
            layer.cols(),
            layer.rows()
        );
        self.layers.push(layer);
        self.planes.push(Plane::Layer(id));
        Ok(id)
    }

    /// Install the sprite plane on top of the layers added so far.
    pub fn set_sprites(&mut self, sprites: SpriteLayer) -> Result<()> {
        if self.gfx.get(sprites.gfx.0).is_none() {
            return Err(Error::UnknownGfx(sprites.gfx.0));
        }
        self.sprites = Some(sprites);
        self.planes.retain(|p| *p != Plane::Sprites);
        self.planes.push(Plane::Sprites);
        Ok(())
    }

    /// Replace the compositing order.
    pub fn set_planes(&mut self, planes: Vec<Plane>) {
        self.planes = planes;
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn set_background(&mut self, pen: u16) {
        self.background = pen;
    }

    pub fn layer(&self, id: LayerId) -> Result<&TileLayer> {
        self.layers.get(id.0).ok_or(Error::UnknownLayer(id.0))
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut TileLayer> {
        self.layers.get_mut(id.0).ok_or(Error::UnknownLayer(id.0))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn read_tile_ram(&self, layer: LayerId, plane: TilePlane, offset: usize) -> u8 {
        self.layers
            .get(layer.0)
            .map_or(0xFF, |l| l.read(plane, offset))
    }

    pub fn write_tile_ram(&mut self, layer: LayerId, plane: TilePlane, offset: usize, value: u8) {
        if let Some(l) = self.layers.get_mut(layer.0) {
            l.write(plane, offset, value);
        }
    }

    pub fn read_palette_ram(&self, offset: usize) -> u8 {
        self.palette_ram.get(offset).copied().unwrap_or(0)
    }

    /// Store a palette RAM byte and recolour pen `offset`. A colour change
    /// invalidates every layer cache.
    pub fn write_palette_ram(&mut self, format: PaletteRamFormat, offset: usize, value: u8) {
        if self.palette_ram.len() <= offset {
            self.palette_ram.resize(offset + 1, 0);
        }
        self.palette_ram[offset] = value;
        if self.palette.set_color(offset, format.decode(value)) {
            self.invalidated = true;
        }
    }

    pub fn flipped(&self) -> bool {
        self.flip
    }

    pub fn set_flip(&mut self, flip: bool) {
        if self.flip != flip {
            self.flip = flip;
            self.invalidated = true;
        }
    }

    pub fn sprite_order(&self) -> DrawOrder {
        self.sprite_order
    }

    pub fn set_sprite_order(&mut self, order: DrawOrder) {
        self.sprite_order = order;
    }

    /// Force every cell of every layer to be redrawn at the next composite.
    pub fn invalidate_all(&mut self) {
        self.invalidated = true;
    }

    pub fn frame(&self) -> &IndexedBitmap {
        &self.frame
    }

    /// Cells redrawn by the most recent composite, in redraw order.
    pub fn last_draws(&self) -> &[TileDraw] {
        &self.draws
    }

    pub fn render_rgb24(&self, buffer: &mut [u8]) {
        self.frame.to_rgb24(&self.palette, buffer);
    }

    /// Bring layer caches up to date and build the output frame.
    pub fn composite(&mut self, memory: &Memory, force: bool) -> CompositeStats {
        let full = force || self.invalidated;
        self.invalidated = false;
        self.draws.clear();

        for (index, layer) in self.layers.iter_mut().enumerate() {
            if full {
                layer.cache.mark_all();
            }
            let Some(gfx) = self.gfx.get(layer.gfx().0) else {
                continue;
            };
            for cell in layer.cache.take_dirty() {
                let tile = draw_cell(layer, gfx, &self.palette, self.flip, cell);
                self.draws.push(TileDraw {
                    layer: LayerId(index),
                    cell,
                    code: tile.code,
                    color: tile.color,
                });
            }
        }

        self.frame.fill(self.background);
        let mut sprites_drawn = 0;
        for plane in self.planes.clone() {
            match plane {
                Plane::Layer(id) => self.copy_layer(id),
                Plane::Sprites => sprites_drawn = self.draw_sprites(memory),
            }
        }

        CompositeStats {
            tiles_redrawn: self.draws.len(),
            sprites_drawn,
            full_redraw: full,
        }
    }

    fn copy_layer(&mut self, id: LayerId) {
        let Some(layer) = self.layers.get(id.0) else {
            return;
        };
        let src = &layer.bitmap;
        if !layer.enabled() || src.width() == 0 || src.height() == 0 {
            return;
        }
        // The cached bitmap is mirrored as a whole under flip, so the visible
        // window sits at the far edge of the layer.
        let (mut sx, mut sy) = layer.scroll();
        if self.flip {
            sx = src.width() as i32 - self.width as i32 - sx;
            sy = src.height() as i32 - self.height as i32 - sy;
        }
        for y in 0..self.height {
            let src_y = (y as i32 + sy).rem_euclid(src.height() as i32) as usize;
            for x in 0..self.width {
                let src_x = (x as i32 + sx).rem_euclid(src.width() as i32) as usize;
                let pen = src.get(src_x, src_y);
                if pen != TRANSPARENT_PEN {
                    self.frame.set(x, y, pen);
                }
            }
        }
    }

    fn draw_sprites(&mut self, memory: &Memory) -> usize {
        let Some(layer) = self.sprites else {
            return 0;
        };
        let Some(gfx) = self.gfx.get(layer.gfx.0) else {
            return 0;
        };
        let Some(block) = memory.block(layer.block) else {
            return 0;
        };
        let ram = block.as_slice().get(layer.offset..).unwrap_or(&[]);
        let count = layer.format.count;
        let order: Box<dyn Iterator<Item = usize>> = match self.sprite_order {
            DrawOrder::FrontToBack => Box::new((0..count).rev()),
            DrawOrder::BackToFront => Box::new(0..count),
        };
        for index in order {
            let sprite = layer.format.decode(ram, index);
            let mut at = Placement {
                code: sprite.code,
                color: sprite.color,
                flip_x: sprite.flip_x,
                flip_y: sprite.flip_y,
                x: sprite.x,
                y: sprite.y,
            };
            if self.flip {
                at.x = self.width as i32 - gfx.width() as i32 - at.x;
                at.y = self.height as i32 - gfx.height() as i32 - at.y;
                at.flip_x = !at.flip_x;
                at.flip_y = !at.flip_y;
            }
            let transparency = layer.transparency;
            draw_gfx(&mut self.frame, gfx, &self.palette, &at, transparency, false);
        }
        count
    }

    /// Power-on state: tile RAM cleared, palette restored, flip off.
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
        self.palette.reset();
        self.palette_ram.fill(0);
        self.flip = false;
        self.sprite_order = DrawOrder::default();
        self.invalidated = true;
        self.draws.clear();
        self.frame.fill(self.background);
    }
}
