mod common;

use cabinet_core::board::{Action, BoardBuilder};
use cabinet_core::memory::{AddressSpace, Handler};
use cabinet_core::video::{
    CellLayout, DrawOrder, FieldBit, GfxLayout, PaletteRamFormat, SpriteFormat, SpriteLayer,
    TileDraw, TileFormat, TileLayer, TilePlane, Transparency,
};

use common::{TIMING, blank_video, dot_gfx};

// ==========================================================================
// Dirty tracking end to end
// ==========================================================================

#[test]
fn test_repeated_value_marks_once_and_redraws_latest_code() {
    let mut b = BoardBuilder::new("tiles", TIMING, blank_video(32, 32));
    let rom = b.memory().add_rom("program", vec![0; 0x8000]);
    let gfx = b.video().add_gfx(dot_gfx());
    let layer = b.video().add_layer(TileLayer::new("fg", 32, 32, gfx)).unwrap();
    let space = b.add_space(
        AddressSpace::builder("main")
            .map(0x0000, 0x7FFF, Handler::rom(rom))
            .map(0x8000, 0x83FF, Handler::tile_ram(layer, TilePlane::Code))
            .build()
            .unwrap(),
    );
    let mut board = b.build().unwrap();

    board.write(space, 0x8000, 0x05).unwrap();
    board.write(space, 0x8000, 0x05).unwrap();
    board.write(space, 0x8000, 0x07).unwrap();
    assert_eq!(board.video().layer(layer).unwrap().cache().mark_events(), 1);

    let stats = board.composite(false);
    assert_eq!(stats.tiles_redrawn, 1);
    assert_eq!(
        board.video().last_draws(),
        &[TileDraw {
            layer,
            cell: 0,
            code: 0x07,
            color: 0,
        }]
    );
    // 0x07 % 4 == 3
    assert_eq!(board.video().frame().get(0, 0), 3);

    // Nothing dirty any more.
    assert_eq!(board.composite(false).tiles_redrawn, 0);
    assert!(board.video().last_draws().is_empty());
}

#[test]
fn test_composite_redraws_exactly_the_dirty_set() {
    let mut b = BoardBuilder::new("tiles", TIMING, blank_video(16, 16));
    let gfx = b.video().add_gfx(dot_gfx());
    let bg = TileLayer::new("bg", 16, 16, gfx).with_layout(CellLayout::ColumnMajor);
    let layer = b.video().add_layer(bg).unwrap();
    let space = b.add_space(
        AddressSpace::builder("main")
            .map(0x4000, 0x40FF, Handler::tile_ram(layer, TilePlane::Code))
            .build()
            .unwrap(),
    );
    let mut board = b.build().unwrap();

    for offset in [0x10u16, 0x03, 0x10, 0xFF] {
        board.write(space, 0x4000 + offset, offset as u8 | 1).unwrap();
    }
    board.composite(false);
    let cells: Vec<usize> = board.video().last_draws().iter().map(|d| d.cell).collect();
    assert_eq!(cells, vec![0x10, 0x03, 0xFF]);
    // Column-major: cell 0x10 is column 1, row 0.
    assert_eq!(board.video().frame().get(1, 0), 0x11 % 4);
}

#[test]
fn test_first_frame_after_reset_is_full_redraw() {
    let mut b = BoardBuilder::new("tiles", TIMING, blank_video(4, 4));
    let gfx = b.video().add_gfx(dot_gfx());
    b.video().add_layer(TileLayer::new("fg", 4, 4, gfx)).unwrap();
    let mut board = b.build().unwrap();

    let first = board.step_frame().unwrap();
    assert!(first.composite.full_redraw);
    assert_eq!(first.composite.tiles_redrawn, 16);
    assert_eq!(board.step_frame().unwrap().composite.tiles_redrawn, 0);

    board.reset();
    assert_eq!(board.step_frame().unwrap().composite.tiles_redrawn, 16);
}

// ==========================================================================
// Attributes, palette RAM and flip
// ==========================================================================

#[test]
fn test_attribute_write_marks_cell() {
    let mut b = BoardBuilder::new("tiles", TIMING, blank_video(4, 4));
    let gfx = b.video().add_gfx(dot_gfx().with_colors(0, 4));
    let format = TileFormat {
        color_mask: 0x03,
        ..TileFormat::default()
    };
    let layer = b
        .video()
        .add_layer(TileLayer::new("fg", 4, 4, gfx).with_attributes(format))
        .unwrap();
    let space = b.add_space(
        AddressSpace::builder("main")
            .map(0x4000, 0x400F, Handler::tile_ram(layer, TilePlane::Code))
            .map(0x4400, 0x440F, Handler::tile_ram(layer, TilePlane::Attribute))
            .build()
            .unwrap(),
    );
    let mut board = b.build().unwrap();
    board.write(space, 0x4005, 0x01).unwrap();
    board.write(space, 0x4405, 0x02).unwrap();
    board.composite(false);
    assert_eq!(board.video().last_draws().len(), 1);
    // color 2, granularity 4, pixel 1 -> pen 9
    assert_eq!(board.video().frame().get(1, 1), 9);
}

#[test]
fn test_flip_and_palette_writes_force_full_redraw() {
    let mut b = BoardBuilder::new("tiles", TIMING, blank_video(2, 2));
    let gfx = b.video().add_gfx(dot_gfx());
    let layer = b.video().add_layer(TileLayer::new("fg", 2, 2, gfx)).unwrap();
    let space = b.add_space(
        AddressSpace::builder("main")
            .map(0x4000, 0x4003, Handler::tile_ram(layer, TilePlane::Code))
            .map(0x5000, 0x500F, Handler::PaletteRam(PaletteRamFormat::Rgb332))
            .build()
            .unwrap(),
    );
    let mut board = b.build().unwrap();
    board.write(space, 0x4000, 1).unwrap();
    board.composite(false);

    board.apply(&Action::FlipScreen(true)).unwrap();
    assert_eq!(board.composite(false).tiles_redrawn, 4);
    // Cell 0 now sits in the opposite corner.
    assert_eq!(board.video().frame().get(1, 1), 1);

    board.write(space, 0x5003, 0xC0).unwrap();
    assert_eq!(board.read(space, 0x5003).unwrap(), 0xC0);
    assert!(board.composite(false).full_redraw);

    board.apply(&Action::ForceRedraw).unwrap();
    assert_eq!(board.composite(false).tiles_redrawn, 4);
}

// ==========================================================================
// Layers and sprites
// ==========================================================================

#[test]
fn test_transparent_foreground_shows_background_and_scroll() {
    let mut b = BoardBuilder::new("layers", TIMING, blank_video(4, 1));
    let gfx = b.video().add_gfx(dot_gfx());
    let bg = b.video().add_layer(TileLayer::new("bg", 4, 1, gfx)).unwrap();
    let fg = TileLayer::new("fg", 4, 1, gfx).with_transparency(Transparency::Pixel(0));
    let fg = b.video().add_layer(fg).unwrap();
    let mut board = b.build().unwrap();
    let video = board.video_mut();
    for cell in 0..4 {
        video.write_tile_ram(bg, TilePlane::Code, cell, 2);
    }
    video.write_tile_ram(fg, TilePlane::Code, 1, 3);
    board.composite(false);
    assert_eq!(board.video().frame().pixels(), &[2, 3, 2, 2]);

    board.video_mut().layer_mut(fg).unwrap().set_scroll(1, 0);
    board.composite(false);
    assert_eq!(board.video().frame().pixels(), &[3, 2, 2, 2]);
}

#[test]
fn test_sprites_drawn_from_ram_in_runtime_order() {
    let mut b = BoardBuilder::new("sprites", TIMING, blank_video(16, 16));
    // 2x2 solid sprites from a planar ROM: code 0 all pixel 1, code 1 all pixel 2.
    let layout = GfxLayout {
        width: 2,
        height: 2,
        plane_offsets: vec![0, 1],
        x_offsets: vec![0, 2],
        y_offsets: vec![0, 4],
        increment: 8,
    };
    let gfx = b.video().add_gfx(layout.decode(&[0b0101_0101, 0b1010_1010]));
    let sprite_ram = b.memory().add_ram("sprites", 8, 0);
    b.video()
        .set_sprites(SpriteLayer {
            block: sprite_ram,
            offset: 0,
            format: SpriteFormat {
                count: 2,
                flip_x: Some(FieldBit::new(2, 0x80)),
                ..SpriteFormat::default()
            },
            gfx,
            transparency: Transparency::Pixel(0),
        })
        .unwrap();
    let space = b.add_space(
        AddressSpace::builder("main")
            .map(0x7000, 0x7007, Handler::ram(sprite_ram))
            .build()
            .unwrap(),
    );
    let mut board = b.build().unwrap();
    assert_eq!(board.video().gfx(gfx).unwrap().pixel(1, 1, 1), 2);

    // Entry 0: code 0 at (4,4). Entry 1: code 1 at (5,5).
    for (addr, value) in [
        (0x7000, 4),
        (0x7001, 0),
        (0x7003, 4),
        (0x7004, 5),
        (0x7005, 1),
        (0x7007, 5),
    ] {
        board.write(space, addr, value).unwrap();
    }
    let stats = board.composite(false);
    assert_eq!(stats.sprites_drawn, 2);
    // Front-to-back: entry 0 wins the overlap.
    assert_eq!(board.video().frame().get(5, 5), 1);
    assert_eq!(board.video().frame().get(6, 6), 2);

    board.apply(&Action::SetSpriteOrder(DrawOrder::BackToFront)).unwrap();
    board.composite(false);
    assert_eq!(board.video().frame().get(5, 5), 2);
}
