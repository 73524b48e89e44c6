use cabinet_core::core::Machine;
use cabinet_core::device::{RegisterFileChip, SoundPort};
use cabinet_core::Error;
use cabinet_machines::{DescriptionError, MachineDescription, registry};

fn board(name: &str) -> cabinet_core::board::Board {
    registry::find(name).unwrap().create().unwrap()
}

const HEADER: &str = r#"
name = "t"
[timing]
master_clock_hz = 1000
cycles_per_frame = 100
[video]
width = 8
height = 8
"#;

fn parse(body: &str) -> MachineDescription {
    MachineDescription::from_toml(&format!("{HEADER}{body}")).unwrap()
}

// ==========================================================================
// Built-in boards
// ==========================================================================

#[test]
fn test_tiles_first_frame_pixels() {
    let mut board = board("tiles");
    let report = board.step_frame().unwrap();
    assert!(report.composite.full_redraw);
    assert_eq!(report.composite.tiles_redrawn, 16);
    assert_eq!(report.composite.sprites_drawn, 4);

    let frame = board.video().frame();
    assert_eq!(frame.get(0, 0), 1); // frame tile border, colour 0
    assert_eq!(frame.get(1, 1), 0); // frame tile interior
    assert_eq!(frame.get(8, 8), 2); // checker, colour 1
    assert_eq!(frame.get(9, 8), 0);
    assert_eq!(frame.get(8, 16), 3); // solid, colour 2
    assert_eq!(frame.get(21, 21), 4); // sprite, colour 3
    assert_eq!(frame.get(31, 31), 0); // vblank has not been serviced yet
}

#[test]
fn test_tiles_vblank_routine_only_redraws_changed_cell() {
    let mut board = board("tiles");
    board.step_frame().unwrap();

    let report = board.step_frame().unwrap();
    assert!(!report.composite.full_redraw);
    assert_eq!(report.composite.tiles_redrawn, 1);
    // Port 0 idles at 0xFF; code 0xFF wraps to the frame tile.
    assert_eq!(board.video().frame().get(31, 31), 1);
    assert_eq!(board.video().frame().get(29, 30), 0);

    let report = board.step_frame().unwrap();
    assert_eq!(report.composite.tiles_redrawn, 0);
    assert!(!report.watchdog_reset);
}

#[test]
fn test_tiles_input_reaches_tilemap() {
    let mut board = board("tiles");
    board.step_frame().unwrap();
    board.step_frame().unwrap();
    assert_eq!(board.input_map().len(), 2);

    board.set_input(1, true);
    board.step_frame().unwrap();
    // 0xFD selects the solid tile.
    assert_eq!(board.video().frame().get(29, 30), 1);
}

#[test]
fn test_latch_command_reaches_sound_chip() {
    let mut board = board("latch");
    board.step_frame().unwrap();

    let ram = board.memory().find("soundram").unwrap();
    assert_eq!(board.memory().read(ram, 0x10), 0x11);
    let ay = board.devices().find("ay").unwrap();
    let port = board.device::<SoundPort<RegisterFileChip>>(ay).unwrap();
    assert_eq!(port.chip().register(7), 0x11);

    // The second command (from bank page 0) lands at the end of frame 0
    // and is serviced early in frame 1.
    board.step_frame().unwrap();
    assert_eq!(board.memory().read(ram, 0x10), 0x00);
}

// ==========================================================================
// Errors
// ==========================================================================

#[test]
fn test_unknown_reference_is_named() {
    let desc = parse(
        r#"
        [[spaces]]
        name = "main"
        regions = [{ start = 0, end = 0, map = "device", device = "ghost" }]
        "#,
    );
    match desc.build(std::path::Path::new(".")) {
        Err(DescriptionError::UnknownName { kind, name }) => {
            assert_eq!(kind, "device");
            assert_eq!(name, "ghost");
        }
        other => panic!("unexpected: {:?}", other.err()),
    }
}

#[test]
fn test_duplicate_block_name() {
    let desc = parse(
        r#"
        [[memory]]
        name = "ram"
        kind = "ram"
        size = 16
        [[memory]]
        name = "ram"
        kind = "ram"
        size = 16
        "#,
    );
    assert!(matches!(
        desc.build(std::path::Path::new(".")),
        Err(DescriptionError::Duplicate { kind: "block", .. })
    ));
}

#[test]
fn test_overlap_surfaces_core_error() {
    let desc = parse(
        r#"
        [[memory]]
        name = "ram"
        kind = "ram"
        size = 0x100
        [[spaces]]
        name = "main"
        regions = [
            { start = 0x00, end = 0x7F, map = "ram", block = "ram" },
            { start = 0x40, end = 0xBF, map = "ram", block = "ram", offset = 0x40 },
        ]
        "#,
    );
    assert!(matches!(
        desc.build(std::path::Path::new(".")),
        Err(DescriptionError::Board(Error::RegionOverlap { start: 0x40, .. }))
    ));
}

#[test]
fn test_bad_colour() {
    let desc = parse(
        r##"
        [video.palette]
        colors = ["#12345"]
        "##,
    );
    assert!(matches!(
        desc.build(std::path::Path::new(".")),
        Err(DescriptionError::Invalid(_))
    ));
}

#[test]
fn test_shift_past_a_byte_is_rejected() {
    let bodies = [
        r#"
        [[memory]]
        name = "banked"
        kind = "rom"
        size = 0x200
        [[banks]]
        name = "bank1"
        block = "banked"
        page_size = 0x100
        pages = 2
        [[devices]]
        name = "bankselect"
        kind = "bank-select"
        bank = "bank1"
        shift = 8
        "#,
        r#"
        [[video.gfx]]
        name = "dots"
        width = 1
        height = 1
        pixels = [0, 1]
        [[video.layers]]
        name = "bg"
        cols = 8
        rows = 8
        gfx = "dots"
        attributes = true
        format = { bank_mask = 0x01, bank_shift = 8 }
        "#,
        r#"
        [[memory]]
        name = "spriteram"
        kind = "ram"
        size = 0x10
        [[video.gfx]]
        name = "dots"
        width = 1
        height = 1
        pixels = [0, 1]
        [video.sprites]
        block = "spriteram"
        gfx = "dots"
        count = 4
        color_shift = 9
        "#,
    ];
    for body in bodies {
        match parse(body).build(std::path::Path::new(".")) {
            Err(DescriptionError::Invalid(message)) => {
                assert!(message.contains("shifts past a byte"), "{message}");
            }
            other => panic!("unexpected: {:?}", other.err()),
        }
    }
}

#[test]
fn test_rom_file_is_loaded_relative_to_description() {
    let dir = std::env::temp_dir().join(format!("cabinet-desc-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("prog.bin"), [0xDE, 0xAD]).unwrap();
    std::fs::write(
        dir.join("board.toml"),
        format!(
            "{HEADER}\n{}",
            r#"
            [[memory]]
            name = "prog"
            file = "prog.bin"
            size = 4
            fill = 0xEE
            [[spaces]]
            name = "main"
            unmapped = "open-bus"
            regions = [{ start = 0, end = 3, map = "rom", block = "prog" }]
            "#
        ),
    )
    .unwrap();

    let mut board = cabinet_machines::load_file(&dir.join("board.toml")).unwrap();
    let main = cabinet_core::memory::SpaceId(0);
    assert_eq!(board.read(main, 0).unwrap(), 0xDE);
    assert_eq!(board.read(main, 3).unwrap(), 0xEE);
    assert_eq!(board.read(main, 4).unwrap(), 0xFF);

    let missing = cabinet_machines::load_file(&dir.join("absent.toml"));
    assert!(matches!(missing, Err(DescriptionError::Io { .. })));
    std::fs::remove_dir_all(&dir).unwrap();
}
