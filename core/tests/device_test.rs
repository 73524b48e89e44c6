mod common;

use cabinet_core::board::{Action, Board, BoardBuilder};
use cabinet_core::cpu::CpuId;
use cabinet_core::device::{
    AdpcmFeeder, CommandLatch, DeviceId, PortMode, RegisterFileChip, SoundChip, SoundPort,
    ValueDecoder,
};
use cabinet_core::interrupt::InterruptLine;
use cabinet_core::memory::{AddressSpace, Bank, Handler, SpaceId};
use cabinet_core::video::DrawOrder;

use common::{TIMING, blank_video};

/// Board with one device mapped at 0x8000-0x80FF and no CPUs.
fn board_with(
    setup: impl FnOnce(&mut BoardBuilder) -> DeviceId,
) -> (Board, SpaceId, DeviceId) {
    let mut b = BoardBuilder::new("devices", TIMING, blank_video(8, 8));
    let id = setup(&mut b);
    let space = b.add_space(
        AddressSpace::builder("main")
            .map(0x8000, 0x80FF, Handler::Device(id))
            .build()
            .unwrap(),
    );
    (b.build().unwrap(), space, id)
}

// ==========================================================================
// ValueDecoder
// ==========================================================================

#[test]
fn test_value_decoder_magic_values_and_fallback() {
    let (mut board, space, id) = board_with(|b| {
        let rom = b.memory().add_rom("banks", vec![0; 0x4000]);
        let bank = b.add_bank(Bank::new("bank1", rom, 0x2000, 2)).unwrap();
        b.add_device(Box::new(
            ValueDecoder::new("stopcode")
                .with_value(
                    0xA5,
                    vec![
                        Action::SelectBank { bank, page: 1 },
                        Action::FlipScreen(true),
                    ],
                )
                .with_fallback(vec![Action::SetSpriteOrder(DrawOrder::BackToFront)]),
        ))
    });

    board.write(space, 0x8000, 0xA5).unwrap();
    let bank = board.banks().get(cabinet_core::memory::BankId(0)).unwrap();
    assert_eq!(bank.selected(), 1);
    assert!(board.video().flipped());
    assert_eq!(board.video().sprite_order(), DrawOrder::FrontToBack);

    board.write(space, 0x8000, 0x00).unwrap();
    assert_eq!(board.video().sprite_order(), DrawOrder::BackToFront);
    assert_eq!(board.device::<ValueDecoder>(id).unwrap().last(), 0x00);
}

// ==========================================================================
// Sound chip ports
// ==========================================================================

#[test]
fn test_address_latched_port() {
    let (mut board, space, id) = board_with(|b| {
        b.add_device(Box::new(SoundPort::new(
            "ay",
            PortMode::AddressLatched,
            RegisterFileChip::new(),
        )))
    });
    board.write(space, 0x8000, 0x07).unwrap();
    board.write(space, 0x8001, 0x38).unwrap();
    assert_eq!(board.read(space, 0x8001).unwrap(), 0x38);

    let port = board.device::<SoundPort<RegisterFileChip>>(id).unwrap();
    assert_eq!(port.selected(), 0x07);
    assert_eq!(port.chip().register(0x07), 0x38);
    assert_eq!(port.chip().writes(), 1);
}

#[test]
fn test_direct_port_maps_offset_to_register() {
    let (mut board, space, id) = board_with(|b| {
        let port = SoundPort::new("dac", PortMode::Direct, RegisterFileChip::new());
        b.add_device(Box::new(port))
    });
    board.write(space, 0x8003, 0x80).unwrap();
    let port = board.device::<SoundPort<RegisterFileChip>>(id).unwrap();
    assert_eq!(port.chip().register(3), 0x80);
    assert!(board.device::<ValueDecoder>(id).is_none());
}

// ==========================================================================
// Command latch gate
// ==========================================================================

#[test]
fn test_gated_latch_holds_data_without_interrupt() {
    let mut b = BoardBuilder::new("gate", TIMING, blank_video(8, 8));
    let sound = CpuId(0);
    let latch = b.add_device(Box::new(
        CommandLatch::new("soundlatch", sound, InterruptLine::Nmi).with_gate(),
    ));
    let space = b.add_space(
        AddressSpace::builder("main")
            .map(0x8000, 0x8001, Handler::Device(latch))
            .build()
            .unwrap(),
    );
    b.add_cpu(cabinet_core::board::CpuConfig::new(
        "sound",
        Box::new(cabinet_core::cpu::ScriptedCpu::idle()),
        1_000_000,
        space,
    ));
    let mut board = b.build().unwrap();

    board.write(space, 0x8000, 0x10).unwrap();
    board.run_slice(10).unwrap();
    assert!(!board.interrupts(sound).unwrap().is_pending(InterruptLine::Nmi));
    assert_eq!(board.read(space, 0x8001).unwrap(), 1);

    // Open the gate through a device delivery, as a control latch would.
    board
        .apply(&Action::Device {
            device: latch,
            param: 1,
        })
        .unwrap();
    board.write(space, 0x8000, 0x11).unwrap();
    board.run_slice(10).unwrap();
    assert!(board.interrupts(sound).unwrap().is_pending(InterruptLine::Nmi));
    assert_eq!(board.read(space, 0x8000).unwrap(), 0x11);
    assert_eq!(board.read(space, 0x8001).unwrap(), 0);
}

// ==========================================================================
// ADPCM feeder
// ==========================================================================

/// Chip that remembers the nibbles it was fed.
#[derive(Default)]
struct NibbleSink {
    fed: Vec<u8>,
}

impl SoundChip for NibbleSink {
    fn write(&mut self, _register: u8, data: u8) {
        self.fed.push(data);
    }
}

fn adpcm_board() -> (Board, SpaceId, DeviceId) {
    board_with(|b| {
        let mut samples = vec![0u8; 0x200];
        samples[0x100..0x104].copy_from_slice(&[0x12, 0x34, 0x56, 0xFF]);
        samples[0..2].copy_from_slice(&[0xAB, 0xFF]);
        let rom = b.memory().add_rom("samples", samples);
        let this = b.next_device_id();
        b.add_device(Box::new(
            AdpcmFeeder::new("adpcm", this, rom, 100, NibbleSink::default()).with_end_marker(0xFF),
        ))
    })
}

#[test]
fn test_adpcm_streams_nibbles_until_end_marker() {
    let (mut board, space, id) = adpcm_board();
    board.write(space, 0x8000, 0x01).unwrap();
    assert_eq!(board.read(space, 0x8000).unwrap(), 1);

    board.run_slice(2_000).unwrap();
    let feeder = board.device::<AdpcmFeeder<NibbleSink>>(id).unwrap();
    assert_eq!(feeder.chip().fed, vec![1, 2, 3, 4, 5, 6]);
    assert!(!feeder.is_playing());
    assert_eq!(board.read(space, 0x8000).unwrap(), 0);
}

#[test]
fn test_adpcm_restart_cancels_running_stream() {
    let (mut board, space, id) = adpcm_board();
    board.write(space, 0x8000, 0x01).unwrap();
    board.run_slice(250).unwrap();
    // Restart at sample 0 mid-stream: the old tick timer must not survive.
    board.write(space, 0x8000, 0x00).unwrap();
    board.run_slice(1_000).unwrap();
    let feeder = board.device::<AdpcmFeeder<NibbleSink>>(id).unwrap();
    assert_eq!(feeder.chip().fed, vec![1, 2, 0xA, 0xB]);
}

#[test]
fn test_adpcm_stop_register() {
    let (mut board, space, id) = adpcm_board();
    board.write(space, 0x8000, 0x01).unwrap();
    board.run_slice(100).unwrap();
    board.write(space, 0x8001, 0x00).unwrap();
    board.run_slice(1_000).unwrap();
    let feeder = board.device::<AdpcmFeeder<NibbleSink>>(id).unwrap();
    assert_eq!(feeder.chip().fed, vec![1]);
    assert!(!feeder.is_playing());
}
