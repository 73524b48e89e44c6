#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use cabinet_core::board::Timing;
use cabinet_core::core::{Bus, BusMaster};
use cabinet_core::cpu::Cpu;
use cabinet_core::interrupt::InterruptLine;
use cabinet_core::memory::BankView;
use cabinet_core::video::{GfxSet, Palette, Rgb, Video};

pub const TIMING: Timing = Timing {
    master_clock_hz: 1_000_000,
    cycles_per_frame: 10_000,
};

/// Everything a [`RecordingCpu`] was asked to do, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Signal(InterruptLine),
    Run(u64),
    Bank { page: usize },
    Reset,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// CPU that touches nothing and logs every call from the board.
pub struct RecordingCpu {
    log: Log,
}

impl RecordingCpu {
    pub fn new() -> (Box<Self>, Log) {
        let log = Log::default();
        let cpu = Self {
            log: Rc::clone(&log),
        };
        (Box::new(cpu), log)
    }
}

impl Cpu for RecordingCpu {
    fn run(&mut self, cycles: u64, _bus: &mut dyn Bus, _master: BusMaster) -> u64 {
        self.log.borrow_mut().push(Event::Run(cycles));
        cycles
    }

    fn signal(&mut self, line: InterruptLine) {
        self.log.borrow_mut().push(Event::Signal(line));
    }

    fn set_program_bank(&mut self, view: BankView) {
        self.log.borrow_mut().push(Event::Bank { page: view.page });
    }

    fn reset(&mut self) {
        self.log.borrow_mut().push(Event::Reset);
    }
}

pub fn signals(log: &Log, line: InterruptLine) -> usize {
    log.borrow()
        .iter()
        .filter(|e| **e == Event::Signal(line))
        .count()
}

pub fn runs(log: &Log) -> Vec<u64> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Run(c) => Some(*c),
            _ => None,
        })
        .collect()
}

/// 1x1 "tiles": code n is a single pixel of value n % 4.
pub fn dot_gfx() -> GfxSet {
    GfxSet::from_pixels(1, 1, (0..=255u16).map(|c| (c % 4) as u8).collect())
}

pub fn blank_video(width: usize, height: usize) -> Video {
    Video::new(width, height, Palette::new(vec![Rgb::BLACK; 16]))
}
