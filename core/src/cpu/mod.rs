//! CPU collaborator interface.
//!
//! The board never decodes instructions. A CPU core is anything that can
//! run for a number of cycles against a [`Bus`] and accept interrupt
//! requests between time slices.

use std::any::Any;

use crate::core::{Bus, BusMaster};
use crate::interrupt::InterruptLine;
use crate::memory::BankView;

pub mod scripted;
pub use scripted::{BusOp, ScriptedCpu};

/// Index of a CPU in board declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CpuId(pub usize);

impl CpuId {
    pub fn master(self) -> BusMaster {
        BusMaster::Cpu(self.0)
    }
}

/// Generic CPU interface
pub trait Cpu: Any {
    /// Execute roughly `cycles` cycles. Returns the cycles actually
    /// consumed, which may overshoot when the last instruction straddles
    /// the slice end; the board carries the overshoot into the next slice.
    fn run(&mut self, cycles: u64, bus: &mut dyn Bus, master: BusMaster) -> u64;

    /// Present an interrupt request. Called before `run` for every line the
    /// board considers deliverable.
    fn signal(&mut self, line: InterruptLine);

    /// Notification that a bank mapped into this CPU's program space now
    /// points at a different page. Cores that cache an opcode base pointer
    /// refresh it here; the default ignores it.
    fn set_program_bank(&mut self, _view: BankView) {}

    /// Reset vector fetch
    fn reset(&mut self);
}
