//! Game-agnostic runtime for 8-bit arcade boards.
//!
//! A board is data: storage blocks, banks, per-CPU address spaces, devices,
//! timers and a tile/sprite video pipeline, wired together by a
//! [`BoardBuilder`](board::BoardBuilder). CPU cores plug in through the
//! [`Cpu`](cpu::Cpu) trait and see the board only as a [`Bus`](core::Bus).

pub mod board;
pub mod core;
pub mod cpu;
pub mod device;
pub mod error;
pub mod input;
pub mod interrupt;
pub mod memory;
pub mod timer;
pub mod video;

pub use error::{Access, Error, Result};

pub mod prelude {
    pub use crate::board::{Action, Board, BoardBuilder, CpuConfig, FrameReport, Timing};
    pub use crate::core::{Bus, BusMaster, InputButton, Machine};
    pub use crate::cpu::{BusOp, Cpu, CpuId, ScriptedCpu};
    pub use crate::device::{Device, DeviceContext, DeviceId, DeviceRegistry};
    pub use crate::error::{Error, Result};
    pub use crate::interrupt::{InterruptLine, LineConfig, MaskedBehavior, Trigger};
    pub use crate::memory::{
        AddressSpace, Bank, BankId, BankPolicy, BlockId, Handler, SpaceId, UnmappedPolicy,
    };
    pub use crate::timer::{TimerHandle, TimerQueue};
    pub use crate::video::{LayerId, Palette, TileLayer, TilePlane, Video};
}
