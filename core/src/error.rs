use thiserror::Error;

/// Direction of a bus access, carried by [`Error::UnmappedAccess`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// Errors produced while configuring or running a board.
///
/// Everything except [`Error::UnmappedAccess`] is a configuration error:
/// it means the machine description is wrong and is reported before any
/// emulation runs. `UnmappedAccess` only surfaces when the address space
/// runs under [`UnmappedPolicy::Strict`](crate::memory::UnmappedPolicy).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unmapped {access} at 0x{addr:04X} in space \"{space}\"")]
    UnmappedAccess {
        space: String,
        addr: u16,
        access: Access,
    },

    #[error(
        "region 0x{start:04X}-0x{end:04X} overlaps 0x{other_start:04X}-0x{other_end:04X} in space \"{space}\""
    )]
    RegionOverlap {
        space: String,
        start: u16,
        end: u16,
        other_start: u16,
        other_end: u16,
    },

    #[error("invalid region 0x{start:04X}-0x{end:04X}: {reason}")]
    InvalidRegion {
        start: u16,
        end: u16,
        reason: String,
    },

    #[error("bank \"{bank}\": index {index} out of range (0..{pages})")]
    InvalidBankIndex {
        bank: String,
        index: usize,
        pages: usize,
    },

    #[error("timer handle {0} was never issued by this queue")]
    InvalidTimerHandle(u64),

    #[error("unknown bank #{0}")]
    UnknownBank(usize),

    #[error("unknown device #{0}")]
    UnknownDevice(usize),

    #[error("unknown cpu #{0}")]
    UnknownCpu(usize),

    #[error("unknown tile layer #{0}")]
    UnknownLayer(usize),

    #[error("unknown gfx set #{0}")]
    UnknownGfx(usize),

    #[error("unknown memory block #{0}")]
    UnknownBlock(usize),

    #[error("unknown address space #{0}")]
    UnknownSpace(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
