//! Memory plumbing: backing storage blocks, bank switching and the
//! per-CPU address spaces that route bus accesses to handlers.

pub mod address_space;
pub mod bank;
pub mod storage;

pub use address_space::{
    AddressRegion, AddressSpace, AddressSpaceBuilder, Handler, RegionKind, Resolved, SpaceId,
    UnmappedPolicy,
};
pub use bank::{Bank, BankId, BankPolicy, BankSwitch, BankView};
pub use storage::{BlockId, BlockKind, Memory, MemoryBlock};
