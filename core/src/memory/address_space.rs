use crate::device::DeviceId;
use crate::error::{Access, Error, Result};
use crate::memory::bank::BankId;
use crate::memory::storage::BlockId;
use crate::video::{LayerId, PaletteRamFormat, TilePlane};

/// Handle to an address space owned by a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpaceId(pub usize);

/// Coarse classification of a region, mirroring how the hardware decodes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Rom,
    Ram,
    Banked,
    Device,
}

/// What services accesses to a region. Storage-backed variants carry the
/// block and the byte offset within it that corresponds to `region.start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    Rom { block: BlockId, offset: usize },
    Ram { block: BlockId, offset: usize },
    /// Window whose backing page is chosen at runtime by a [`BankSwitch`](super::BankSwitch).
    Banked(BankId),
    Device(DeviceId),
    /// Tile code or attribute RAM feeding a cached tile layer.
    TileRam { layer: LayerId, plane: TilePlane },
    /// Palette RAM; offset selects the pen.
    PaletteRam(PaletteRamFormat),
    /// Latched input port; writes are ignored.
    Input(u8),
    /// Decoded but unconnected: reads float to 0xFF, writes vanish.
    Nop,
}

impl Handler {
    /// ROM starting at the first byte of `block`.
    pub fn rom(block: BlockId) -> Self {
        Handler::Rom { block, offset: 0 }
    }

    /// RAM starting at the first byte of `block`.
    pub fn ram(block: BlockId) -> Self {
        Handler::Ram { block, offset: 0 }
    }

    pub fn tile_ram(layer: LayerId, plane: TilePlane) -> Self {
        Handler::TileRam { layer, plane }
    }

    pub fn kind(&self) -> RegionKind {
        match self {
            Handler::Rom { .. } => RegionKind::Rom,
            Handler::Ram { .. } => RegionKind::Ram,
            Handler::Banked(_) => RegionKind::Banked,
            Handler::Device(_)
            | Handler::TileRam { .. }
            | Handler::PaletteRam(_)
            | Handler::Input(_)
            | Handler::Nop => RegionKind::Device,
        }
    }
}

/// An inclusive `[start, end]` range bound to a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRegion {
    pub start: u16,
    pub end: u16,
    pub handler: Handler,
}

impl AddressRegion {
    pub fn new(start: u16, end: u16, handler: Handler) -> Self {
        Self {
            start,
            end,
            handler,
        }
    }

    pub fn kind(&self) -> RegionKind {
        self.handler.kind()
    }

    pub fn contains(&self, addr: u16) -> bool {
        (self.start..=self.end).contains(&addr)
    }

    /// Number of addresses covered.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Result of resolving one bus access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub handler: Handler,
    /// Offset of the access relative to the region start.
    pub offset: u16,
}

/// What happens when no region claims an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnmappedPolicy {
    /// Reads return the open-bus value, writes are dropped.
    OpenBus,
    /// Same as `OpenBus`, but the access is also recorded as a fault that
    /// fails the current frame.
    Strict,
}

impl Default for UnmappedPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            UnmappedPolicy::Strict
        } else {
            UnmappedPolicy::OpenBus
        }
    }
}

/// Sorted, non-overlapping region list for one access direction.
#[derive(Clone, Debug, Default)]
struct RegionTable {
    regions: Vec<AddressRegion>,
}

impl RegionTable {
    fn from_unsorted(space: &str, mut regions: Vec<AddressRegion>) -> Result<Self> {
        regions.sort_by_key(|r| r.start);
        for pair in regions.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.start <= a.end {
                return Err(Error::RegionOverlap {
                    space: space.to_string(),
                    start: b.start,
                    end: b.end,
                    other_start: a.start,
                    other_end: a.end,
                });
            }
        }
        Ok(Self { regions })
    }

    fn resolve(&self, addr: u16) -> Option<&AddressRegion> {
        // First region whose end is >= addr; it matches iff it also starts <= addr.
        let idx = self.regions.partition_point(|r| r.end < addr);
        self.regions.get(idx).filter(|r| r.start <= addr)
    }
}

/// Per-CPU view of the bus: separate read and write tables, each sorted
/// by start address and checked for overlap when built.
#[derive(Clone, Debug)]
pub struct AddressSpace {
    name: String,
    reads: RegionTable,
    writes: RegionTable,
    mirror_mask: u16,
    policy: UnmappedPolicy,
    open_bus: u8,
}

impl AddressSpace {
    pub fn builder(name: &str) -> AddressSpaceBuilder {
        AddressSpaceBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> UnmappedPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: UnmappedPolicy) {
        self.policy = policy;
    }

    /// Value returned by unmapped reads.
    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }

    pub fn read_regions(&self) -> &[AddressRegion] {
        &self.reads.regions
    }

    pub fn write_regions(&self) -> &[AddressRegion] {
        &self.writes.regions
    }

    /// Resolve an access, or `None` when the address is unmapped.
    pub fn resolve(&self, addr: u16, access: Access) -> Option<Resolved> {
        let addr = addr & self.mirror_mask;
        let table = match access {
            Access::Read => &self.reads,
            Access::Write => &self.writes,
        };
        table.resolve(addr).map(|region| Resolved {
            handler: region.handler,
            offset: addr - region.start,
        })
    }

    pub fn resolve_read(&self, addr: u16) -> Option<Resolved> {
        self.resolve(addr, Access::Read)
    }

    pub fn resolve_write(&self, addr: u16) -> Option<Resolved> {
        self.resolve(addr, Access::Write)
    }

    /// Like [`resolve`](Self::resolve), but reports unmapped accesses as
    /// [`Error::UnmappedAccess`].
    pub fn try_resolve(&self, addr: u16, access: Access) -> Result<Resolved> {
        self.resolve(addr, access)
            .ok_or_else(|| Error::UnmappedAccess {
                space: self.name.clone(),
                addr,
                access,
            })
    }

    /// Whether any region in either table is a window onto `bank`.
    pub fn maps_bank(&self, bank: BankId) -> bool {
        self.reads
            .regions
            .iter()
            .chain(self.writes.regions.iter())
            .any(|r| r.handler == Handler::Banked(bank))
    }
}

/// Collects region declarations; validation happens in [`build`](Self::build).
pub struct AddressSpaceBuilder {
    name: String,
    reads: Vec<AddressRegion>,
    writes: Vec<AddressRegion>,
    mirror_mask: u16,
    policy: UnmappedPolicy,
    open_bus: u8,
    invalid: Option<Error>,
}

impl AddressSpaceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reads: Vec::new(),
            writes: Vec::new(),
            mirror_mask: 0xFFFF,
            policy: UnmappedPolicy::default(),
            open_bus: 0xFF,
            invalid: None,
        }
    }

    fn check(&mut self, start: u16, end: u16) -> bool {
        if start > end && self.invalid.is_none() {
            self.invalid = Some(Error::InvalidRegion {
                start,
                end,
                reason: "start is past end".to_string(),
            });
        }
        start <= end
    }

    /// Bind `[start, end]` for both reads and writes.
    pub fn map(mut self, start: u16, end: u16, handler: Handler) -> Self {
        if self.check(start, end) {
            self.reads.push(AddressRegion::new(start, end, handler));
            self.writes.push(AddressRegion::new(start, end, handler));
        }
        self
    }

    pub fn map_read(mut self, start: u16, end: u16, handler: Handler) -> Self {
        if self.check(start, end) {
            self.reads.push(AddressRegion::new(start, end, handler));
        }
        self
    }

    pub fn map_write(mut self, start: u16, end: u16, handler: Handler) -> Self {
        if self.check(start, end) {
            self.writes.push(AddressRegion::new(start, end, handler));
        }
        self
    }

    /// Mask applied to every address before lookup, for boards whose upper
    /// address lines are not decoded (e.g. 0x7FFF mirrors the top half).
    pub fn mirror_mask(mut self, mask: u16) -> Self {
        self.mirror_mask = mask;
        self
    }

    pub fn unmapped(mut self, policy: UnmappedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn open_bus(mut self, value: u8) -> Self {
        self.open_bus = value;
        self
    }

    pub fn build(self) -> Result<AddressSpace> {
        if let Some(err) = self.invalid {
            return Err(err);
        }
        Ok(AddressSpace {
            reads: RegionTable::from_unsorted(&self.name, self.reads)?,
            writes: RegionTable::from_unsorted(&self.name, self.writes)?,
            name: self.name,
            mirror_mask: self.mirror_mask,
            policy: self.policy,
            open_bus: self.open_bus,
        })
    }
}
