use crate::board::BoardState;
use crate::core::{Bus, BusMaster};
use crate::device::DeviceRegistry;
use crate::error::{Access, Error};
use crate::memory::{AddressSpace, Handler, Resolved, UnmappedPolicy};

/// The bus a CPU sees during its slice: its program space, an optional
/// separate I/O space, and the board state behind them.
pub(crate) struct BusContext<'a> {
    pub(crate) state: &'a mut BoardState,
    pub(crate) devices: &'a mut DeviceRegistry,
    pub(crate) program: &'a AddressSpace,
    pub(crate) io: Option<&'a AddressSpace>,
}

impl BusContext<'_> {
    fn unmapped(&mut self, space: &AddressSpace, addr: u16, access: Access) {
        log::debug!("unmapped {access} 0x{addr:04X} in \"{}\"", space.name());
        if space.policy() == UnmappedPolicy::Strict {
            self.state.record_fault(Error::UnmappedAccess {
                space: space.name().to_string(),
                addr,
                access,
            });
        }
    }

    fn read_from(&mut self, space: &AddressSpace, master: BusMaster, addr: u16) -> u8 {
        let Some(Resolved { handler, offset }) = space.resolve_read(addr) else {
            self.unmapped(space, addr, Access::Read);
            return space.open_bus();
        };
        let at = offset as usize;
        let state = &mut *self.state;
        match handler {
            Handler::Rom { block, offset } | Handler::Ram { block, offset } => {
                state.memory.read(block, offset + at)
            }
            Handler::Banked(bank) => match state.banks.resolve(bank, at) {
                Some((block, physical)) => state.memory.read(block, physical),
                None => space.open_bus(),
            },
            Handler::Device(id) => self.devices.read(id, offset, state, master),
            Handler::TileRam { layer, plane } => state.video.read_tile_ram(layer, plane, at),
            Handler::PaletteRam(_) => state.video.read_palette_ram(at),
            Handler::Input(port) => state.inputs.read(port),
            Handler::Nop => space.open_bus(),
        }
    }

    fn write_to(&mut self, space: &AddressSpace, master: BusMaster, addr: u16, data: u8) {
        let Some(Resolved { handler, offset }) = space.resolve_write(addr) else {
            self.unmapped(space, addr, Access::Write);
            return;
        };
        let at = offset as usize;
        let state = &mut *self.state;
        match handler {
            Handler::Ram { block, offset } => state.memory.write(block, offset + at, data),
            Handler::Banked(bank) => {
                if let Some((block, physical)) = state.banks.resolve(bank, at) {
                    state.memory.write(block, physical, data);
                }
            }
            Handler::Device(id) => self.devices.write(id, offset, data, state, master),
            Handler::TileRam { layer, plane } => {
                state.video.write_tile_ram(layer, plane, at, data)
            }
            Handler::PaletteRam(format) => state.video.write_palette_ram(format, at, data),
            Handler::Rom { .. } | Handler::Input(_) | Handler::Nop => {}
        }
    }
}

impl Bus for BusContext<'_> {
    fn read(&mut self, master: BusMaster, addr: u16) -> u8 {
        self.read_from(self.program, master, addr)
    }

    fn write(&mut self, master: BusMaster, addr: u16, data: u8) {
        self.write_to(self.program, master, addr, data)
    }

    fn io_read(&mut self, master: BusMaster, addr: u16) -> u8 {
        let space = self.io.unwrap_or(self.program);
        self.read_from(space, master, addr)
    }

    fn io_write(&mut self, master: BusMaster, addr: u16, data: u8) {
        let space = self.io.unwrap_or(self.program);
        self.write_to(space, master, addr, data)
    }
}
