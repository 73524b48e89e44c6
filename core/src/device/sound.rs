use std::any::Any;

use crate::device::{Device, DeviceContext};

/// A sound chip as seen from the bus: registers in, status out. Synthesis
/// happens behind this interface and is not the board's concern.
pub trait SoundChip: Any {
    fn write(&mut self, register: u8, data: u8);

    fn read(&mut self, _register: u8) -> u8 {
        0xFF
    }

    fn reset(&mut self) {}
}

/// Register file standing in for a sound chip: remembers the last value
/// written to each register and counts writes.
pub struct RegisterFileChip {
    registers: [u8; 256],
    writes: u64,
}

impl RegisterFileChip {
    pub fn new() -> Self {
        Self {
            registers: [0; 256],
            writes: 0,
        }
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl Default for RegisterFileChip {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundChip for RegisterFileChip {
    fn write(&mut self, register: u8, data: u8) {
        self.registers[register as usize] = data;
        self.writes += 1;
    }

    fn read(&mut self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    fn reset(&mut self) {
        self.registers = [0; 256];
    }
}

/// How a chip's registers appear in its region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PortMode {
    /// Region offset is the register number.
    #[default]
    Direct,
    /// Even offsets select a register, odd offsets read or write it
    /// (AY-3-8910 style).
    AddressLatched,
}

/// Maps a [`SoundChip`] into an address space.
pub struct SoundPort<C: SoundChip> {
    name: String,
    mode: PortMode,
    selected: u8,
    chip: C,
}

impl<C: SoundChip> SoundPort<C> {
    pub fn new(name: &str, mode: PortMode, chip: C) -> Self {
        Self {
            name: name.to_string(),
            mode,
            selected: 0,
            chip,
        }
    }

    pub fn chip(&self) -> &C {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }

    pub fn selected(&self) -> u8 {
        self.selected
    }
}

impl<C: SoundChip> Device for SoundPort<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, offset: u16, _ctx: &mut DeviceContext) -> u8 {
        match self.mode {
            PortMode::Direct => self.chip.read(offset as u8),
            PortMode::AddressLatched if offset & 1 == 1 => self.chip.read(self.selected),
            PortMode::AddressLatched => 0xFF,
        }
    }

    fn write(&mut self, offset: u16, data: u8, _ctx: &mut DeviceContext) {
        match self.mode {
            PortMode::Direct => self.chip.write(offset as u8, data),
            PortMode::AddressLatched if offset & 1 == 1 => self.chip.write(self.selected, data),
            PortMode::AddressLatched => self.selected = data,
        }
    }

    fn reset(&mut self) {
        self.selected = 0;
        self.chip.reset();
    }
}
