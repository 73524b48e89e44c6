/// Identifies who is accessing the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BusMaster {
    Cpu(usize), // CPU 0, CPU 1, etc.
    Host,       // Debuggers, loaders and tests poking the board directly
}

/// Byte-wide bus seen by a CPU collaborator.
///
/// The board hands a `&mut dyn Bus` to each CPU for the duration of its
/// time slice. Every access is resolved through the CPU's address space.
pub trait Bus {
    fn read(&mut self, master: BusMaster, addr: u16) -> u8;
    fn write(&mut self, master: BusMaster, addr: u16, data: u8);

    /// Read from I/O port address space (separate from memory on Z80).
    /// Default maps to memory read; override for CPUs with separate I/O.
    fn io_read(&mut self, master: BusMaster, addr: u16) -> u8 {
        self.read(master, addr)
    }

    /// Write to I/O port address space (separate from memory on Z80).
    /// Default maps to memory write; override for CPUs with separate I/O.
    fn io_write(&mut self, master: BusMaster, addr: u16, data: u8) {
        self.write(master, addr, data)
    }
}
