use crate::board::Action;
use crate::cpu::CpuId;
use crate::device::{Device, DeviceContext};
use crate::interrupt::InterruptLine;

/// Cross-CPU command latch (a "sound latch").
///
/// The writing CPU stores a byte; after `delay` master cycles the target
/// CPU's interrupt line is raised. The raise always goes through the timer
/// queue, even with a zero delay, so the target never observes the command
/// in the middle of the writer's slice.
///
/// Offsets:
/// - 0 read: latched byte (optionally acknowledging the interrupt)
/// - 0 write: store byte, schedule the interrupt
/// - 1 read: status, bit 0 set while a byte is waiting
/// - 1 write: interrupt enable gate, bit 0 (only when gated)
///
/// The gate can also be driven by delivery params: 0 disables, 1 enables.
pub struct CommandLatch {
    name: String,
    target: CpuId,
    line: InterruptLine,
    delay: u64,
    data: u8,
    full: bool,
    gated: bool,
    enabled: bool,
    acknowledge_on_read: bool,
}

impl CommandLatch {
    pub fn new(name: &str, target: CpuId, line: InterruptLine) -> Self {
        Self {
            name: name.to_string(),
            target,
            line,
            delay: 0,
            data: 0,
            full: false,
            gated: false,
            enabled: true,
            acknowledge_on_read: false,
        }
    }

    pub fn with_delay(mut self, cycles: u64) -> Self {
        self.delay = cycles;
        self
    }

    /// Start with the interrupt gate closed; the target side opens it.
    pub fn with_gate(mut self) -> Self {
        self.gated = true;
        self.enabled = false;
        self
    }

    /// Clear the target's interrupt line when the latch is read.
    pub fn acknowledge_on_read(mut self) -> Self {
        self.acknowledge_on_read = true;
        self
    }

    pub fn data(&self) -> u8 {
        self.data
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Device for CommandLatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, offset: u16, ctx: &mut DeviceContext) -> u8 {
        if offset & 1 == 1 {
            return self.full as u8;
        }
        self.full = false;
        if self.acknowledge_on_read {
            ctx.clear(self.target, self.line);
        }
        self.data
    }

    fn write(&mut self, offset: u16, data: u8, ctx: &mut DeviceContext) {
        if offset & 1 == 1 {
            if self.gated {
                self.enabled = data & 1 != 0;
            }
            return;
        }
        self.data = data;
        self.full = true;
        if self.enabled {
            ctx.schedule(
                self.delay,
                0,
                Action::RaiseInterrupt {
                    cpu: self.target,
                    line: self.line,
                },
            );
        } else {
            log::trace!(
                "{}: 0x{data:02X} latched with interrupt gated off",
                self.name
            );
        }
    }

    fn on_timer(&mut self, param: u32, _ctx: &mut DeviceContext) {
        if self.gated {
            self.enabled = param != 0;
        }
    }

    fn reset(&mut self) {
        self.data = 0;
        self.full = false;
        self.enabled = !self.gated;
    }
}
