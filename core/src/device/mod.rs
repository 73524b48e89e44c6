//! Memory-mapped peripherals.
//!
//! A device sees only offsets relative to the start of its region and talks
//! back to the board through a [`DeviceContext`]: bank selection, timers,
//! interrupt lines, video flags and raw storage. Actions aimed at another
//! device are queued and delivered after the current access completes, so
//! a device is never re-entered while it is handling an access.

pub mod adpcm;
pub mod bank_select;
pub mod command_latch;
pub mod control_latch;
pub mod sound;
pub mod value_decoder;

pub use adpcm::AdpcmFeeder;
pub use bank_select::BankSelect;
pub use command_latch::CommandLatch;
pub use control_latch::ControlLatch;
pub use sound::{PortMode, RegisterFileChip, SoundChip, SoundPort};
pub use value_decoder::ValueDecoder;

use std::any::Any;

use crate::board::{Action, BoardState};
use crate::core::BusMaster;
use crate::cpu::CpuId;
use crate::error::{Error, Result};
use crate::interrupt::InterruptLine;
use crate::memory::{BankId, Memory};
use crate::timer::TimerHandle;
use crate::video::Video;

/// Handle to a device owned by a [`DeviceRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(pub usize);

/// Device-to-device deliveries allowed to cascade from one access.
const MAX_CHAIN: usize = 16;

pub trait Device: Any {
    fn name(&self) -> &str;

    fn read(&mut self, _offset: u16, _ctx: &mut DeviceContext) -> u8 {
        0xFF
    }

    fn write(&mut self, offset: u16, data: u8, ctx: &mut DeviceContext);

    /// Delivery of an [`Action::Device`], from a timer or another device.
    fn on_timer(&mut self, _param: u32, _ctx: &mut DeviceContext) {}

    fn reset(&mut self) {}
}

/// Board services available to a device during an access.
pub struct DeviceContext<'a> {
    state: &'a mut BoardState,
    deferred: &'a mut Vec<(DeviceId, u32)>,
    master: BusMaster,
}

impl<'a> DeviceContext<'a> {
    pub(crate) fn new(
        state: &'a mut BoardState,
        deferred: &'a mut Vec<(DeviceId, u32)>,
        master: BusMaster,
    ) -> Self {
        Self {
            state,
            deferred,
            master,
        }
    }

    /// Bus master performing the access (`Host` for timer deliveries).
    pub fn master(&self) -> BusMaster {
        self.master
    }

    /// Current board time in master cycles.
    pub fn now(&self) -> u64 {
        self.state.timers.now()
    }

    /// Apply an action. Failures are configuration mistakes; they are
    /// logged and the action is skipped.
    pub fn apply(&mut self, action: &Action) {
        if let Err(err) = self.state.apply(action, self.deferred) {
            log::warn!("{action:?} failed: {err}");
        }
    }

    pub fn apply_all(&mut self, actions: &[Action]) {
        for action in actions {
            self.apply(action);
        }
    }

    pub fn schedule(&mut self, delay: u64, period: u64, action: Action) -> TimerHandle {
        self.state.timers.schedule(delay, period, action)
    }

    /// Cancel a timer; false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.state.timers.cancel(handle).unwrap_or(false)
    }

    pub fn select_bank(&mut self, bank: BankId, index: usize) -> Result<usize> {
        self.state.banks.select(bank, index)
    }

    pub fn raise(&mut self, cpu: CpuId, line: InterruptLine) {
        self.apply(&Action::RaiseInterrupt { cpu, line });
    }

    pub fn clear(&mut self, cpu: CpuId, line: InterruptLine) {
        self.apply(&Action::ClearInterrupt { cpu, line });
    }

    pub fn memory(&self) -> &Memory {
        &self.state.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.state.memory
    }

    pub fn video_mut(&mut self) -> &mut Video {
        &mut self.state.video
    }
}

#[derive(Default)]
pub struct DeviceRegistry {
    devices: Vec<Box<dyn Device>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, device: Box<dyn Device>) -> DeviceId {
        log::debug!("device #{}: {}", self.devices.len(), device.name());
        self.devices.push(device);
        DeviceId(self.devices.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        id.0 < self.devices.len()
    }

    pub fn find(&self, name: &str) -> Option<DeviceId> {
        self.devices
            .iter()
            .position(|d| d.name() == name)
            .map(DeviceId)
    }

    /// Typed access to a device, `None` if `id` is unknown or not a `T`.
    pub fn get<T: Device>(&self, id: DeviceId) -> Option<&T> {
        let device: &dyn Any = &**self.devices.get(id.0)?;
        device.downcast_ref()
    }

    pub fn get_mut<T: Device>(&mut self, id: DeviceId) -> Option<&mut T> {
        let device: &mut dyn Any = &mut **self.devices.get_mut(id.0)?;
        device.downcast_mut()
    }

    pub(crate) fn read(
        &mut self,
        id: DeviceId,
        offset: u16,
        state: &mut BoardState,
        master: BusMaster,
    ) -> u8 {
        let mut deferred = Vec::new();
        let value = match self.devices.get_mut(id.0) {
            Some(device) => {
                let mut ctx = DeviceContext::new(state, &mut deferred, master);
                device.read(offset, &mut ctx)
            }
            None => {
                state.record_fault(Error::UnknownDevice(id.0));
                0xFF
            }
        };
        self.deliver(deferred, state, master);
        value
    }

    pub(crate) fn write(
        &mut self,
        id: DeviceId,
        offset: u16,
        data: u8,
        state: &mut BoardState,
        master: BusMaster,
    ) {
        let mut deferred = Vec::new();
        match self.devices.get_mut(id.0) {
            Some(device) => {
                let mut ctx = DeviceContext::new(state, &mut deferred, master);
                device.write(offset, data, &mut ctx)
            }
            None => state.record_fault(Error::UnknownDevice(id.0)),
        }
        self.deliver(deferred, state, master);
    }

    /// Hand queued `(device, param)` deliveries to their targets, including
    /// any they queue in turn.
    pub(crate) fn deliver(
        &mut self,
        mut queue: Vec<(DeviceId, u32)>,
        state: &mut BoardState,
        master: BusMaster,
    ) {
        let mut rounds = 0;
        while !queue.is_empty() {
            if rounds == MAX_CHAIN {
                log::warn!("device delivery chain cut after {MAX_CHAIN} rounds");
                return;
            }
            rounds += 1;
            let mut next = Vec::new();
            for (id, param) in queue {
                match self.devices.get_mut(id.0) {
                    Some(device) => {
                        device.on_timer(param, &mut DeviceContext::new(state, &mut next, master))
                    }
                    None => log::warn!("delivery to unknown device #{}", id.0),
                }
            }
            queue = next;
        }
    }

    pub fn reset(&mut self) {
        for device in &mut self.devices {
            device.reset();
        }
    }
}
