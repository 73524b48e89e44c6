use crate::board::Action;
use crate::cpu::CpuId;
use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::input::InputPorts;
use crate::interrupt::InterruptController;
use crate::memory::{BankSwitch, Memory};
use crate::timer::TimerQueue;
use crate::video::Video;

/// Reset and halt lines of one CPU, driven by board logic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuControl {
    pub halted: bool,
    pub reset_pending: bool,
}

/// Frame-counting watchdog. Must be kicked at least once every `limit`
/// frames or the board resets.
#[derive(Clone, Copy, Debug, Default)]
pub struct Watchdog {
    limit: Option<u32>,
    counter: u32,
}

impl Watchdog {
    pub fn new(limit: Option<u32>) -> Self {
        Self { limit, counter: 0 }
    }

    pub fn kick(&mut self) {
        self.counter = 0;
    }

    /// Count one frame. True when the watchdog bites.
    pub fn tick(&mut self) -> bool {
        let Some(limit) = self.limit else {
            return false;
        };
        self.counter += 1;
        if self.counter >= limit {
            self.counter = 0;
            return true;
        }
        false
    }
}

/// Everything a bus access may touch, apart from the devices themselves.
pub struct BoardState {
    pub(crate) memory: Memory,
    pub(crate) banks: BankSwitch,
    pub(crate) timers: TimerQueue<Action>,
    pub(crate) interrupts: Vec<InterruptController>,
    pub(crate) control: Vec<CpuControl>,
    pub(crate) video: Video,
    pub(crate) inputs: InputPorts,
    pub(crate) watchdog: Watchdog,
    pub(crate) fault: Option<Error>,
}

impl BoardState {
    pub(crate) fn new(memory: Memory, banks: BankSwitch, video: Video, inputs: InputPorts) -> Self {
        Self {
            memory,
            banks,
            timers: TimerQueue::new(),
            interrupts: Vec::new(),
            control: Vec::new(),
            video,
            inputs,
            watchdog: Watchdog::default(),
            fault: None,
        }
    }

    /// Keep the first fault of a frame; later ones are usually fallout.
    pub(crate) fn record_fault(&mut self, err: Error) {
        if self.fault.is_none() {
            log::error!("{err}");
            self.fault = Some(err);
        }
    }

    fn interrupts_mut(&mut self, cpu: CpuId) -> Result<&mut InterruptController> {
        self.interrupts
            .get_mut(cpu.0)
            .ok_or(Error::UnknownCpu(cpu.0))
    }

    fn control_mut(&mut self, cpu: CpuId) -> Result<&mut CpuControl> {
        self.control.get_mut(cpu.0).ok_or(Error::UnknownCpu(cpu.0))
    }

    /// Apply an action. Device deliveries are queued on `deferred` for the
    /// caller to hand to the registry.
    pub(crate) fn apply(
        &mut self,
        action: &Action,
        deferred: &mut Vec<(DeviceId, u32)>,
    ) -> Result<()> {
        match *action {
            Action::SelectBank { bank, page } => {
                self.banks.select(bank, page)?;
            }
            Action::RaiseInterrupt { cpu, line } => self.interrupts_mut(cpu)?.raise(line),
            Action::ClearInterrupt { cpu, line } => self.interrupts_mut(cpu)?.clear(line),
            Action::MaskInterrupt { cpu, line, masked } => {
                self.interrupts_mut(cpu)?.set_mask(line, masked)
            }
            Action::ResetCpu(cpu) => self.control_mut(cpu)?.reset_pending = true,
            Action::HaltCpu { cpu, halted } => self.control_mut(cpu)?.halted = halted,
            Action::FlipScreen(flip) => self.video.set_flip(flip),
            Action::SetSpriteOrder(order) => self.video.set_sprite_order(order),
            Action::ForceRedraw => self.video.invalidate_all(),
            Action::KickWatchdog => self.watchdog.kick(),
            Action::Device { device, param } => deferred.push((device, param)),
        }
        Ok(())
    }
}
