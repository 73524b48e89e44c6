//! A configured board and its frame scheduler.
//!
//! Time is kept in master-clock cycles. A frame is split into `interleave`
//! slices; within a slice every CPU runs in declaration order for its share
//! of the slice, then the timer queue is drained up to the slice end.
//! Cross-CPU effects (latch writes, timer-raised interrupts) therefore
//! become visible at slice boundaries, which is what the interleave factor
//! trades against speed.

pub mod action;
mod bus;
pub mod state;

pub use action::Action;
pub use state::{BoardState, CpuControl, Watchdog};

use std::any::Any;

use crate::core::machine::{InputButton, Machine};
use crate::core::BusMaster;
use crate::cpu::{Cpu, CpuId};
use crate::device::{Device, DeviceId, DeviceRegistry};
use crate::error::{Error, Result};
use crate::input::{InputPorts, InputSource};
use crate::interrupt::{InterruptController, InterruptLine, LineConfig};
use crate::memory::{AddressSpace, Bank, BankId, BankSwitch, Handler, Memory, SpaceId};
use crate::timer::TimerHandle;
use crate::video::{CompositeStats, Video};

use bus::BusContext;

/// Master clock and frame length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub master_clock_hz: u64,
    pub cycles_per_frame: u64,
}

impl Timing {
    pub fn frame_rate_hz(&self) -> f64 {
        self.master_clock_hz as f64 / self.cycles_per_frame.max(1) as f64
    }
}

/// Declaration of one CPU.
pub struct CpuConfig {
    pub name: String,
    pub cpu: Box<dyn Cpu>,
    pub clock_hz: u64,
    pub program: SpaceId,
    pub io: Option<SpaceId>,
    /// Line raised once per frame at vblank.
    pub vblank: Option<InterruptLine>,
}

impl CpuConfig {
    pub fn new(name: &str, cpu: Box<dyn Cpu>, clock_hz: u64, program: SpaceId) -> Self {
        Self {
            name: name.to_string(),
            cpu,
            clock_hz,
            program,
            io: None,
            vblank: None,
        }
    }

    pub fn with_io(mut self, io: SpaceId) -> Self {
        self.io = Some(io);
        self
    }

    pub fn with_vblank(mut self, line: InterruptLine) -> Self {
        self.vblank = Some(line);
        self
    }
}

struct CpuSlot {
    name: String,
    cpu: Box<dyn Cpu>,
    clock_hz: u64,
    program: SpaceId,
    io: Option<SpaceId>,
    vblank: Option<InterruptLine>,
    /// Bresenham remainder of clock_hz * master cycles / master_clock_hz.
    remainder: u64,
    /// Cycles overshot past the end of previous slices.
    debt: u64,
    cycles_this_frame: u64,
}

/// A periodic interrupt independent of vblank (N per frame).
#[derive(Clone, Copy, Debug)]
struct TimedInterrupt {
    cpu: CpuId,
    line: InterruptLine,
    per_frame: u32,
}

/// What happened during one [`Board::step_frame`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// CPU cycles executed, per CPU in declaration order.
    pub cpu_cycles: Vec<u64>,
    pub timers_fired: usize,
    pub composite: CompositeStats,
    pub watchdog_reset: bool,
}

/// Collects the pieces of a board. IDs handed out here are valid for the
/// built [`Board`].
pub struct BoardBuilder {
    name: String,
    timing: Timing,
    interleave: u32,
    memory: Memory,
    banks: BankSwitch,
    devices: DeviceRegistry,
    spaces: Vec<AddressSpace>,
    cpus: Vec<CpuConfig>,
    line_configs: Vec<(CpuId, InterruptLine, LineConfig)>,
    timed: Vec<TimedInterrupt>,
    watchdog: Option<u32>,
    video: Video,
    inputs: InputPorts,
}

impl BoardBuilder {
    pub fn new(name: &str, timing: Timing, video: Video) -> Self {
        Self {
            name: name.to_string(),
            timing,
            interleave: 1,
            memory: Memory::new(),
            banks: BankSwitch::new(),
            devices: DeviceRegistry::new(),
            spaces: Vec::new(),
            cpus: Vec::new(),
            line_configs: Vec::new(),
            timed: Vec::new(),
            watchdog: None,
            video,
            inputs: InputPorts::new(),
        }
    }

    /// Slices per frame.
    pub fn interleave(mut self, slices: u32) -> Self {
        self.interleave = slices.max(1);
        self
    }

    /// Frames without a kick before the watchdog resets the board.
    pub fn watchdog(mut self, frames: u32) -> Self {
        self.watchdog = Some(frames.max(1));
        self
    }

    pub fn memory(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn video(&mut self) -> &mut Video {
        &mut self.video
    }

    pub fn inputs(&mut self) -> &mut InputPorts {
        &mut self.inputs
    }

    pub fn add_bank(&mut self, bank: Bank) -> Result<BankId> {
        self.banks.add(bank, &self.memory)
    }

    pub fn add_device(&mut self, device: Box<dyn Device>) -> DeviceId {
        self.devices.add(device)
    }

    /// Id the next [`add_device`](Self::add_device) call will return, for
    /// devices that address timers to themselves.
    pub fn next_device_id(&self) -> DeviceId {
        DeviceId(self.devices.len())
    }

    pub fn add_space(&mut self, space: AddressSpace) -> SpaceId {
        self.spaces.push(space);
        SpaceId(self.spaces.len() - 1)
    }

    pub fn add_cpu(&mut self, config: CpuConfig) -> CpuId {
        self.cpus.push(config);
        CpuId(self.cpus.len() - 1)
    }

    pub fn configure_line(&mut self, cpu: CpuId, line: InterruptLine, config: LineConfig) {
        self.line_configs.push((cpu, line, config));
    }

    /// Raise `line` on `cpu` `per_frame` times per frame, evenly spaced.
    pub fn timed_interrupt(&mut self, cpu: CpuId, line: InterruptLine, per_frame: u32) {
        self.timed.push(TimedInterrupt {
            cpu,
            line,
            per_frame: per_frame.max(1),
        });
    }

    fn validate_space(&self, space: &AddressSpace) -> Result<()> {
        for region in space.read_regions().iter().chain(space.write_regions()) {
            let fits = match region.handler {
                Handler::Rom { block, offset } | Handler::Ram { block, offset } => {
                    let len = self
                        .memory
                        .block(block)
                        .ok_or(Error::UnknownBlock(block.0))?
                        .len();
                    offset + region.len() <= len
                }
                Handler::Banked(bank) => self.banks.get(bank)?.page_size() >= region.len(),
                Handler::Device(id) => {
                    if !self.devices.contains(id) {
                        return Err(Error::UnknownDevice(id.0));
                    }
                    true
                }
                Handler::TileRam { layer, .. } => self.video.layer(layer)?.cells() >= region.len(),
                Handler::PaletteRam(_) | Handler::Input(_) | Handler::Nop => true,
            };
            if !fits {
                return Err(Error::InvalidRegion {
                    start: region.start,
                    end: region.end,
                    reason: format!("backing storage too small in space \"{}\"", space.name()),
                });
            }
        }
        Ok(())
    }

    pub fn build(self) -> Result<Board> {
        for space in &self.spaces {
            self.validate_space(space)?;
        }
        for config in &self.cpus {
            for id in std::iter::once(config.program).chain(config.io) {
                if id.0 >= self.spaces.len() {
                    return Err(Error::UnknownSpace(id.0));
                }
            }
        }
        let cpu_count = self.cpus.len();
        for &(cpu, _, _) in &self.line_configs {
            if cpu.0 >= cpu_count {
                return Err(Error::UnknownCpu(cpu.0));
            }
        }
        if let Some(t) = self.timed.iter().find(|t| t.cpu.0 >= cpu_count) {
            return Err(Error::UnknownCpu(t.cpu.0));
        }

        let mut state = BoardState::new(self.memory, self.banks, self.video, self.inputs);
        state.interrupts = vec![InterruptController::new(); cpu_count];
        state.control = vec![CpuControl::default(); cpu_count];
        state.watchdog = Watchdog::new(self.watchdog);
        for (cpu, line, config) in self.line_configs {
            state.interrupts[cpu.0].configure(line, config);
        }

        let cpus = self
            .cpus
            .into_iter()
            .map(|c| CpuSlot {
                name: c.name,
                cpu: c.cpu,
                clock_hz: c.clock_hz,
                program: c.program,
                io: c.io,
                vblank: c.vblank,
                remainder: 0,
                debt: 0,
                cycles_this_frame: 0,
            })
            .collect::<Vec<_>>();

        log::info!(
            "board \"{}\": {} cpu(s), {} space(s), {} device(s), {:.2} Hz, interleave {}",
            self.name,
            cpus.len(),
            self.spaces.len(),
            self.devices.len(),
            self.timing.frame_rate_hz(),
            self.interleave
        );

        let mut board = Board {
            name: self.name,
            timing: self.timing,
            interleave: self.interleave,
            cpus,
            spaces: self.spaces,
            devices: self.devices,
            state,
            timed: self.timed,
            frame: 0,
            force_redraw: true,
        };
        board.arm_timed_interrupts();
        board.notify_all_banks();
        Ok(board)
    }
}

/// A running board: CPUs, address spaces, devices and shared state.
pub struct Board {
    name: String,
    timing: Timing,
    interleave: u32,
    cpus: Vec<CpuSlot>,
    spaces: Vec<AddressSpace>,
    devices: DeviceRegistry,
    state: BoardState,
    timed: Vec<TimedInterrupt>,
    frame: u64,
    force_redraw: bool,
}

impl Board {
    pub fn builder(name: &str, timing: Timing, video: Video) -> BoardBuilder {
        BoardBuilder::new(name, timing, video)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn interleave(&self) -> u32 {
        self.interleave
    }

    /// Frames completed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Current time in master cycles.
    pub fn now(&self) -> u64 {
        self.state.timers.now()
    }

    pub fn memory(&self) -> &Memory {
        &self.state.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.state.memory
    }

    pub fn banks(&self) -> &BankSwitch {
        &self.state.banks
    }

    pub fn video(&self) -> &Video {
        &self.state.video
    }

    pub fn video_mut(&mut self) -> &mut Video {
        &mut self.state.video
    }

    pub fn inputs_mut(&mut self) -> &mut InputPorts {
        &mut self.state.inputs
    }

    pub fn attach_input_source(&mut self, source: Box<dyn InputSource>) {
        self.state.inputs.attach_source(source);
    }

    pub fn space(&self, id: SpaceId) -> Result<&AddressSpace> {
        self.spaces.get(id.0).ok_or(Error::UnknownSpace(id.0))
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn device<T: Device>(&self, id: DeviceId) -> Option<&T> {
        self.devices.get(id)
    }

    pub fn device_mut<T: Device>(&mut self, id: DeviceId) -> Option<&mut T> {
        self.devices.get_mut(id)
    }

    pub fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    pub fn cpu_name(&self, id: CpuId) -> Option<&str> {
        self.cpus.get(id.0).map(|s| s.name.as_str())
    }

    /// Typed access to a CPU core.
    pub fn cpu<T: Cpu>(&self, id: CpuId) -> Option<&T> {
        let cpu: &dyn Any = &*self.cpus.get(id.0)?.cpu;
        cpu.downcast_ref()
    }

    pub fn cpu_mut<T: Cpu>(&mut self, id: CpuId) -> Option<&mut T> {
        let cpu: &mut dyn Any = &mut *self.cpus.get_mut(id.0)?.cpu;
        cpu.downcast_mut()
    }

    pub fn interrupts(&self, id: CpuId) -> Result<&InterruptController> {
        self.state.interrupts.get(id.0).ok_or(Error::UnknownCpu(id.0))
    }

    pub fn cpu_control(&self, id: CpuId) -> Result<CpuControl> {
        self.state
            .control
            .get(id.0)
            .copied()
            .ok_or(Error::UnknownCpu(id.0))
    }

    /// Apply an action from the host, as a device would.
    pub fn apply(&mut self, action: &Action) -> Result<()> {
        let mut deferred = Vec::new();
        self.state.apply(action, &mut deferred)?;
        self.devices.deliver(deferred, &mut self.state, BusMaster::Host);
        self.notify_bank_changes();
        Ok(())
    }

    pub fn schedule(&mut self, delay: u64, period: u64, action: Action) -> TimerHandle {
        self.state.timers.schedule(delay, period, action)
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> Result<bool> {
        self.state.timers.cancel(handle)
    }

    /// Host read through an address space, with full handler dispatch.
    pub fn read(&mut self, space: SpaceId, addr: u16) -> Result<u8> {
        let program = self.spaces.get(space.0).ok_or(Error::UnknownSpace(space.0))?;
        let mut bus = BusContext {
            state: &mut self.state,
            devices: &mut self.devices,
            program,
            io: None,
        };
        let value = crate::core::Bus::read(&mut bus, BusMaster::Host, addr);
        self.finish_host_access()?;
        Ok(value)
    }

    /// Host write through an address space, with full handler dispatch.
    pub fn write(&mut self, space: SpaceId, addr: u16, data: u8) -> Result<()> {
        let program = self.spaces.get(space.0).ok_or(Error::UnknownSpace(space.0))?;
        let mut bus = BusContext {
            state: &mut self.state,
            devices: &mut self.devices,
            program,
            io: None,
        };
        crate::core::Bus::write(&mut bus, BusMaster::Host, addr, data);
        self.finish_host_access()
    }

    fn finish_host_access(&mut self) -> Result<()> {
        self.notify_bank_changes();
        match self.state.fault.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Tell every CPU whose program space maps a switched bank about the
    /// new page.
    fn notify_bank_changes(&mut self) {
        for bank in self.state.banks.take_changes() {
            let Some(view) = self.state.banks.view(bank) else {
                continue;
            };
            for slot in &mut self.cpus {
                if self.spaces[slot.program.0].maps_bank(bank) {
                    slot.cpu.set_program_bank(view);
                }
            }
        }
    }

    fn notify_all_banks(&mut self) {
        for index in 0..self.state.banks.len() {
            let bank = BankId(index);
            if let Some(view) = self.state.banks.view(bank) {
                for slot in &mut self.cpus {
                    if self.spaces[slot.program.0].maps_bank(bank) {
                        slot.cpu.set_program_bank(view);
                    }
                }
            }
        }
    }

    fn arm_timed_interrupts(&mut self) {
        for t in &self.timed {
            let period = (self.timing.cycles_per_frame / t.per_frame as u64).max(1);
            self.state.timers.schedule(
                period,
                period,
                Action::RaiseInterrupt {
                    cpu: t.cpu,
                    line: t.line,
                },
            );
        }
    }

    /// Run every CPU for `master_cycles` master cycles, then fire the
    /// timers due by the end of that window. Returns the number of timers
    /// fired.
    pub fn run_slice(&mut self, master_cycles: u64) -> Result<usize> {
        let slice_end = self.state.timers.now() + master_cycles;

        for index in 0..self.cpus.len() {
            let control = self.state.control[index];
            let slot = &mut self.cpus[index];

            let mut budget = slot.remainder + master_cycles * slot.clock_hz;
            slot.remainder = budget % self.timing.master_clock_hz.max(1);
            budget /= self.timing.master_clock_hz.max(1);

            if control.reset_pending {
                log::debug!("cpu \"{}\": reset", slot.name);
                slot.cpu.reset();
                slot.debt = 0;
                self.state.control[index].reset_pending = false;
            }
            if control.halted {
                continue;
            }

            for line in self.state.interrupts[index].take_deliverable() {
                slot.cpu.signal(line);
            }

            let to_run = budget.saturating_sub(slot.debt);
            slot.debt = slot.debt.saturating_sub(budget);
            if to_run > 0 {
                let mut bus = BusContext {
                    state: &mut self.state,
                    devices: &mut self.devices,
                    program: &self.spaces[slot.program.0],
                    io: slot.io.map(|io| &self.spaces[io.0]),
                };
                let used = slot.cpu.run(to_run, &mut bus, BusMaster::Cpu(index));
                slot.debt += used.saturating_sub(to_run);
                slot.cycles_this_frame += used;
            }

            self.notify_bank_changes();
            if let Some(err) = self.state.fault.take() {
                return Err(err);
            }
        }

        let mut fired = 0;
        while let Some(entry) = self.state.timers.pop_due(slice_end) {
            fired += 1;
            let mut deferred = Vec::new();
            if let Err(err) = self.state.apply(&entry.payload, &mut deferred) {
                log::warn!("timer {} ({:?}): {err}", entry.handle.id(), entry.payload);
            }
            self.devices.deliver(deferred, &mut self.state, BusMaster::Host);
        }
        self.state.timers.set_now(slice_end);
        self.notify_bank_changes();
        Ok(fired)
    }

    /// Run one frame: latch inputs, run the interleaved slices, raise
    /// vblank, tick the watchdog and composite.
    pub fn step_frame(&mut self) -> Result<FrameReport> {
        self.state.inputs.latch(self.frame);
        for slot in &mut self.cpus {
            slot.cycles_this_frame = 0;
        }

        let frame_start = self.state.timers.now();
        let per_frame = self.timing.cycles_per_frame;
        let slices = self.interleave as u64;
        let mut timers_fired = 0;
        for k in 0..slices {
            let end = frame_start + (k + 1) * per_frame / slices;
            let length = end - self.state.timers.now();
            timers_fired += self.run_slice(length)?;
        }

        for (index, slot) in self.cpus.iter().enumerate() {
            if let Some(line) = slot.vblank {
                self.state.interrupts[index].raise(line);
            }
        }

        let cpu_cycles = self.cpus.iter().map(|s| s.cycles_this_frame).collect();

        let watchdog_reset = self.state.watchdog.tick();
        if watchdog_reset {
            log::warn!(
                "board \"{}\": watchdog reset at frame {}",
                self.name,
                self.frame
            );
            self.reset();
        }

        let force = std::mem::take(&mut self.force_redraw);
        let composite = self.state.video.composite(&self.state.memory, force);

        let report = FrameReport {
            frame: self.frame,
            cpu_cycles,
            timers_fired,
            composite,
            watchdog_reset,
        };
        self.frame += 1;
        Ok(report)
    }

    /// Composite outside the frame loop (debuggers, tests).
    pub fn composite(&mut self, force: bool) -> CompositeStats {
        self.state.video.composite(&self.state.memory, force)
    }

    /// Power-on state. Storage, banks, timers, interrupt lines, CPUs,
    /// devices and video all return to their initial configuration.
    pub fn reset(&mut self) {
        self.state.memory.reset();
        self.state.banks.reset();
        self.state.timers.clear();
        for ic in &mut self.state.interrupts {
            ic.reset();
        }
        self.state.control.fill(CpuControl::default());
        self.state.video.reset();
        self.state.inputs.reset();
        self.state.watchdog.kick();
        self.state.fault = None;
        self.devices.reset();
        for slot in &mut self.cpus {
            slot.cpu.reset();
            slot.remainder = 0;
            slot.debt = 0;
        }
        self.arm_timed_interrupts();
        self.notify_all_banks();
        self.force_redraw = true;
    }
}

impl Machine for Board {
    fn display_size(&self) -> (u32, u32) {
        (
            self.state.video.width() as u32,
            self.state.video.height() as u32,
        )
    }

    fn run_frame(&mut self) -> Result<()> {
        self.step_frame().map(|_| ())
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        self.state.video.render_rgb24(buffer);
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        self.state.inputs.set_input(button, pressed);
    }

    fn input_map(&self) -> &[InputButton] {
        self.state.inputs.buttons()
    }

    fn reset(&mut self) {
        Board::reset(self);
    }

    fn frame_rate_hz(&self) -> f64 {
        self.timing.frame_rate_hz()
    }
}
