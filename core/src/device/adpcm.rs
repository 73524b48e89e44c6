use crate::board::Action;
use crate::device::sound::SoundChip;
use crate::device::{Device, DeviceContext, DeviceId};
use crate::memory::BlockId;
use crate::timer::TimerHandle;

/// Streams 4-bit ADPCM samples from a ROM block into a sound chip.
///
/// Writing offset 0 starts playback at `data * granule` bytes into the
/// block; writing offset 1 stops it. Each timer tick hands the chip one
/// nibble (high nibble first) on register 0. Playback ends at the end of
/// the block or at the first `end_marker` byte. Starting while already
/// playing cancels the running stream first, so at most one tick timer is
/// ever pending. Reading offset 0 returns 1 while playing.
pub struct AdpcmFeeder<C: SoundChip> {
    name: String,
    this: DeviceId,
    rom: BlockId,
    period: u64,
    granule: usize,
    end_marker: Option<u8>,
    position: usize,
    low_nibble: bool,
    timer: Option<TimerHandle>,
    chip: C,
}

impl<C: SoundChip> AdpcmFeeder<C> {
    /// `this` is the id the feeder will be registered under; the tick timer
    /// is addressed to it.
    pub fn new(name: &str, this: DeviceId, rom: BlockId, period: u64, chip: C) -> Self {
        Self {
            name: name.to_string(),
            this,
            rom,
            period: period.max(1),
            granule: 0x100,
            end_marker: None,
            position: 0,
            low_nibble: false,
            timer: None,
            chip,
        }
    }

    pub fn with_granule(mut self, bytes: usize) -> Self {
        self.granule = bytes;
        self
    }

    pub fn with_end_marker(mut self, marker: u8) -> Self {
        self.end_marker = Some(marker);
        self
    }

    pub fn is_playing(&self) -> bool {
        self.timer.is_some()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn chip(&self) -> &C {
        &self.chip
    }

    fn stop(&mut self, ctx: &mut DeviceContext) {
        if let Some(handle) = self.timer.take() {
            ctx.cancel(handle);
        }
    }
}

impl<C: SoundChip> Device for AdpcmFeeder<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, _offset: u16, _ctx: &mut DeviceContext) -> u8 {
        self.is_playing() as u8
    }

    fn write(&mut self, offset: u16, data: u8, ctx: &mut DeviceContext) {
        self.stop(ctx);
        if offset & 1 == 1 {
            return;
        }
        self.position = data as usize * self.granule;
        self.low_nibble = false;
        let tick = Action::Device {
            device: self.this,
            param: 0,
        };
        self.timer = Some(ctx.schedule(self.period, self.period, tick));
    }

    fn on_timer(&mut self, _param: u32, ctx: &mut DeviceContext) {
        if self.timer.is_none() {
            return;
        }
        let byte = ctx
            .memory()
            .block(self.rom)
            .and_then(|b| b.as_slice().get(self.position).copied());
        let byte = match byte {
            Some(b) if Some(b) != self.end_marker => b,
            _ => {
                log::trace!("{}: end of sample at 0x{:X}", self.name, self.position);
                self.stop(ctx);
                return;
            }
        };
        let nibble = if self.low_nibble { byte & 0x0F } else { byte >> 4 };
        self.chip.write(0, nibble);
        if self.low_nibble {
            self.position += 1;
        }
        self.low_nibble = !self.low_nibble;
    }

    fn reset(&mut self) {
        // Board reset clears the timer queue.
        self.timer = None;
        self.position = 0;
        self.low_nibble = false;
        self.chip.reset();
    }
}
