use crate::board::Action;
use crate::device::{Device, DeviceContext};

/// 74LS259 8-bit addressable latch.
///
/// The low three address bits select an output and data bit 0 is its new
/// level. Boards hang their control signals (interrupt enable, flip screen,
/// sound CPU reset, coin counters...) off these outputs, so each output
/// carries the actions to apply on its rising and falling edge. Writing
/// the level an output already has does nothing.
pub struct ControlLatch {
    name: String,
    outputs: u8,
    on_set: [Vec<Action>; 8],
    on_clear: [Vec<Action>; 8],
}

impl ControlLatch {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outputs: 0,
            on_set: Default::default(),
            on_clear: Default::default(),
        }
    }

    /// Actions for output `bit` going high and going low.
    pub fn with_output(mut self, bit: u8, on_set: Vec<Action>, on_clear: Vec<Action>) -> Self {
        let bit = (bit & 7) as usize;
        self.on_set[bit] = on_set;
        self.on_clear[bit] = on_clear;
        self
    }

    pub fn output(&self, bit: u8) -> bool {
        self.outputs & (1 << (bit & 7)) != 0
    }

    pub fn outputs(&self) -> u8 {
        self.outputs
    }
}

impl Device for ControlLatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, _offset: u16, _ctx: &mut DeviceContext) -> u8 {
        self.outputs
    }

    fn write(&mut self, offset: u16, data: u8, ctx: &mut DeviceContext) {
        let bit = (offset & 7) as usize;
        let mask = 1u8 << bit;
        let level = data & 1 != 0;
        if (self.outputs & mask != 0) == level {
            return;
        }
        if level {
            self.outputs |= mask;
            ctx.apply_all(&self.on_set[bit]);
        } else {
            self.outputs &= !mask;
            ctx.apply_all(&self.on_clear[bit]);
        }
    }

    fn reset(&mut self) {
        self.outputs = 0;
    }
}
