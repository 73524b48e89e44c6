//! Board-side interrupt lines.
//!
//! The board, not the CPU, decides when a request reaches the CPU: each line
//! has a board-level mask (an "NMI enable" or "IRQ enable" latch on most
//! boards) and a trigger mode. Requests are handed to the CPU at the start
//! of its next time slice via [`InterruptController::take_deliverable`].

/// Interrupt inputs of the emulated CPUs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterruptLine {
    Nmi,
    Irq,
    /// 6809 fast IRQ; ignored by CPUs without it.
    Firq,
}

impl InterruptLine {
    pub const ALL: [InterruptLine; 3] =
        [InterruptLine::Nmi, InterruptLine::Irq, InterruptLine::Firq];

    pub(crate) fn index(self) -> usize {
        match self {
            InterruptLine::Nmi => 0,
            InterruptLine::Irq => 1,
            InterruptLine::Firq => 2,
        }
    }
}

/// Edge lines deliver one request per assertion; level lines keep being
/// presented to the CPU until something clears them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Trigger {
    #[default]
    Edge,
    Level,
}

/// Fate of a request that arrives while the line is masked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MaskedBehavior {
    /// Hold it and deliver at the next unmask.
    #[default]
    Latch,
    /// Discard it.
    Drop,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineConfig {
    pub trigger: Trigger,
    pub masked: MaskedBehavior,
}

impl LineConfig {
    pub const fn new(trigger: Trigger, masked: MaskedBehavior) -> Self {
        Self { trigger, masked }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct LineState {
    config: LineConfig,
    masked: bool,
    pending: bool,
}

/// Interrupt lines of one CPU.
#[derive(Clone, Debug, Default)]
pub struct InterruptController {
    lines: [LineState; 3],
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&mut self, line: InterruptLine, config: LineConfig) {
        self.lines[line.index()].config = config;
    }

    pub fn config(&self, line: InterruptLine) -> LineConfig {
        self.lines[line.index()].config
    }

    /// Assert a request on `line`.
    pub fn raise(&mut self, line: InterruptLine) {
        let state = &mut self.lines[line.index()];
        if state.masked && state.config.masked == MaskedBehavior::Drop {
            log::trace!("{line:?} dropped while masked");
            return;
        }
        state.pending = true;
    }

    /// Withdraw a request (level lines) or an undelivered edge.
    pub fn clear(&mut self, line: InterruptLine) {
        self.lines[line.index()].pending = false;
    }

    pub fn set_mask(&mut self, line: InterruptLine, masked: bool) {
        let state = &mut self.lines[line.index()];
        state.masked = masked;
        if masked && state.config.masked == MaskedBehavior::Drop {
            state.pending = false;
        }
    }

    pub fn is_masked(&self, line: InterruptLine) -> bool {
        self.lines[line.index()].masked
    }

    /// Whether a request is held on `line`, masked or not.
    pub fn is_pending(&self, line: InterruptLine) -> bool {
        self.lines[line.index()].pending
    }

    /// Requests to hand to the CPU now, in NMI, IRQ, FIRQ order. Edge
    /// requests are consumed; level requests stay asserted.
    pub fn take_deliverable(&mut self) -> Vec<InterruptLine> {
        let mut out = Vec::new();
        for line in InterruptLine::ALL {
            let state = &mut self.lines[line.index()];
            if state.pending && !state.masked {
                out.push(line);
                if state.config.trigger == Trigger::Edge {
                    state.pending = false;
                }
            }
        }
        out
    }

    /// Drop all requests and masks; line configuration is kept.
    pub fn reset(&mut self) {
        for state in &mut self.lines {
            state.pending = false;
            state.masked = false;
        }
    }
}
