use std::collections::VecDeque;

use crate::core::{Bus, BusMaster};
use crate::cpu::Cpu;
use crate::interrupt::InterruptLine;
use crate::memory::BankView;

/// One step of a scripted CPU program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusOp {
    Read(u16),
    Write(u16, u8),
    /// Write the value returned by the most recent read.
    WriteLast(u16),
    IoRead(u16),
    IoWrite(u16, u8),
    /// Burn cycles without touching the bus.
    Idle(u64),
}

/// Deterministic stand-in for a CPU core.
///
/// Runs a looping main program of bus operations, each costing
/// `op_cycles` cycles (except `Idle`, which costs its argument). When an
/// interrupt is signalled and a service routine is registered for its
/// line, the routine runs to completion before the main program resumes.
/// Requests for lines without a routine are counted and ignored.
pub struct ScriptedCpu {
    program: Vec<BusOp>,
    routines: Vec<(InterruptLine, Vec<BusOp>)>,
    op_cycles: u64,
    pc: usize,
    service: Option<(usize, usize)>, // (routine index, position)
    pending: VecDeque<InterruptLine>,
    last_read: u8,
    total_cycles: u64,
    taken: [u64; 3],
    program_bank: Option<BankView>,
}

impl ScriptedCpu {
    pub fn new(program: Vec<BusOp>) -> Self {
        Self {
            program,
            routines: Vec::new(),
            op_cycles: 4,
            pc: 0,
            service: None,
            pending: VecDeque::new(),
            last_read: 0,
            total_cycles: 0,
            taken: [0; 3],
            program_bank: None,
        }
    }

    /// Idle CPU: consumes its slice without touching the bus.
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_op_cycles(mut self, cycles: u64) -> Self {
        self.op_cycles = cycles.max(1);
        self
    }

    /// Register the service routine run when `line` is signalled.
    pub fn with_routine(mut self, line: InterruptLine, ops: Vec<BusOp>) -> Self {
        self.routines.retain(|(l, _)| *l != line);
        self.routines.push((line, ops));
        self
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Number of requests received on `line`.
    pub fn interrupts_taken(&self, line: InterruptLine) -> u64 {
        self.taken[line.index()]
    }

    pub fn last_read(&self) -> u8 {
        self.last_read
    }

    pub fn program_bank(&self) -> Option<BankView> {
        self.program_bank
    }

    fn next_op(&mut self) -> Option<BusOp> {
        if self.service.is_none()
            && let Some(line) = self.pending.pop_front()
            && let Some(idx) = self.routines.iter().position(|(l, _)| *l == line)
        {
            self.service = Some((idx, 0));
        }

        if let Some((idx, pos)) = self.service {
            let routine = &self.routines[idx].1;
            if pos < routine.len() {
                let op = routine[pos].clone();
                self.service = if pos + 1 < routine.len() {
                    Some((idx, pos + 1))
                } else {
                    None
                };
                return Some(op);
            }
            self.service = None;
        }

        if self.program.is_empty() {
            return None;
        }
        let op = self.program[self.pc].clone();
        self.pc = (self.pc + 1) % self.program.len();
        Some(op)
    }

    fn execute(&mut self, op: BusOp, bus: &mut dyn Bus, master: BusMaster) -> u64 {
        match op {
            BusOp::Read(addr) => self.last_read = bus.read(master, addr),
            BusOp::Write(addr, data) => bus.write(master, addr, data),
            BusOp::WriteLast(addr) => bus.write(master, addr, self.last_read),
            BusOp::IoRead(addr) => self.last_read = bus.io_read(master, addr),
            BusOp::IoWrite(addr, data) => bus.io_write(master, addr, data),
            BusOp::Idle(cycles) => return cycles.max(1),
        }
        self.op_cycles
    }
}

impl Cpu for ScriptedCpu {
    fn run(&mut self, cycles: u64, bus: &mut dyn Bus, master: BusMaster) -> u64 {
        let mut consumed = 0;
        while consumed < cycles {
            match self.next_op() {
                Some(op) => consumed += self.execute(op, bus, master),
                None => consumed = cycles,
            }
        }
        self.total_cycles += consumed;
        consumed
    }

    fn signal(&mut self, line: InterruptLine) {
        self.taken[line.index()] += 1;
        if self.routines.iter().any(|(l, _)| *l == line) {
            self.pending.push_back(line);
        }
    }

    fn set_program_bank(&mut self, view: BankView) {
        self.program_bank = Some(view);
    }

    fn reset(&mut self) {
        self.pc = 0;
        self.service = None;
        self.pending.clear();
        self.last_read = 0;
    }
}
