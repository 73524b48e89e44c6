//! Priority queue of scheduled events.
//!
//! Time is measured in master-clock cycles since power-on. Entries fire in
//! fire-time order; entries due at the same time fire in the order they
//! were (re)scheduled. Periodic entries re-arm at `fire_time + period`, so
//! a timer never drifts no matter how irregularly the queue is advanced.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{Error, Result};

/// Opaque reference to a scheduled entry. Handles are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A timer that just fired.
#[derive(Clone, Debug, PartialEq)]
pub struct Fired<T> {
    pub handle: TimerHandle,
    /// Scheduled fire time (not the time the queue was advanced to).
    pub time: u64,
    pub payload: T,
    /// True when the entry was re-armed for another period.
    pub rescheduled: bool,
}

struct Entry<T> {
    fire_time: u64,
    period: u64,
    seq: u64,
    payload: T,
}

#[derive(PartialEq, Eq)]
struct Slot {
    fire_time: u64,
    seq: u64,
    id: u64,
}

// BinaryHeap is a max-heap: invert so the earliest (time, seq) pops first.
impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.fire_time, other.seq).cmp(&(self.fire_time, self.seq))
    }
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct TimerQueue<T> {
    now: u64,
    heap: BinaryHeap<Slot>,
    live: HashMap<u64, Entry<T>>,
    next_id: u64,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now: 0,
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// Current time in master cycles.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Number of entries still scheduled.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Schedule `payload` to fire `delay` cycles from now, then every
    /// `period` cycles (`period == 0` means one-shot).
    pub fn schedule(&mut self, delay: u64, period: u64, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let fire_time = self.now + delay;
        self.arm(id, fire_time, period, payload);
        TimerHandle(id)
    }

    fn arm(&mut self, id: u64, fire_time: u64, period: u64, payload: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Slot { fire_time, seq, id });
        self.live.insert(
            id,
            Entry {
                fire_time,
                period,
                seq,
                payload,
            },
        );
    }

    fn validate(&self, handle: TimerHandle) -> Result<()> {
        if handle.0 >= self.next_id {
            return Err(Error::InvalidTimerHandle(handle.0));
        }
        Ok(())
    }

    /// Remove a scheduled entry. Returns `Ok(false)` if it already fired
    /// (one-shot) or was already cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> Result<bool> {
        self.validate(handle)?;
        // The heap slot goes stale and is skipped when it surfaces.
        Ok(self.live.remove(&handle.0).is_some())
    }

    /// Move a live entry to fire `delay` cycles from now, keeping its
    /// period. Returns `Ok(false)` if the entry is no longer scheduled.
    pub fn reschedule(&mut self, handle: TimerHandle, delay: u64) -> Result<bool> {
        self.validate(handle)?;
        match self.live.remove(&handle.0) {
            Some(entry) => {
                self.arm(handle.0, self.now + delay, entry.period, entry.payload);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.live.contains_key(&handle.0)
    }

    /// Cycles until the entry fires, or `None` if it is not scheduled.
    pub fn remaining(&self, handle: TimerHandle) -> Option<u64> {
        self.live
            .get(&handle.0)
            .map(|e| e.fire_time.saturating_sub(self.now))
    }

    /// Fire time of the earliest live entry.
    pub fn next_fire_time(&mut self) -> Option<u64> {
        self.discard_stale();
        self.heap.peek().map(|slot| slot.fire_time)
    }

    fn discard_stale(&mut self) {
        while let Some(slot) = self.heap.peek() {
            let stale = self
                .live
                .get(&slot.id)
                .is_none_or(|entry| entry.seq != slot.seq);
            if !stale {
                break;
            }
            self.heap.pop();
        }
    }

    /// Advance the clock to `target`. Does not fire anything; entries due
    /// before `target` stay queued and fire on the next pop.
    pub fn set_now(&mut self, target: u64) {
        self.now = self.now.max(target);
    }

    /// Forget all entries and rewind the clock to zero.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
        self.now = 0;
    }
}

impl<T: Clone> TimerQueue<T> {
    /// Pop the earliest entry due at or before `limit`, moving the clock to
    /// its fire time. Periodic entries are re-armed before returning.
    ///
    /// This is the primitive the board uses so that the dispatch of each
    /// fired entry may schedule or cancel other entries.
    pub fn pop_due(&mut self, limit: u64) -> Option<Fired<T>> {
        self.discard_stale();
        let slot = self.heap.peek()?;
        if slot.fire_time > limit {
            return None;
        }
        let slot = self.heap.pop()?;
        let entry = self.live.remove(&slot.id)?;
        self.now = self.now.max(entry.fire_time);

        let rescheduled = entry.period > 0;
        if rescheduled {
            let next = entry.fire_time + entry.period;
            self.arm(slot.id, next, entry.period, entry.payload.clone());
        }
        Some(Fired {
            handle: TimerHandle(slot.id),
            time: entry.fire_time,
            payload: entry.payload,
            rescheduled,
        })
    }

    /// Advance the clock by `elapsed` cycles, firing every due entry in
    /// order. The callback receives the queue itself so it can schedule or
    /// cancel entries; anything that becomes due inside the window fires in
    /// this same call. Returns the number of entries fired.
    pub fn advance<F>(&mut self, elapsed: u64, on_fire: F) -> usize
    where
        F: FnMut(&mut Self, Fired<T>),
    {
        let target = self.now + elapsed;
        self.advance_to(target, on_fire)
    }

    pub fn advance_to<F>(&mut self, target: u64, mut on_fire: F) -> usize
    where
        F: FnMut(&mut Self, Fired<T>),
    {
        let mut fired = 0;
        while let Some(entry) = self.pop_due(target) {
            fired += 1;
            on_fire(self, entry);
        }
        self.set_now(target);
        fired
    }
}
