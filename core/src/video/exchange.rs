//! Single-producer, single-consumer handoff of finished frames.

use std::sync::{Arc, Mutex};

use crate::video::bitmap::IndexedBitmap;

struct Shared {
    frame: IndexedBitmap,
    sequence: u64,
}

/// Emulation-side half of a frame channel.
pub struct FramePublisher {
    shared: Arc<Mutex<Shared>>,
    back: IndexedBitmap,
}

/// Presentation-side half of a frame channel.
pub struct FrameReceiver {
    shared: Arc<Mutex<Shared>>,
    front: IndexedBitmap,
    seen: u64,
}

/// Create a frame channel for `width` x `height` bitmaps.
pub fn frame_channel(width: usize, height: usize) -> (FramePublisher, FrameReceiver) {
    let shared = Arc::new(Mutex::new(Shared {
        frame: IndexedBitmap::new(width, height),
        sequence: 0,
    }));
    (
        FramePublisher {
            shared: Arc::clone(&shared),
            back: IndexedBitmap::new(width, height),
        },
        FrameReceiver {
            shared,
            front: IndexedBitmap::new(width, height),
            seen: 0,
        },
    )
}

impl FramePublisher {
    /// Publish a finished frame. The copy happens outside the lock; only
    /// the buffer swap is done while holding it.
    pub fn publish(&mut self, frame: &IndexedBitmap) {
        self.back.copy_from(frame);
        // A poisoned lock means the receiver panicked; keep publishing into it.
        let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::swap(&mut shared.frame, &mut self.back);
        shared.sequence += 1;
    }
}

impl FrameReceiver {
    /// The most recent frame and its sequence number (0 before anything
    /// was published). Never blocks on rendering.
    pub fn latest(&mut self) -> (u64, &IndexedBitmap) {
        {
            let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
            if shared.sequence != self.seen {
                std::mem::swap(&mut shared.frame, &mut self.front);
                self.seen = shared.sequence;
            }
        }
        (self.seen, &self.front)
    }
}
