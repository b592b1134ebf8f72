//! Single-slot store for the most recent frame

use crate::frame::Frame;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Holds at most one frame: the latest one published.
///
/// Publishing replaces the held frame; there is no queue, so a slow reader
/// skips frames instead of falling behind. Readers get an owned copy and may
/// process it while the acquisition loop keeps publishing.
#[derive(Debug, Default)]
pub struct FrameStore {
    slot: Mutex<Option<Frame>>,
    published: AtomicU64,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held frame and return its sequence number.
    pub fn publish(&self, frame: Frame) -> u64 {
        let mut slot = self.slot.lock();
        let sequence = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        *slot = Some(frame.with_sequence(sequence));
        sequence
    }

    /// Independent copy of the held frame, `None` until the first publish.
    pub fn snapshot(&self) -> Option<Frame> {
        self.slot.lock().clone()
    }

    pub fn has_frame(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Number of frames published since creation
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
