//! Start-ordered queue of instruction buffers waiting to play.

use alloc::vec::Vec;
use ms_formats::InstructionBuffer;

#[derive(Clone, Debug)]
struct ScheduledBuffer {
    start: u64,
    /// `None` once the mixer has taken it.
    buffer: Option<InstructionBuffer>,
}

/// Buffers sorted by start sample.
///
/// The mixer consumes entries through a cursor without removing them, so
/// the render path never frees memory. Consumed entries are dropped by
/// [`EventQueue::compact`] outside the render path.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    entries: Vec<ScheduledBuffer>,
    cursor: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { entries: Vec::new(), cursor: 0 }
    }

    /// Insert a buffer. Buffers with equal start play in insertion order.
    pub fn push(&mut self, start: u64, buffer: InstructionBuffer) {
        let pos = self.cursor + self.entries[self.cursor..].partition_point(|e| e.start <= start);
        self.entries.insert(pos, ScheduledBuffer { start, buffer: Some(buffer) });
    }

    /// Slot of the next entry due at `now`, advancing the cursor past it.
    ///
    /// The caller takes the buffer out of the slot and may leave a spent
    /// buffer in its place to be freed by the next compaction.
    pub fn next_due(&mut self, now: u64) -> Option<&mut Option<InstructionBuffer>> {
        let entry = self.entries.get_mut(self.cursor)?;
        if entry.start > now {
            return None;
        }
        self.cursor += 1;
        Some(&mut entry.buffer)
    }

    /// Entries not yet consumed.
    pub fn pending(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// Drop consumed entries.
    pub fn compact(&mut self) {
        self.entries.drain(..self.cursor);
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}
