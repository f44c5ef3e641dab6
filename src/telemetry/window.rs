//! Fixed-size window of per-second samples.
//!
//! The write cursor saturates at the last slot: when the publish phase is
//! late, further reads keep overwriting slot `N-1`.  Slots persist across
//! resets so a read that cannot refresh a field keeps the previous value.

use super::SampleRecord;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    slots: Vec<SampleRecord>,
    cursor: usize,
    filled: usize,
}

impl RollingWindow {
    /// A window of `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![SampleRecord::default(); capacity.max(1)],
            cursor: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next read writes into.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Distinct slots written since the last reset.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Mutable access to the slot at the cursor.
    pub fn current_mut(&mut self) -> &mut SampleRecord {
        &mut self.slots[self.cursor]
    }

    /// Commit the slot at the cursor and move on, saturating at `N-1`.
    pub fn advance(&mut self) {
        self.filled = (self.cursor + 1).max(self.filled);
        self.cursor = (self.cursor + 1).min(self.slots.len() - 1);
    }

    /// Samples captured since the last reset, oldest first.
    pub fn samples(&self) -> &[SampleRecord] {
        &self.slots[..self.filled]
    }

    /// Logically empty the window.  Slot contents are kept.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.filled = 0;
    }

    /// Empty the window and zero every slot.
    pub fn clear(&mut self) {
        self.reset();
        self.slots.fill(SampleRecord::default());
    }
}
