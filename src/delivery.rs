//! Delivery queue for records that could not be published.
//!
//! FIFO: records leave in the order they were queued.  Only the recover
//! phase removes entries, one per successful publish.  Growth is limited
//! by available memory; an allocation failure is reported instead of
//! aborting.

use std::collections::VecDeque;

use log::debug;

use crate::error::{Error, Result};
use crate::telemetry::AggregatedRecord;

#[derive(Debug, Default)]
pub struct DeliveryQueue {
    pending: VecDeque<AggregatedRecord>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail.
    pub fn push(&mut self, record: AggregatedRecord) -> Result<()> {
        self.pending
            .try_reserve(1)
            .map_err(|_| Error::Exhausted("delivery queue"))?;
        self.pending.push_back(record);
        debug!("Queue: pushed, {} pending", self.pending.len());
        Ok(())
    }

    /// Oldest pending record.
    pub fn peek(&self) -> Option<&AggregatedRecord> {
        self.pending.front()
    }

    /// Drop the oldest record.  `false` when empty.
    pub fn pop(&mut self) -> bool {
        let popped = self.pending.pop_front().is_some();
        if popped {
            debug!("Queue: popped, {} pending", self.pending.len());
        }
        popped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
