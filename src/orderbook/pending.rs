//! The per-book queue of events that could not yet be resolved against the
//! order index (spec.md §4.3.3).

use crate::tick::MarketEvent;
use std::collections::VecDeque;

/// FIFO holding-pen for events waiting on a predecessor (an order or the
/// other leg of a trade) that hasn't arrived yet.
#[derive(Debug, Default)]
pub struct PendingQueue {
    events: VecDeque<MarketEvent>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: MarketEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Swaps out every currently buffered event, leaving the queue empty.
    /// Callers replay the drained events through `apply_event`; anything
    /// still unresolved is pushed back in via `push`, which is safe to call
    /// while iterating the drained snapshot since it targets a different
    /// deque.
    pub fn drain_all(&mut self) -> VecDeque<MarketEvent> {
        std::mem::take(&mut self.events)
    }
}
