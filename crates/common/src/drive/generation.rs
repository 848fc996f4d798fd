use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Request counter used to drop results of superseded requests
///
/// Every long running load takes a [`Ticket`] before it starts and only
/// applies its result if the ticket is still current when it finishes.
/// Starting a newer load or calling [`Generation::invalidate`] makes all
/// outstanding tickets stale.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }

    /// Make every outstanding ticket stale
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
