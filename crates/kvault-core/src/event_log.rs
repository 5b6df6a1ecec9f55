//! Append-only, sequenced log of committed vault events.
//!
//! Operations stage their events locally and hand them over only after
//! every check and transfer has succeeded, so a failed call never leaves a
//! trace here.

use chrono::Utc;
use kvault_types::{EventRecord, VaultEvent};

/// Sequenced event log.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_sequence: u64,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of events from one committed call, in order.
    pub fn commit(&mut self, events: Vec<VaultEvent>) {
        let now = Utc::now();
        for event in events {
            tracing::debug!(sequence = self.next_sequence, event = %event, "Event committed");
            self.records.push(EventRecord {
                sequence: self.next_sequence,
                event,
                emitted_at: now,
            });
            self.next_sequence += 1;
        }
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence >= from`.
    #[must_use]
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = self.records.partition_point(|r| r.sequence < from);
        &self.records[start..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use kvault_types::MarketMode;

    use super::*;

    fn toggled(enabled: bool) -> VaultEvent {
        VaultEvent::SwapToggled { enabled }
    }

    #[test]
    fn sequences_are_monotonic_across_commits() {
        let mut log = EventLog::new();
        log.commit(vec![toggled(false), toggled(true)]);
        log.commit(vec![VaultEvent::FloorPriceUpdated {
            price: 5,
            mode: MarketMode::Bootstrap,
        }]);
        let seqs: Vec<u64> = log.records().iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn since_filters_by_sequence() {
        let mut log = EventLog::new();
        log.commit(vec![toggled(false), toggled(true), toggled(false)]);
        assert_eq!(log.since(0).len(), 3);
        assert_eq!(log.since(2).len(), 1);
        assert_eq!(log.since(2)[0].event, toggled(false));
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn empty_commit_is_noop() {
        let mut log = EventLog::new();
        log.commit(Vec::new());
        assert!(log.is_empty());
    }
}
