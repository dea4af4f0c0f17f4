//! Event logging for auditing and observability.
//!
//! Two kinds of events exist:
//! - **Rebase**: a cycle ran and a supply delta (possibly zero) was applied
//! - **TransactionFailed**: a downstream notification failed with an
//!   approved code and the cycle continued
//!
//! The log is truncatable so the orchestrator can discard events produced by
//! a cycle that was rolled back.

use crate::auth::AccountId;

/// A structured record of a significant state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A rebase completed (a zero delta still records that the cycle ran)
    Rebase {
        epoch: u64,
        exchange_rate: u128,
        ref_index: u128,
        aux_rate: u128,
        delta: i128,
        timestamp: u64,
    },

    /// A downstream notification failed with an approved code; the cycle
    /// tolerated it and continued
    TransactionFailed {
        destination: AccountId,
        index: usize,
        payload: Vec<u8>,
        message: String,
    },
}

impl Event {
    /// Short description of the event kind
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Rebase { .. } => "Rebase",
            Event::TransactionFailed { .. } => "TransactionFailed",
        }
    }
}

/// Append-only event log with simple query helpers.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Drop everything logged after position `len`. Used by cycle rollback.
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// All events of the given kind (see [`Event::event_type`]), in order
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// All rebase events, in order
    pub fn rebases(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Rebase { .. }))
            .collect()
    }

    /// All tolerated-failure events, in order
    pub fn tolerated_failures(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::TransactionFailed { .. }))
            .collect()
    }

    /// The rebase event for a specific epoch, if it was logged
    pub fn rebase_for_epoch(&self, epoch: u64) -> Option<&Event> {
        self.events.iter().find(
            |e| matches!(e, Event::Rebase { epoch: logged, .. } if *logged == epoch),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rebase(epoch: u64) -> Event {
        Event::Rebase {
            epoch,
            exchange_rate: 2,
            ref_index: 1,
            aux_rate: 1,
            delta: -5,
            timestamp: 86_400,
        }
    }

    #[test]
    fn test_log_and_query() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.log(sample_rebase(1));
        log.log(Event::TransactionFailed {
            destination: "pool_notifier".to_string(),
            index: 0,
            payload: vec![1, 2, 3],
            message: "known flake".to_string(),
        });
        log.log(sample_rebase(2));

        assert_eq!(log.len(), 3);
        assert_eq!(log.rebases().len(), 2);
        assert_eq!(log.tolerated_failures().len(), 1);
        assert_eq!(log.events_of_type("Rebase").len(), 2);
        assert!(log.rebase_for_epoch(2).is_some());
        assert!(log.rebase_for_epoch(3).is_none());
    }

    #[test]
    fn test_truncate_discards_tail() {
        let mut log = EventLog::new();
        log.log(sample_rebase(1));
        let mark = log.len();
        log.log(sample_rebase(2));
        log.log(sample_rebase(3));

        log.truncate(mark);
        assert_eq!(log.len(), 1);
        assert!(log.rebase_for_epoch(1).is_some());
        assert!(log.rebase_for_epoch(2).is_none());
    }
}
