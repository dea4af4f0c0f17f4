//! Cycle checkpoint - the rollback primitive
//!
//! On the source platform a fatal cycle failure is undone by the host's
//! transactional execution. This engine reproduces that with an explicit
//! checkpoint taken before the rebase: policy cycle state, a serialized
//! ledger snapshot, and the event-log length. Restoring the checkpoint
//! discards everything the cycle changed, including an already-applied
//! rebase and any events it logged.
//!
//! # Critical Invariants
//!
//! - Restore is exact: ledger and policy state compare equal to their
//!   pre-cycle values
//! - Events logged after capture disappear on restore

use crate::ledger::{LedgerError, SupplyLedger};
use crate::models::event::EventLog;
use crate::policy::{PolicyEngine, PolicyStateSnapshot};

/// Everything needed to undo one orchestrator cycle
#[derive(Debug, Clone)]
pub struct CycleCheckpoint {
    policy: PolicyStateSnapshot,
    ledger: Vec<u8>,
    event_count: usize,
}

impl CycleCheckpoint {
    /// Capture the pre-cycle state
    pub fn capture(
        policy: &PolicyEngine,
        ledger: &dyn SupplyLedger,
        events: &EventLog,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            policy: policy.state_snapshot(),
            ledger: ledger.checkpoint()?,
            event_count: events.len(),
        })
    }

    /// Roll everything back to the captured state
    pub fn restore(
        &self,
        policy: &mut PolicyEngine,
        ledger: &mut dyn SupplyLedger,
        events: &mut EventLog,
    ) -> Result<(), LedgerError> {
        ledger.restore(&self.ledger)?;
        policy.restore_state(&self.policy);
        events.truncate(self.event_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CallerContext;
    use crate::core::fixed::ONE;
    use crate::ledger::MemoryLedger;
    use crate::models::event::Event;
    use crate::oracle::StaticRateSource;
    use crate::policy::PolicyConfig;

    #[test]
    fn test_restore_undoes_rebase_and_events() {
        let owner = CallerContext::external("ops");
        let mut policy = PolicyEngine::new("ops", PolicyConfig::default(), ONE).unwrap();
        policy.set_orchestrator(&owner, "orchestrator").unwrap();
        policy
            .set_ref_index_source(&owner, Box::new(StaticRateSource::valid(ONE)))
            .unwrap();
        policy
            .set_exchange_rate_source(&owner, Box::new(StaticRateSource::valid(2 * ONE)))
            .unwrap();
        policy
            .set_aux_rate_source(&owner, Box::new(StaticRateSource::valid(ONE)))
            .unwrap();

        let mut ledger = MemoryLedger::new(1_000_000);
        let mut events = EventLog::new();
        let checkpoint = CycleCheckpoint::capture(&policy, &ledger, &events).unwrap();

        let orchestrator_ctx = CallerContext::internal("orchestrator");
        let now = 86_400 + 72_000;
        policy
            .rebase(&orchestrator_ctx, now, &mut ledger, &mut events)
            .unwrap();
        assert_eq!(policy.epoch(), 1);
        assert_ne!(ledger.total_supply(), 1_000_000);
        assert_eq!(events.len(), 1);

        checkpoint
            .restore(&mut policy, &mut ledger, &mut events)
            .unwrap();
        assert_eq!(policy.epoch(), 0);
        assert_eq!(policy.last_rebase_timestamp(), 0);
        assert_eq!(ledger.total_supply(), 1_000_000);
        assert!(events.is_empty());
    }

    #[test]
    fn test_restore_keeps_events_logged_before_capture() {
        let policy = PolicyEngine::new("ops", PolicyConfig::default(), ONE).unwrap();
        let ledger = MemoryLedger::new(500);
        let mut events = EventLog::new();
        events.log(Event::TransactionFailed {
            destination: "pool".to_string(),
            index: 0,
            payload: Vec::new(),
            message: "earlier cycle".to_string(),
        });

        let checkpoint = CycleCheckpoint::capture(&policy, &ledger, &events).unwrap();
        events.log(Event::TransactionFailed {
            destination: "pool".to_string(),
            index: 1,
            payload: Vec::new(),
            message: "doomed cycle".to_string(),
        });

        let mut policy = policy;
        let mut ledger = ledger;
        checkpoint
            .restore(&mut policy, &mut ledger, &mut events)
            .unwrap();
        assert_eq!(events.len(), 1);
    }
}
