//! External-call seam
//!
//! Invoking a downstream destination is the one genuinely host-specific
//! operation in the system, so it is isolated behind [`CallDispatcher`]:
//! the orchestrator hands over a destination, payload, and per-call compute
//! budget and receives a tagged outcome back. Failure classification over
//! the raw payload lives in `models::transaction` as a pure function.

use crate::auth::AccountId;
use std::collections::{HashMap, VecDeque};

/// Tagged result of one downstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call completed; return data is retained by the cycle result
    Success { data: Vec<u8> },

    /// The call failed; `raw` is the unparsed failure payload
    Failure { raw: Vec<u8> },
}

/// Performs downstream calls on behalf of the orchestrator.
///
/// Implementations are synchronous: the orchestrator waits for each
/// outcome before moving to the next record, because abort-vs-continue
/// decisions must be made in sequence.
pub trait CallDispatcher {
    /// Computational budget still available to this cycle. The orchestrator
    /// requires this to strictly exceed a record's budget before dispatching
    /// it.
    fn remaining_budget(&self) -> u64;

    /// Invoke `destination` with `payload`, bounded by `compute_budget`
    fn dispatch(&mut self, destination: &str, payload: &[u8], compute_budget: u64) -> CallOutcome;
}

/// Scripted dispatcher for tests and bring-up.
///
/// Outcomes are queued per destination and popped in call order; an
/// unscripted destination succeeds with empty return data. Each dispatch
/// consumes its compute budget from the remaining-budget counter, and every
/// call is recorded for assertions.
///
/// NOTE: Available in all builds to support integration testing, the same
/// way the oracle module ships `StaticRateSource`.
#[derive(Debug, Default)]
pub struct ScriptedDispatcher {
    remaining_budget: u64,
    script: HashMap<AccountId, VecDeque<CallOutcome>>,
    calls: Vec<DispatchRecord>,
}

/// One recorded dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub destination: AccountId,
    pub payload: Vec<u8>,
    pub compute_budget: u64,
}

impl ScriptedDispatcher {
    pub fn with_budget(remaining_budget: u64) -> Self {
        Self {
            remaining_budget,
            ..Self::default()
        }
    }

    /// Queue the next outcome for a destination
    pub fn script(&mut self, destination: impl Into<AccountId>, outcome: CallOutcome) {
        self.script
            .entry(destination.into())
            .or_default()
            .push_back(outcome);
    }

    /// Calls made so far, in dispatch order
    pub fn calls(&self) -> &[DispatchRecord] {
        &self.calls
    }
}

impl CallDispatcher for ScriptedDispatcher {
    fn remaining_budget(&self) -> u64 {
        self.remaining_budget
    }

    fn dispatch(&mut self, destination: &str, payload: &[u8], compute_budget: u64) -> CallOutcome {
        self.remaining_budget = self.remaining_budget.saturating_sub(compute_budget);
        self.calls.push(DispatchRecord {
            destination: destination.to_string(),
            payload: payload.to_vec(),
            compute_budget,
        });
        self.script
            .get_mut(destination)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(CallOutcome::Success { data: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_outcomes_pop_in_order() {
        let mut dispatcher = ScriptedDispatcher::with_budget(1_000);
        dispatcher.script("pool", CallOutcome::Failure { raw: vec![1] });
        dispatcher.script("pool", CallOutcome::Success { data: vec![2] });

        assert_eq!(
            dispatcher.dispatch("pool", &[], 100),
            CallOutcome::Failure { raw: vec![1] }
        );
        assert_eq!(
            dispatcher.dispatch("pool", &[], 100),
            CallOutcome::Success { data: vec![2] }
        );
        // Unscripted destinations succeed with empty data
        assert_eq!(
            dispatcher.dispatch("other", &[], 100),
            CallOutcome::Success { data: Vec::new() }
        );
        assert_eq!(dispatcher.remaining_budget(), 700);
        assert_eq!(dispatcher.calls().len(), 3);
    }
}
