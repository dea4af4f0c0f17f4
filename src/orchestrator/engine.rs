//! Orchestrator Engine
//!
//! The cycle entry point plus the owner-managed transaction list.
//!
//! # Cycle sequence
//!
//! ```text
//! run_cycle:
//! 1. Reject indirect callers (top-level initiators only)
//! 2. Checkpoint policy state, ledger, event-log length
//! 3. Policy rebase - any failure is fatal, no notifications run
//! 4. For each enabled record, in index order:
//!    a. Require remaining budget strictly exceeds the record's budget
//!    b. Dispatch; retain return data on success
//!    c. On failure, classify: approved code -> log TransactionFailed and
//!       continue; unapproved -> fatal
//! 5. Fatal after step 3 restores the checkpoint (the rebase rolls back too)
//! ```
//!
//! # Critical Invariants
//!
//! 1. Notifications are sequential and synchronous, in index order - the
//!    abort-vs-continue decision for each call depends on its outcome
//! 2. `remove` is swap-with-last + truncate: index is not a stable identity
//! 3. The budget check runs per call, never assumed from the caller's total
//!    allowance
//!
//! # Example
//!
//! ```
//! use supply_policy_core::{
//!     CallerContext, EventLog, MemoryLedger, Orchestrator, PolicyConfig, PolicyEngine,
//!     ScriptedDispatcher, StaticRateSource, ONE,
//! };
//! use std::collections::HashSet;
//!
//! let owner = CallerContext::external("ops");
//! let mut policy = PolicyEngine::new("ops", PolicyConfig::default(), ONE).unwrap();
//! policy.set_orchestrator(&owner, "orchestrator").unwrap();
//! policy.set_ref_index_source(&owner, Box::new(StaticRateSource::valid(ONE))).unwrap();
//! policy.set_exchange_rate_source(&owner, Box::new(StaticRateSource::valid(2 * ONE))).unwrap();
//! policy.set_aux_rate_source(&owner, Box::new(StaticRateSource::valid(ONE))).unwrap();
//!
//! let mut orchestrator = Orchestrator::new("ops", "orchestrator");
//! orchestrator
//!     .append(&owner, "pool_notifier", vec![0x01], 50_000, HashSet::new())
//!     .unwrap();
//!
//! let mut ledger = MemoryLedger::new(1_000_000);
//! let mut dispatcher = ScriptedDispatcher::with_budget(1_000_000);
//! let mut events = EventLog::new();
//! let keeper = CallerContext::external("keeper");
//!
//! let result = orchestrator
//!     .run_cycle(&keeper, &mut policy, &mut ledger, &mut dispatcher, &mut events, 86_400 + 72_000)
//!     .unwrap();
//! assert_eq!(result.epoch, 1);
//! ```

use crate::auth::{self, AccountId, AuthError, CallerContext, OwnerGuard};
use crate::ledger::{LedgerError, SupplyLedger};
use crate::models::event::{Event, EventLog};
use crate::models::transaction::{classify_failure, FailureCode, TransactionRecord};
use crate::orchestrator::checkpoint::CycleCheckpoint;
use crate::orchestrator::dispatch::{CallDispatcher, CallOutcome};
use crate::policy::{PolicyEngine, PolicyError};
use std::collections::HashSet;
use thiserror::Error;

/// Errors from orchestrator operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The policy rebase failed; the cycle never reached the notifications
    #[error("rebase failed: {0}")]
    Policy(#[from] PolicyError),

    /// A checkpoint or rollback operation failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("transaction {index} needs budget {required} but only {remaining} remains")]
    InsufficientBudget {
        index: usize,
        required: u64,
        remaining: u64,
    },

    #[error("unapproved failure from transaction {index} ({destination}): {message}")]
    UnapprovedTransactionFailure {
        index: usize,
        destination: AccountId,
        code: FailureCode,
        message: String,
    },

    #[error("transaction index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// What a successful cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleResult {
    pub epoch: u64,
    pub delta: i128,
    pub new_total_supply: u128,
    /// Enabled records that were actually dispatched
    pub notifications_attempted: usize,
    /// Dispatched records that failed with an approved code
    pub notifications_tolerated: usize,
    /// Return data from successful notifications, in dispatch order
    pub returns: Vec<Vec<u8>>,
}

/// Sequences the policy rebase and the downstream notification list
pub struct Orchestrator {
    guard: OwnerGuard,
    /// Identity under which this orchestrator calls the policy engine;
    /// must match the engine's configured orchestrator.
    identity: AccountId,
    records: Vec<TransactionRecord>,
}

impl Orchestrator {
    pub fn new(owner: impl Into<AccountId>, identity: impl Into<AccountId>) -> Self {
        Self {
            guard: OwnerGuard::new(owner),
            identity: identity.into(),
            records: Vec::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    // ------------------------------------------------------------------
    // Cycle entry point
    // ------------------------------------------------------------------

    /// Run one full cycle: rebase, then notify downstream receivers.
    ///
    /// Fatal outcomes (failed rebase, insufficient budget, unapproved
    /// downstream failure) leave no trace: the checkpoint taken at entry is
    /// restored, rolling back the rebase and any events this cycle logged.
    pub fn run_cycle(
        &mut self,
        ctx: &CallerContext,
        policy: &mut PolicyEngine,
        ledger: &mut dyn SupplyLedger,
        dispatcher: &mut dyn CallDispatcher,
        events: &mut EventLog,
        now: u64,
    ) -> Result<CycleResult, OrchestratorError> {
        auth::require_top_level(ctx)?;

        let checkpoint = CycleCheckpoint::capture(policy, ledger, events)?;

        // A failed rebase mutates nothing, so there is nothing to restore.
        let policy_ctx = CallerContext::internal(self.identity.clone());
        let outcome = policy.rebase(&policy_ctx, now, ledger, events)?;

        let mut attempted = 0usize;
        let mut tolerated = 0usize;
        let mut returns = Vec::new();

        for index in 0..self.records.len() {
            let record = &self.records[index];
            if !record.enabled() {
                continue;
            }

            let remaining = dispatcher.remaining_budget();
            if remaining <= record.compute_budget() {
                checkpoint.restore(policy, ledger, events)?;
                return Err(OrchestratorError::InsufficientBudget {
                    index,
                    required: record.compute_budget(),
                    remaining,
                });
            }

            attempted += 1;
            match dispatcher.dispatch(record.destination(), record.payload(), record.compute_budget())
            {
                CallOutcome::Success { data } => returns.push(data),
                CallOutcome::Failure { raw } => {
                    let (code, message) = classify_failure(&raw);
                    if record.is_approved(&code) {
                        tolerated += 1;
                        events.log(Event::TransactionFailed {
                            destination: record.destination().to_string(),
                            index,
                            payload: record.payload().to_vec(),
                            message,
                        });
                    } else {
                        checkpoint.restore(policy, ledger, events)?;
                        return Err(OrchestratorError::UnapprovedTransactionFailure {
                            index,
                            destination: record.destination().to_string(),
                            code,
                            message,
                        });
                    }
                }
            }
        }

        Ok(CycleResult {
            epoch: outcome.epoch,
            delta: outcome.delta,
            new_total_supply: outcome.new_total_supply,
            notifications_attempted: attempted,
            notifications_tolerated: tolerated,
            returns,
        })
    }

    // ------------------------------------------------------------------
    // Owner-only list management
    // ------------------------------------------------------------------

    /// Append an enabled record to the end of the sequence
    pub fn append(
        &mut self,
        ctx: &CallerContext,
        destination: impl Into<AccountId>,
        payload: Vec<u8>,
        compute_budget: u64,
        approved_failures: HashSet<FailureCode>,
    ) -> Result<(), OrchestratorError> {
        self.guard.require_owner(ctx)?;
        self.records.push(TransactionRecord::new(
            destination,
            payload,
            compute_budget,
            approved_failures,
        ));
        Ok(())
    }

    /// Remove the record at `index` by swapping the last record into its
    /// place and truncating. Reorders the sequence: callers must re-resolve
    /// indices before repeat operations.
    pub fn remove(&mut self, ctx: &CallerContext, index: usize) -> Result<(), OrchestratorError> {
        self.guard.require_owner(ctx)?;
        self.check_bounds(index)?;
        self.records.swap_remove(index);
        Ok(())
    }

    /// Enable or disable the record at `index` in place
    pub fn set_enabled(
        &mut self,
        ctx: &CallerContext,
        index: usize,
        enabled: bool,
    ) -> Result<(), OrchestratorError> {
        self.guard.require_owner(ctx)?;
        self.check_bounds(index)?;
        self.records[index].set_enabled(enabled);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TransactionRecord> {
        self.records.get(index)
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &CallerContext,
        new_owner: impl Into<AccountId>,
    ) -> Result<(), OrchestratorError> {
        self.guard.transfer_ownership(ctx, new_owner)?;
        Ok(())
    }

    fn check_bounds(&self, index: usize) -> Result<(), OrchestratorError> {
        if index >= self.records.len() {
            return Err(OrchestratorError::IndexOutOfBounds {
                index,
                len: self.records.len(),
            });
        }
        Ok(())
    }
}
