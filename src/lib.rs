//! Elastic Supply Policy Core - Rust Engine
//!
//! Gated, periodic supply-adjustment ("rebase") engine for an elastic-supply
//! asset, plus a batch orchestrator that broadcasts each adjustment to a
//! configurable set of downstream receivers under partial-failure semantics.
//!
//! # Architecture
//!
//! - **core**: Checked 18-decimal fixed-point arithmetic
//! - **models**: Domain types (TransactionRecord, FailureCode, Event)
//! - **oracle**: Price-feed adapter with per-source clamping ceilings
//! - **ledger**: Supply ledger seam + in-memory reference implementation
//! - **policy**: Rebase policy engine (window gating, dead-zone, dampening)
//! - **orchestrator**: Cycle sequencing and downstream notification
//! - **auth**: Owner and caller-origin guards
//!
//! # Critical Invariants
//!
//! 1. All rate and supply values are u128 scaled by 10^18; signed
//!    intermediates are i128
//! 2. Every arithmetic step is checked; overflow is an error, never a wrap
//! 3. At most one successful rebase per interval window (cooldown timestamp,
//!    no lock)
//! 4. A fatal cycle failure rolls back everything the cycle changed,
//!    including an already-applied rebase

// Module declarations
pub mod auth;
pub mod core;
pub mod ledger;
pub mod models;
pub mod oracle;
pub mod orchestrator;
pub mod policy;

// Re-exports for convenience
pub use auth::{AccountId, AuthError, CallerContext, OwnerGuard};
pub use core::fixed::{FixedPointError, MAX_AUX_RATE, MAX_RATE, MAX_SUPPLY, ONE};
pub use ledger::{LedgerError, MemoryLedger, SupplyLedger};
pub use models::{
    event::{Event, EventLog},
    transaction::{classify_failure, encode_reason, FailureCode, TransactionRecord},
};
pub use oracle::{
    OracleError, OracleSample, OracleSet, OracleSource, RateSource, StaticRateSource,
};
pub use orchestrator::{
    CallDispatcher, CallOutcome, CycleResult, Orchestrator, OrchestratorError, ScriptedDispatcher,
};
pub use policy::{PolicyConfig, PolicyEngine, PolicyError, PolicyStateSnapshot, RebaseOutcome};
