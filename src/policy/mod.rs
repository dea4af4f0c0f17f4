//! Policy Engine - decides whether and by how much supply changes
//!
//! The engine gates execution by a time window and a cooldown, computes a
//! requested supply delta from a weighted two-factor model, suppresses small
//! deviations (dead-zone), dampens by a lag factor, clamps to the supply
//! ceiling, and invokes the ledger's rebase operation.
//!
//! See `engine.rs` for the full implementation.

pub mod engine;

// Re-export main types for convenience
pub use engine::{PolicyConfig, PolicyEngine, PolicyError, PolicyStateSnapshot, RebaseOutcome};
