//! Batch Orchestrator - cycle sequencing and downstream notification
//!
//! The orchestrator owns the ordered transaction list and the cycle entry
//! point: it calls the policy engine's rebase (fatal if it fails), then
//! iterates the enabled records in index order, classifying each downstream
//! failure as tolerated or fatal. A fatal outcome rolls the whole cycle
//! back, including an already-applied rebase.
//!
//! See `engine.rs` for the full implementation, `dispatch.rs` for the
//! external-call seam, and `checkpoint.rs` for the rollback primitive.

pub mod checkpoint;
pub mod dispatch;
pub mod engine;

// Re-export main types for convenience
pub use checkpoint::CycleCheckpoint;
pub use dispatch::{CallDispatcher, CallOutcome, DispatchRecord, ScriptedDispatcher};
pub use engine::{CycleResult, Orchestrator, OrchestratorError};
