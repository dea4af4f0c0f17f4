//! Domain types
//!
//! - `transaction`: downstream notification records and failure
//!   classification
//! - `event`: structured event log for rebase and tolerated-failure records

pub mod event;
pub mod transaction;

pub use event::{Event, EventLog};
pub use transaction::{classify_failure, encode_reason, FailureCode, TransactionRecord};
