//! Supply Ledger seam
//!
//! The ledger that actually redistributes balances on a supply change is an
//! external collaborator. The engine consumes it through [`SupplyLedger`]:
//! `total_supply` and `rebase(epoch, delta) -> new_total_supply`, plus a
//! checkpoint/restore pair that stands in for the host platform's
//! atomic-unit-of-work primitive - the orchestrator uses it to roll an
//! already-applied rebase back when a later step of the same cycle fails
//! fatally.
//!
//! [`MemoryLedger`] is the in-memory reference implementation used by tests
//! and embedders.

use crate::core::fixed::MAX_SUPPLY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from ledger operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("supply underflow: delta {delta} exceeds total supply {total_supply}")]
    SupplyUnderflow { total_supply: u128, delta: i128 },

    #[error("supply overflow: delta {delta} pushes total supply {total_supply} past the ceiling")]
    SupplyOverflow { total_supply: u128, delta: i128 },

    #[error("checkpoint encode failed: {0}")]
    CheckpointEncode(String),

    #[error("checkpoint decode failed: {0}")]
    CheckpointDecode(String),
}

/// The two operations the policy engine needs from the ledger, plus the
/// rollback seam the orchestrator needs.
pub trait SupplyLedger {
    /// Current total unit count
    fn total_supply(&self) -> u128;

    /// Apply a signed supply delta for the given epoch and return the new
    /// total supply. The ledger promises the result never exceeds
    /// `MAX_SUPPLY`; the policy engine re-checks defensively.
    fn rebase(&mut self, epoch: u64, delta: i128) -> Result<u128, LedgerError>;

    /// Serialize enough state to restore this ledger later
    fn checkpoint(&self) -> Result<Vec<u8>, LedgerError>;

    /// Restore state captured by [`SupplyLedger::checkpoint`]
    fn restore(&mut self, checkpoint: &[u8]) -> Result<(), LedgerError>;
}

/// In-memory reference ledger
///
/// # Example
///
/// ```
/// use supply_policy_core::ledger::{MemoryLedger, SupplyLedger};
///
/// let mut ledger = MemoryLedger::new(1_000_000);
/// let new_supply = ledger.rebase(1, -250_000).unwrap();
/// assert_eq!(new_supply, 750_000);
/// assert_eq!(ledger.total_supply(), 750_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLedger {
    total_supply: u128,
    last_epoch: u64,
}

impl MemoryLedger {
    /// Create a ledger with an initial supply
    ///
    /// # Panics
    /// Panics if the initial supply exceeds `MAX_SUPPLY`.
    pub fn new(initial_supply: u128) -> Self {
        assert!(
            initial_supply <= MAX_SUPPLY,
            "initial supply exceeds ceiling"
        );
        Self {
            total_supply: initial_supply,
            last_epoch: 0,
        }
    }

    /// Epoch of the most recent rebase applied to this ledger
    pub fn last_epoch(&self) -> u64 {
        self.last_epoch
    }
}

impl SupplyLedger for MemoryLedger {
    fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn rebase(&mut self, epoch: u64, delta: i128) -> Result<u128, LedgerError> {
        let new_supply = if delta >= 0 {
            self.total_supply
                .checked_add(delta.unsigned_abs())
                .filter(|s| *s <= MAX_SUPPLY)
                .ok_or(LedgerError::SupplyOverflow {
                    total_supply: self.total_supply,
                    delta,
                })?
        } else {
            self.total_supply
                .checked_sub(delta.unsigned_abs())
                .ok_or(LedgerError::SupplyUnderflow {
                    total_supply: self.total_supply,
                    delta,
                })?
        };

        self.total_supply = new_supply;
        self.last_epoch = epoch;
        Ok(new_supply)
    }

    fn checkpoint(&self) -> Result<Vec<u8>, LedgerError> {
        serde_json::to_vec(self).map_err(|e| LedgerError::CheckpointEncode(e.to_string()))
    }

    fn restore(&mut self, checkpoint: &[u8]) -> Result<(), LedgerError> {
        let decoded: MemoryLedger = serde_json::from_slice(checkpoint)
            .map_err(|e| LedgerError::CheckpointDecode(e.to_string()))?;
        *self = decoded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebase_applies_positive_and_negative_deltas() {
        let mut ledger = MemoryLedger::new(1_000);
        assert_eq!(ledger.rebase(1, 500).unwrap(), 1_500);
        assert_eq!(ledger.rebase(2, -1_500).unwrap(), 0);
        assert_eq!(ledger.last_epoch(), 2);
    }

    #[test]
    fn test_rebase_rejects_underflow() {
        let mut ledger = MemoryLedger::new(100);
        assert_eq!(
            ledger.rebase(1, -101),
            Err(LedgerError::SupplyUnderflow {
                total_supply: 100,
                delta: -101
            })
        );
        // No partial mutation on failure
        assert_eq!(ledger.total_supply(), 100);
        assert_eq!(ledger.last_epoch(), 0);
    }

    #[test]
    fn test_rebase_rejects_ceiling_breach() {
        let mut ledger = MemoryLedger::new(MAX_SUPPLY);
        assert!(matches!(
            ledger.rebase(1, 1),
            Err(LedgerError::SupplyOverflow { .. })
        ));
    }

    #[test]
    fn test_checkpoint_restore_round_trip() {
        let mut ledger = MemoryLedger::new(1_000);
        ledger.rebase(1, 250).unwrap();
        let checkpoint = ledger.checkpoint().unwrap();

        ledger.rebase(2, -500).unwrap();
        assert_eq!(ledger.total_supply(), 750);

        ledger.restore(&checkpoint).unwrap();
        assert_eq!(ledger.total_supply(), 1_250);
        assert_eq!(ledger.last_epoch(), 1);
    }
}
