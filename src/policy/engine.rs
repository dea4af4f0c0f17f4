//! Rebase policy engine
//!
//! # Gating
//!
//! Two predicates are evaluated before any computation:
//!
//! 1. **Window**: `now mod min_rebase_interval` must fall inside
//!    `[rebase_window_offset, rebase_window_offset + rebase_window_length)`.
//! 2. **Cooldown**: `last_rebase_timestamp + min_rebase_interval < now`.
//!    This also guarantees at most one successful rebase per cycle - the
//!    timestamp update happens atomically with the decision, so no separate
//!    reentrancy lock exists.
//!
//! # Supply-delta model
//!
//! ```text
//! target_rate    = ref_index * ONE / base_reference_index
//! aux_deviation  = aux_rate - ONE                               (signed)
//! primary_factor = (ONE - aux_weight) * (exchange_rate - target_rate) / target_rate
//! aux_factor     = aux_weight * aux_deviation / ONE
//! combined_rate  = primary_factor + aux_factor
//! ```
//!
//! The target rate is capped at `MAX_RATE` like the oracle readings, so
//! every deviation is bounded by the envelope constants.
//!
//! Dead-zone: `|combined_rate| < deviation_threshold` requests a delta of
//! exactly zero for the cycle; epoch and timestamp still advance, recording
//! that the cycle ran. Otherwise the raw delta is dampened by the lag factor
//! (truncating division) and, on the positive side only, clamped so supply
//! never exceeds `MAX_SUPPLY`. The negative side has no symmetric floor
//! clamp beyond arithmetic safety; that asymmetry is part of the contract.
//!
//! The supply products divide last: `supply * deviation` stays under
//! `MAX_SUPPLY * MAX_RATE`, which the const assertion in `core::fixed`
//! proves fits a signed value, even when the target rate is tiny and the
//! combined rate itself is enormous.
//!
//! # Critical Invariants
//!
//! 1. Epoch strictly increases by 1 on each successful rebase
//! 2. A failed rebase leaves epoch, timestamp, and ledger untouched - all
//!    fallible work completes before any state mutation
//! 3. `total_supply` after a positive delta never exceeds `MAX_SUPPLY`

use crate::auth::{AccountId, AuthError, CallerContext, OwnerGuard};
use crate::core::fixed::{self, FixedPointError, MAX_RATE, MAX_SUPPLY, ONE, ONE_SIGNED};
use crate::ledger::{LedgerError, SupplyLedger};
use crate::models::event::{Event, EventLog};
use crate::oracle::{OracleError, OracleSample, OracleSet, RateSource};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from policy operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyError {
    /// Expected gating failure; retry inside the next window
    #[error("outside the rebase window")]
    OutsideRebaseWindow,

    /// Expected gating failure; the cooldown has not elapsed
    #[error("rebase too soon: cooldown has not elapsed")]
    RebaseTooSoon,

    #[error("invalid policy config: {0}")]
    InvalidConfig(String),

    /// The ledger broke its own contract
    #[error("new total supply {new_total_supply} exceeds ceiling {ceiling}")]
    SupplyCeilingViolated { new_total_supply: u128, ceiling: u128 },

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Arithmetic(#[from] FixedPointError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Owner-settable policy parameters
///
/// # Fields
///
/// * `deviation_threshold` - dead-zone half-width as an 18-decimal rate
/// * `rebase_lag` - dampening divisor applied to the raw delta, must be > 0
/// * `min_rebase_interval` - seconds between cycles, also the window modulus
/// * `rebase_window_offset` - seconds into the interval where the window
///   opens, must be < `min_rebase_interval`
/// * `rebase_window_length` - window duration in seconds
/// * `aux_weight` - weight in `[0, ONE]` given to the auxiliary-market
///   factor versus the primary exchange-rate factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub deviation_threshold: u128,
    pub rebase_lag: u128,
    pub min_rebase_interval: u64,
    pub rebase_window_offset: u64,
    pub rebase_window_length: u64,
    pub aux_weight: u128,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            deviation_threshold: ONE / 20, // 5%
            rebase_lag: 30,
            min_rebase_interval: 86_400,  // daily
            rebase_window_offset: 72_000, // 20:00 UTC
            rebase_window_length: 900,    // 15 minutes
            aux_weight: 0,                // primary factor only until configured
        }
    }
}

impl PolicyConfig {
    /// Check the configuration bounds
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.min_rebase_interval == 0 {
            return Err(PolicyError::InvalidConfig(
                "min_rebase_interval must be positive".to_string(),
            ));
        }
        if self.rebase_lag == 0 {
            return Err(PolicyError::InvalidConfig(
                "rebase_lag must be positive".to_string(),
            ));
        }
        if self.aux_weight > ONE {
            return Err(PolicyError::InvalidConfig(
                "aux_weight must not exceed one unit".to_string(),
            ));
        }
        if self.rebase_window_offset >= self.min_rebase_interval {
            return Err(PolicyError::InvalidConfig(
                "rebase_window_offset must be less than min_rebase_interval".to_string(),
            ));
        }
        Ok(())
    }
}

/// The mutable cycle state, captured for checkpointing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStateSnapshot {
    pub epoch: u64,
    pub last_rebase_timestamp: u64,
}

/// What a successful rebase did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebaseOutcome {
    pub epoch: u64,
    pub delta: i128,
    pub new_total_supply: u128,
}

/// The policy engine singleton
///
/// Owns the cycle counter, the cooldown timestamp, the immutable base
/// reference index captured at construction, and the oracle handles.
pub struct PolicyEngine {
    guard: OwnerGuard,
    orchestrator: Option<AccountId>,
    config: PolicyConfig,
    oracles: OracleSet,
    base_reference_index: u128,
    epoch: u64,
    last_rebase_timestamp: u64,
}

impl PolicyEngine {
    /// Create an engine with a validated config and the reference index
    /// captured at initialization. Oracle sources and the orchestrator
    /// identity are installed afterwards by the owner; rebase fails until
    /// they are.
    pub fn new(
        owner: impl Into<AccountId>,
        config: PolicyConfig,
        base_reference_index: u128,
    ) -> Result<Self, PolicyError> {
        config.validate()?;
        if base_reference_index == 0 {
            return Err(PolicyError::InvalidConfig(
                "base_reference_index must be positive".to_string(),
            ));
        }
        Ok(Self {
            guard: OwnerGuard::new(owner),
            orchestrator: None,
            config,
            oracles: OracleSet::new(),
            base_reference_index,
            epoch: 0,
            last_rebase_timestamp: 0,
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn last_rebase_timestamp(&self) -> u64 {
        self.last_rebase_timestamp
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn base_reference_index(&self) -> u128 {
        self.base_reference_index
    }

    /// Whether `now` falls inside the rebase window. Pure function of `now`
    /// and configuration; upper bound is exclusive.
    pub fn in_window(&self, now: u64) -> bool {
        let position = now % self.config.min_rebase_interval;
        position >= self.config.rebase_window_offset
            && position
                < self
                    .config
                    .rebase_window_offset
                    .saturating_add(self.config.rebase_window_length)
    }

    // ------------------------------------------------------------------
    // Owner-only configuration
    // ------------------------------------------------------------------

    pub fn set_orchestrator(
        &mut self,
        ctx: &CallerContext,
        orchestrator: impl Into<AccountId>,
    ) -> Result<(), PolicyError> {
        self.guard.require_owner(ctx)?;
        self.orchestrator = Some(orchestrator.into());
        Ok(())
    }

    pub fn set_deviation_threshold(
        &mut self,
        ctx: &CallerContext,
        deviation_threshold: u128,
    ) -> Result<(), PolicyError> {
        self.guard.require_owner(ctx)?;
        self.config.deviation_threshold = deviation_threshold;
        Ok(())
    }

    pub fn set_rebase_lag(&mut self, ctx: &CallerContext, rebase_lag: u128) -> Result<(), PolicyError> {
        self.guard.require_owner(ctx)?;
        if rebase_lag == 0 {
            return Err(PolicyError::InvalidConfig(
                "rebase_lag must be positive".to_string(),
            ));
        }
        self.config.rebase_lag = rebase_lag;
        Ok(())
    }

    pub fn set_aux_weight(&mut self, ctx: &CallerContext, aux_weight: u128) -> Result<(), PolicyError> {
        self.guard.require_owner(ctx)?;
        if aux_weight > ONE {
            return Err(PolicyError::InvalidConfig(
                "aux_weight must not exceed one unit".to_string(),
            ));
        }
        self.config.aux_weight = aux_weight;
        Ok(())
    }

    /// Replace all three window-timing parameters together, so their mutual
    /// bounds can be validated as a unit.
    pub fn set_rebase_timing(
        &mut self,
        ctx: &CallerContext,
        min_rebase_interval: u64,
        rebase_window_offset: u64,
        rebase_window_length: u64,
    ) -> Result<(), PolicyError> {
        self.guard.require_owner(ctx)?;
        let candidate = PolicyConfig {
            min_rebase_interval,
            rebase_window_offset,
            rebase_window_length,
            ..self.config.clone()
        };
        candidate.validate()?;
        self.config = candidate;
        Ok(())
    }

    pub fn set_ref_index_source(
        &mut self,
        ctx: &CallerContext,
        source: Box<dyn RateSource>,
    ) -> Result<(), PolicyError> {
        self.guard.require_owner(ctx)?;
        self.oracles.set_ref_index_source(source);
        Ok(())
    }

    pub fn set_exchange_rate_source(
        &mut self,
        ctx: &CallerContext,
        source: Box<dyn RateSource>,
    ) -> Result<(), PolicyError> {
        self.guard.require_owner(ctx)?;
        self.oracles.set_exchange_rate_source(source);
        Ok(())
    }

    pub fn set_aux_rate_source(
        &mut self,
        ctx: &CallerContext,
        source: Box<dyn RateSource>,
    ) -> Result<(), PolicyError> {
        self.guard.require_owner(ctx)?;
        self.oracles.set_aux_rate_source(source);
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &CallerContext,
        new_owner: impl Into<AccountId>,
    ) -> Result<(), PolicyError> {
        self.guard.transfer_ownership(ctx, new_owner)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Checkpointing
    // ------------------------------------------------------------------

    /// Capture the mutable cycle state
    pub fn state_snapshot(&self) -> PolicyStateSnapshot {
        PolicyStateSnapshot {
            epoch: self.epoch,
            last_rebase_timestamp: self.last_rebase_timestamp,
        }
    }

    /// Restore state captured by [`PolicyEngine::state_snapshot`]. Used by
    /// cycle rollback.
    pub fn restore_state(&mut self, snapshot: &PolicyStateSnapshot) {
        self.epoch = snapshot.epoch;
        self.last_rebase_timestamp = snapshot.last_rebase_timestamp;
    }

    // ------------------------------------------------------------------
    // Rebase
    // ------------------------------------------------------------------

    /// Run one rebase cycle against the ledger.
    ///
    /// Callable only by the configured orchestrator identity. On success the
    /// epoch increments by one, the cooldown timestamp snaps to the start of
    /// the current window, and a `Rebase` event is logged (a dead-zone cycle
    /// logs a zero delta). On any failure nothing is mutated.
    pub fn rebase(
        &mut self,
        ctx: &CallerContext,
        now: u64,
        ledger: &mut dyn SupplyLedger,
        events: &mut EventLog,
    ) -> Result<RebaseOutcome, PolicyError> {
        match &self.orchestrator {
            Some(orchestrator) if orchestrator.as_str() == ctx.caller() => {}
            _ => {
                return Err(AuthError::CallerNotOrchestrator {
                    caller: ctx.caller().to_string(),
                }
                .into())
            }
        }

        if !self.in_window(now) {
            return Err(PolicyError::OutsideRebaseWindow);
        }
        // Cooldown doubles as the reentrancy guard: a second attempt inside
        // the same interval fails here instead of needing a lock.
        if self
            .last_rebase_timestamp
            .saturating_add(self.config.min_rebase_interval)
            >= now
        {
            return Err(PolicyError::RebaseTooSoon);
        }

        let sample = self.oracles.read_all()?;
        let total_supply = ledger.total_supply();
        let delta = self.compute_supply_delta(&sample, total_supply)?;

        let next_epoch = self.epoch + 1;
        let new_total_supply = ledger.rebase(next_epoch, delta)?;
        if new_total_supply > MAX_SUPPLY {
            return Err(PolicyError::SupplyCeilingViolated {
                new_total_supply,
                ceiling: MAX_SUPPLY,
            });
        }

        // Every fallible step is done; mutate state and record the cycle.
        self.epoch = next_epoch;
        self.last_rebase_timestamp =
            now - (now % self.config.min_rebase_interval) + self.config.rebase_window_offset;
        events.log(Event::Rebase {
            epoch: next_epoch,
            exchange_rate: sample.exchange_rate,
            ref_index: sample.ref_index,
            aux_rate: sample.aux_rate,
            delta,
            timestamp: now,
        });

        Ok(RebaseOutcome {
            epoch: next_epoch,
            delta,
            new_total_supply,
        })
    }

    /// Compute the dampened, clamped supply delta for one cycle. Pure with
    /// respect to engine state.
    fn compute_supply_delta(
        &self,
        sample: &OracleSample,
        total_supply: u128,
    ) -> Result<i128, PolicyError> {
        // The target rate lives under the same ceiling as the readings, so
        // every deviation below is bounded by MAX_RATE.
        let target_rate =
            fixed::mul_div(sample.ref_index, ONE, self.base_reference_index)?.min(MAX_RATE);
        let target = fixed::to_signed(target_rate)?;
        let exchange = fixed::to_signed(sample.exchange_rate)?;
        let aux = fixed::to_signed(sample.aux_rate)?;
        let aux_weight = fixed::to_signed(self.config.aux_weight)?;
        let primary_weight = fixed::signed_sub(ONE_SIGNED, aux_weight)?;

        let deviation = fixed::signed_sub(exchange, target)?;
        let aux_deviation = fixed::signed_sub(aux, ONE_SIGNED)?;

        // Each intermediate product here is at most MAX_RATE * ONE.
        let weighted_deviation = fixed::signed_mul_div(primary_weight, deviation, ONE_SIGNED)?;
        let primary_factor = fixed::signed_mul_div(weighted_deviation, ONE_SIGNED, target)?;
        let aux_factor = fixed::signed_mul_div(aux_weight, aux_deviation, ONE_SIGNED)?;
        let combined_rate = fixed::signed_add(primary_factor, aux_factor)?;

        if combined_rate.unsigned_abs() < self.config.deviation_threshold {
            return Ok(0);
        }

        // Division comes last so the products stay under
        // MAX_SUPPLY * MAX_RATE even when the target rate is tiny.
        let supply = fixed::to_signed(total_supply)?;
        let primary_supply = fixed::signed_mul_div(supply, primary_weight, ONE_SIGNED)?;
        let primary_delta = fixed::signed_mul_div(primary_supply, deviation, target)?;
        let aux_supply = fixed::signed_mul_div(supply, aux_weight, ONE_SIGNED)?;
        let aux_delta = fixed::signed_mul_div(aux_supply, aux_deviation, ONE_SIGNED)?;
        let raw_delta = fixed::signed_add(primary_delta, aux_delta)?;

        let lag = fixed::to_signed(self.config.rebase_lag)?;
        // Truncates toward zero; lag is validated positive.
        let delta = raw_delta / lag;

        if delta > 0 {
            let projected = fixed::add(total_supply, delta.unsigned_abs())?;
            if projected > MAX_SUPPLY {
                let headroom = fixed::sub(MAX_SUPPLY, total_supply)?;
                return Ok(fixed::to_signed(headroom)?);
            }
        }
        // Deliberately no symmetric floor clamp on the negative side.
        Ok(delta)
    }
}
