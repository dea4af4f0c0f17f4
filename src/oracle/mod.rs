//! Oracle Adapter
//!
//! Normalizes three independent external readings into validated fixed-point
//! values:
//!
//! - **reference index** - divisor for computing the target rate
//! - **exchange rate** - market price of the asset
//! - **auxiliary rate** - auxiliary-market delta rate around one unit
//!
//! Any single invalid reading fails the whole cycle, naming the failing
//! source. Pre-configuration (no source installed) also fails.
//!
//! # Clamping policy
//!
//! Clamping is not a failure. The exchange rate and the reference index are
//! capped at `MAX_RATE` and the auxiliary rate at `MAX_AUX_RATE`; these are
//! deliberate ceilings that keep downstream arithmetic within the
//! overflow-safe envelope, so any reading that passes validity never aborts
//! the cycle with an arithmetic error.

use crate::core::fixed::{MAX_AUX_RATE, MAX_RATE};
use std::fmt;
use thiserror::Error;

/// A single external price feed.
///
/// Readings are a raw 18-decimal fixed-point value plus a validity flag;
/// interpretation and clamping happen in [`OracleSet::read_all`].
pub trait RateSource {
    fn get_reading(&self) -> (u128, bool);
}

/// Names the three independent feeds, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleSource {
    RefIndex,
    ExchangeRate,
    AuxRate,
}

impl fmt::Display for OracleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OracleSource::RefIndex => "reference index",
            OracleSource::ExchangeRate => "exchange rate",
            OracleSource::AuxRate => "auxiliary rate",
        };
        write!(f, "{}", name)
    }
}

/// Errors from oracle reads
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("{0} oracle returned invalid data")]
    DataInvalid(OracleSource),

    #[error("{0} oracle is not configured")]
    NotConfigured(OracleSource),
}

/// One validated, clamped set of readings for a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleSample {
    /// Capped at `MAX_RATE`
    pub ref_index: u128,
    /// Capped at `MAX_RATE`
    pub exchange_rate: u128,
    /// Capped at `MAX_AUX_RATE`
    pub aux_rate: u128,
}

/// Holds the three feed handles. All start unconfigured; reads fail until
/// the owner installs sources via the policy engine's setters.
#[derive(Default)]
pub struct OracleSet {
    ref_index: Option<Box<dyn RateSource>>,
    exchange_rate: Option<Box<dyn RateSource>>,
    aux_rate: Option<Box<dyn RateSource>>,
}

impl OracleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ref_index_source(&mut self, source: Box<dyn RateSource>) {
        self.ref_index = Some(source);
    }

    pub fn set_exchange_rate_source(&mut self, source: Box<dyn RateSource>) {
        self.exchange_rate = Some(source);
    }

    pub fn set_aux_rate_source(&mut self, source: Box<dyn RateSource>) {
        self.aux_rate = Some(source);
    }

    fn read(&self, which: OracleSource) -> Result<u128, OracleError> {
        let source = match which {
            OracleSource::RefIndex => self.ref_index.as_deref(),
            OracleSource::ExchangeRate => self.exchange_rate.as_deref(),
            OracleSource::AuxRate => self.aux_rate.as_deref(),
        }
        .ok_or(OracleError::NotConfigured(which))?;

        let (value, valid) = source.get_reading();
        if !valid {
            return Err(OracleError::DataInvalid(which));
        }
        Ok(value)
    }

    /// Read all three feeds, failing on the first invalid or missing one
    pub fn read_all(&self) -> Result<OracleSample, OracleError> {
        let ref_index = self.read(OracleSource::RefIndex)?.min(MAX_RATE);
        let exchange_rate = self.read(OracleSource::ExchangeRate)?.min(MAX_RATE);
        let aux_rate = self.read(OracleSource::AuxRate)?.min(MAX_AUX_RATE);
        Ok(OracleSample {
            ref_index,
            exchange_rate,
            aux_rate,
        })
    }
}

/// Fixed-value rate source.
///
/// NOTE: Available in all builds to support integration testing and
/// embedding bring-up, but real deployments should install live feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticRateSource {
    value: u128,
    valid: bool,
}

impl StaticRateSource {
    /// A source that always reports `value` as valid
    pub fn valid(value: u128) -> Self {
        Self { value, valid: true }
    }

    /// A source whose readings are always flagged invalid
    pub fn invalid() -> Self {
        Self {
            value: 0,
            valid: false,
        }
    }
}

impl RateSource for StaticRateSource {
    fn get_reading(&self) -> (u128, bool) {
        (self.value, self.valid)
    }
}
