//! Property tests for the supply clamp and cycle atomicity

use proptest::prelude::*;
use supply_policy_core::{
    CallerContext, EventLog, MemoryLedger, PolicyConfig, PolicyEngine, StaticRateSource,
    SupplyLedger, MAX_RATE, MAX_SUPPLY, ONE,
};

const NOW: u64 = 86_400 + 72_000;

fn engine_with(ref_index: u128, exchange_rate: u128, rebase_lag: u128) -> PolicyEngine {
    let owner = CallerContext::external("ops");
    let config = PolicyConfig {
        rebase_lag,
        deviation_threshold: 0,
        ..PolicyConfig::default()
    };
    let mut engine = PolicyEngine::new("ops", config, ONE).unwrap();
    engine.set_orchestrator(&owner, "orchestrator").unwrap();
    engine
        .set_ref_index_source(&owner, Box::new(StaticRateSource::valid(ref_index)))
        .unwrap();
    engine
        .set_exchange_rate_source(&owner, Box::new(StaticRateSource::valid(exchange_rate)))
        .unwrap();
    engine
        .set_aux_rate_source(&owner, Box::new(StaticRateSource::valid(ONE)))
        .unwrap();
    engine
}

proptest! {
    /// For any supply and any valid readings, including ones past the
    /// clamps, a rebase succeeds and never pushes supply over the ceiling.
    #[test]
    fn prop_supply_never_exceeds_ceiling(
        supply in 1u128..=MAX_SUPPLY,
        ref_index in 1u128..=10 * MAX_RATE,
        exchange_rate in 0u128..=10 * MAX_RATE,
        rebase_lag in 1u128..=50,
    ) {
        let mut engine = engine_with(ref_index, exchange_rate, rebase_lag);
        let mut ledger = MemoryLedger::new(supply);
        let mut events = EventLog::new();
        let ctx = CallerContext::internal("orchestrator");

        let outcome = engine.rebase(&ctx, NOW, &mut ledger, &mut events).unwrap();
        prop_assert!(ledger.total_supply() <= MAX_SUPPLY);
        prop_assert_eq!(ledger.total_supply(), outcome.new_total_supply);
        prop_assert_eq!(engine.epoch(), 1);
    }

    /// The delta direction always matches the deviation sign, over the
    /// whole clamped exchange-rate range.
    #[test]
    fn prop_delta_sign_follows_deviation(
        supply in 1_000u128..=MAX_SUPPLY,
        exchange_rate in 0u128..=MAX_RATE,
    ) {
        let mut engine = engine_with(ONE, exchange_rate, 1);
        let mut ledger = MemoryLedger::new(supply);
        let mut events = EventLog::new();
        let ctx = CallerContext::internal("orchestrator");

        let outcome = engine.rebase(&ctx, NOW, &mut ledger, &mut events).unwrap();
        if exchange_rate > ONE {
            prop_assert!(outcome.delta >= 0);
        } else if exchange_rate < ONE {
            prop_assert!(outcome.delta <= 0);
        } else {
            prop_assert_eq!(outcome.delta, 0);
        }
    }
}
