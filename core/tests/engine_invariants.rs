use depin_core::{simulate_run, DemandRegime, SimParams};

// ── Helpers ──────────────────────────────────────────────────────────────────

const SUPPLY_FLOOR: f64 = 1000.0;

fn run_with(seed: u32, regime: DemandRegime) -> (SimParams, Vec<depin_core::WeekState>) {
    let params = SimParams {
        seed,
        horizon_weeks: 52,
        demand_regime: regime,
        ..SimParams::default()
    };
    let series = simulate_run(&params, seed);
    (params, series)
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Supply conservation: every week's supply equals the floored balance
/// of the previous supply plus mint minus burn, exactly.
#[test]
fn supply_conservation_holds_every_week() {
    for seed in [1, 42, 777] {
        let (params, series) = run_with(seed, DemandRegime::Growth);

        let mut previous = params.initial_supply;
        for state in &series {
            let expected = (previous + state.minted - state.burned).max(SUPPLY_FLOOR);
            let error = (state.supply - expected).abs() / expected.max(1.0);
            assert!(
                error < 1e-9,
                "week {}: supply {} != expected {}",
                state.week,
                state.supply,
                expected
            );
            previous = state.supply;
        }
    }
}

/// Served demand never exceeds demand or capacity; utilization stays a
/// percentage.
#[test]
fn service_is_bounded_by_demand_and_capacity() {
    for regime in [
        DemandRegime::Consistent,
        DemandRegime::Growth,
        DemandRegime::Volatile,
        DemandRegime::HighToDecay,
    ] {
        let (_, series) = run_with(42, regime);
        for state in &series {
            assert!(state.demand_served <= state.demand + 1e-9);
            assert!(state.demand_served <= state.capacity + 1e-9);
            assert!((0.0..=100.0).contains(&state.utilization_pct));
        }
    }
}

/// Token flows and populations stay non-negative; every recorded value
/// stays finite under all four demand regimes.
#[test]
fn outputs_are_finite_and_non_negative() {
    for regime in [
        DemandRegime::Consistent,
        DemandRegime::Growth,
        DemandRegime::Volatile,
        DemandRegime::HighToDecay,
    ] {
        let (_, series) = run_with(9, regime);
        for state in &series {
            assert!(state.minted >= 0.0 && state.minted.is_finite());
            assert!(state.burned >= 0.0 && state.burned.is_finite());
            assert!(state.demand >= 0.0);
            assert!(state.capacity >= 0.0);
            assert!(state.supply >= SUPPLY_FLOOR);
            assert!(state.price > 0.0 && state.price.is_finite());
            assert!(state.service_price.is_finite());
            assert!(state.profit.is_finite());
            assert!(state.solvency_score.is_finite());
            assert!(state.treasury_balance >= 0.0);
            assert!(state.coverage_score >= 0.0);
        }
    }
}

/// The weekly mint never exceeds the configured emission cap.
#[test]
fn mint_respects_the_emission_cap() {
    let (params, series) = run_with(5, DemandRegime::Volatile);
    for state in &series {
        assert!(state.minted <= params.max_mint_weekly + 1e-9);
    }
}

/// Service price stays inside its configured bounds.
#[test]
fn service_price_stays_in_bounds() {
    let (params, series) = run_with(11, DemandRegime::HighToDecay);
    for state in &series {
        assert!(state.service_price >= params.min_service_price - 1e-12);
        assert!(state.service_price <= params.max_service_price + 1e-12);
    }
}

/// Urban + rural always equals the active population.
#[test]
fn category_counts_partition_the_active_pool() {
    let (_, series) = run_with(21, DemandRegime::Growth);
    for state in &series {
        assert_eq!(state.urban_count + state.rural_count, state.providers);
        assert!(state.pro_count <= state.providers);
        assert!(state.underwater_count <= state.providers);
    }
}
