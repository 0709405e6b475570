use depin_core::{aggregate, SimError, SimParams};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn expect_invalid(params: &SimParams, expected_name: &str) {
    match params.validate() {
        Err(SimError::InvalidParameter { name, .. }) => {
            assert_eq!(name, expected_name);
        }
        other => panic!("expected InvalidParameter({expected_name}), got {other:?}"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Defaults must validate: they are the documented baseline scenario.
#[test]
fn default_params_are_valid() {
    SimParams::default().validate().unwrap();
}

#[test]
fn zero_horizon_is_rejected() {
    let params = SimParams { horizon_weeks: 0, ..SimParams::default() };
    expect_invalid(&params, "horizon_weeks");
}

#[test]
fn zero_run_count_is_rejected() {
    let params = SimParams { n_sims: 0, ..SimParams::default() };
    expect_invalid(&params, "n_sims");
}

#[test]
fn negative_volatility_is_rejected() {
    let params = SimParams { demand_volatility: -0.1, ..SimParams::default() };
    expect_invalid(&params, "demand_volatility");
}

#[test]
fn non_finite_fraction_is_rejected() {
    let params = SimParams { burn_fraction: f64::NAN, ..SimParams::default() };
    expect_invalid(&params, "burn_fraction");
}

#[test]
fn out_of_range_fraction_is_rejected() {
    let params = SimParams { burn_fraction: 1.5, ..SimParams::default() };
    expect_invalid(&params, "burn_fraction");
}

#[test]
fn inverted_service_price_bounds_are_rejected() {
    let params = SimParams {
        min_service_price: 2.0,
        max_service_price: 1.0,
        ..SimParams::default()
    };
    expect_invalid(&params, "min_service_price");
}

#[test]
fn non_positive_supply_is_rejected() {
    let params = SimParams { initial_supply: 0.0, ..SimParams::default() };
    expect_invalid(&params, "initial_supply");
}

/// Invalid parameters fail before any simulation work: the aggregator
/// surfaces the same error.
#[test]
fn aggregate_fails_fast_on_invalid_params() {
    let params = SimParams { horizon_weeks: 0, ..SimParams::default() };
    let err = aggregate(&params).unwrap_err();
    assert!(matches!(err, SimError::InvalidParameter { name: "horizon_weeks", .. }));
}
