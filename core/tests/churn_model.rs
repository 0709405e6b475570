use depin_core::provider::{HardwareTier, Provider, ProviderCategory, ProviderStatus};
use depin_core::rng::SimRng;
use depin_core::{aggregate, simulate_run, SimParams};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Parameters that keep providers comfortably profitable until an
/// investor unlock cliff crashes the price.
fn crash_params(unlock_week: Option<u32>) -> SimParams {
    SimParams {
        seed: 42,
        horizon_weeks: 26,
        n_sims: 10,
        initial_providers: 100,
        investor_unlock_week: unlock_week,
        investor_sell_fraction: 0.15,
        initial_liquidity: 50_000.0,
        ..SimParams::default()
    }
}

fn provider(category: ProviderCategory, tier: HardwareTier) -> Provider {
    Provider {
        category,
        tier,
        status: ProviderStatus::Active,
        capacity: 180.0,
        weekly_cost: 26.0,
        joined_week: 0,
        consecutive_loss_weeks: 0,
        cumulative_profit: 0.0,
        coverage_share: 1.0,
        is_sybil: false,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Under an identical shock probability, the urban/pro stickiness
/// modulation makes those agents churn strictly less often than
/// rural/basic agents across 1000 trials.
#[test]
fn urban_and_pro_agents_panic_less_than_rural_basic() {
    let urban = provider(ProviderCategory::Urban, HardwareTier::Basic);
    let rural = provider(ProviderCategory::Rural, HardwareTier::Basic);
    let pro = provider(ProviderCategory::Rural, HardwareTier::Pro);
    let basic = provider(ProviderCategory::Rural, HardwareTier::Basic);

    // Deep-underwater panic base probability.
    let shock = 0.8;
    let mut rng = SimRng::new(1000);
    let mut urban_churns = 0u32;
    let mut rural_churns = 0u32;
    let mut pro_churns = 0u32;
    let mut basic_churns = 0u32;

    for _ in 0..1000 {
        // One shared draw per trial: an agent with the lower exit
        // probability can never churn when the higher one stays.
        let roll = rng.next_f64();
        if roll < shock * urban.stickiness() {
            urban_churns += 1;
        }
        if roll < shock * rural.stickiness() {
            rural_churns += 1;
        }
        if roll < shock * pro.stickiness() {
            pro_churns += 1;
        }
        if roll < shock * basic.stickiness() {
            basic_churns += 1;
        }
    }

    assert!(
        urban_churns < rural_churns,
        "urban churned {urban_churns} vs rural {rural_churns}"
    );
    assert!(
        pro_churns < basic_churns,
        "pro churned {pro_churns} vs basic {basic_churns}"
    );
}

/// The same ordering must hold inside the full engine: after an unlock
/// crash, the urban cohort survives at a higher rate than the rural one.
#[test]
fn crash_week_survival_favours_urban_cohort() {
    let mut params = crash_params(Some(20));
    params.initial_providers = 300;
    params.n_sims = 20;
    let series = aggregate(&params).unwrap();

    let before = &series[19];
    let after = &series[20];

    let urban_survival = after.urban_count.mean / before.urban_count.mean.max(1.0);
    let rural_survival = after.rural_count.mean / before.rural_count.mean.max(1.0);

    assert!(
        urban_survival > rural_survival,
        "urban survival {urban_survival:.3} should exceed rural {rural_survival:.3}"
    );
}

/// Churn in the week of an investor-unlock crash must dwarf the
/// steady-state churn of a matched control without the unlock.
#[test]
fn crash_churn_amplifies_over_steady_state() {
    let crash = aggregate(&crash_params(Some(20))).unwrap();
    let control = aggregate(&crash_params(None)).unwrap();

    let crash_churn = crash[20].churn_count.mean;
    let control_churn = control[20].churn_count.mean;

    assert!(
        crash_churn >= 5.0 * control_churn.max(1.0),
        "crash churn {crash_churn:.1} vs control {control_churn:.1}"
    );
}

/// Sunk-cost damping from an unreleased preorder backlog reduces panic
/// capitulation.
#[test]
fn sunk_cost_damping_softens_the_panic() {
    let undamped = aggregate(&crash_params(Some(20))).unwrap();

    let mut damped_params = crash_params(Some(20));
    damped_params.preorder_backlog_fraction = 0.9;
    damped_params.sunk_cost_churn_damping = 0.8;
    let damped = aggregate(&damped_params).unwrap();

    assert!(
        damped[20].churn_count.mean < undamped[20].churn_count.mean,
        "damped churn {:.1} should be below undamped {:.1}",
        damped[20].churn_count.mean,
        undamped[20].churn_count.mean
    );
}

/// A sybil batch inflates the provider count and dilutes per-provider
/// rewards without adding serving capacity or coverage.
#[test]
fn sybil_batch_dilutes_rewards_without_serving() {
    let baseline_params = SimParams {
        seed: 3,
        horizon_weeks: 20,
        n_sims: 1,
        investor_unlock_week: None,
        ..SimParams::default()
    };
    let mut sybil_params = baseline_params.clone();
    sybil_params.sybil_size = 0.5;

    let baseline = simulate_run(&baseline_params, 3);
    let attacked = simulate_run(&sybil_params, 3);

    // Injection lands at horizon / 4.
    let week = 5usize;
    assert!(attacked[week].providers > baseline[week].providers);
    assert!((attacked[week].capacity - baseline[week].capacity).abs() < 1e-9);
    assert!((attacked[week].coverage_score - baseline[week].coverage_score).abs() < 1e-9);
    assert!(
        attacked[week].profit < baseline[week].profit,
        "diluted mean profit {:.2} should drop below baseline {:.2}",
        attacked[week].profit,
        baseline[week].profit
    );
}

/// A competitor yield above the attention floor induces churn that the
/// engine reports separately from profitability churn.
#[test]
fn competitor_yield_induces_separate_churn() {
    let mut params = crash_params(None);
    params.competitor_yield = 1.0;
    params.horizon_weeks = 12;
    let series = aggregate(&params).unwrap();

    let total_competitor_churn: f64 = series.iter().map(|w| w.competitor_churn.mean).sum();
    assert!(
        total_competitor_churn > 0.0,
        "expected vampire churn under a 100% yield advantage"
    );

    let mut quiet = crash_params(None);
    quiet.competitor_yield = 0.0;
    quiet.horizon_weeks = 12;
    let quiet_series = aggregate(&quiet).unwrap();
    let quiet_churn: f64 = quiet_series.iter().map(|w| w.competitor_churn.mean).sum();
    assert_eq!(quiet_churn, 0.0);
}
