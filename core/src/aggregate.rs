//! Monte Carlo aggregation across independent runs.
//!
//! RULES:
//!   - Run i always simulates with seed `base_seed + i`; the mapping
//!     from run index to output never depends on completion order.
//!   - Runs share nothing but the read-only parameter set.
//!   - This is the single entry point the optimizer, the calibrator,
//!     and external collaborators all evaluate.

use crate::engine::{simulate_run, WeekState};
use crate::error::SimResult;
use crate::params::SimParams;
use crate::stats::{summarize, MetricSummary};
use crate::types::Week;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Distributional summary of every recorded metric for one week,
/// computed across the N runs. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateWeek {
    pub week:            Week,
    pub price:           MetricSummary,
    pub supply:          MetricSummary,
    pub demand:          MetricSummary,
    pub demand_served:   MetricSummary,
    pub providers:       MetricSummary,
    pub capacity:        MetricSummary,
    pub service_price:   MetricSummary,
    pub minted:          MetricSummary,
    pub burned:          MetricSummary,
    pub utilization_pct: MetricSummary,
    pub profit:          MetricSummary,
    pub scarcity:        MetricSummary,
    pub incentive:       MetricSummary,
    pub buy_pressure:    MetricSummary,
    pub sell_pressure:   MetricSummary,
    pub net_flow:        MetricSummary,
    pub churn_count:     MetricSummary,
    pub join_count:      MetricSummary,

    pub solvency_score: MetricSummary,
    pub net_daily_loss: MetricSummary,
    pub daily_mint_usd: MetricSummary,
    pub daily_burn_usd: MetricSummary,

    pub urban_count:    MetricSummary,
    pub rural_count:    MetricSummary,
    pub pro_count:      MetricSummary,
    pub coverage_score: MetricSummary,

    pub treasury_balance: MetricSummary,
    pub competitor_churn: MetricSummary,

    pub underwater_count:     MetricSummary,
    pub cost_per_capacity:    MetricSummary,
    pub revenue_per_capacity: MetricSummary,
    /// Fraction of runs where joins were suppressed this week.
    pub entry_barrier:        MetricSummary,
}

/// Run the simulator `n_sims` times and reduce each week's per-run
/// values into distributional summaries.
pub fn aggregate(params: &SimParams) -> SimResult<Vec<AggregateWeek>> {
    params.validate()?;

    log::debug!(
        "aggregate: {} runs x {} weeks (seed {})",
        params.n_sims,
        params.horizon_weeks,
        params.seed
    );

    // Embarrassingly parallel; the indexed collect keeps run order
    // deterministic regardless of scheduling.
    let runs: Vec<Vec<WeekState>> = (0..params.n_sims)
        .into_par_iter()
        .map(|i| simulate_run(params, params.seed.wrapping_add(i)))
        .collect();

    let mut aggregated = Vec::with_capacity(params.horizon_weeks as usize);
    for week in 0..params.horizon_weeks {
        let states: Vec<&WeekState> = runs.iter().map(|run| &run[week as usize]).collect();
        aggregated.push(reduce_week(week, &states));
    }

    Ok(aggregated)
}

fn reduce_week(week: Week, states: &[&WeekState]) -> AggregateWeek {
    fn field(states: &[&WeekState], f: impl Fn(&WeekState) -> f64) -> MetricSummary {
        let values: Vec<f64> = states.iter().map(|s| f(*s)).collect();
        summarize(&values)
    }

    AggregateWeek {
        week,
        price: field(states, |s| s.price),
        supply: field(states, |s| s.supply),
        demand: field(states, |s| s.demand),
        demand_served: field(states, |s| s.demand_served),
        providers: field(states, |s| s.providers as f64),
        capacity: field(states, |s| s.capacity),
        service_price: field(states, |s| s.service_price),
        minted: field(states, |s| s.minted),
        burned: field(states, |s| s.burned),
        utilization_pct: field(states, |s| s.utilization_pct),
        profit: field(states, |s| s.profit),
        scarcity: field(states, |s| s.scarcity),
        incentive: field(states, |s| s.incentive),
        buy_pressure: field(states, |s| s.buy_pressure),
        sell_pressure: field(states, |s| s.sell_pressure),
        net_flow: field(states, |s| s.net_flow),
        churn_count: field(states, |s| s.churn_count as f64),
        join_count: field(states, |s| s.join_count as f64),
        solvency_score: field(states, |s| s.solvency_score),
        net_daily_loss: field(states, |s| s.net_daily_loss),
        daily_mint_usd: field(states, |s| s.daily_mint_usd),
        daily_burn_usd: field(states, |s| s.daily_burn_usd),
        urban_count: field(states, |s| s.urban_count as f64),
        rural_count: field(states, |s| s.rural_count as f64),
        pro_count: field(states, |s| s.pro_count as f64),
        coverage_score: field(states, |s| s.coverage_score),
        treasury_balance: field(states, |s| s.treasury_balance),
        competitor_churn: field(states, |s| s.competitor_churn as f64),
        underwater_count: field(states, |s| s.underwater_count as f64),
        cost_per_capacity: field(states, |s| s.cost_per_capacity),
        revenue_per_capacity: field(states, |s| s.revenue_per_capacity),
        entry_barrier: field(states, |s| s.entry_barrier as u8 as f64),
    }
}
