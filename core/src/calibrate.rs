//! Calibration of the parameter set against a historical reference.
//!
//! A seeded randomized search samples candidate parameter vectors over
//! bounded ranges, scores each against two aligned index series (price
//! and provider count, both rebased to 100 at week 0) with a weighted
//! blend of MAE, correlation penalty, and directional-accuracy penalty,
//! and keeps the best seen. The winner is re-evaluated once at a larger
//! run count for the reported fit. Deterministic given its seed.

use crate::aggregate::aggregate;
use crate::error::{SimError, SimResult};
use crate::fit;
use crate::params::{DemandRegime, MacroCondition, SimParams};
use crate::rng::SimRng;
use crate::types::Week;
use serde::{Deserialize, Serialize};

/// Two aligned historical index series, normalized to 100 at week 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub price:     Vec<f64>,
    pub providers: Vec<f64>,
}

impl HistoricalSeries {
    pub fn len(&self) -> usize {
        self.price.len().min(self.providers.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Random candidates evaluated during search.
    pub sample_count:  u32,
    /// Run count per search-phase evaluation.
    pub n_sims_search: u32,
    /// Run count for the final re-evaluation of the winner.
    pub n_sims_final:  u32,
    /// Seed of the candidate sampler.
    pub seed:          u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            sample_count:  220,
            n_sims_search: 14,
            n_sims_final:  80,
            seed:          20_260_216,
        }
    }
}

/// Fit metrics for one series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesFit {
    pub mae:                  f64,
    pub rmse:                 f64,
    pub mape_pct:             f64,
    pub correlation:          f64,
    pub directional_accuracy: f64,
    pub band_coverage:        f64,
}

/// One week of the calibration comparison table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeeklyRow {
    pub week:                      Week,
    pub historical_price_index:    f64,
    pub simulated_price_index:     f64,
    pub simulated_price_p10_index: f64,
    pub simulated_price_p90_index: f64,
    pub historical_node_index:     f64,
    pub simulated_node_index:      f64,
    pub simulated_node_p10_index:  f64,
    pub simulated_node_p90_index:  f64,
}

/// A full evaluation of one parameter set against the reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSnapshot {
    pub objective:            f64,
    pub price:                SeriesFit,
    pub providers:            SeriesFit,
    pub final_price_index:    f64,
    pub final_provider_index: f64,
    pub weekly_rows:          Vec<WeeklyRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub best_params:               SimParams,
    pub baseline:                  FitSnapshot,
    pub fit:                       FitSnapshot,
    pub objective_improvement_pct: f64,
    /// Structural-limitation notes; empty when alignment is adequate.
    pub limitations:               Vec<String>,
}

fn correlation_penalty(correlation: f64) -> f64 {
    (1.0 - correlation.clamp(-1.0, 1.0)) / 2.0
}

/// Weighted blend favouring the two MAE terms.
fn objective(
    price: &SeriesFit,
    providers: &SeriesFit,
    final_price_index: f64,
    final_provider_index: f64,
    historical: &HistoricalSeries,
) -> f64 {
    let n = historical.len();
    let price_final_gap = (final_price_index - historical.price[n - 1]).abs() / 100.0;
    let provider_final_gap = (final_provider_index - historical.providers[n - 1]).abs() / 100.0;

    (price.mae / 100.0) * 0.32
        + (providers.mae / 100.0) * 0.30
        + correlation_penalty(price.correlation) * 0.10
        + correlation_penalty(providers.correlation) * 0.16
        + (1.0 - price.directional_accuracy) * 0.04
        + (1.0 - providers.directional_accuracy) * 0.05
        + provider_final_gap * 0.02
        + price_final_gap * 0.01
}

fn series_fit(
    historical: &[f64],
    simulated: &[f64],
    p10: &[f64],
    p90: &[f64],
) -> SeriesFit {
    SeriesFit {
        mae: fit::mae(historical, simulated),
        rmse: fit::rmse(historical, simulated),
        mape_pct: fit::mape(historical, simulated),
        correlation: fit::pearson_correlation(historical, simulated),
        directional_accuracy: fit::directional_accuracy(historical, simulated),
        band_coverage: fit::band_coverage(historical, p10, p90),
    }
}

/// Evaluate one parameter set against the reference series, truncating
/// the horizon to the overlapping window.
pub fn evaluate_fit(params: &SimParams, historical: &HistoricalSeries) -> SimResult<FitSnapshot> {
    let window = (historical.len() as Week).min(params.horizon_weeks);
    let mut windowed = params.clone();
    windowed.horizon_weeks = window;

    let series = aggregate(&windowed)?;

    let historical_price = &historical.price[..window as usize];
    let historical_providers = &historical.providers[..window as usize];

    let collect = |f: fn(&crate::aggregate::AggregateWeek) -> f64| -> Vec<f64> {
        series.iter().map(f).collect()
    };
    let simulated_price = fit::normalize_to_index(&collect(|w| w.price.mean));
    let simulated_price_p10 = fit::normalize_to_index(&collect(|w| w.price.p10));
    let simulated_price_p90 = fit::normalize_to_index(&collect(|w| w.price.p90));
    let simulated_nodes = fit::normalize_to_index(&collect(|w| w.providers.mean));
    let simulated_nodes_p10 = fit::normalize_to_index(&collect(|w| w.providers.p10));
    let simulated_nodes_p90 = fit::normalize_to_index(&collect(|w| w.providers.p90));

    let price_fit = series_fit(
        historical_price,
        &simulated_price,
        &simulated_price_p10,
        &simulated_price_p90,
    );
    let provider_fit = series_fit(
        historical_providers,
        &simulated_nodes,
        &simulated_nodes_p10,
        &simulated_nodes_p90,
    );

    let final_price_index = simulated_price.last().copied().unwrap_or(0.0);
    let final_provider_index = simulated_nodes.last().copied().unwrap_or(0.0);

    let weekly_rows = (0..window as usize)
        .map(|week| WeeklyRow {
            week: week as Week,
            historical_price_index: historical_price[week],
            simulated_price_index: simulated_price[week],
            simulated_price_p10_index: simulated_price_p10[week],
            simulated_price_p90_index: simulated_price_p90[week],
            historical_node_index: historical_providers[week],
            simulated_node_index: simulated_nodes[week],
            simulated_node_p10_index: simulated_nodes_p10[week],
            simulated_node_p90_index: simulated_nodes_p90[week],
        })
        .collect();

    Ok(FitSnapshot {
        objective: objective(
            &price_fit,
            &provider_fit,
            final_price_index,
            final_provider_index,
            historical,
        ),
        price: price_fit,
        providers: provider_fit,
        final_price_index,
        final_provider_index,
        weekly_rows,
    })
}

/// Sample one candidate parameter vector over the bounded search space.
fn random_candidate(base: &SimParams, rng: &mut SimRng, n_sims_search: u32) -> SimParams {
    let mut candidate = base.clone();
    candidate.n_sims = n_sims_search;

    candidate.demand_regime = if rng.chance(0.5) {
        DemandRegime::Consistent
    } else {
        DemandRegime::HighToDecay
    };
    candidate.macro_condition = if rng.chance(0.5) {
        MacroCondition::Bearish
    } else {
        MacroCondition::Sideways
    };

    candidate.initial_liquidity = rng.range(250_000.0, 12_000_000.0).round();
    candidate.investor_unlock_week = Some(rng.range_u32(8, 42));
    candidate.investor_sell_fraction = rng.range(0.04, 0.45);
    candidate.demand_volatility = rng.range(0.01, 0.11);
    candidate.base_demand = rng.range(6_000.0, 100_000.0).round();
    candidate.cost_per_week = rng.range(2.0, 20.0);
    candidate.churn_threshold = rng.range(-10.0, 8.0);
    candidate.join_profit_threshold = rng.range(0.0, 8.0);
    candidate.max_growth_rate = rng.range(0.01, 0.18);
    candidate.max_churn_rate = rng.range(0.004, 0.11);
    candidate.preorder_backlog_fraction = rng.range(0.0, 0.9);
    candidate.sunk_cost_churn_damping = rng.range(0.0, 0.8);
    candidate.hardware_lead_time_weeks = rng.range_u32(0, 8);
    candidate.k_buy_pressure = rng.range(0.001, 0.05);
    candidate.k_sell_pressure = rng.range(0.01, 0.4);
    candidate.k_demand_price = rng.range(0.001, 0.07);
    candidate.k_mint_price = rng.range(0.08, 0.5);
    candidate.burn_fraction = rng.range(0.35, 1.0);
    candidate.base_service_price = rng.range(0.01, 0.35);
    candidate.service_price_elasticity = rng.range(0.1, 0.95);
    candidate.max_service_price = rng.range(0.4, 3.0);
    candidate.min_service_price =
        rng.range(0.001, 0.03).min(candidate.max_service_price * 0.5);
    candidate.reward_lag_weeks = rng.range_u32(0, 6);

    // Roughly half the candidates carry a demand growth shock.
    if rng.chance(0.45) {
        candidate.demand_shock_week = Some(rng.range_u32(2, 24));
        candidate.demand_shock_magnitude = rng.range(0.05, 0.6);
    } else {
        candidate.demand_shock_week = None;
        candidate.demand_shock_magnitude = 0.0;
    }

    candidate
}

/// Search a bounded parameter space for the best fit to `historical`.
///
/// The baseline fit of `base_params` and the winner's fit are both
/// reported at `n_sims_final`; search-phase evaluations use the faster
/// `n_sims_search`.
pub fn calibrate(
    historical: &HistoricalSeries,
    base_params: &SimParams,
    config: &CalibrationConfig,
) -> SimResult<CalibrationOutcome> {
    base_params.validate()?;
    if historical.len() < 2 {
        return Err(SimError::InvalidParameter {
            name: "historical",
            reason: format!(
                "reference series needs at least 2 aligned weeks, got {}",
                historical.len()
            ),
        });
    }

    let mut baseline_params = base_params.clone();
    baseline_params.n_sims = config.n_sims_final;
    let baseline = evaluate_fit(&baseline_params, historical)?;

    let mut best_candidate = base_params.clone();
    best_candidate.n_sims = config.n_sims_search;
    let mut best_fit = evaluate_fit(&best_candidate, historical)?;

    let mut rng = SimRng::new(config.seed);
    for i in 0..config.sample_count {
        let candidate = random_candidate(base_params, &mut rng, config.n_sims_search);
        let fit = evaluate_fit(&candidate, historical)?;
        if fit.objective < best_fit.objective {
            log::debug!(
                "calibrate: sample {i} improves objective {:.4} -> {:.4}",
                best_fit.objective,
                fit.objective
            );
            best_fit = fit;
            best_candidate = candidate;
        }
    }

    let mut final_params = best_candidate;
    final_params.n_sims = config.n_sims_final;
    let fit = evaluate_fit(&final_params, historical)?;

    let objective_improvement_pct = if baseline.objective > 0.0 {
        (baseline.objective - fit.objective) / baseline.objective
    } else {
        0.0
    };

    let mut limitations = Vec::new();
    if fit.providers.correlation < 0.1 || fit.providers.directional_accuracy < 0.35 {
        limitations.push(
            "Provider trajectory remains weakly aligned to history after bounded \
             calibration; this points at a structural model gap rather than a \
             parameter choice."
                .to_string(),
        );
    }
    if fit.price.correlation < 0.5 {
        limitations
            .push("Price correlation remains below 0.5 under the bounded search space.".to_string());
    }
    for note in &limitations {
        log::warn!("calibrate: {note}");
    }

    log::info!(
        "calibrate: objective {:.4} -> {:.4} over {} samples",
        baseline.objective,
        fit.objective,
        config.sample_count
    );

    Ok(CalibrationOutcome {
        best_params: final_params,
        baseline,
        fit,
        objective_improvement_pct,
        limitations,
    })
}
