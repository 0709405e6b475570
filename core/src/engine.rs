//! The single-run simulator — the heart of the engine.
//!
//! WEEKLY ORDER (fixed, documented, never reordered):
//!   1. Pending providers whose hardware lead time elapsed come online.
//!   2. Steady-state churn/join pass on last week's profits.
//!   3. Demand is read; service clears at an elasticity-bounded price.
//!   4. Mint from the emission schedule; burn from served revenue.
//!   5. Provider rewards, profits, and sell pressure.
//!   6. Token price update (organic log-return, or AMM unlock swap).
//!   7. Panic pass when the week-over-week price crashes.
//!   8. Competitor (vampire) churn under a configured yield threat.
//!   9. Supply update and diagnostics.
//!
//! RULES:
//!   - One run owns one SimRng; identical params + seed give identical
//!     output, element for element.
//!   - All recorded values stay finite; a non-finite value is a defect.
//!   - No state crosses run boundaries.

use crate::demand;
use crate::params::{EmissionModel, RevenueStrategy, SimParams};
use crate::provider::{ProviderPool, ProviderStatus};
use crate::rng::SimRng;
use crate::types::Week;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Price floor: the token never trades at exactly zero.
const PRICE_FLOOR: f64 = 1e-4;
/// Circulating supply never falls below this floor.
const SUPPLY_FLOOR: f64 = 1000.0;
/// At most this share of supply can burn in one week.
const MAX_BURN_SUPPLY_SHARE: f64 = 0.95;
/// Week-over-week price ratio below which the panic pass runs.
const PANIC_PRICE_RATIO: f64 = 0.8;
/// Competitor yield below this level attracts nobody.
const COMPETITOR_YIELD_FLOOR: f64 = 0.2;

/// Complete economic state recorded for one week of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekState {
    pub week:            Week,
    pub price:           f64,
    pub supply:          f64,
    pub demand:          f64,
    pub demand_served:   f64,
    pub providers:       u32,
    pub capacity:        f64,
    pub service_price:   f64,
    pub minted:          f64,
    pub burned:          f64,
    pub utilization_pct: f64,
    pub profit:          f64,
    pub scarcity:        f64,
    pub incentive:       f64,
    pub buy_pressure:    f64,
    pub sell_pressure:   f64,
    pub net_flow:        f64,
    pub churn_count:     u32,
    pub join_count:      u32,

    // Solvency scorecard
    pub solvency_score: f64,
    pub net_daily_loss: f64,
    pub daily_mint_usd: f64,
    pub daily_burn_usd: f64,

    // Cohorts & coverage
    pub urban_count:    u32,
    pub rural_count:    u32,
    pub pro_count:      u32,
    pub coverage_score: f64,

    // Competitive resilience
    pub treasury_balance: f64,
    pub competitor_churn: u32,

    // Capitulation diagnostics
    pub underwater_count:     u32,
    pub cost_per_capacity:    f64,
    pub revenue_per_capacity: f64,
    pub entry_barrier:        bool,
}

/// Steady-state exit probability from consecutive loss weeks, before
/// stickiness modulation. Logistic in the loss-week count, with a bump
/// for deeply negative profit.
fn steady_churn_probability(loss_weeks: u32, profit: f64, churn_threshold: f64) -> f64 {
    if loss_weeks == 0 {
        return 0.0;
    }
    let l = loss_weeks as f64;
    let mut p = 0.9 / (1.0 + (-0.5 * (l - 6.0)).exp());
    if profit < -churn_threshold {
        p += 0.10;
    }
    p.min(0.9)
}

/// Panic exit probability from the estimated post-crash position,
/// before stickiness modulation.
fn panic_probability(estimated_revenue: f64, weekly_cost: f64) -> f64 {
    if estimated_revenue - weekly_cost >= 0.0 {
        return 0.0;
    }
    if estimated_revenue < weekly_cost * 0.5 {
        0.8
    } else {
        0.2
    }
}

/// One in-flight simulation run.
struct RunEngine<'a> {
    params: &'a SimParams,
    rng:    SimRng,
    pool:   ProviderPool,

    demands: Vec<f64>,
    mu:      f64,
    sigma:   f64,

    price:         f64,
    supply:        f64,
    service_price: f64,
    treasury:      f64,

    // Constant-product pool absorbing the investor unlock.
    pool_usd:    f64,
    pool_tokens: f64,
    k_amm:       f64,

    // Lagged reward signal for the join incentive.
    reward_history: VecDeque<f64>,

    // Per-arena-slot profit from the previous week.
    last_profits:       Vec<f64>,
    has_profit_history: bool,

    sybil_injected: bool,
}

impl<'a> RunEngine<'a> {
    fn new(params: &'a SimParams, run_seed: u32) -> Self {
        let mut rng = SimRng::new(run_seed);
        let (mu, sigma) = params.macro_condition.drift();

        let mut demands = demand::generate_series(
            params.horizon_weeks,
            params.base_demand,
            params.demand_regime,
            params.demand_volatility,
            &mut rng,
        );
        if let Some(shock_week) = params.demand_shock_week {
            demand::apply_shock(&mut demands, shock_week, params.demand_shock_magnitude, 0.1);
        }

        let pool = ProviderPool::initialise(params, &mut rng);
        let last_profits = vec![0.0; pool.len()];

        let pool_usd = params.initial_liquidity;
        let pool_tokens = pool_usd / params.initial_price;

        let history_len = params.reward_lag_weeks as usize + 1;
        let reward_history: VecDeque<f64> =
            std::iter::repeat(params.cost_per_week * 1.5).take(history_len).collect();

        Self {
            params,
            rng,
            pool,
            demands,
            mu,
            sigma,
            price: params.initial_price,
            supply: params.initial_supply,
            service_price: params.base_service_price,
            treasury: 0.0,
            pool_usd,
            pool_tokens,
            k_amm: pool_usd * pool_tokens,
            reward_history,
            last_profits,
            has_profit_history: false,
            sybil_injected: false,
        }
    }

    fn sunk_cost_factor(&self) -> f64 {
        (1.0 - self.params.sunk_cost_churn_damping * self.params.preorder_backlog_fraction)
            .clamp(0.0, 1.0)
    }

    /// Phase 2: update loss counters, evaluate exits, queue joins.
    /// Joined providers sit in Pending until their hardware lead time
    /// elapses; they only count as joins when they come online.
    /// Returns (churn_count, entry_barrier).
    fn steady_state_pass(&mut self, week: Week) -> (u32, bool) {
        let active_before = self.pool.active_count();
        if active_before == 0 {
            return (0, true);
        }

        let active_ids = self.pool.active_ids();
        let mean_profit = active_ids
            .iter()
            .map(|id| self.last_profits[*id])
            .sum::<f64>()
            / active_ids.len() as f64;

        let damping = self.sunk_cost_factor();
        let mut leavers = Vec::new();

        for id in active_ids {
            let profit = self.last_profits[id];
            {
                let provider = self.pool.get_mut(id);
                provider.cumulative_profit += profit;
                if profit < self.params.churn_threshold {
                    provider.consecutive_loss_weeks += 1;
                } else {
                    provider.consecutive_loss_weeks =
                        provider.consecutive_loss_weeks.saturating_sub(1);
                }
            }

            let provider = self.pool.get(id);
            let base = steady_churn_probability(
                provider.consecutive_loss_weeks,
                profit,
                self.params.churn_threshold,
            );
            let p = (base * provider.stickiness() * damping).min(0.9);
            if self.rng.chance(p) {
                leavers.push(id);
            }
        }

        // Weekly churn cap: excess leavers stay after all.
        let max_churn = (active_before as f64 * self.params.max_churn_rate).floor() as usize;
        leavers.truncate(max_churn);
        for id in &leavers {
            self.pool.churn(*id);
        }
        let churn_count = leavers.len() as u32;

        // Joins: admitted into Pending when expected profit clears the
        // join threshold, up to the weekly growth cap.
        let mut join_spawned = 0u32;
        let entry_barrier = mean_profit <= self.params.join_profit_threshold;
        if !entry_barrier {
            let attractiveness = (mean_profit - self.params.join_profit_threshold)
                / self.params.join_profit_threshold.max(1e-12);
            let potential = (self.pool.active_count() as f64
                * self.params.max_growth_rate
                * attractiveness.min(1.0))
            .floor() as u32;
            for _ in 0..potential {
                self.pool
                    .spawn(self.params, &mut self.rng, week, ProviderStatus::Pending);
                join_spawned += 1;
            }
            if join_spawned > 0 {
                log::debug!(
                    "week={week} providers: {join_spawned} joins queued (mean_profit={mean_profit:.2})"
                );
            }
        }

        (churn_count, entry_barrier)
    }

    /// Phase 7: crash-triggered capitulation, distinct from the slow
    /// consecutive-loss signal. Runs in addition to the steady-state
    /// pass and is deliberately uncapped.
    fn panic_pass(&mut self, price_ratio: f64) -> u32 {
        let damping = self.sunk_cost_factor();
        let mut churned = 0;

        for id in self.pool.active_ids() {
            let provider = self.pool.get(id);
            // Reconstruct revenue from last profit, then reprice it.
            let last_revenue = self.last_profits[id] + provider.weekly_cost;
            let estimated_revenue = last_revenue * price_ratio;

            let base = panic_probability(estimated_revenue, provider.weekly_cost);
            let p = (base * provider.stickiness() * damping).min(0.95);
            if self.rng.chance(p) {
                self.pool.churn(id);
                churned += 1;
            }
        }

        churned
    }

    /// Phase 8: a higher-yield competitor peels off the least sticky
    /// cohort (rural/basic, sybils included).
    fn competitor_pass(&mut self) -> u32 {
        if self.params.competitor_yield <= COMPETITOR_YIELD_FLOOR {
            return 0;
        }
        let p = (self.params.competitor_yield * 0.05).min(0.9);
        let mut churned = 0;
        for id in self.pool.active_ids() {
            let provider = self.pool.get(id);
            if provider.stickiness() < 1.0 {
                continue; // urban or pro: not worth the switch
            }
            if self.rng.chance(p) {
                self.pool.churn(id);
                churned += 1;
            }
        }
        churned
    }

    fn step(&mut self, week: Week) -> WeekState {
        // 1. Hardware comes online.
        let promoted = self
            .pool
            .promote_ready(week, self.params.hardware_lead_time_weeks);

        // 2. Stay/leave decisions need one week of profit history.
        let (mut churn_count, entry_barrier) = if self.has_profit_history {
            self.steady_state_pass(week)
        } else {
            (0, false)
        };
        let join_count = promoted;

        // One-off sybil batch a quarter of the way in.
        if self.params.sybil_size > 0.0
            && !self.sybil_injected
            && week == self.params.horizon_weeks / 4
        {
            let batch =
                (self.pool.active_count() as f64 * self.params.sybil_size).ceil() as u32;
            self.pool.spawn_sybils(self.params, week, batch);
            self.sybil_injected = true;
            log::debug!("week={week} providers: sybil batch of {batch} injected");
        }
        self.last_profits.resize(self.pool.len(), 0.0);

        // 3. Demand & service clearing.
        let week_demand = self.demands[week as usize];
        let capacity = self.pool.service_capacity().max(1.0);
        let demand_served = week_demand.min(capacity);
        let utilization_pct = (demand_served / capacity) * 100.0;
        let scarcity = (week_demand - capacity) / capacity;

        self.service_price = (self.service_price
            * (1.0 + self.params.service_price_elasticity * scarcity))
            .clamp(self.params.min_service_price, self.params.max_service_price);

        // 4. Token flows: users spend, protocol burns or reserves.
        let safe_price = self.price.max(PRICE_FLOOR);
        let revenue_usd = demand_served * self.service_price;
        let tokens_spent = revenue_usd / safe_price;
        let burned = (self.params.burn_fraction * tokens_spent)
            .min(self.supply * MAX_BURN_SUPPLY_SHARE);
        if self.params.revenue_strategy == RevenueStrategy::Reserve {
            // Sinking fund: the unburned residual accrues instead of
            // leaving the system.
            self.treasury += revenue_usd * (1.0 - self.params.burn_fraction);
        }

        // Emissions: sigmoid demand response, saturation dampening.
        let saturation = (self.pool.active_count() as f64 / 5000.0).min(1.0);
        let mut emission_factor =
            0.6 + 0.4 * (week_demand / 15_000.0).tanh() - 0.2 * saturation;
        if self.params.emission_model == EmissionModel::Kpi {
            emission_factor *= (demand_served / capacity).max(0.3);
            if self.price < self.params.initial_price * 0.8 {
                emission_factor *= 0.6;
            }
        }
        let minted = (self.params.max_mint_weekly * emission_factor)
            .clamp(0.0, self.params.max_mint_weekly);

        // 5. Rewards & provider economics.
        let reward_capacity = self.pool.reward_capacity().max(1.0);
        let reward_per_unit = minted / reward_capacity;

        let active_ids = self.pool.active_ids();
        let mut sell_pressure = 0.0;
        let mut profit_sum = 0.0;
        let mut underwater_count = 0u32;
        for id in &active_ids {
            let provider = self.pool.get(*id);
            let reward_tokens = reward_per_unit * provider.capacity;
            let profit = reward_tokens * safe_price - provider.weekly_cost;
            // Providers sell just enough of the reward to cover opex.
            sell_pressure += reward_tokens.min(provider.weekly_cost / safe_price);

            self.last_profits[*id] = profit;
            profit_sum += profit;
            if profit < 0.0 {
                underwater_count += 1;
            }
        }
        let active_count = active_ids.len() as u32;
        let mean_profit = if active_count > 0 {
            profit_sum / active_count as f64
        } else {
            0.0
        };
        self.has_profit_history = true;

        let buy_pressure = tokens_spent;

        // Lagged reward signal drives the join incentive.
        let instant_reward = (minted / (active_count.max(1)) as f64) * safe_price;
        self.reward_history.push_back(instant_reward);
        let delayed_reward = if self.reward_history.len() > self.params.reward_lag_weeks as usize + 1
        {
            self.reward_history.pop_front().unwrap_or(instant_reward)
        } else {
            *self.reward_history.front().unwrap_or(&instant_reward)
        };
        let incentive = (delayed_reward - self.params.cost_per_week) / self.params.cost_per_week;

        // 6. Price formation.
        let mut net_flow = buy_pressure - sell_pressure - burned;
        let next_price = if self.params.investor_unlock_week == Some(week) {
            // Cliff: a lump sale goes through the constant-product pool.
            let unlock_amount = self.supply * self.params.investor_sell_fraction;
            self.pool_tokens += unlock_amount;
            self.pool_usd = self.k_amm / self.pool_tokens;
            net_flow = -unlock_amount;
            (self.pool_usd / self.pool_tokens).max(PRICE_FLOOR)
        } else {
            let buy_effect =
                self.params.k_buy_pressure * (buy_pressure / self.supply * 100.0).tanh();
            let sell_effect =
                -self.params.k_sell_pressure * (sell_pressure / self.supply * 100.0).tanh();
            let demand_effect = self.params.k_demand_price * scarcity.tanh();
            let dilution_effect = -self.params.k_mint_price * (minted / self.supply) * 100.0;

            let log_return = self.mu
                + buy_effect
                + sell_effect
                + demand_effect
                + dilution_effect
                + self.sigma * self.rng.normal();
            let organic = (self.price * log_return.exp()).max(PRICE_FLOOR);
            // Keep the AMM pool marked to the organic price.
            self.pool_usd = (self.k_amm * organic).sqrt();
            self.pool_tokens = (self.k_amm / organic).sqrt();
            organic
        };

        // 7. Panic pass on a genuine crash.
        let price_ratio = next_price / safe_price;
        if price_ratio < PANIC_PRICE_RATIO {
            let panicked = self.panic_pass(price_ratio);
            if panicked > 0 {
                log::debug!(
                    "week={week} providers: panic churn {panicked} (price ratio {price_ratio:.3})"
                );
            }
            churn_count += panicked;
        }

        // 8. Vampire attack.
        let competitor_churn = self.competitor_pass();

        // 9. Supply conservation and diagnostics.
        self.supply = (self.supply + minted - burned).max(SUPPLY_FLOOR);

        let daily_mint_usd = minted / 7.0 * safe_price;
        let daily_burn_usd = burned / 7.0 * safe_price;
        let solvency_score = if daily_mint_usd > 0.0 {
            daily_burn_usd / daily_mint_usd
        } else {
            10.0
        };

        let state = WeekState {
            week,
            price: self.price,
            supply: self.supply,
            demand: week_demand,
            demand_served,
            providers: self.pool.active_count(),
            capacity,
            service_price: self.service_price,
            minted,
            burned,
            utilization_pct,
            profit: mean_profit,
            scarcity,
            incentive,
            buy_pressure,
            sell_pressure,
            net_flow,
            churn_count,
            join_count,
            solvency_score,
            net_daily_loss: daily_burn_usd - daily_mint_usd,
            daily_mint_usd,
            daily_burn_usd,
            urban_count: self.pool.urban_count(),
            rural_count: self.pool.rural_count(),
            pro_count: self.pool.pro_count(),
            coverage_score: self.pool.coverage_score(),
            treasury_balance: self.treasury,
            competitor_churn,
            underwater_count,
            cost_per_capacity: minted * safe_price / capacity.max(0.1),
            revenue_per_capacity: revenue_usd / capacity.max(0.1),
            entry_barrier,
        };

        debug_assert!(
            state.price.is_finite()
                && state.supply.is_finite()
                && state.minted.is_finite()
                && state.burned.is_finite()
                && state.profit.is_finite(),
            "non-finite state at week {week}"
        );

        self.price = next_price;
        state
    }
}

/// Advance one complete run, week by week.
///
/// Identical `params` and `run_seed` produce an identical series.
pub fn simulate_run(params: &SimParams, run_seed: u32) -> Vec<WeekState> {
    let mut engine = RunEngine::new(params, run_seed);
    (0..params.horizon_weeks).map(|week| engine.step(week)).collect()
}
