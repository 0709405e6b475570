//! Simulation parameter set.
//!
//! One `SimParams` value is the complete, immutable input to a full
//! evaluation (aggregation, optimizer procedure, or calibration probe).
//! Defaults are applied here, at construction, never at call sites.
//! `validate()` must pass before any simulation work begins.

use crate::error::{SimError, SimResult};
use crate::types::Week;
use serde::{Deserialize, Serialize};

/// Shape of the demand curve over the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemandRegime {
    /// Stable demand with small fluctuations.
    Consistent,
    /// Linear adoption ramp: 80% of base at week 0, +2%/week.
    Growth,
    /// High-variance demand (4x the configured volatility).
    Volatile,
    /// Initial hype decaying exponentially from 1.6x to 0.6x base.
    HighToDecay,
}

/// Overall market sentiment driving token price drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroCondition {
    Bearish,
    Sideways,
    Bullish,
}

impl MacroCondition {
    /// Weekly log-return drift and noise (mu, sigma).
    pub fn drift(&self) -> (f64, f64) {
        match self {
            MacroCondition::Bearish  => (-0.010, 0.06),
            MacroCondition::Sideways => (0.002, 0.05),
            MacroCondition::Bullish  => (0.015, 0.06),
        }
    }
}

/// Emission schedule: fixed cap, or demand/guardrail-adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionModel {
    Fixed,
    Kpi,
}

/// What happens to the unburned share of service revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueStrategy {
    /// Buy & burn; the unburned residual leaves the system.
    Burn,
    /// Sinking fund: the unburned residual accrues to a treasury.
    Reserve,
}

/// Complete parameter set for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    // Time & sampling
    pub horizon_weeks: Week,
    pub n_sims:        u32,
    pub seed:          u32,

    // Tokenomics
    pub initial_supply:    f64,
    pub initial_price:     f64,
    pub initial_liquidity: f64,
    pub max_mint_weekly:   f64,
    pub burn_fraction:     f64,

    // Investor unlock cliff
    pub investor_unlock_week:   Option<Week>,
    pub investor_sell_fraction: f64,

    // Demand
    pub demand_regime:     DemandRegime,
    pub base_demand:       f64,
    pub demand_volatility: f64,

    // Macro
    pub macro_condition: MacroCondition,

    // Provider economics
    pub initial_providers:        u32,
    pub capacity_mean:            f64,
    pub capacity_std_dev:         f64,
    pub cost_per_week:            f64,
    pub cost_std_dev:             f64,
    pub hardware_lead_time_weeks: Week,
    pub churn_threshold:          f64,
    pub join_profit_threshold:    f64,
    pub max_growth_rate:          f64,
    pub max_churn_rate:           f64,
    pub hardware_cost:            f64,

    // Hardware tiers
    pub pro_tier_share:      f64,
    pub pro_tier_efficiency: f64,

    // Preorder backlog & sunk-cost damping
    pub preorder_backlog_fraction: f64,
    pub sunk_cost_churn_damping:   f64,

    // Price formation coefficients
    pub k_buy_pressure:  f64,
    pub k_sell_pressure: f64,
    pub k_demand_price:  f64,
    pub k_mint_price:    f64,

    // Service pricing
    pub base_service_price:       f64,
    pub service_price_elasticity: f64,
    pub min_service_price:        f64,
    pub max_service_price:        f64,

    // Reward mechanics
    pub reward_lag_weeks: Week,

    // Competitive threat & strategy switches
    pub competitor_yield: f64,
    pub emission_model:   EmissionModel,
    pub revenue_strategy: RevenueStrategy,

    // Adversarial: phantom capacity farming rewards
    pub sybil_size: f64,

    // One-off demand growth shock
    pub demand_shock_week:      Option<Week>,
    pub demand_shock_magnitude: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            horizon_weeks: 52,
            n_sims:        100,
            seed:          42,

            initial_supply:    100_000_000.0,
            initial_price:     3.0,
            initial_liquidity: 50_000.0,
            max_mint_weekly:   250_000.0,
            burn_fraction:     0.65,

            investor_unlock_week:   Some(26),
            investor_sell_fraction: 0.15,

            demand_regime:     DemandRegime::Growth,
            base_demand:       12_000.0,
            demand_volatility: 0.05,

            macro_condition: MacroCondition::Sideways,

            initial_providers:        30,
            capacity_mean:            180.0,
            capacity_std_dev:         0.2,
            cost_per_week:            25.96,
            cost_std_dev:             0.15,
            hardware_lead_time_weeks: 2,
            churn_threshold:          10.0,
            join_profit_threshold:    15.0,
            max_growth_rate:          0.15,
            max_churn_rate:           0.10,
            hardware_cost:            800.0,

            pro_tier_share:      0.2,
            pro_tier_efficiency: 1.5,

            preorder_backlog_fraction: 0.0,
            sunk_cost_churn_damping:   0.0,

            k_buy_pressure:  0.08,
            k_sell_pressure: 0.12,
            k_demand_price:  0.15,
            k_mint_price:    0.35,

            base_service_price:       0.5,
            service_price_elasticity: 0.6,
            min_service_price:        0.05,
            max_service_price:        5.0,

            reward_lag_weeks: 6,

            competitor_yield: 0.0,
            emission_model:   EmissionModel::Fixed,
            revenue_strategy: RevenueStrategy::Burn,

            sybil_size: 0.0,

            demand_shock_week:      None,
            demand_shock_magnitude: 0.0,
        }
    }
}

fn require(condition: bool, name: &'static str, reason: &str) -> SimResult<()> {
    if condition {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name,
            reason: reason.to_string(),
        })
    }
}

fn require_finite(value: f64, name: &'static str) -> SimResult<()> {
    require(value.is_finite(), name, &format!("must be finite, got {value}"))
}

fn require_fraction(value: f64, name: &'static str) -> SimResult<()> {
    require_finite(value, name)?;
    require(
        (0.0..=1.0).contains(&value),
        name,
        &format!("must be in [0, 1], got {value}"),
    )
}

impl SimParams {
    /// Fail fast on invalid inputs, before any simulation work.
    pub fn validate(&self) -> SimResult<()> {
        require(self.horizon_weeks >= 1, "horizon_weeks", "must be a positive integer")?;
        require(self.n_sims >= 1, "n_sims", "must be a positive integer")?;

        require_finite(self.initial_supply, "initial_supply")?;
        require(self.initial_supply > 0.0, "initial_supply", "must be > 0")?;
        require_finite(self.initial_price, "initial_price")?;
        require(self.initial_price > 0.0, "initial_price", "must be > 0")?;
        require_finite(self.initial_liquidity, "initial_liquidity")?;
        require(self.initial_liquidity > 0.0, "initial_liquidity", "must be > 0")?;
        require_finite(self.max_mint_weekly, "max_mint_weekly")?;
        require(self.max_mint_weekly >= 0.0, "max_mint_weekly", "must be >= 0")?;

        require_fraction(self.burn_fraction, "burn_fraction")?;
        require_fraction(self.investor_sell_fraction, "investor_sell_fraction")?;

        require_finite(self.base_demand, "base_demand")?;
        require(self.base_demand >= 0.0, "base_demand", "must be >= 0")?;
        require_finite(self.demand_volatility, "demand_volatility")?;
        require(self.demand_volatility >= 0.0, "demand_volatility", "must be >= 0")?;

        require_finite(self.capacity_mean, "capacity_mean")?;
        require(self.capacity_mean > 0.0, "capacity_mean", "must be > 0")?;
        require_finite(self.capacity_std_dev, "capacity_std_dev")?;
        require(self.capacity_std_dev >= 0.0, "capacity_std_dev", "must be >= 0")?;
        require_finite(self.cost_per_week, "cost_per_week")?;
        require(self.cost_per_week > 0.0, "cost_per_week", "must be > 0")?;
        require_finite(self.cost_std_dev, "cost_std_dev")?;
        require(self.cost_std_dev >= 0.0, "cost_std_dev", "must be >= 0")?;

        require_finite(self.churn_threshold, "churn_threshold")?;
        require_finite(self.join_profit_threshold, "join_profit_threshold")?;
        require_fraction(self.max_growth_rate, "max_growth_rate")?;
        require_fraction(self.max_churn_rate, "max_churn_rate")?;
        require_finite(self.hardware_cost, "hardware_cost")?;
        require(self.hardware_cost >= 0.0, "hardware_cost", "must be >= 0")?;

        require_fraction(self.pro_tier_share, "pro_tier_share")?;
        require_finite(self.pro_tier_efficiency, "pro_tier_efficiency")?;
        require(self.pro_tier_efficiency >= 1.0, "pro_tier_efficiency", "must be >= 1")?;

        require_fraction(self.preorder_backlog_fraction, "preorder_backlog_fraction")?;
        require_fraction(self.sunk_cost_churn_damping, "sunk_cost_churn_damping")?;

        require_finite(self.k_buy_pressure, "k_buy_pressure")?;
        require_finite(self.k_sell_pressure, "k_sell_pressure")?;
        require_finite(self.k_demand_price, "k_demand_price")?;
        require_finite(self.k_mint_price, "k_mint_price")?;

        require_finite(self.base_service_price, "base_service_price")?;
        require(self.base_service_price > 0.0, "base_service_price", "must be > 0")?;
        require_finite(self.service_price_elasticity, "service_price_elasticity")?;
        require(
            self.service_price_elasticity >= 0.0,
            "service_price_elasticity",
            "must be >= 0",
        )?;
        require_finite(self.min_service_price, "min_service_price")?;
        require_finite(self.max_service_price, "max_service_price")?;
        require(
            self.min_service_price <= self.max_service_price,
            "min_service_price",
            "must not exceed max_service_price",
        )?;

        require_finite(self.competitor_yield, "competitor_yield")?;
        require(self.competitor_yield >= 0.0, "competitor_yield", "must be >= 0")?;

        require_fraction(self.sybil_size, "sybil_size")?;
        require_finite(self.demand_shock_magnitude, "demand_shock_magnitude")?;
        require(
            self.demand_shock_magnitude >= 0.0,
            "demand_shock_magnitude",
            "must be >= 0",
        )?;

        Ok(())
    }
}
