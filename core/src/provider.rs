//! Provider agents and the per-run provider pool.
//!
//! RULES:
//!   - Agents live in an arena owned by one run; they are never shared
//!     across runs.
//!   - Pool membership is the status field, not separate collections.
//!     Pending -> Active -> Churned; Churned is terminal, no re-entry.
//!   - Capacity and weekly cost are sampled once, at creation.

use crate::params::SimParams;
use crate::rng::SimRng;
use crate::types::Week;
use serde::{Deserialize, Serialize};

/// Index into the pool arena. Stable for the provider's lifetime.
pub type ProviderId = usize;

/// Location category. Urban sites are dense (redundant coverage, higher
/// cost) but operated by stickier, better-capitalized owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    Urban,
    Rural,
}

/// Hardware tier. Pro hardware earns a reward-weight multiplier and its
/// owners exit more reluctantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareTier {
    Basic,
    Pro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Pending,
    Active,
    Churned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub category:               ProviderCategory,
    pub tier:                   HardwareTier,
    pub status:                 ProviderStatus,
    /// Service units per week; tier weighting already applied.
    pub capacity:               f64,
    pub weekly_cost:            f64,
    pub joined_week:            Week,
    pub consecutive_loss_weeks: u32,
    pub cumulative_profit:      f64,
    /// 1.0 for unique coverage, <1 for dense/redundant urban sites.
    pub coverage_share:         f64,
    /// Phantom capacity farming rewards without serving demand.
    pub is_sybil:               bool,
}

impl Provider {
    /// Churn reluctance multiplier applied to every exit probability.
    /// Urban/pro agents must never churn more readily than rural/basic
    /// under an identical shock.
    pub fn stickiness(&self) -> f64 {
        let category_factor = match self.category {
            ProviderCategory::Urban => 0.85,
            ProviderCategory::Rural => 1.15,
        };
        let tier_factor = match self.tier {
            HardwareTier::Pro => 0.5,
            HardwareTier::Basic => 1.0,
        };
        category_factor * tier_factor
    }
}

/// Arena of all agents ever created in one run.
#[derive(Debug, Clone, Default)]
pub struct ProviderPool {
    arena: Vec<Provider>,
}

impl ProviderPool {
    pub fn new() -> Self {
        Self { arena: Vec::new() }
    }

    /// Initialise the starting population, online from week 0.
    pub fn initialise(params: &SimParams, rng: &mut SimRng) -> Self {
        let mut pool = Self::new();
        for _ in 0..params.initial_providers {
            pool.spawn(params, rng, 0, ProviderStatus::Active);
        }
        pool
    }

    /// Sample a new heterogeneous provider into the arena.
    pub fn spawn(
        &mut self,
        params: &SimParams,
        rng: &mut SimRng,
        joined_week: Week,
        status: ProviderStatus,
    ) -> ProviderId {
        // 30% urban, 70% rural.
        let category = if rng.chance(0.3) {
            ProviderCategory::Urban
        } else {
            ProviderCategory::Rural
        };
        let tier = if rng.chance(params.pro_tier_share) {
            HardwareTier::Pro
        } else {
            HardwareTier::Basic
        };

        let cost_multiplier = match category {
            ProviderCategory::Urban => 1.5,
            ProviderCategory::Rural => 0.8,
        };
        let tier_multiplier = match tier {
            HardwareTier::Pro => params.pro_tier_efficiency,
            HardwareTier::Basic => 1.0,
        };

        let capacity = (params.capacity_mean
            * (1.0 + params.capacity_std_dev * rng.normal()))
        .max(10.0)
            * tier_multiplier;
        let weekly_cost = (params.cost_per_week
            * cost_multiplier
            * (1.0 + params.cost_std_dev * rng.normal()))
        .max(1.0);

        // Urban density: 2-5 neighbours sharing the same hex.
        let coverage_share = match category {
            ProviderCategory::Urban => {
                let neighbours = 2.0 + (rng.normal() * 1.5).abs();
                1.0 / (1.0 + neighbours)
            }
            ProviderCategory::Rural => 1.0,
        };

        self.arena.push(Provider {
            category,
            tier,
            status,
            capacity,
            weekly_cost,
            joined_week,
            consecutive_loss_weeks: 0,
            cumulative_profit: 0.0,
            coverage_share,
            is_sybil: false,
        });
        self.arena.len() - 1
    }

    /// Inject a batch of phantom providers: near-zero cost, no coverage,
    /// capacity that dilutes rewards but serves nothing.
    pub fn spawn_sybils(&mut self, params: &SimParams, joined_week: Week, count: u32) {
        for _ in 0..count {
            self.arena.push(Provider {
                category: ProviderCategory::Rural,
                tier: HardwareTier::Basic,
                status: ProviderStatus::Active,
                capacity: params.capacity_mean,
                weekly_cost: 0.5,
                joined_week,
                consecutive_loss_weeks: 0,
                cumulative_profit: 0.0,
                coverage_share: 0.0,
                is_sybil: true,
            });
        }
    }

    pub fn get(&self, id: ProviderId) -> &Provider {
        &self.arena[id]
    }

    pub fn get_mut(&mut self, id: ProviderId) -> &mut Provider {
        &mut self.arena[id]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Ids of active providers in arena order. Collected up front so
    /// churn passes can mutate statuses without aliasing the iterator.
    pub fn active_ids(&self) -> Vec<ProviderId> {
        self.arena
            .iter()
            .enumerate()
            .filter(|(_, p)| p.status == ProviderStatus::Active)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn active_count(&self) -> u32 {
        self.count_with(|p| p.status == ProviderStatus::Active)
    }

    pub fn pending_count(&self) -> u32 {
        self.count_with(|p| p.status == ProviderStatus::Pending)
    }

    pub fn churned_count(&self) -> u32 {
        self.count_with(|p| p.status == ProviderStatus::Churned)
    }

    pub fn urban_count(&self) -> u32 {
        self.count_with(|p| {
            p.status == ProviderStatus::Active && p.category == ProviderCategory::Urban
        })
    }

    pub fn rural_count(&self) -> u32 {
        self.count_with(|p| {
            p.status == ProviderStatus::Active && p.category == ProviderCategory::Rural
        })
    }

    pub fn pro_count(&self) -> u32 {
        self.count_with(|p| p.status == ProviderStatus::Active && p.tier == HardwareTier::Pro)
    }

    fn count_with(&self, predicate: impl Fn(&Provider) -> bool) -> u32 {
        self.arena.iter().filter(|p| predicate(p)).count() as u32
    }

    /// Capacity that can actually serve demand (sybil capacity is fake).
    pub fn service_capacity(&self) -> f64 {
        self.arena
            .iter()
            .filter(|p| p.status == ProviderStatus::Active && !p.is_sybil)
            .map(|p| p.capacity)
            .sum()
    }

    /// Capacity competing for the weekly mint, sybils included.
    pub fn reward_capacity(&self) -> f64 {
        self.arena
            .iter()
            .filter(|p| p.status == ProviderStatus::Active)
            .map(|p| p.capacity)
            .sum()
    }

    /// Sum of active coverage shares.
    pub fn coverage_score(&self) -> f64 {
        self.arena
            .iter()
            .filter(|p| p.status == ProviderStatus::Active)
            .map(|p| p.coverage_share)
            .sum()
    }

    /// Move pending providers online once their hardware lead time has
    /// elapsed. Returns the number promoted this week.
    pub fn promote_ready(&mut self, week: Week, lead_time: Week) -> u32 {
        let mut promoted = 0;
        for provider in &mut self.arena {
            if provider.status == ProviderStatus::Pending
                && week.saturating_sub(provider.joined_week) >= lead_time
            {
                provider.status = ProviderStatus::Active;
                promoted += 1;
            }
        }
        promoted
    }

    /// Active -> Churned. Terminal.
    pub fn churn(&mut self, id: ProviderId) {
        debug_assert_eq!(self.arena[id].status, ProviderStatus::Active);
        self.arena[id].status = ProviderStatus::Churned;
    }
}
