//! Stochastic demand series generation.
//!
//! The series is produced once per run, before the weekly loop, from the
//! run's own RNG stream. Every value is floored at zero.

use crate::params::DemandRegime;
use crate::rng::SimRng;
use crate::types::Week;

/// Generate a length-`horizon` demand series for the given regime.
pub fn generate_series(
    horizon: Week,
    base_demand: f64,
    regime: DemandRegime,
    volatility: f64,
    rng: &mut SimRng,
) -> Vec<f64> {
    let mut series = Vec::with_capacity(horizon as usize);

    for t in 0..horizon {
        let noise = volatility * rng.normal();

        let demand = match regime {
            DemandRegime::Consistent => base_demand * (1.0 + noise),
            // Adoption ramp: 80% of base at week 0, +2% per week.
            DemandRegime::Growth => base_demand * (0.8 + 0.02 * t as f64) * (1.0 + noise),
            DemandRegime::Volatile => base_demand * (1.0 + volatility * 4.0 * rng.normal()),
            // Hype envelope: exponential decay from 1.6x to 0.6x base.
            DemandRegime::HighToDecay => {
                let decay = 1.6 * (-(t as f64) / 10.0).exp() + 0.6;
                base_demand * decay * (1.0 + noise)
            }
        };

        series.push(demand.max(0.0));
    }

    series
}

/// Apply a one-off demand growth shock at `week`, decaying afterwards.
///
/// Weeks before the shock are untouched; from the shock week on, demand
/// is multiplied by `1 + magnitude * e^(-decay_rate * weeks_since)`.
pub fn apply_shock(series: &mut [f64], week: Week, magnitude: f64, decay_rate: f64) {
    for (t, demand) in series.iter_mut().enumerate() {
        if (t as Week) < week {
            continue;
        }
        let weeks_since = (t as Week - week) as f64;
        let multiplier = 1.0 + magnitude * (-decay_rate * weeks_since).exp();
        *demand *= multiplier;
    }
}
