//! depin-core — stochastic simulation engine for token-incentivized
//! physical-infrastructure networks.
//!
//! The pipeline: a parameter set feeds the demand generator, the
//! single-run simulator advances provider agents and token flows week
//! by week, the Monte Carlo aggregator reduces N independent runs into
//! confidence-banded series, and the optimizer/calibrator treat that
//! aggregation as a black-box objective.
//!
//! Entry points for collaborators:
//!   - [`aggregate::aggregate`] — one full evaluation of a parameter set
//!   - [`optimizer`] — break-even, max-scale, defensive-emission,
//!     sensitivity searches
//!   - [`calibrate::calibrate`] — randomized fit against history

pub mod aggregate;
pub mod calibrate;
pub mod demand;
pub mod engine;
pub mod error;
pub mod fit;
pub mod optimizer;
pub mod params;
pub mod provider;
pub mod rng;
pub mod stats;
pub mod types;

pub use aggregate::{aggregate, AggregateWeek};
pub use calibrate::{calibrate, CalibrationConfig, CalibrationOutcome, HistoricalSeries};
pub use engine::{simulate_run, WeekState};
pub use error::{SimError, SimResult};
pub use params::{DemandRegime, EmissionModel, MacroCondition, RevenueStrategy, SimParams};
pub use stats::MetricSummary;
