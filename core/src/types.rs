//! Shared primitive types used across the entire engine.

/// A simulation step. One week = one step.
pub type Week = u32;

/// Index of one Monte Carlo run inside an aggregation.
pub type RunIndex = u32;
