//! sim-runner: headless driver for the DePIN simulation engine.
//!
//! Usage:
//!   sim-runner --seed 42 --weeks 52 --sims 100
//!   sim-runner --seed 42 --diagnostics
//!
//! Runs one Monte Carlo aggregation with default parameters (plus the
//! flags above) and logs a summary; `--diagnostics` additionally runs
//! the optimizer procedures. Output goes to the log only — exporting
//! artifacts is a collaborator concern, not this binary's.

use anyhow::Result;
use depin_core::{aggregate, optimizer, SimParams};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u32);
    let weeks = parse_arg(&args, "--weeks", 52u32);
    let sims = parse_arg(&args, "--sims", 100u32);
    let diagnostics = args.iter().any(|a| a == "--diagnostics");

    let params = SimParams {
        seed,
        horizon_weeks: weeks,
        n_sims: sims,
        ..SimParams::default()
    };

    println!("depin sim-runner");
    println!("  seed:  {seed}");
    println!("  weeks: {weeks}");
    println!("  sims:  {sims}");
    println!();

    let series = aggregate(&params)?;
    let last = series.last().expect("horizon is validated positive");

    log::info!(
        "final week: price=${:.4} providers={:.1} utilization={:.1}% solvency={:.3}",
        last.price.mean,
        last.providers.mean,
        last.utilization_pct.mean,
        last.solvency_score.mean,
    );
    log::info!(
        "final week bands: price p10={:.4} p90={:.4}, providers p10={:.1} p90={:.1}",
        last.price.p10,
        last.price.p90,
        last.providers.p10,
        last.providers.p90,
    );

    if diagnostics {
        let break_even = optimizer::find_break_even_price(&params, 1.0)?;
        let max_scale = optimizer::find_max_scalable_supply(&params)?;
        let emission = optimizer::find_defensive_emission(&params)?;
        let sweep = optimizer::sensitivity_sweep(&params)?;

        log::info!("break-even price: ${break_even:.6}");
        log::info!("max scalable providers: {max_scale}");
        log::info!("defensive emission: {emission:.0}/week");
        for impact in &sweep {
            log::info!(
                "sensitivity {}: low={:.3} high={:.3} delta={:.3}",
                impact.parameter,
                impact.low,
                impact.high,
                impact.delta,
            );
        }
    }

    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
