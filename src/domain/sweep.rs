//! Parallel parameter sweeps.
//!
//! Runs share nothing mutable: each worker reads the same bar slice and its
//! own strategy, so results are identical to sequential
//! [`run_backtest`](super::backtest::run_backtest) calls and come back in
//! input order.

use rayon::prelude::*;
use std::sync::atomic::AtomicBool;

use super::backtest::{BacktestConfig, BacktestResult, run_backtest_with_cancel};
use super::bar::Bar;
use super::error::ForgeError;
use super::strategy::Strategy;

pub fn run_sweep(
    strategies: &[Strategy],
    bars: &[Bar],
    config: &BacktestConfig,
) -> Vec<Result<BacktestResult, ForgeError>> {
    run_sweep_with_cancel(strategies, bars, config, &AtomicBool::new(false))
}

/// Setting `cancel` stops every in-flight run at its next bar boundary.
pub fn run_sweep_with_cancel(
    strategies: &[Strategy],
    bars: &[Bar],
    config: &BacktestConfig,
    cancel: &AtomicBool,
) -> Vec<Result<BacktestResult, ForgeError>> {
    strategies
        .par_iter()
        .map(|strategy| run_backtest_with_cancel(strategy, bars, config, cancel))
        .collect()
}
