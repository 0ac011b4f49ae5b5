//! Backtest engine and event loop.
//!
//! A run is a pure function of `(strategy, bars, config)`: it owns all of its
//! state, returns a fresh [`BacktestResult`], and never looks ahead. Bar 0
//! only seeds the equity curve; signals are evaluated from bar 1 onward.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::bar::Bar;
use super::error::ForgeError;
use super::execution::{self, EntryResult, ExecutionCosts};
use super::metrics::Metrics;
use super::position::{Position, PositionState, Trade};
use super::strategy::{Strategy, non_negative};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

/// Per-run parameters. `commission` and `slippage` override the strategy's
/// own cost settings when set.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub commission: Option<f64>,
    pub slippage: Option<f64>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission: None,
            slippage: None,
        }
    }
}

impl BacktestConfig {
    pub fn new(initial_capital: f64, commission: f64, slippage: f64) -> Self {
        BacktestConfig {
            initial_capital,
            commission: Some(commission),
            slippage: Some(slippage),
        }
    }

    /// Costs in effect for `strategy` under this config.
    pub fn costs_for(&self, strategy: &Strategy) -> Result<ExecutionCosts, ForgeError> {
        Ok(ExecutionCosts {
            commission: non_negative(
                "backtest",
                "commission",
                self.commission.unwrap_or(strategy.costs.commission),
            )?,
            slippage: non_negative(
                "backtest",
                "slippage",
                self.slippage.unwrap_or(strategy.costs.slippage),
            )?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub metrics: Metrics,
    pub trades: Vec<Trade>,
    /// One valuation per bar; index 0 is the initial capital.
    pub equity_curve: Vec<f64>,
    /// Still open at the last bar. Marked to market in the final equity,
    /// never converted to a trade.
    pub open_position: Option<Position>,
}

pub fn run_backtest(
    strategy: &Strategy,
    bars: &[Bar],
    config: &BacktestConfig,
) -> Result<BacktestResult, ForgeError> {
    run_backtest_with_cancel(strategy, bars, config, &AtomicBool::new(false))
}

/// Like [`run_backtest`], checking `cancel` before each bar. A cancelled run
/// returns [`ForgeError::Cancelled`] and no partial result.
pub fn run_backtest_with_cancel(
    strategy: &Strategy,
    bars: &[Bar],
    config: &BacktestConfig,
    cancel: &AtomicBool,
) -> Result<BacktestResult, ForgeError> {
    let initial_capital = non_negative("backtest", "initial_capital", config.initial_capital)?;
    let costs = config.costs_for(strategy)?;
    let first = bars.first().ok_or(ForgeError::NoBars)?;
    validate_bar(0, first, None)?;

    let mut cash = initial_capital;
    let mut state = PositionState::Flat;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());
    equity_curve.push(initial_capital);

    for (offset, pair) in bars.windows(2).enumerate() {
        let index = offset + 1;
        let (prev, bar) = (&pair[0], &pair[1]);

        if cancel.load(Ordering::Relaxed) {
            return Err(ForgeError::Cancelled { bar_index: index });
        }
        validate_bar(index, bar, Some(prev))?;

        state = match state {
            PositionState::Flat if strategy.check_entry(bar) => {
                match execution::open_position(bar, index, cash, strategy.max_position_size, &costs)
                {
                    EntryResult::Entered(position) => {
                        cash -= position.cost_basis;
                        debug!(
                            bar = index,
                            date = %bar.date,
                            shares = position.shares,
                            price = position.entry_price,
                            cost = position.cost_basis,
                            "entered position"
                        );
                        PositionState::Open(position)
                    }
                    EntryResult::InsufficientCapital => {
                        debug!(bar = index, cash, "entry signal skipped, no capital");
                        PositionState::Flat
                    }
                }
            }
            PositionState::Flat => PositionState::Flat,
            PositionState::Open(position) => match strategy.check_exit(&position, bar) {
                Some(reason) => {
                    let cost_basis = position.cost_basis;
                    let trade = execution::close_position(bar, index, position, reason, &costs);
                    cash += execution::net_proceeds(&trade, cost_basis);
                    debug!(
                        bar = index,
                        date = %bar.date,
                        price = trade.exit_price,
                        pnl = trade.pnl,
                        reason = ?trade.exit_reason,
                        "closed position"
                    );
                    trades.push(trade);
                    PositionState::Flat
                }
                None => PositionState::Open(position),
            },
        };

        equity_curve.push(state.equity(cash, bar.close));
    }

    let metrics = Metrics::compute(&equity_curve, &trades, bars.len());
    info!(
        strategy = %strategy.name,
        bars = bars.len(),
        trades = metrics.total_trades,
        final_equity = metrics.final_equity,
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        metrics,
        trades,
        equity_curve,
        open_position: state.position().cloned(),
    })
}

fn validate_bar(index: usize, bar: &Bar, prev: Option<&Bar>) -> Result<(), ForgeError> {
    if !bar.close.is_finite() || bar.close <= 0.0 {
        return Err(ForgeError::Bar {
            index,
            date: bar.date,
            reason: format!("close must be a positive finite number, got {}", bar.close),
        });
    }
    if let Some(prev) = prev.filter(|p| bar.date <= p.date) {
        return Err(ForgeError::Bar {
            index,
            date: bar.date,
            reason: format!("date is not after previous bar ({})", prev.date),
        });
    }
    Ok(())
}
