//! Performance metrics and statistics.
//!
//! Every ratio has an explicit guarded default so a degenerate run (flat
//! equity, no trades, no losing trades) yields finite numbers.

use serde::Serialize;

use super::position::Trade;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annual_return: f64,
    pub sharpe_ratio: f64,
    /// Most negative drawdown, e.g. `-0.25` for a 25% peak-to-trough fall.
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// Zero when there are no losing trades, which also covers "no trades".
    pub profit_factor: f64,
    pub total_trades: usize,
    pub avg_trade: f64,
    pub final_equity: f64,
}

impl Metrics {
    pub fn compute(equity_curve: &[f64], trades: &[Trade], bar_count: usize) -> Self {
        let first = equity_curve.first().copied().unwrap_or(0.0);
        let final_equity = equity_curve.last().copied().unwrap_or(0.0);

        let total_return = if first != 0.0 {
            final_equity / first - 1.0
        } else {
            0.0
        };

        let annual_return = annualize(total_return, bar_count);
        let sharpe_ratio = compute_sharpe(&period_returns(equity_curve));
        let max_drawdown = compute_max_drawdown(equity_curve);

        let total_trades = trades.len();
        let mut trades_won = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut total_pnl = 0.0_f64;

        for trade in trades {
            total_pnl += trade.pnl;
            if trade.pnl > 0.0 {
                trades_won += 1;
                gross_profit += trade.pnl;
            } else if trade.pnl < 0.0 {
                gross_loss += trade.pnl;
            }
        }
        let gross_loss = gross_loss.abs();

        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        };

        let avg_trade = if total_trades > 0 {
            total_pnl / total_trades as f64
        } else {
            0.0
        };

        Metrics {
            total_return,
            annual_return,
            sharpe_ratio,
            max_drawdown,
            win_rate,
            profit_factor,
            total_trades,
            avg_trade,
            final_equity,
        }
    }
}

/// `(1 + total_return)^(252 / bar_count) - 1`, with `bar_count` floored at 1.
/// A wiped-out or negative account annualizes to -100%.
fn annualize(total_return: f64, bar_count: usize) -> f64 {
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    let periods = bar_count.max(1) as f64;
    growth.powf(TRADING_DAYS_PER_YEAR / periods) - 1.0
}

/// Simple returns between consecutive equity values. Steps from a zero
/// valuation have no defined return and are skipped.
fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect()
}

/// Annualized mean over sample standard deviation; 0 when fewer than two
/// returns or when the deviation is zero.
fn compute_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 && stddev.is_finite() {
        mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// Minimum of `(equity - running_peak) / running_peak` over points whose
/// running peak is nonzero; 0 when no point qualifies.
fn compute_max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd: Option<f64> = None;

    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }
        if peak != 0.0 {
            let dd = (equity - peak) / peak;
            max_dd = Some(max_dd.map_or(dd, |m| m.min(dd)));
        }
    }

    max_dd.unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::ExitReason;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_trade(pnl: f64) -> Trade {
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Trade {
            entry_date,
            exit_date: entry_date + chrono::Duration::days(3),
            entry_index: 0,
            exit_index: 3,
            entry_price: 100.0,
            exit_price: 100.0 + pnl / 10.0,
            shares: 10,
            pnl,
            return_pct: pnl / 1000.0,
            exit_reason: ExitReason::Rule(0),
        }
    }

    #[test]
    fn metrics_flat_curve() {
        let equity = vec![10_000.0; 5];
        let m = Metrics::compute(&equity, &[], 5);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.annual_return, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.avg_trade, 0.0);
        assert_eq!(m.final_equity, 10_000.0);
    }

    #[test]
    fn metrics_total_return() {
        let m = Metrics::compute(&[100_000.0, 110_000.0], &[], 2);
        assert_relative_eq!(m.total_return, 0.10, max_relative = 1e-12);
        let m = Metrics::compute(&[100_000.0, 90_000.0], &[], 2);
        assert_relative_eq!(m.total_return, -0.10, max_relative = 1e-12);
    }

    #[test]
    fn metrics_total_return_zero_start() {
        let m = Metrics::compute(&[0.0, 50.0], &[], 2);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.final_equity, 50.0);
    }

    #[test]
    fn metrics_annual_return_over_one_year() {
        let mut equity = vec![100.0; 252];
        equity[251] = 110.0;
        let m = Metrics::compute(&equity, &[], 252);
        assert_relative_eq!(m.annual_return, 0.10, max_relative = 1e-9);
    }

    #[test]
    fn metrics_annual_return_compounds_short_runs() {
        let m = Metrics::compute(&[100.0, 101.0], &[], 126);
        assert_relative_eq!(m.annual_return, 1.01_f64.powi(2) - 1.0, max_relative = 1e-9);
    }

    #[test]
    fn annualize_guards() {
        assert_eq!(annualize(-1.0, 10), -1.0);
        assert_eq!(annualize(-1.5, 10), -1.0);
        assert_relative_eq!(annualize(0.01, 0), 1.01_f64.powf(252.0) - 1.0, max_relative = 1e-9);
    }

    #[test]
    fn sharpe_matches_sample_deviation() {
        let equity = [100.0, 101.0, 100.0, 102.0];
        let returns = period_returns(&equity);
        let mean = returns.iter().sum::<f64>() / 3.0;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 2.0;
        let expected = mean / var.sqrt() * 252.0_f64.sqrt();
        let m = Metrics::compute(&equity, &[], 4);
        assert_relative_eq!(m.sharpe_ratio, expected, max_relative = 1e-12);
        assert!(m.sharpe_ratio > 0.0);
    }

    #[test]
    fn sharpe_zero_for_constant_or_single_return() {
        assert_eq!(compute_sharpe(&[]), 0.0);
        assert_eq!(compute_sharpe(&[0.05]), 0.0);
        assert_eq!(compute_sharpe(&[0.01, 0.01, 0.01]), 0.0);
    }

    #[test]
    fn returns_skip_zero_valuation() {
        let returns = period_returns(&[0.0, 10.0, 12.0]);
        assert_eq!(returns.len(), 1);
        assert_relative_eq!(returns[0], 0.2, max_relative = 1e-12);
    }

    #[test]
    fn metrics_max_drawdown() {
        let equity = [100.0, 110.0, 90.0, 95.0, 80.0, 100.0];
        let m = Metrics::compute(&equity, &[], equity.len());
        assert_relative_eq!(m.max_drawdown, (80.0 - 110.0) / 110.0, max_relative = 1e-12);
    }

    #[test]
    fn max_drawdown_skips_zero_peak() {
        assert_eq!(compute_max_drawdown(&[0.0, 0.0]), 0.0);
        assert_eq!(compute_max_drawdown(&[]), 0.0);
        assert_relative_eq!(compute_max_drawdown(&[0.0, 10.0, 5.0]), -0.5);
    }

    #[test]
    fn metrics_trade_stats() {
        let trades = vec![
            make_trade(100.0),
            make_trade(-50.0),
            make_trade(200.0),
            make_trade(0.0),
        ];
        let m = Metrics::compute(&[10_000.0, 10_250.0], &trades, 2);
        assert_eq!(m.total_trades, 4);
        assert_relative_eq!(m.win_rate, 0.5);
        assert_relative_eq!(m.profit_factor, 6.0);
        assert_relative_eq!(m.avg_trade, 62.5);
    }

    #[test]
    fn profit_factor_zero_without_losses() {
        let trades = vec![make_trade(100.0), make_trade(20.0)];
        let m = Metrics::compute(&[10_000.0, 10_120.0], &trades, 2);
        assert_eq!(m.profit_factor, 0.0);
        assert_relative_eq!(m.win_rate, 1.0);
    }

    #[test]
    fn serializes_fixed_keys() {
        let m = Metrics::compute(&[1.0, 1.0], &[], 2);
        let value = serde_json::to_value(&m).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "annual_return",
                "avg_trade",
                "final_equity",
                "max_drawdown",
                "profit_factor",
                "sharpe_ratio",
                "total_return",
                "total_trades",
                "win_rate",
            ]
        );
    }
}
