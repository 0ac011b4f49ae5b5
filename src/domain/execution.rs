//! Trade execution and fill simulation.
//!
//! Implements entry/exit fills with slippage, whole-share sizing,
//! proportional commissions, and stop-loss/take-profit trigger checks.
//! All rates are fractions (`0.001` is 0.1%).

use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::position::{ExitReason, Position, Trade};

pub const DEFAULT_COMMISSION: f64 = 0.001;
pub const DEFAULT_SLIPPAGE: f64 = 0.0005;

/// Transaction cost model applied on both legs of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionCosts {
    pub commission: f64,
    pub slippage: f64,
}

impl Default for ExecutionCosts {
    fn default() -> Self {
        ExecutionCosts {
            commission: DEFAULT_COMMISSION,
            slippage: DEFAULT_SLIPPAGE,
        }
    }
}

/// Buy fill: market_price * (1 + slippage)
pub fn apply_slippage_entry(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 + slippage)
}

/// Sell fill: market_price * (1 - slippage)
pub fn apply_slippage_exit(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 - slippage)
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered(Position),
    /// Sizing produced no notional to commit.
    InsufficientCapital,
}

/// Open a long position on `bar`.
///
/// 1. Apply slippage to the close
/// 2. Notional = available_capital * max_position_size
/// 3. Shares = floor(notional / fill), at least 1 when notional > 0
/// 4. Cost basis = shares * fill * (1 + commission)
///
/// The caller debits `cost_basis` from its cash. The one-share floor can
/// commit more than the notional on under-capitalised runs.
pub fn open_position(
    bar: &Bar,
    bar_index: usize,
    available_capital: f64,
    max_position_size: f64,
    costs: &ExecutionCosts,
) -> EntryResult {
    let notional = available_capital * max_position_size;
    if notional.is_nan() || notional <= 0.0 {
        return EntryResult::InsufficientCapital;
    }

    let entry_price = apply_slippage_entry(bar.close, costs.slippage);
    let shares = ((notional / entry_price).floor() as u64).max(1);
    let cost_basis = shares as f64 * entry_price * (1.0 + costs.commission);

    EntryResult::Entered(Position {
        entry_date: bar.date,
        entry_index: bar_index,
        entry_price,
        shares,
        cost_basis,
    })
}

/// Close `position` on `bar`. The caller credits `net proceeds`, which is
/// `cost_basis + pnl` of the returned trade.
pub fn close_position(
    bar: &Bar,
    bar_index: usize,
    position: Position,
    reason: ExitReason,
    costs: &ExecutionCosts,
) -> Trade {
    let exit_price = apply_slippage_exit(bar.close, costs.slippage);
    let gross = position.shares as f64 * exit_price;
    let net = gross * (1.0 - costs.commission);
    let pnl = net - position.cost_basis;
    let return_pct = if position.cost_basis != 0.0 {
        pnl / position.cost_basis
    } else {
        0.0
    };

    Trade {
        entry_date: position.entry_date,
        exit_date: bar.date,
        entry_index: position.entry_index,
        exit_index: bar_index,
        entry_price: position.entry_price,
        exit_price,
        shares: position.shares,
        pnl,
        return_pct,
        exit_reason: reason,
    }
}

/// Net cash returned to the account by a closed trade.
pub fn net_proceeds(trade: &Trade, cost_basis: f64) -> f64 {
    cost_basis + trade.pnl
}

/// `(close - entry) / entry <= -stop_loss`. Disabled when `None`.
pub fn stop_loss_hit(position: &Position, close: f64, stop_loss: Option<f64>) -> bool {
    stop_loss.is_some_and(|sl| position.pnl_pct(close) <= -sl)
}

/// `(close - entry) / entry >= take_profit`. Disabled when `None`.
pub fn take_profit_hit(position: &Position, close: f64, take_profit: Option<f64>) -> bool {
    take_profit.is_some_and(|tp| position.pnl_pct(close) >= tp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> Bar {
        Bar::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), close)
    }

    fn no_costs() -> ExecutionCosts {
        ExecutionCosts {
            commission: 0.0,
            slippage: 0.0,
        }
    }

    fn entered(result: EntryResult) -> Position {
        match result {
            EntryResult::Entered(p) => p,
            EntryResult::InsufficientCapital => panic!("expected entry"),
        }
    }

    #[test]
    fn default_costs() {
        let costs = ExecutionCosts::default();
        assert_eq!(costs.commission, 0.001);
        assert_eq!(costs.slippage, 0.0005);
    }

    #[test]
    fn slippage_moves_against_trader() {
        assert_relative_eq!(apply_slippage_entry(100.0, 0.01), 101.0, max_relative = 1e-12);
        assert_relative_eq!(apply_slippage_exit(100.0, 0.01), 99.0, max_relative = 1e-12);
    }

    #[test]
    fn open_without_costs() {
        let pos = entered(open_position(&bar(2, 100.0), 1, 10_000.0, 0.2, &no_costs()));
        assert_eq!(pos.shares, 20);
        assert_relative_eq!(pos.entry_price, 100.0);
        assert_relative_eq!(pos.cost_basis, 2000.0);
        assert_eq!(pos.entry_index, 1);
    }

    #[test]
    fn open_with_costs() {
        let costs = ExecutionCosts {
            commission: 0.001,
            slippage: 0.0005,
        };
        let pos = entered(open_position(&bar(2, 100.0), 1, 100_000.0, 0.2, &costs));
        // 20_000 / 100.05 = 199.9 -> 199 shares
        assert_eq!(pos.shares, 199);
        assert_relative_eq!(pos.entry_price, 100.05, max_relative = 1e-12);
        assert_relative_eq!(pos.cost_basis, 199.0 * 100.05 * 1.001, max_relative = 1e-12);
    }

    #[test]
    fn open_floors_to_one_share() {
        let pos = entered(open_position(&bar(2, 500.0), 1, 1000.0, 0.2, &no_costs()));
        assert_eq!(pos.shares, 1);
        assert_relative_eq!(pos.cost_basis, 500.0);
    }

    #[test]
    fn open_with_no_capital() {
        assert_eq!(
            open_position(&bar(2, 100.0), 1, 0.0, 0.2, &no_costs()),
            EntryResult::InsufficientCapital
        );
        assert_eq!(
            open_position(&bar(2, 100.0), 1, -50.0, 0.2, &no_costs()),
            EntryResult::InsufficientCapital
        );
    }

    #[test]
    fn close_loss_without_costs() {
        let pos = entered(open_position(&bar(2, 100.0), 1, 10_000.0, 0.2, &no_costs()));
        let cost_basis = pos.cost_basis;
        let trade = close_position(&bar(4, 97.0), 3, pos, ExitReason::Rule(0), &no_costs());
        assert_relative_eq!(trade.pnl, -60.0);
        assert_relative_eq!(trade.return_pct, -0.03);
        assert_relative_eq!(net_proceeds(&trade, cost_basis), 1940.0);
        assert_eq!(trade.exit_index, 3);
        assert_eq!(trade.exit_reason, ExitReason::Rule(0));
    }

    #[test]
    fn close_with_costs() {
        let costs = ExecutionCosts {
            commission: 0.01,
            slippage: 0.01,
        };
        let pos = entered(open_position(&bar(2, 100.0), 1, 10_000.0, 0.5, &costs));
        // fill 101, 49 shares, cost 49 * 101 * 1.01
        assert_eq!(pos.shares, 49);
        let cost_basis = 49.0 * 101.0 * 1.01;
        assert_relative_eq!(pos.cost_basis, cost_basis, max_relative = 1e-12);

        let trade = close_position(&bar(3, 110.0), 2, pos, ExitReason::TakeProfit, &costs);
        let net = 49.0 * 108.9 * 0.99;
        assert_relative_eq!(trade.exit_price, 108.9, max_relative = 1e-12);
        assert_relative_eq!(trade.pnl, net - cost_basis, max_relative = 1e-9);
        assert_relative_eq!(trade.return_pct, (net - cost_basis) / cost_basis, max_relative = 1e-9);
    }

    #[test]
    fn stop_loss_trigger() {
        let pos = entered(open_position(&bar(2, 100.0), 1, 10_000.0, 0.2, &no_costs()));
        assert!(stop_loss_hit(&pos, 95.0, Some(0.05)));
        assert!(stop_loss_hit(&pos, 90.0, Some(0.05)));
        assert!(!stop_loss_hit(&pos, 96.0, Some(0.05)));
        assert!(!stop_loss_hit(&pos, 1.0, None));
    }

    #[test]
    fn take_profit_trigger() {
        let pos = entered(open_position(&bar(2, 100.0), 1, 10_000.0, 0.2, &no_costs()));
        assert!(take_profit_hit(&pos, 110.0, Some(0.10)));
        assert!(!take_profit_hit(&pos, 109.0, Some(0.10)));
        assert!(!take_profit_hit(&pos, 1000.0, None));
    }
}
