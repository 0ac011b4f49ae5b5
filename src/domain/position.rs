//! Position tracking and the closed-trade ledger entry.

use chrono::NaiveDate;
use serde::Serialize;

/// An open long position. At most one exists during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_index: usize,
    /// Fill price including slippage.
    pub entry_price: f64,
    pub shares: u64,
    /// Cash debited at open, commission included.
    pub cost_basis: f64,
}

impl Position {
    /// Fractional change of a raw close against the fill price.
    pub fn pnl_pct(&self, close: f64) -> f64 {
        (close - self.entry_price) / self.entry_price
    }

    pub fn unrealized_pnl(&self, close: f64) -> f64 {
        (close - self.entry_price) * self.shares as f64
    }

    /// Committed cash plus unrealized gain at the raw close.
    pub fn mark_to_market(&self, close: f64) -> f64 {
        self.cost_basis + self.unrealized_pnl(close)
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "rule")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Index into the strategy's exit rules.
    Rule(usize),
}

/// A closed round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u64,
    pub pnl: f64,
    pub return_pct: f64,
    pub exit_reason: ExitReason,
}

/// Run-local position state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open(Position),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionState::Flat => None,
            PositionState::Open(p) => Some(p),
        }
    }

    /// Total valuation given free cash and the current close.
    pub fn equity(&self, cash: f64, close: f64) -> f64 {
        match self {
            PositionState::Flat => cash,
            PositionState::Open(p) => cash + p.mark_to_market(close),
        }
    }
}
