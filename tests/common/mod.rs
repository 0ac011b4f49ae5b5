#![allow(dead_code)]

use chrono::NaiveDate;
use ruleforge::domain::backtest::BacktestConfig;
use ruleforge::domain::bar::Bar;
use ruleforge::domain::error::ForgeError;
use ruleforge::domain::field::Field;
use ruleforge::domain::strategy::{Strategy, StrategyConfig};
use ruleforge::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, ForgeError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ForgeError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn rsi_bar(date: NaiveDate, rsi: f64, close: f64) -> Bar {
    Bar::new(date, close).with(Field::Rsi, rsi)
}

/// Bars on consecutive days from 2024-01-01, one per `(rsi, close)` pair.
pub fn rsi_bars(points: &[(f64, f64)]) -> Vec<Bar> {
    let start = date(2024, 1, 1);
    points
        .iter()
        .enumerate()
        .map(|(i, &(rsi, close))| rsi_bar(start + chrono::Duration::days(i as i64), rsi, close))
        .collect()
}

/// Deterministic oscillating series long enough to produce several trades.
pub fn generate_bars(count: usize, start_price: f64) -> Vec<Bar> {
    let start = date(2023, 1, 2);
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = start_price + (t * 0.3).sin() * start_price * 0.08 + t * 0.05;
            Bar::new(start + chrono::Duration::days(i as i64), close)
                .with(Field::Rsi, 50.0 + (t * 0.3).cos() * 35.0)
                .with(Field::Sma20, close - (t * 0.1).sin())
                .with(Field::Sma50, close)
                .with(Field::SentimentScore, 0.5 + (t * 0.7).sin() * 0.4)
        })
        .collect()
}

pub fn make_strategy(entry: &[&str], exit: &[&str]) -> Strategy {
    Strategy::new(&StrategyConfig {
        name: "Test".into(),
        entry_rules: entry.iter().map(|s| s.to_string()).collect(),
        exit_rules: exit.iter().map(|s| s.to_string()).collect(),
        ..StrategyConfig::default()
    })
    .unwrap()
}

/// RSI mean reversion with a 5% stop and 10% target.
pub fn make_rsi_strategy() -> Strategy {
    Strategy::new(&StrategyConfig {
        name: "RSI Reversion".into(),
        entry_rules: vec!["rsi < 30".into()],
        exit_rules: vec!["rsi > 70".into()],
        stop_loss: Some(0.05),
        take_profit: Some(0.10),
        max_position_size: Some(0.2),
        ..StrategyConfig::default()
    })
    .unwrap()
}

pub fn frictionless_config(initial_capital: f64) -> BacktestConfig {
    BacktestConfig::new(initial_capital, 0.0, 0.0)
}
