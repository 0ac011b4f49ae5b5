//! Point-in-time signal check for alerting.
//!
//! Evaluates a strategy against the most recent bar without any capital
//! accounting. Exit conditions are checked against a notional position
//! entered at the current close, so in practice only exit rules can fire.

use serde::Serialize;
use std::collections::BTreeMap;

use super::bar::Bar;
use super::error::ForgeError;
use super::field::{Field, FieldSource};
use super::position::{ExitReason, Position};
use super::strategy::Strategy;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalCheck {
    pub entry_matched: bool,
    pub exit_matched: bool,
    pub exit_reason: Option<ExitReason>,
    /// Defined values of `close` and every field the rules reference,
    /// rounded to 4 decimals.
    pub current_values: BTreeMap<String, f64>,
}

/// Check entry/exit conditions on the latest of `bars`. Fewer than two bars
/// yields no signal.
pub fn check_signal(strategy: &Strategy, bars: &[Bar]) -> Result<SignalCheck, ForgeError> {
    if bars.len() < 2 {
        return Ok(SignalCheck::default());
    }
    let index = bars.len() - 1;
    let current = &bars[index];
    if !current.close.is_finite() || current.close <= 0.0 {
        return Err(ForgeError::Bar {
            index,
            date: current.date,
            reason: format!("close must be a positive finite number, got {}", current.close),
        });
    }

    let entry_matched = strategy.check_entry(current);
    let notional = Position {
        entry_date: current.date,
        entry_index: index,
        entry_price: current.close,
        shares: 1,
        cost_basis: current.close,
    };
    let exit_reason = strategy.check_exit(&notional, current);

    let mut fields = strategy.fields();
    fields.insert(Field::Close);
    let current_values = fields
        .into_iter()
        .filter_map(|f| current.value(f).map(|v| (f.name().to_string(), round4(v))))
        .collect();

    Ok(SignalCheck {
        entry_matched,
        exit_matched: exit_reason.is_some(),
        exit_reason,
        current_values,
    })
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::StrategyConfig;
    use chrono::NaiveDate;

    fn strategy() -> Strategy {
        Strategy::new(&StrategyConfig {
            entry_rules: vec!["rsi < 30 and sentiment_score > 0.6".into()],
            exit_rules: vec!["rsi > 70".into()],
            stop_loss: Some(0.05),
            take_profit: Some(0.1),
            ..StrategyConfig::default()
        })
        .unwrap()
    }

    fn bar(d: u32, close: f64) -> Bar {
        Bar::new(NaiveDate::from_ymd_opt(2024, 3, d).unwrap(), close)
    }

    #[test]
    fn too_few_bars() {
        let check = check_signal(&strategy(), &[bar(1, 10.0).with(Field::Rsi, 5.0)]).unwrap();
        assert_eq!(check, SignalCheck::default());
        assert!(check_signal(&strategy(), &[]).unwrap().current_values.is_empty());
    }

    #[test]
    fn entry_on_latest_bar() {
        let bars = vec![
            bar(1, 100.0).with(Field::Rsi, 50.0),
            bar(2, 98.123456)
                .with(Field::Rsi, 25.0)
                .with(Field::SentimentScore, 0.7)
                .with(Field::Macd, 1.0),
        ];
        let check = check_signal(&strategy(), &bars).unwrap();
        assert!(check.entry_matched);
        assert!(!check.exit_matched);
        assert_eq!(check.current_values.get("close"), Some(&98.1235));
        assert_eq!(check.current_values.get("rsi"), Some(&25.0));
        assert_eq!(check.current_values.get("sentiment_score"), Some(&0.7));
        assert!(!check.current_values.contains_key("macd"));
    }

    #[test]
    fn only_latest_bar_is_used() {
        let bars = vec![
            bar(1, 100.0).with(Field::Rsi, 20.0).with(Field::SentimentScore, 0.9),
            bar(2, 100.0).with(Field::Rsi, 80.0),
        ];
        let check = check_signal(&strategy(), &bars).unwrap();
        assert!(!check.entry_matched);
        assert!(check.exit_matched);
        assert_eq!(check.exit_reason, Some(ExitReason::Rule(0)));
        assert!(!check.current_values.contains_key("sentiment_score"));
    }

    #[test]
    fn invalid_latest_close() {
        let bars = vec![bar(1, 100.0), bar(2, 0.0)];
        assert!(matches!(
            check_signal(&strategy(), &bars),
            Err(ForgeError::Bar { index: 1, .. })
        ));
    }
}
