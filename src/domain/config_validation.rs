//! Configuration validation.
//!
//! Validates INI config fields before a backtest runs. Rule lists are
//! written on one line, separated by `|`.

use crate::domain::error::{ForgeError, RuleKind};
use crate::domain::rule_parser;
use crate::ports::config_port::ConfigPort;

pub const RULE_SEPARATOR: char = '|';

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ForgeError> {
    validate_non_negative(config, "backtest", "initial_capital")?;
    validate_non_negative(config, "backtest", "commission")?;
    validate_non_negative(config, "backtest", "slippage")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ForgeError> {
    validate_position_size(config)?;
    validate_non_negative(config, "strategy", "stop_loss")?;
    validate_non_negative(config, "strategy", "take_profit")?;
    validate_non_negative(config, "strategy", "commission")?;
    validate_non_negative(config, "strategy", "slippage")?;
    validate_rules(config, RuleKind::Entry, "entry_rules")?;
    validate_rules(config, RuleKind::Exit, "exit_rules")?;
    Ok(())
}

/// Reads an optional number, rejecting values that are present but not
/// numeric.
pub fn get_optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, ForgeError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ForgeError::invalid(section, key, format!("'{s}' is not a number"))),
    }
}

/// Splits a `|`-separated rule list, dropping blank entries.
pub fn split_rules(value: &str) -> Vec<String> {
    value
        .split(RULE_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), ForgeError> {
    match get_optional_double(config, section, key)? {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ForgeError::invalid(
            section,
            key,
            format!("{key} must be non-negative"),
        )),
        _ => Ok(()),
    }
}

fn validate_position_size(config: &dyn ConfigPort) -> Result<(), ForgeError> {
    match get_optional_double(config, "strategy", "max_position_size")? {
        Some(v) if v.is_nan() || v <= 0.0 || v > 1.0 => Err(ForgeError::invalid(
            "strategy",
            "max_position_size",
            "max_position_size must be in (0, 1]",
        )),
        _ => Ok(()),
    }
}

/// Rule errors keep their position so callers can point at the bad
/// character.
fn validate_rules(config: &dyn ConfigPort, kind: RuleKind, key: &str) -> Result<(), ForgeError> {
    for (index, rule) in config.get_list("strategy", key).into_iter().enumerate() {
        if let Err(source) = rule_parser::parse(&rule) {
            return Err(ForgeError::RuleParse {
                kind,
                index,
                rule,
                source,
            });
        }
    }
    Ok(())
}
