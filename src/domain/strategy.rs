//! Strategy configuration, validation and signal checks.
//!
//! [`StrategyConfig`] is the raw, deserializable document (as authored by a
//! user or generated upstream). [`Strategy::new`] validates it and parses
//! every rule exactly once; the resulting [`Strategy`] is immutable and can
//! be shared across threads by reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::bar::Bar;
use super::error::{ForgeError, RuleKind};
use super::execution::{self, DEFAULT_COMMISSION, DEFAULT_SLIPPAGE, ExecutionCosts};
use super::field::{Field, FieldSource};
use super::position::{ExitReason, Position};
use super::rule_eval::{self, CompiledRule};

pub const DEFAULT_MAX_POSITION_SIZE: f64 = 0.2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetAllocation {
    pub max_position_size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub name: String,
    pub description: String,
    pub entry_rules: Vec<String>,
    pub exit_rules: Vec<String>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub max_position_size: Option<f64>,
    /// Nested form used by generated strategy documents. The top-level
    /// `max_position_size` wins when both are present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_allocation: Option<AssetAllocation>,
    pub commission: f64,
    pub slippage: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "Unnamed".to_string(),
            description: String::new(),
            entry_rules: Vec::new(),
            exit_rules: Vec::new(),
            stop_loss: None,
            take_profit: None,
            max_position_size: None,
            asset_allocation: None,
            commission: DEFAULT_COMMISSION,
            slippage: DEFAULT_SLIPPAGE,
        }
    }
}

impl StrategyConfig {
    pub fn effective_max_position_size(&self) -> f64 {
        self.max_position_size
            .or_else(|| {
                self.asset_allocation
                    .as_ref()
                    .and_then(|a| a.max_position_size)
            })
            .unwrap_or(DEFAULT_MAX_POSITION_SIZE)
    }
}

/// A validated strategy with pre-parsed rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub description: String,
    pub entry_rules: Vec<CompiledRule>,
    pub exit_rules: Vec<CompiledRule>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub max_position_size: f64,
    pub costs: ExecutionCosts,
}

impl Strategy {
    pub fn new(config: &StrategyConfig) -> Result<Self, ForgeError> {
        let max_position_size = config.effective_max_position_size();
        if max_position_size.is_nan() || max_position_size <= 0.0 || max_position_size > 1.0 {
            return Err(ForgeError::invalid(
                "strategy",
                "max_position_size",
                format!("must be in (0, 1], got {max_position_size}"),
            ));
        }

        let stop_loss = optional_threshold("stop_loss", config.stop_loss)?;
        let take_profit = optional_threshold("take_profit", config.take_profit)?;
        let costs = ExecutionCosts {
            commission: non_negative("strategy", "commission", config.commission)?,
            slippage: non_negative("strategy", "slippage", config.slippage)?,
        };

        Ok(Strategy {
            name: config.name.clone(),
            description: config.description.clone(),
            entry_rules: compile_rules(RuleKind::Entry, &config.entry_rules)?,
            exit_rules: compile_rules(RuleKind::Exit, &config.exit_rules)?,
            stop_loss,
            take_profit,
            max_position_size,
            costs,
        })
    }

    /// True when any entry rule holds on `bar`.
    pub fn check_entry(&self, bar: &impl FieldSource) -> bool {
        rule_eval::any_match(&self.entry_rules, bar)
    }

    /// First exit condition that fires, in order: stop-loss, take-profit,
    /// exit rules.
    pub fn check_exit(&self, position: &Position, bar: &Bar) -> Option<ExitReason> {
        if execution::stop_loss_hit(position, bar.close, self.stop_loss) {
            return Some(ExitReason::StopLoss);
        }
        if execution::take_profit_hit(position, bar.close, self.take_profit) {
            return Some(ExitReason::TakeProfit);
        }
        rule_eval::first_match(&self.exit_rules, bar).map(ExitReason::Rule)
    }

    /// Every field referenced by the entry and exit rules.
    pub fn fields(&self) -> BTreeSet<Field> {
        self.entry_rules
            .iter()
            .chain(&self.exit_rules)
            .flat_map(|r| r.expr.fields())
            .collect()
    }
}

fn compile_rules(kind: RuleKind, rules: &[String]) -> Result<Vec<CompiledRule>, ForgeError> {
    rules
        .iter()
        .enumerate()
        .map(|(index, text)| {
            CompiledRule::parse(text).map_err(|source| ForgeError::RuleParse {
                kind,
                index,
                rule: text.clone(),
                source,
            })
        })
        .collect()
}

/// Zero means disabled, same as omitted.
fn optional_threshold(key: &str, value: Option<f64>) -> Result<Option<f64>, ForgeError> {
    match value {
        None => Ok(None),
        Some(v) if v == 0.0 => Ok(None),
        Some(v) => non_negative("strategy", key, v).map(Some),
    }
}

pub(crate) fn non_negative(section: &str, key: &str, value: f64) -> Result<f64, ForgeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ForgeError::invalid(
            section,
            key,
            format!("must be a non-negative number, got {value}"),
        ))
    }
}
