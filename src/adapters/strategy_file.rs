//! Strategy documents on disk.
//!
//! `.json` files hold either one strategy object or an array of them;
//! any other extension is read as INI with a `[strategy]` section.
//! Rules are loaded as text; [`Strategy::new`] parses them.
//!
//! [`Strategy::new`]: crate::domain::strategy::Strategy::new

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::get_optional_double;
use crate::domain::error::ForgeError;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(StrategyConfig),
    Many(Vec<StrategyConfig>),
}

/// Load every strategy in `path`.
pub fn load_strategies(path: &Path) -> Result<Vec<StrategyConfig>, ForgeError> {
    if is_json(path) {
        let content = fs::read_to_string(path)?;
        parse_json(&content).map_err(|reason| ForgeError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    } else {
        let adapter = FileConfigAdapter::from_file(path)?;
        Ok(vec![strategy_from_config(&adapter)?])
    }
}

/// Load exactly one strategy from `path`.
pub fn load_strategy(path: &Path) -> Result<StrategyConfig, ForgeError> {
    let mut all = load_strategies(path)?;
    if all.len() != 1 {
        return Err(ForgeError::ConfigParse {
            file: path.display().to_string(),
            reason: format!("expected one strategy, found {}", all.len()),
        });
    }
    Ok(all.remove(0))
}

pub fn parse_json(content: &str) -> Result<Vec<StrategyConfig>, String> {
    match serde_json::from_str::<OneOrMany>(content).map_err(|e| e.to_string())? {
        OneOrMany::One(s) => Ok(vec![s]),
        OneOrMany::Many(v) => Ok(v),
    }
}

/// Build a [`StrategyConfig`] from the `[strategy]` section, defaults for
/// anything omitted.
pub fn strategy_from_config(config: &dyn ConfigPort) -> Result<StrategyConfig, ForgeError> {
    let defaults = StrategyConfig::default();

    Ok(StrategyConfig {
        name: config
            .get_string("strategy", "name")
            .unwrap_or(defaults.name),
        description: config
            .get_string("strategy", "description")
            .unwrap_or_default(),
        entry_rules: config.get_list("strategy", "entry_rules"),
        exit_rules: config.get_list("strategy", "exit_rules"),
        stop_loss: get_optional_double(config, "strategy", "stop_loss")?,
        take_profit: get_optional_double(config, "strategy", "take_profit")?,
        max_position_size: get_optional_double(config, "strategy", "max_position_size")?,
        asset_allocation: None,
        commission: get_optional_double(config, "strategy", "commission")?
            .unwrap_or(defaults.commission),
        slippage: get_optional_double(config, "strategy", "slippage")?
            .unwrap_or(defaults.slippage),
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
