//! JSON report adapter.

use serde::Serialize;
use std::fs;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ForgeError;
use crate::domain::strategy::Strategy;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct JsonReportAdapter {
    pub pretty: bool,
}

#[derive(Serialize)]
struct StrategySummary<'a> {
    name: &'a str,
    description: &'a str,
    entry_rules: Vec<&'a str>,
    exit_rules: Vec<&'a str>,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
    max_position_size: f64,
    commission: f64,
    slippage: f64,
}

#[derive(Serialize)]
struct Report<'a> {
    strategy: StrategySummary<'a>,
    #[serde(flatten)]
    result: &'a BacktestResult,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn render(&self, result: &BacktestResult, strategy: &Strategy) -> Result<String, ForgeError> {
        let report = Report {
            strategy: StrategySummary {
                name: &strategy.name,
                description: &strategy.description,
                entry_rules: strategy.entry_rules.iter().map(|r| r.source.as_str()).collect(),
                exit_rules: strategy.exit_rules.iter().map(|r| r.source.as_str()).collect(),
                stop_loss: strategy.stop_loss,
                take_profit: strategy.take_profit,
                max_position_size: strategy.max_position_size,
                commission: strategy.costs.commission,
                slippage: strategy.costs.slippage,
            },
            result,
        };
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        };
        rendered.map_err(|e| ForgeError::Data {
            reason: format!("failed to serialize report: {e}"),
        })
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        output_path: &str,
    ) -> Result<(), ForgeError> {
        let json = self.render(result, strategy)?;
        fs::write(output_path, json)?;
        Ok(())
    }
}
