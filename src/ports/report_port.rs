//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ForgeError;
use crate::domain::strategy::Strategy;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        output_path: &str,
    ) -> Result<(), ForgeError>;

    /// Default implementation: one `write` per run, suffixing the path with
    /// the run's position in the sweep.
    fn write_sweep(
        &self,
        results: &[(&Strategy, &BacktestResult)],
        output_path: &str,
    ) -> Result<(), ForgeError> {
        for (i, (strategy, result)) in results.iter().enumerate() {
            self.write(result, strategy, &format!("{output_path}.{i}"))?;
        }
        Ok(())
    }
}
