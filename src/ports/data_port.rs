//! Data access port trait.

use crate::domain::bar::Bar;
use crate::domain::error::ForgeError;
use chrono::NaiveDate;

/// Source of pre-computed bars for one instrument.
pub trait DataPort {
    /// Bars for `symbol` within the inclusive date range, oldest first.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, ForgeError>;
}
