//! Named numeric bar fields and field lookup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Every field a rule may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Close,
    Rsi,
    Macd,
    MacdSignal,
    MacdDiff,
    Sma20,
    Sma50,
    BbHigh,
    BbLow,
    VolumeRatio,
    SentimentScore,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Close,
        Field::Rsi,
        Field::Macd,
        Field::MacdSignal,
        Field::MacdDiff,
        Field::Sma20,
        Field::Sma50,
        Field::BbHigh,
        Field::BbLow,
        Field::VolumeRatio,
        Field::SentimentScore,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Close => "close",
            Field::Rsi => "rsi",
            Field::Macd => "macd",
            Field::MacdSignal => "macd_signal",
            Field::MacdDiff => "macd_diff",
            Field::Sma20 => "sma_20",
            Field::Sma50 => "sma_50",
            Field::BbHigh => "bb_high",
            Field::BbLow => "bb_low",
            Field::VolumeRatio => "volume_ratio",
            Field::SentimentScore => "sentiment_score",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Field> {
        let lower = name.to_ascii_lowercase();
        Field::ALL.iter().copied().find(|f| f.name() == lower)
    }

    pub fn known_names() -> String {
        Field::ALL
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view of a bar's field values.
///
/// `None` means the field is undefined for this bar. Implementations must
/// never report a non-finite value as defined.
pub trait FieldSource {
    fn value(&self, field: Field) -> Option<f64>;
}

impl FieldSource for HashMap<Field, f64> {
    fn value(&self, field: Field) -> Option<f64> {
        self.get(&field).copied().filter(|v| v.is_finite())
    }
}

impl FieldSource for HashMap<Field, Option<f64>> {
    fn value(&self, field: Field) -> Option<f64> {
        self.get(&field).copied().flatten().filter(|v| v.is_finite())
    }
}

/// Values keyed by canonical field name (`"rsi"`, `"sma_20"`), as they
/// arrive from JSON or other name-keyed records.
impl FieldSource for HashMap<String, Option<f64>> {
    fn value(&self, field: Field) -> Option<f64> {
        self.get(field.name())
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }
}
