//! Per-period market and indicator snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::field::{Field, FieldSource};

/// One bar of pre-computed market data.
///
/// Only `close` is required. Indicator fields are `None` when the upstream
/// producer had no value for the period (warm-up windows, missing news).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd_signal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd_diff: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma_20: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma_50: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
}

impl Bar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Bar {
            date,
            close,
            rsi: None,
            macd: None,
            macd_signal: None,
            macd_diff: None,
            sma_20: None,
            sma_50: None,
            bb_high: None,
            bb_low: None,
            volume_ratio: None,
            sentiment_score: None,
        }
    }

    /// Builder-style setter, mostly for tests and adapters.
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Sets a field. Setting `close` to `None` stores NaN, which the engine
    /// rejects when the bar is replayed.
    pub fn set(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::Close => {
                self.close = value.unwrap_or(f64::NAN);
                return;
            }
            Field::Rsi => &mut self.rsi,
            Field::Macd => &mut self.macd,
            Field::MacdSignal => &mut self.macd_signal,
            Field::MacdDiff => &mut self.macd_diff,
            Field::Sma20 => &mut self.sma_20,
            Field::Sma50 => &mut self.sma_50,
            Field::BbHigh => &mut self.bb_high,
            Field::BbLow => &mut self.bb_low,
            Field::VolumeRatio => &mut self.volume_ratio,
            Field::SentimentScore => &mut self.sentiment_score,
        };
        *slot = value;
    }

    fn raw(&self, field: Field) -> Option<f64> {
        match field {
            Field::Close => Some(self.close),
            Field::Rsi => self.rsi,
            Field::Macd => self.macd,
            Field::MacdSignal => self.macd_signal,
            Field::MacdDiff => self.macd_diff,
            Field::Sma20 => self.sma_20,
            Field::Sma50 => self.sma_50,
            Field::BbHigh => self.bb_high,
            Field::BbLow => self.bb_low,
            Field::VolumeRatio => self.volume_ratio,
            Field::SentimentScore => self.sentiment_score,
        }
    }
}

impl FieldSource for Bar {
    fn value(&self, field: Field) -> Option<f64> {
        self.raw(field).filter(|v| v.is_finite())
    }
}
