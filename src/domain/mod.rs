//! Core domain types and logic.

pub mod field;
pub mod bar;
pub mod position;
pub mod execution;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod signal;
pub mod sweep;
pub mod config_validation;
pub mod error;
