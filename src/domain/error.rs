//! Domain error types.

use chrono::NaiveDate;

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for ruleforge.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid {kind} rule #{index} '{rule}': {source}")]
    RuleParse {
        kind: RuleKind,
        index: usize,
        rule: String,
        #[source]
        source: ParseError,
    },

    #[error("no bars to replay")]
    NoBars,

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("bar {index} ({date}): {reason}")]
    Bar {
        index: usize,
        date: NaiveDate,
        reason: String,
    },

    #[error("run cancelled before bar {bar_index}")]
    Cancelled { bar_index: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which rule list a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Entry,
    Exit,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Entry => f.write_str("entry"),
            RuleKind::Exit => f.write_str("exit"),
        }
    }
}

impl ForgeError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ForgeError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised before any bar is replayed.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ForgeError::ConfigParse { .. }
                | ForgeError::ConfigInvalid { .. }
                | ForgeError::RuleParse { .. }
                | ForgeError::NoBars
        )
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ForgeError::Io(_) => 1,
            ForgeError::ConfigParse { .. } | ForgeError::ConfigInvalid { .. } => 2,
            ForgeError::RuleParse { .. } => 4,
            ForgeError::NoBars | ForgeError::Data { .. } => 5,
            ForgeError::Bar { .. } | ForgeError::Cancelled { .. } => 6,
        }
    }
}

impl From<&ForgeError> for std::process::ExitCode {
    fn from(err: &ForgeError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}
