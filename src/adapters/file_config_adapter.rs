//! INI file configuration adapter.

use crate::domain::error::ForgeError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ForgeError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| ForgeError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ForgeError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ForgeError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[backtest]
initial_capital = 10000
commission = 0.001
slippage = 0.0005

[strategy]
name = RSI Reversal
entry_rules = rsi < 30 and sentiment_score > 0.6 | macd_diff > 0.5
exit_rules = RSI > 70
stop_loss = 0.05

[sweep]
threads = 4

[report]
pretty = yes
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_keeps_rule_text() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("strategy", "entry_rules"),
            Some("rsi < 30 and sentiment_score > 0.6 | macd_diff > 0.5".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "exit_rules"),
            Some("RSI > 70".to_string())
        );
    }

    #[test]
    fn rule_lists_split_on_pipe() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_list("strategy", "entry_rules"),
            vec!["rsi < 30 and sentiment_score > 0.6", "macd_diff > 0.5"]
        );
        assert_eq!(adapter.get_list("strategy", "exit_rules"), vec!["RSI > 70"]);
        assert!(adapter.get_list("strategy", "missing").is_empty());
    }

    #[test]
    fn missing_keys_and_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("strategy", "take_profit"), None);
        assert_eq!(adapter.get_string("data", "dir"), None);
    }

    #[test]
    fn typed_getters() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_capital", 0.0), 10_000.0);
        assert_eq!(adapter.get_double("backtest", "commission", 1.0), 0.001);
        assert_eq!(adapter.get_int("sweep", "threads", 0), 4);
        assert!(adapter.get_bool("report", "pretty", false));
    }

    #[test]
    fn typed_getters_fall_back_to_default() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = lots\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_capital", 99.9), 99.9);
        assert_eq!(adapter.get_int("sweep", "threads", 0), 0);
        assert!(!adapter.get_bool("report", "pretty", false));
    }

    #[test]
    fn bool_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[report]\na = true\nb = On\nc = 0\nd = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("report", "a", false));
        assert!(adapter.get_bool("report", "b", false));
        assert!(!adapter.get_bool("report", "c", true));
        assert!(adapter.get_bool("report", "d", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("RSI Reversal".to_string())
        );
    }

    #[test]
    fn from_file_missing_file_is_config_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, ForgeError::ConfigParse { .. }));
        assert!(err.is_config_error());
    }
}
