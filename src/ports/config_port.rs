//! Configuration access port trait.

use crate::domain::config_validation::split_rules;

/// Typed access to sectioned `key = value` settings. Getters with a default
/// fall back to it when the key is missing or does not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// A `|`-separated list, blank entries dropped. Empty when the key is
    /// missing.
    fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get_string(section, key)
            .map(|v| split_rules(&v))
            .unwrap_or_default()
    }
}
