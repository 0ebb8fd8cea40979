//! Driver configuration.

use serde::{Deserialize, Serialize};

/// Default number of positions per page.
pub const DEFAULT_PAGE_SIZE: usize = 2048;

/// Default number of value warnings retained per driver.
pub const DEFAULT_MAX_WARNINGS: usize = 20;

/// What an evaluator does when a single position cannot be computed
/// (malformed encoded value, overflow, division by zero).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueErrorPolicy {
    /// Emit null for that position and record a warning.
    #[default]
    NullWithWarning,
    /// Fail the whole evaluation.
    Fail,
}

/// Configuration for one execution partition and its driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Number of positions per page produced by sources.
    pub page_size: usize,
    /// Memory budget in bytes per driver context (`None` = unbounded).
    pub memory_limit: Option<usize>,
    /// Number of worker threads used to run partitions.
    pub partitions: usize,
    /// Policy for position-local evaluation failures.
    pub value_error_policy: ValueErrorPolicy,
    /// Number of warnings kept per driver context.
    pub max_warnings: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            memory_limit: None,
            partitions: 1,
            value_error_policy: ValueErrorPolicy::default(),
            max_warnings: DEFAULT_MAX_WARNINGS,
        }
    }
}

impl DriverConfig {
    /// Creates a new driver configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the memory budget in bytes.
    #[must_use]
    pub fn with_memory_limit(mut self, memory_limit: Option<usize>) -> Self {
        self.memory_limit = memory_limit;
        self
    }

    /// Sets the number of partitions.
    #[must_use]
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    /// Sets the value error policy.
    #[must_use]
    pub fn with_value_error_policy(mut self, policy: ValueErrorPolicy) -> Self {
        self.value_error_policy = policy;
        self
    }

    /// Sets how many warnings are retained.
    #[must_use]
    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.memory_limit, None);
        assert_eq!(config.value_error_policy, ValueErrorPolicy::NullWithWarning);
    }

    #[test]
    fn test_builder_chain() {
        let config = DriverConfig::new()
            .with_page_size(16)
            .with_memory_limit(Some(0))
            .with_partitions(4)
            .with_value_error_policy(ValueErrorPolicy::Fail);
        assert_eq!(config.page_size, 16);
        assert_eq!(config.memory_limit, Some(0));
        assert_eq!(config.partitions, 4);
        assert_eq!(config.value_error_policy, ValueErrorPolicy::Fail);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DriverConfig =
            serde_json::from_str(r#"{"memory_limit": 1024, "value_error_policy": "fail"}"#)
                .unwrap();
        assert_eq!(config.memory_limit, Some(1024));
        assert_eq!(config.value_error_policy, ValueErrorPolicy::Fail);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }
}
