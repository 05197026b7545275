//! Export configuration.

use std::env;
use std::str::FromStr;

use crate::buffer::DEFAULT_BUFFER_CAPACITY;

/// Tuning knobs for an export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Rows held back before the header is committed.
    pub buffer_capacity: usize,
    /// Per-request page size sent to the store. `None` lets the store decide.
    pub page_size: Option<i32>,
}

impl ExportConfig {
    /// Create configuration from environment variables.
    ///
    /// Unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            buffer_capacity: env_parse("DYNOCSV_BUFFER_CAPACITY")
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_BUFFER_CAPACITY),
            page_size: env_parse("DYNOCSV_PAGE_SIZE").filter(|s| *s > 0),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            page_size: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.buffer_capacity, 1000);
        assert_eq!(config.page_size, None);
    }
}
