//! Dispatcher configuration.

use serde::Deserialize;
use std::time::Duration;

/// Tunables for a [`Dispatcher`](crate::Dispatcher).
///
/// Deserializable so an embedding process can load it however it likes;
/// missing fields fall back to [`DispatchConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Buffered messages per streaming channel before `send` suspends.
    pub channel_capacity: usize,
    /// Deadline applied to calls that arrive without one.
    pub default_timeout_ms: Option<u64>,
}

impl DispatchConfig {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            default_timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: DispatchConfig = serde_json::from_str(r#"{"default_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.channel_capacity, 32);
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(250)));
    }
}
