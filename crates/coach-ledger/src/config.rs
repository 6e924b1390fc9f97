use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry discipline for optimistic commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Total commit attempts before a conflict is surfaced. Values below 1 count as 1.
    pub max_attempts: u32,
    /// Pause between attempts, multiplied by the attempt number. Zero yields the thread instead.
    pub backoff_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_ms: 0,
        }
    }
}

impl LedgerConfig {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub(crate) fn pause(&self, attempt: u32) {
        if self.backoff_ms == 0 {
            std::thread::yield_now();
        } else {
            std::thread::sleep(Duration::from_millis(self.backoff_ms.saturating_mul(attempt as u64)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_four_attempts() {
        let config = LedgerConfig::default();
        assert_eq!(config.attempts(), 4);
        assert_eq!(config.backoff_ms, 0);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let config = LedgerConfig {
            max_attempts: 0,
            ..LedgerConfig::default()
        };
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"backoff_ms": 5}"#).unwrap();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.backoff_ms, 5);
    }
}
