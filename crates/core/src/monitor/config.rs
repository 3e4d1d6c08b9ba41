//! Monitor configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the background library monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Start the monitor with the server.
    /// When disabled, cycles only run on demand via API.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between the end of one cycle and the start of the next.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// How often the idle loop checks for a stop request (milliseconds).
    #[serde(default = "default_poll_tick")]
    pub poll_tick_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    30
}

fn default_poll_tick() -> u64 {
    100
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
            poll_tick_ms: default_poll_tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 30);
        assert_eq!(config.poll_tick_ms, 100);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            interval_secs = 120
        "#;
        let config: MonitorConfig = toml::from_str(toml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 120);
        assert_eq!(config.poll_tick_ms, 100);
    }

    #[test]
    fn test_deserialize_disabled() {
        let config: MonitorConfig = toml::from_str("enabled = false").unwrap();
        assert!(!config.enabled);
    }
}
