//! Configuration types for the beacon system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Reporter daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Where to send reports
    pub collector: CollectorEndpoint,

    /// Cycle timing
    #[serde(default)]
    pub intervals: IntervalConfig,

    /// Capacity of the engine's event channel
    ///
    /// When full, new events are dropped (with a warning log). This
    /// bounds memory if nothing is draining the receiver.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ReporterConfig {
    /// Create a configuration for the given collector endpoint, with
    /// default intervals
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            collector: CollectorEndpoint {
                host: host.into(),
                port,
            },
            intervals: IntervalConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.collector.host.is_empty() {
            return Err(crate::Error::config("collector host cannot be empty"));
        }
        if self.collector.port == 0 {
            return Err(crate::Error::config("collector port cannot be 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "event channel capacity must be > 0",
            ));
        }
        Ok(())
    }
}

/// Network location of the collector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorEndpoint {
    /// Collector hostname or address
    pub host: String,
    /// Collector TCP port
    pub port: u16,
}

/// Cycle timing for the reporting engine
///
/// All three values are wall-clock seconds and must be positive. Values
/// missing from the configuration source take the defaults below; values
/// present but zero are replaced by the defaults with a warning (see
/// [`IntervalConfig::sanitized`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalConfig {
    /// Steady-state delay after a successful send, and the delay after
    /// abandoning a failed data point before resolving fresh identity
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Delay between consecutive failed-send attempts while still within
    /// the failure window
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// Maximum wall-clock span, measured from the first failure for a
    /// given identity, before that identity is abandoned
    #[serde(default = "default_max_retry_duration_secs")]
    pub max_retry_duration_secs: u64,
}

impl IntervalConfig {
    /// Replace invalid (zero) values with the documented defaults
    ///
    /// Logs a warning per substitution so a misconfigured deployment is
    /// visible without being fatal.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        if out.report_interval_secs == 0 {
            tracing::warn!(
                "report interval must be positive, falling back to {}s",
                default_report_interval_secs()
            );
            out.report_interval_secs = default_report_interval_secs();
        }
        if out.retry_interval_secs == 0 {
            tracing::warn!(
                "retry interval must be positive, falling back to {}s",
                default_retry_interval_secs()
            );
            out.retry_interval_secs = default_retry_interval_secs();
        }
        if out.max_retry_duration_secs == 0 {
            tracing::warn!(
                "max retry duration must be positive, falling back to {}s",
                default_max_retry_duration_secs()
            );
            out.max_retry_duration_secs = default_max_retry_duration_secs();
        }
        out
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval_secs(),
            retry_interval_secs: default_retry_interval_secs(),
            max_retry_duration_secs: default_max_retry_duration_secs(),
        }
    }
}

/// Collector daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Record storage backend
    #[serde(default)]
    pub store: StoreConfig,
}

impl CollectorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.bind_addr.is_empty() {
            return Err(crate::Error::config("bind address cannot be empty"));
        }
        if let StoreConfig::File { path } = &self.store
            && path.is_empty()
        {
            return Err(crate::Error::config(
                "file store path cannot be empty",
            ));
        }
        Ok(())
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            store: StoreConfig::default(),
        }
    }
}

/// Client store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// File-based store (durable)
    File {
        /// Path to the store file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

fn default_report_interval_secs() -> u64 {
    1800
}

fn default_retry_interval_secs() -> u64 {
    300
}

fn default_max_retry_duration_secs() -> u64 {
    86400
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_intervals_take_documented_defaults() {
        let cfg: ReporterConfig =
            serde_json::from_str(r#"{"collector": {"host": "collector.lan", "port": 5000}}"#)
                .unwrap();

        assert_eq!(cfg.intervals.report_interval_secs, 1800);
        assert_eq!(cfg.intervals.retry_interval_secs, 300);
        assert_eq!(cfg.intervals.max_retry_duration_secs, 86400);
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_intervals_are_sanitized_to_defaults() {
        let intervals = IntervalConfig {
            report_interval_secs: 0,
            retry_interval_secs: 0,
            max_retry_duration_secs: 0,
        };

        assert_eq!(intervals.sanitized(), IntervalConfig::default());
    }

    #[test]
    fn valid_intervals_pass_through_sanitize_unchanged() {
        let intervals = IntervalConfig {
            report_interval_secs: 60,
            retry_interval_secs: 10,
            max_retry_duration_secs: 600,
        };

        assert_eq!(intervals.sanitized(), intervals);
    }

    #[test]
    fn empty_collector_host_is_rejected() {
        let cfg = ReporterConfig::new("", 5000);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn collector_config_rejects_empty_file_path() {
        let cfg = CollectorConfig {
            bind_addr: default_bind_addr(),
            store: StoreConfig::File {
                path: String::new(),
            },
        };
        assert!(cfg.validate().is_err());
    }
}
