//! Engine tuning options.
//!
//! Durations are integer milliseconds in configuration and exposed as
//! `Duration` accessors. Every field has a default, so an empty TOML
//! table is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("failed to read options file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Forwarder tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct Options {
    /// Interval between unroute-timeout worker checks, and the idle
    /// threshold those checks enforce. Larger values delay session
    /// reclamation.
    #[serde(default = "default_xgress_close_check_interval_ms")]
    pub xgress_close_check_interval_ms: u64,

    /// Idle threshold after which the scanner unilaterally reaps a
    /// session with no xgress receive activity.
    #[serde(default = "default_idle_session_timeout_ms")]
    pub idle_session_timeout_ms: u64,

    /// Interval between idle scans. Zero disables the scanner.
    #[serde(default = "default_idle_scan_interval_ms")]
    pub idle_scan_interval_ms: u64,

    /// Capacity of the faulter's submission queue. Reports beyond it are
    /// dropped with a warning.
    #[serde(default = "default_fault_report_capacity")]
    pub fault_report_capacity: usize,

    /// Interval between fault flushes to the control plane.
    #[serde(default = "default_fault_flush_interval_ms")]
    pub fault_flush_interval_ms: u64,
}

fn default_xgress_close_check_interval_ms() -> u64 {
    5_000
}

fn default_idle_session_timeout_ms() -> u64 {
    60_000
}

fn default_idle_scan_interval_ms() -> u64 {
    10_000
}

fn default_fault_report_capacity() -> usize {
    1_024
}

fn default_fault_flush_interval_ms() -> u64 {
    1_000
}

impl Default for Options {
    fn default() -> Self {
        Self {
            xgress_close_check_interval_ms: default_xgress_close_check_interval_ms(),
            idle_session_timeout_ms: default_idle_session_timeout_ms(),
            idle_scan_interval_ms: default_idle_scan_interval_ms(),
            fault_report_capacity: default_fault_report_capacity(),
            fault_flush_interval_ms: default_fault_flush_interval_ms(),
        }
    }
}

impl Options {
    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Parse options from a TOML string.
    pub fn parse(s: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(s)?)
    }

    #[must_use]
    pub fn xgress_close_check_interval(&self) -> Duration {
        Duration::from_millis(self.xgress_close_check_interval_ms)
    }

    #[must_use]
    pub fn idle_session_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_session_timeout_ms)
    }

    #[must_use]
    pub fn idle_scan_interval(&self) -> Duration {
        Duration::from_millis(self.idle_scan_interval_ms)
    }

    #[must_use]
    pub fn fault_flush_interval(&self) -> Duration {
        Duration::from_millis(self.fault_flush_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert_eq!(options.xgress_close_check_interval(), Duration::from_secs(5));
        assert_eq!(options.idle_session_timeout(), Duration::from_secs(60));
        assert_eq!(options.idle_scan_interval(), Duration::from_secs(10));
        assert_eq!(options.fault_report_capacity, 1_024);
        assert_eq!(options.fault_flush_interval(), Duration::from_secs(1));
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let options = Options::parse("").unwrap();
        assert_eq!(options.idle_session_timeout_ms, 60_000);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let options = Options::parse(
            "xgress_close_check_interval_ms = 250\nidle_scan_interval_ms = 0\n",
        )
        .unwrap();

        assert_eq!(
            options.xgress_close_check_interval(),
            Duration::from_millis(250)
        );
        assert!(options.idle_scan_interval().is_zero());
        assert_eq!(options.idle_session_timeout_ms, 60_000);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Options::parse("idle_session_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, OptionsError::Parse(_)));
    }
}
