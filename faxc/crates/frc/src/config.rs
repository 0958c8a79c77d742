//! Configuration Module - Heap Tuning Parameters
//!
//! Manages the knobs of an [`crate::RcHeap`]. None of them change the
//! semantics of `retain` / `release` on a correct program; they only decide
//! how much checking, instrumentation and output surrounds them.

use crate::logging::{LogLevel, DEFAULT_MAX_EVENTS};
use crate::object::header::HEADER_SIZE;
use serde::{Deserialize, Serialize};

/// Main configuration for the reference-counting heap
///
/// # Examples
///
/// ```rust
/// use frc::RcConfig;
///
/// // Use default configuration
/// let config = RcConfig::default();
///
/// // Release build with validation forced on
/// let config = RcConfig {
///     debug_checks: true,
///     poison_on_free: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcConfig {
    /// Enable debug-mode validation
    ///
    /// Tracks freed addresses and traps on use-after-free, double release,
    /// refcount underflow and overflow.
    ///
    /// Default: on in debug builds, off in release builds
    pub debug_checks: bool,

    /// Fill payloads with `0xDD` before returning them to the allocator
    ///
    /// Makes stale reads through dangling references easy to spot.
    /// Default: false
    pub poison_on_free: bool,

    /// Largest payload a single object may request, in bytes
    ///
    /// Must leave room for the header inside an `i32` allocation size.
    /// Default: 256MB
    pub max_capacity: i32,

    /// Enable counters for retains, releases, frees and cascades
    ///
    /// Default: true
    pub stats_enabled: bool,

    /// Print heap events to the console
    ///
    /// Default: false
    pub verbose: bool,

    /// Minimum level of heap events recorded by the heap logger
    ///
    /// Default: Info
    pub log_level: LogLevel,

    /// Emit console events as JSON lines instead of human-readable text
    ///
    /// Default: false
    pub json_logs: bool,

    /// Heap events kept in the logger's ring buffer
    ///
    /// Default: 1024
    pub max_events: usize,
}

impl Default for RcConfig {
    fn default() -> Self {
        RcConfig {
            debug_checks: cfg!(debug_assertions),
            poison_on_free: false,
            max_capacity: DEFAULT_MAX_CAPACITY,
            stats_enabled: true,
            verbose: false,
            log_level: LogLevel::Info,
            json_logs: false,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl RcConfig {
    /// Validate configuration
    ///
    /// ```rust
    /// let config = frc::RcConfig {
    ///     max_capacity: 0, // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_capacity <= 0 {
            return Err(ConfigError::InvalidCapacity(
                "max_capacity must be > 0".to_string(),
            ));
        }

        if self.max_capacity > MAX_PAYLOAD {
            return Err(ConfigError::InvalidCapacity(format!(
                "max_capacity must be <= {} so header + payload fits in i32",
                MAX_PAYLOAD
            )));
        }

        if self.json_logs && !self.verbose {
            return Err(ConfigError::InvalidLogging(
                "json_logs requires verbose output".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - FRC_DEBUG_CHECKS
    /// - FRC_POISON
    /// - FRC_MAX_CAPACITY
    /// - FRC_STATS
    /// - FRC_VERBOSE
    /// - FRC_MAX_EVENTS
    ///
    /// Unparseable values are ignored.
    ///
    /// ```bash
    /// export FRC_DEBUG_CHECKS=1
    /// export FRC_MAX_CAPACITY=1048576
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FRC_DEBUG_CHECKS") {
            config.debug_checks = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FRC_POISON") {
            config.poison_on_free = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FRC_MAX_CAPACITY") {
            if let Ok(size) = val.parse::<i32>() {
                config.max_capacity = size;
            }
        }

        if let Ok(val) = std::env::var("FRC_STATS") {
            config.stats_enabled = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FRC_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FRC_MAX_EVENTS") {
            if let Ok(count) = val.parse::<usize>() {
                config.max_events = count;
            }
        }

        config
    }

    /// Parse configuration from a JSON document
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RcConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    #[error("Invalid logging options: {0}")]
    InvalidLogging(String),

    #[error("Config parse error: {0}")]
    Parse(String),
}

const MB: i32 = 1024 * 1024;

/// Default payload limit: 256MB
const DEFAULT_MAX_CAPACITY: i32 = 256 * MB;

/// Largest payload whose total allocation size still fits in `i32`
const MAX_PAYLOAD: i32 = i32::MAX - HEADER_SIZE as i32;

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true") || val.eq_ignore_ascii_case("on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.debug_checks, cfg!(debug_assertions));
        assert_eq!(config.max_capacity, 256 * MB);
        assert!(config.stats_enabled);
    }

    #[test]
    fn test_invalid_capacity() {
        let config = RcConfig {
            max_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RcConfig {
            max_capacity: i32::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RcConfig {
            max_capacity: MAX_PAYLOAD,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_logs_require_verbose() {
        let config = RcConfig {
            json_logs: true,
            verbose: false,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogging(_))
        ));
    }

    #[test]
    fn test_from_json_partial() {
        let config = RcConfig::from_json(r#"{ "debug_checks": true, "max_capacity": 4096 }"#)
            .expect("valid json config");
        assert!(config.debug_checks);
        assert_eq!(config.max_capacity, 4096);
        assert!(config.stats_enabled);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.max_events, DEFAULT_MAX_EVENTS);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            RcConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RcConfig::from_json(r#"{ "max_capacity": -1 }"#),
            Err(ConfigError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("FRC_POISON", "on");
        std::env::set_var("FRC_MAX_CAPACITY", "65536");
        std::env::set_var("FRC_STATS", "0");
        std::env::set_var("FRC_MAX_EVENTS", "16");

        let config = RcConfig::from_env();

        std::env::remove_var("FRC_POISON");
        std::env::remove_var("FRC_MAX_CAPACITY");
        std::env::remove_var("FRC_STATS");
        std::env::remove_var("FRC_MAX_EVENTS");

        assert!(config.poison_on_free);
        assert_eq!(config.max_capacity, 65536);
        assert!(!config.stats_enabled);
        assert_eq!(config.max_events, 16);
        assert!(!config.verbose);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("no"));
    }
}
