//! Configuration file support
//!
//! Loads settings from ~/.markswap.toml (or %USERPROFILE%\.markswap.toml on Windows)
//!
//! Unknown keys are ignored and malformed values keep their defaults.
//!
//! Example:
//! ```text
//! # markswap configuration
//! tick-interval-ms = 25
//! commit-mode = "immediate"
//! log-file = "/tmp/markswap.log"
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MarkswapError, Result};
use crate::session::CommitMode;

const CONFIG_FILE: &str = ".markswap.toml";

/// Configuration settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Delay between reveal ticks, in milliseconds
    pub tick_interval_ms: u64,
    /// What a commit does after inserting the marker
    pub commit_mode: CommitMode,
    /// Where to write logs; logging is off when unset
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10,
            commit_mode: CommitMode::Stream,
            log_file: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            std::env::var("USERPROFILE")
                .ok()
                .map(|home| PathBuf::from(home).join(CONFIG_FILE))
        }

        #[cfg(not(windows))]
        {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(CONFIG_FILE))
        }
    }

    /// Load configuration from file
    ///
    /// A missing file gives the defaults; so does one that is not valid TOML.
    pub fn load() -> Self {
        let mut config = Config::default();

        if let Some(path) = Self::config_path() {
            if let Ok(contents) = fs::read_to_string(&path) {
                match Self::parse(&contents) {
                    Ok(settings) => config.apply(&settings),
                    Err(e) => eprintln!("markswap: ignoring {}: {}", path.display(), e),
                }
            }
        }

        config
    }

    /// Parse config file contents into a TOML table
    fn parse(contents: &str) -> Result<toml::Table> {
        contents
            .parse::<toml::Table>()
            .map_err(|e| MarkswapError::Config(e.to_string()))
    }

    /// Apply settings from a parsed config
    fn apply(&mut self, settings: &toml::Table) {
        if let Some(n) = settings.get("tick-interval-ms").and_then(parse_u64) {
            self.set_tick_interval_ms(n);
        }

        if let Some(mode) = settings
            .get("commit-mode")
            .and_then(toml::Value::as_str)
            .and_then(CommitMode::parse)
        {
            self.commit_mode = mode;
        }

        if let Some(path) = settings.get("log-file").and_then(toml::Value::as_str) {
            if !path.is_empty() {
                self.log_file = Some(PathBuf::from(path));
            }
        }
    }

    /// Set the tick interval, clamped to 1..=1000 ms
    pub fn set_tick_interval_ms(&mut self, ms: u64) {
        self.tick_interval_ms = ms.clamp(1, 1000);
    }

    /// Tick interval as a duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Accept both `25` and `"25"`
fn parse_u64(value: &toml::Value) -> Option<u64> {
    match value {
        toml::Value::Integer(n) => u64::try_from(*n).ok(),
        toml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let contents = r#"
# Comment
tick-interval-ms = 25
commit-mode = "immediate"
log-file = "/tmp/markswap.log"
        "#;

        let mut config = Config::default();
        config.apply(&Config::parse(contents).unwrap());
        assert_eq!(config.tick_interval_ms, 25);
        assert_eq!(config.commit_mode, CommitMode::Immediate);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/markswap.log")));
        assert_eq!(config.tick_interval(), Duration::from_millis(25));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tick_interval_ms, 10);
        assert_eq!(config.commit_mode, CommitMode::Stream);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_tick_interval_clamped() {
        let mut config = Config::default();
        config.apply(&Config::parse("tick-interval-ms = 0").unwrap());
        assert_eq!(config.tick_interval_ms, 1);
        config.apply(&Config::parse("tick-interval-ms = 99999").unwrap());
        assert_eq!(config.tick_interval_ms, 1000);
        config.apply(&Config::parse("tick-interval-ms = \"40\"").unwrap());
        assert_eq!(config.tick_interval_ms, 40);
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let contents = r#"
tick-interval-ms = -5
commit-mode = "sometimes"
log-file = 3
unknown = true
        "#;
        let mut config = Config::default();
        config.apply(&Config::parse(contents).unwrap());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            Config::parse("tick-interval-ms = = 3"),
            Err(MarkswapError::Config(_))
        ));
    }
}
