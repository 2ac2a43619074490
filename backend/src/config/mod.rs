//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present). CLI flags override them.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `NFADJUST_PORT` | `3000` |
//! | `NFADJUST_LOOKUP` | `data/lookup.json` |
//! | `NFADJUST_EXPORT_DIR` | `.` |
//! | `NFADJUST_SAVE_DELAY_MS` | `2000` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::lookup::ConfiguredLookup;

pub const PORT_VAR: &str = "NFADJUST_PORT";
pub const LOOKUP_VAR: &str = "NFADJUST_LOOKUP";
pub const EXPORT_DIR_VAR: &str = "NFADJUST_EXPORT_DIR";
pub const SAVE_DELAY_VAR: &str = "NFADJUST_SAVE_DELAY_MS";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LOOKUP: &str = "data/lookup.json";
pub const DEFAULT_EXPORT_DIR: &str = ".";
pub const DEFAULT_SAVE_DELAY_MS: u64 = 2000;

/// Maximum accepted upload size (in bytes).
///
/// 10 MB limit.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    /// File path or `http(s)://` URL of the lookup document.
    pub lookup: String,
    pub export_dir: PathBuf,
    /// Duration of the simulated save.
    pub save_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            lookup: DEFAULT_LOOKUP.to_string(),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            save_delay: Duration::from_millis(DEFAULT_SAVE_DELAY_MS),
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build settings from a variable lookup function.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            port: parse_var(&get, PORT_VAR)?.unwrap_or(defaults.port),
            lookup: non_empty(get(LOOKUP_VAR)).unwrap_or(defaults.lookup),
            export_dir: non_empty(get(EXPORT_DIR_VAR))
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            save_delay: parse_var::<u64>(&get, SAVE_DELAY_VAR)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.save_delay),
        })
    }

    pub fn lookup_source(&self) -> ConfiguredLookup {
        ConfiguredLookup::from_location(&self.lookup)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match non_empty(get(key)) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_vars(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.save_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_values_from_vars() {
        let env = vars(&[
            (PORT_VAR, "8080"),
            (LOOKUP_VAR, "https://example.com/items.json"),
            (EXPORT_DIR_VAR, "/tmp/out"),
            (SAVE_DELAY_VAR, "0"),
        ]);
        let settings = Settings::from_vars(|k| env.get(k).cloned()).unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.export_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.save_delay, Duration::ZERO);
        assert!(matches!(settings.lookup_source(), ConfiguredLookup::Http(_)));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let env = vars(&[(LOOKUP_VAR, "  "), (PORT_VAR, "")]);
        let settings = Settings::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(settings.lookup, DEFAULT_LOOKUP);
        assert_eq!(settings.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let env = vars(&[(PORT_VAR, "not-a-port")]);
        let err = Settings::from_vars(|k| env.get(k).cloned()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: PORT_VAR.to_string(),
                value: "not-a-port".to_string()
            }
        );
    }
}
