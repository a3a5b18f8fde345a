//! Application configuration read from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const MAPBOX_SECRET: &str = "MAPBOX_SECRET";
pub const MAPBOX_STYLE: &str = "MAPBOX_STYLE";
pub const TRANSACTIONS_CSV: &str = "REAL_ESTATE_TRANSACTIONS_CSV";
pub const TOWNS_CSV: &str = "REAL_ESTATE_TOWNS_CSV";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{set} is set but {missing} is not")]
    Incomplete {
        set: &'static str,
        missing: &'static str,
    },
}

/// Token and style URL embedded in exported figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapboxCredentials {
    pub access_token: String,
    pub style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub mapbox: Option<MapboxCredentials>,
    pub transactions_csv: Option<PathBuf>,
    pub towns_csv: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mapbox = match (get(MAPBOX_SECRET), get(MAPBOX_STYLE)) {
            (Some(access_token), Some(style)) => Some(MapboxCredentials {
                access_token,
                style,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    set: MAPBOX_SECRET,
                    missing: MAPBOX_STYLE,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    set: MAPBOX_STYLE,
                    missing: MAPBOX_SECRET,
                })
            }
        };

        Ok(Self {
            mapbox,
            transactions_csv: get(TRANSACTIONS_CSV).map(PathBuf::from),
            towns_csv: get(TOWNS_CSV).map(PathBuf::from),
        })
    }

    /// Both input paths, when the environment names them.
    pub fn default_sources(&self) -> Option<(PathBuf, PathBuf)> {
        Some((self.transactions_csv.clone()?, self.towns_csv.clone()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_is_valid() {
        let config = config(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.default_sources().is_none());
    }

    #[test]
    fn reads_mapbox_and_paths() {
        let config = config(&[
            (MAPBOX_SECRET, "pk.test"),
            (MAPBOX_STYLE, "mapbox://styles/me/abc"),
            (TRANSACTIONS_CSV, "data/Tokyo_20211_20212.csv"),
            (TOWNS_CSV, " data/towns.csv "),
        ])
        .unwrap();
        assert_eq!(
            config.mapbox,
            Some(MapboxCredentials {
                access_token: "pk.test".into(),
                style: "mapbox://styles/me/abc".into(),
            })
        );
        assert_eq!(
            config.default_sources(),
            Some((
                PathBuf::from("data/Tokyo_20211_20212.csv"),
                PathBuf::from("data/towns.csv")
            ))
        );
    }

    #[test]
    fn half_configured_mapbox_is_an_error() {
        assert_eq!(
            config(&[(MAPBOX_SECRET, "pk.test")]),
            Err(ConfigError::Incomplete {
                set: MAPBOX_SECRET,
                missing: MAPBOX_STYLE
            })
        );
        assert!(config(&[(MAPBOX_STYLE, "x"), (MAPBOX_SECRET, "  ")]).is_err());
    }

    #[test]
    fn one_path_is_not_a_default_source() {
        let config = config(&[(TRANSACTIONS_CSV, "a.csv")]).unwrap();
        assert!(config.default_sources().is_none());
    }
}
