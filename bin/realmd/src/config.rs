//! Daemon configuration read from the environment

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const REALMLIST_VAR: &str = "REALMD_REALMLIST";
pub const REFRESH_INTERVAL_VAR: &str = "REALMD_REFRESH_INTERVAL";
pub const STATUS_ADDR_VAR: &str = "REALMD_STATUS_ADDR";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RealmdConfig {
    /// YAML realm list
    pub realmlist: PathBuf,
    /// Seconds between realm list refreshes, 0 disables
    pub refresh_interval: u32,
    /// Listen address of the status endpoint
    pub status_addr: SocketAddr,
}

impl Default for RealmdConfig {
    fn default() -> Self {
        Self {
            realmlist: PathBuf::from("realmlist.yaml"),
            refresh_interval: 20,
            status_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl RealmdConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(REALMLIST_VAR).filter(|p| !p.trim().is_empty()) {
            config.realmlist = PathBuf::from(path);
        }

        if let Some(value) = lookup(REFRESH_INTERVAL_VAR) {
            config.refresh_interval =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                        name: REFRESH_INTERVAL_VAR,
                        value: value.clone(),
                        reason: e.to_string(),
                    })?;
        }

        if let Some(value) = lookup(STATUS_ADDR_VAR) {
            config.status_addr =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                        name: STATUS_ADDR_VAR,
                        value: value.clone(),
                        reason: e.to_string(),
                    })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<RealmdConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RealmdConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, RealmdConfig::default());
        assert_eq!(config.refresh_interval, 20);
        assert_eq!(config.status_addr.port(), 8080);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (REALMLIST_VAR, "/etc/realmd/realms.yaml"),
            (REFRESH_INTERVAL_VAR, " 0 "),
            (STATUS_ADDR_VAR, "127.0.0.1:9090"),
        ])
        .unwrap();
        assert_eq!(config.realmlist, PathBuf::from("/etc/realmd/realms.yaml"));
        assert_eq!(config.refresh_interval, 0);
        assert_eq!(config.status_addr, "127.0.0.1:9090".parse().unwrap());
    }

    #[test]
    fn test_invalid_interval() {
        let err = config_from(&[(REFRESH_INTERVAL_VAR, "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: REFRESH_INTERVAL_VAR,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_status_addr() {
        assert!(config_from(&[(STATUS_ADDR_VAR, "localhost")]).is_err());
    }
}
