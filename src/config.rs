//! Runtime configuration read from the environment

use crate::intake::SeverityPolicy;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8000;

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub severity_policy: SeverityPolicy,
    /// Mark the session cookie `Secure` (only when served over TLS)
    pub cookie_secure: bool,
}

/// Configuration with no environment overrides
#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("TELECARE_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".telecare").join("telecare.db")
            },
            PathBuf::from,
        );

        let port = lookup("TELECARE_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let severity_policy = if lookup("TELECARE_STRICT_SEVERITY").is_some_and(|v| is_truthy(&v)) {
            SeverityPolicy::Strict
        } else {
            SeverityPolicy::Lenient
        };

        let cookie_secure = lookup("TELECARE_COOKIE_SECURE").is_some_and(|v| is_truthy(&v));

        Self {
            db_path,
            port,
            severity_policy,
            cookie_secure,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("HOME", "/home/alice")]);
        assert_eq!(config.db_path, PathBuf::from("/home/alice/.telecare/telecare.db"));
        assert_eq!(config.port, 8000);
        assert_eq!(config.severity_policy, SeverityPolicy::Lenient);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_default_matches_empty_environment() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, config_from(&[]).db_path);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.severity_policy, SeverityPolicy::Lenient);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TELECARE_DB_PATH", "/var/lib/telecare.db"),
            ("TELECARE_PORT", "9090"),
            ("TELECARE_STRICT_SEVERITY", "true"),
            ("TELECARE_COOKIE_SECURE", "1"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/var/lib/telecare.db"));
        assert_eq!(config.port, 9090);
        assert_eq!(config.severity_policy, SeverityPolicy::Strict);
        assert!(config.cookie_secure);
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = config_from(&[("TELECARE_PORT", "eighty")]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.db_path, PathBuf::from("/tmp/.telecare/telecare.db"));
    }
}
