//! Engine configuration
//!
//! Loaded from TOML. Every section and field is optional and falls back to
//! its default, so an empty file is a valid config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AccessError, AccessResult};

/// Configuration for the permission engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub loading: LoadingConfig,
    pub diagnostics: DiagnosticsConfig,
    pub requests: RequestConfig,
}

/// Snapshot loading settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// Upper bound on each store call during a load
    pub timeout_ms: u64,
    /// How often background refresh reloads a member snapshot
    pub refresh_interval_secs: u64,
}

impl LoadingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            refresh_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Buffered events per subscriber before old ones are dropped
    pub channel_capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

/// Access request limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub max_reason_len: usize,
    pub max_pending_per_member: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_reason_len: 500,
            max_pending_per_member: 10,
        }
    }
}

/// Default config location: `$XDG_CONFIG_HOME/hearth/access.toml`,
/// falling back to `~/.config/hearth/access.toml`
pub fn default_config_path() -> PathBuf {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(xdg) => PathBuf::from(xdg),
        None => dirs::home_dir()
            .map(|home| home.join(".config"))
            .unwrap_or_else(|| PathBuf::from(".config")),
    };
    base.join("hearth").join("access.toml")
}

/// Load config from a TOML file
pub fn load_config_from_file(path: impl AsRef<Path>) -> AccessResult<EngineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        AccessError::Config(format!("failed to read config file {:?}: {}", path, e))
    })?;

    let config = parse_config(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse config from TOML string
pub fn parse_config(toml_content: &str) -> AccessResult<EngineConfig> {
    toml::from_str(toml_content)
        .map_err(|e| AccessError::Config(format!("invalid config TOML: {}", e)))
}

/// Load config with fallback to default
pub fn load_config_or_default(path: impl AsRef<Path>) -> EngineConfig {
    let path = path.as_ref();
    match load_config_from_file(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::debug!(path = ?path, error = %e, "Using default engine config");
            EngineConfig::default()
        }
    }
}

/// Validate a config for consistency
pub fn validate_config(config: &EngineConfig) -> AccessResult<()> {
    if config.loading.timeout_ms == 0 {
        return Err(AccessError::Config("loading.timeout_ms must be positive".into()));
    }
    if config.loading.refresh_interval_secs == 0 {
        return Err(AccessError::Config(
            "loading.refresh_interval_secs must be positive".into(),
        ));
    }
    if config.diagnostics.channel_capacity == 0 {
        return Err(AccessError::Config(
            "diagnostics.channel_capacity must be positive".into(),
        ));
    }
    if config.requests.max_pending_per_member == 0 {
        return Err(AccessError::Config(
            "requests.max_pending_per_member must be positive".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_config_empty() {
        let config = parse_config("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.loading.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_config_partial() {
        let toml = r#"
[loading]
timeout_ms = 250

[requests]
max_reason_len = 80
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.loading.timeout_ms, 250);
        assert_eq!(config.loading.refresh_interval_secs, 300);
        assert_eq!(config.requests.max_reason_len, 80);
        assert_eq!(config.requests.max_pending_per_member, 10);
    }

    #[test]
    fn test_parse_config_invalid_toml() {
        let result = parse_config("loading = {");
        assert!(matches!(result, Err(AccessError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = EngineConfig::default();
        config.loading.timeout_ms = 0;
        assert!(validate_config(&config).is_err());
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[diagnostics]
channel_capacity = 16
"#
        )
        .unwrap();

        let config = load_config_from_file(file.path()).unwrap();
        assert_eq!(config.diagnostics.channel_capacity, 16);
    }

    #[test]
    fn test_invalid_file_is_rejected_but_default_loader_recovers() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[loading]\ntimeout_ms = 0").unwrap();

        assert!(load_config_from_file(file.path()).is_err());
        assert_eq!(load_config_or_default(file.path()), EngineConfig::default());
    }

    #[test]
    fn test_load_config_or_default_missing_file() {
        let config = load_config_or_default("/nonexistent/hearth/access.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_default_config_path_ends_with_hearth() {
        let path = default_config_path();
        assert!(path.ends_with("hearth/access.toml"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = EngineConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }
}
