use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientOptions;
use crate::transport::DEFAULT_TIMEOUT;

pub const TOKEN_ENV: &str = "TASKSYNC_TOKEN";
pub const HOME_ENV: &str = "TASKSYNC_HOME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Missing API token; set TASKSYNC_TOKEN or add `token` to the config file")]
    MissingToken,
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Unable to resolve home directory; set TASKSYNC_HOME to an absolute path")]
    MissingHome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasksyncConfig {
    pub token: Option<String>,
    /// Base URL of the sync API, without the trailing `/sync`.
    pub endpoint: Option<String>,
    /// Directory holding mirror snapshots; `~/` is expanded.
    pub cache_dir: Option<String>,
    pub timeout_secs: Option<u64>,
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_tasksync_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var(HOME_ENV) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".tasksync"))
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}

pub fn default_cache_dir(home: &Path) -> PathBuf {
    home.join("cache")
}

pub fn load_config(home: &Path) -> Result<Option<TasksyncConfig>, ConfigError> {
    let path = config_path(home);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    Ok(Some(toml::from_str::<TasksyncConfig>(&text)?))
}

pub fn write_config(home: &Path, config: &TasksyncConfig) -> Result<PathBuf, ConfigError> {
    fs::create_dir_all(home)?;
    let path = config_path(home);
    let body = toml::to_string_pretty(config)?;
    fs::write(&path, body)?;
    Ok(path)
}

pub fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let trimmed = endpoint.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(ConfigError::InvalidEndpoint(endpoint.to_string())),
    }
}

/// Builds client options from a config file plus an optional token override
/// (normally the `TASKSYNC_TOKEN` environment variable, which wins).
pub fn client_options_from(
    home: &Path,
    config: TasksyncConfig,
    token_override: Option<String>,
) -> Result<ClientOptions, ConfigError> {
    let token = token_override
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            config
                .token
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .ok_or(ConfigError::MissingToken)?;
    let endpoint = config
        .endpoint
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    if let Some(endpoint) = endpoint.as_deref() {
        validate_endpoint(endpoint)?;
    }
    let cache_dir = config
        .cache_dir
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(|value| expand_home(&value))
        .unwrap_or_else(|| default_cache_dir(home));
    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);
    Ok(ClientOptions {
        token,
        endpoint,
        cache_dir: Some(cache_dir),
        timeout,
    })
}

/// Resolves options from `TASKSYNC_HOME` (or `~/.tasksync`) and the environment.
pub fn resolve_client_options() -> Result<ClientOptions, ConfigError> {
    let home = resolve_tasksync_home_dir().ok_or(ConfigError::MissingHome)?;
    let config = load_config(&home)?.unwrap_or_default();
    client_options_from(&home, config, std::env::var(TOKEN_ENV).ok())
}

fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = resolve_user_home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
        let _guard = crate::test_env::lock();
        f()
    }

    struct EnvGuard {
        tasksync_home: Option<OsString>,
        token: Option<OsString>,
    }

    impl EnvGuard {
        fn capture() -> Self {
            Self {
                tasksync_home: std::env::var_os(HOME_ENV),
                token: std::env::var_os(TOKEN_ENV),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.tasksync_home.as_ref() {
                std::env::set_var(HOME_ENV, value);
            } else {
                std::env::remove_var(HOME_ENV);
            }

            if let Some(value) = self.token.as_ref() {
                std::env::set_var(TOKEN_ENV, value);
            } else {
                std::env::remove_var(TOKEN_ENV);
            }
        }
    }

    #[test]
    fn write_and_read_config() {
        let temp = TempDir::new().expect("tempdir");
        let config = TasksyncConfig {
            token: Some("abc".to_string()),
            endpoint: Some("https://example.test/sync/v8".to_string()),
            cache_dir: None,
            timeout_secs: Some(5),
        };
        write_config(temp.path(), &config).expect("write config");
        let loaded = load_config(temp.path()).expect("load").expect("present");
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_config_is_none() {
        let temp = TempDir::new().expect("tempdir");
        assert!(load_config(temp.path()).expect("load").is_none());
    }

    #[test]
    fn token_override_wins_over_config() {
        let temp = TempDir::new().expect("tempdir");
        let config = TasksyncConfig {
            token: Some("from-file".to_string()),
            ..TasksyncConfig::default()
        };
        let options =
            client_options_from(temp.path(), config.clone(), Some("from-env".to_string()))
                .expect("options");
        assert_eq!(options.token, "from-env");

        let options = client_options_from(temp.path(), config, Some("  ".to_string()))
            .expect("options");
        assert_eq!(options.token, "from-file");
    }

    #[test]
    fn defaults_fill_cache_dir_and_timeout() {
        let temp = TempDir::new().expect("tempdir");
        let config = TasksyncConfig {
            token: Some("abc".to_string()),
            ..TasksyncConfig::default()
        };
        let options = client_options_from(temp.path(), config, None).expect("options");
        assert_eq!(options.cache_dir, Some(temp.path().join("cache")));
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert_eq!(options.endpoint, None);
    }

    #[test]
    fn missing_token_and_bad_endpoint_are_errors() {
        let temp = TempDir::new().expect("tempdir");
        let err = client_options_from(temp.path(), TasksyncConfig::default(), None)
            .expect_err("no token");
        assert!(matches!(err, ConfigError::MissingToken));

        let config = TasksyncConfig {
            token: Some("abc".to_string()),
            endpoint: Some("ftp://example.test".to_string()),
            ..TasksyncConfig::default()
        };
        let err = client_options_from(temp.path(), config, None).expect_err("bad endpoint");
        assert!(matches!(err, ConfigError::InvalidEndpoint(_)));
    }

    #[test]
    fn resolve_client_options_reads_home_and_env() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let home = TempDir::new().expect("home tempdir");
            std::env::set_var(HOME_ENV, home.path());
            std::env::remove_var(TOKEN_ENV);

            // No config and no env token -> error.
            assert!(matches!(
                resolve_client_options(),
                Err(ConfigError::MissingToken)
            ));

            // Config file supplies the token.
            std::fs::write(config_path(home.path()), "token = \"file-token\"\n")
                .expect("config");
            let options = resolve_client_options().expect("options");
            assert_eq!(options.token, "file-token");

            // Environment overrides the file.
            std::env::set_var(TOKEN_ENV, "env-token");
            let options = resolve_client_options().expect("options");
            assert_eq!(options.token, "env-token");
        });
    }
}
