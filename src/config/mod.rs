use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "POLLINATIONS_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bearer token for the keyed endpoint. None uses the public endpoint.
    pub api_key: Option<String>,
    pub default_model: String,
    /// Socket read timeout in seconds. Default: 600.
    pub timeout_secs: u64,
    /// Chat completions URL override.
    pub chat_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: crate::provider::DEFAULT_MODEL.to_string(),
            timeout_secs: 600,
            chat_url: None,
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Default location: `<config_dir>/pollinations/config.toml`.
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("pollinations").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".pollinations/config.toml"))
    }

    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::path())?;
        Ok(config.with_env_key(std::env::var(API_KEY_ENV).ok()))
    }

    /// Load from a file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
            tracing::debug!(path = %path.display(), "Loaded config");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Replace the API key with a non-empty value from the environment.
    #[must_use]
    pub fn with_env_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_model, "openai");
        assert_eq!(config.timeout(), Duration::from_secs(600));
        assert!(config.api_key.is_none());
        assert!(config.chat_url.is_none());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"sk-test\"\ntimeout_secs = 30").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.default_model, "openai");
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = \"soon\"").unwrap();
        match Config::load_from(file.path()) {
            Err(Error::Config(msg)) => assert!(msg.contains("timeout_secs"), "{msg}"),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_path_is_io() {
        let dir = tempfile::tempdir().unwrap();
        // A directory exists but cannot be read as a file.
        assert!(matches!(Config::load_from(dir.path()), Err(Error::Io(_))));
    }

    #[test]
    fn test_env_key_override() {
        let config = Config::default().with_env_key(Some("from-env".into()));
        assert_eq!(config.api_key.as_deref(), Some("from-env"));

        let config = Config {
            api_key: Some("from-file".into()),
            ..Config::default()
        };
        assert_eq!(
            config.clone().with_env_key(Some("  ".into())).api_key.as_deref(),
            Some("from-file")
        );
        assert_eq!(config.with_env_key(None).api_key.as_deref(), Some("from-file"));
    }
}
