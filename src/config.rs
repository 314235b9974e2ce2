//! Configuration loading and defaults for deepresearch-cli.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::DEFAULT_TOOLS;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
/// How long the HTTP transport waits for a single chunk before assuming the
/// backend stalled.
pub const DEFAULT_STALL_TIMEOUT_SECS: u64 = 90;
/// Timeout for the plain request/response endpoints (`/tools`, `/health`).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

const BACKEND_URL_ENV: &str = "DEEPRESEARCH_BACKEND_URL";

// === Types ===

/// Raw configuration as loaded from the config file; every field optional,
/// defaults applied by the accessors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub backend_url: Option<String>,
    /// Tools offered to the backend on every turn.
    pub tools: Option<Vec<String>>,
    /// Start turns in deep research mode (multi-step tool use).
    pub deep_research: Option<bool>,
    pub stall_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub log_file: Option<String>,

    /// Command-line override; wins over both the environment and the file.
    #[serde(skip)]
    pub backend_url_override: Option<String>,
}

impl Config {
    /// Default config file location under the platform config directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deepresearch")
            .join("config.toml")
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file is not an error: defaults apply. A present-but-broken
    /// file is an error, because silently ignoring it hides typos.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject configurations that cannot work before any request is made.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!(
                "backend URL must start with http:// or https:// (got '{url}'); \
                 set backend_url in the config file or {BACKEND_URL_ENV}"
            );
        }
        if let Some(0) = self.stall_timeout_secs {
            anyhow::bail!("stall_timeout_secs must be greater than zero");
        }
        if let Some(0) = self.request_timeout_secs {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Backend base URL. Precedence: command line, then environment, then
    /// the config file, then the default.
    #[must_use]
    pub fn backend_url(&self) -> String {
        self.backend_url_override
            .clone()
            .or_else(|| {
                std::env::var(BACKEND_URL_ENV)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
            })
            .or_else(|| self.backend_url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    #[must_use]
    pub fn tools(&self) -> Vec<String> {
        self.tools.clone().unwrap_or_else(|| {
            DEFAULT_TOOLS.iter().map(|t| (*t).to_string()).collect()
        })
    }

    #[must_use]
    pub fn deep_research(&self) -> bool {
        self.deep_research.unwrap_or(true)
    }

    #[must_use]
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs.unwrap_or(DEFAULT_STALL_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(PathBuf::from)
    }
}

/// Lock shared by every test that reads or writes the backend URL
/// environment variable; the test harness runs tests in parallel.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Restores an environment variable when dropped, so tests do not leak
    /// state into each other.
    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let previous = std::env::var(key).ok();
            // Safety contract of set_var: tests touching this variable run in
            // the same process; the guard restores the prior value.
            unsafe { std::env::set_var(key, value) };
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => unsafe { std::env::set_var(self.key, value) },
                None => unsafe { std::env::remove_var(self.key) },
            }
        }
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let _env = env_lock();
        let config = Config::default();
        assert_eq!(config.backend_url(), DEFAULT_BACKEND_URL);
        assert_eq!(config.tools(), vec!["web_search", "weather", "file_write"]);
        assert!(config.deep_research());
        assert_eq!(config.stall_timeout(), Duration::from_secs(90));
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn loads_values_from_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "backend_url = \"https://agent.example.com/\"\n\
             tools = [\"weather\"]\n\
             deep_research = false\n\
             stall_timeout_secs = 5"
        )
        .expect("write");

        let _env = env_lock();
        let config = Config::load(Some(file.path())).expect("load");
        assert_eq!(config.backend_url(), "https://agent.example.com");
        assert_eq!(config.tools(), vec!["weather"]);
        assert!(!config.deep_research());
        assert_eq!(config.stall_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn missing_file_is_fine_broken_file_is_not() {
        let _env = env_lock();
        let config = Config::load(Some(Path::new("/nonexistent/config.toml"))).expect("defaults");
        assert_eq!(config.backend_url(), DEFAULT_BACKEND_URL);

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "backend_url = [not toml").expect("write");
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn environment_overrides_file_value() {
        let _env = env_lock();
        let _guard = EnvGuard::set(BACKEND_URL_ENV, "http://override:9000");
        let config = Config {
            backend_url: Some("http://file:8000".to_string()),
            ..Config::default()
        };
        assert_eq!(config.backend_url(), "http://override:9000");
    }

    #[test]
    fn validate_rejects_bad_url_and_zero_timeouts() {
        let _env = env_lock();
        let config = Config {
            backend_url: Some("ftp://nope".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            stall_timeout_secs: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
