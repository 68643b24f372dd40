use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173/";

/// Errors raised while resolving the client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported configuration format for {0}; use yaml, json or toml")]
    UnsupportedFormat(PathBuf),

    #[error("invalid {var} value `{value}`: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Output format of the log subscriber.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive when `RUST_LOG` is unset.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// The main configuration structure for the Ledgerly client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the HTTP API, always ending in `/`.
    pub api_base_url: Url,

    /// Public URL of the web frontend that receives OAuth redirects.
    pub frontend_url: Url,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// How long a cached profile response stays fresh.
    pub profile_cache_ttl_secs: u64,

    /// Per-request timeout for API calls.
    pub request_timeout_secs: u64,

    /// Where the persisted credential lives. `None` uses the platform config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Config {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default API URL is valid"),
            frontend_url: Url::parse(DEFAULT_FRONTEND_URL).expect("default frontend URL is valid"),
            logging: LoggingConfig::default(),
            profile_cache_ttl_secs: 30,
            request_timeout_secs: 30,
            session_path: None,
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// Values from the file replace the defaults; environment variables are
    /// applied last and win over both.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when the file cannot be read or parsed, an
    /// environment override is malformed, or the result fails validation.
    pub fn load_config(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Self::with_defaults(),
        };

        config.apply_env_overrides()?;
        config.api_base_url = with_trailing_slash(config.api_base_url);

        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => {
                serde_yml::from_str(&content).map_err(|err| parse_error(err.to_string()))
            }
            Some("json") => serde_json::from_str(&content).map_err(|err| parse_error(err.to_string())),
            Some("toml") => toml::from_str(&content).map_err(|err| parse_error(err.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Apply `LEDGERLY_*` environment overrides.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEnv`] when a variable is set to an unusable value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = env::var("LEDGERLY_API_URL") {
            self.api_base_url = parse_url_var("LEDGERLY_API_URL", &value)?;
        }
        if let Ok(value) = env::var("LEDGERLY_FRONTEND_URL") {
            self.frontend_url = parse_url_var("LEDGERLY_FRONTEND_URL", &value)?;
        }
        if let Ok(level) = env::var("LEDGERLY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(value) = env::var("LEDGERLY_LOG_FORMAT") {
            self.logging.format = match value.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "LEDGERLY_LOG_FORMAT",
                        value,
                        reason: "expected `text` or `json`".to_string(),
                    });
                }
            };
        }
        if let Ok(value) = env::var("LEDGERLY_PROFILE_CACHE_TTL_SECS") {
            self.profile_cache_ttl_secs = parse_secs_var("LEDGERLY_PROFILE_CACHE_TTL_SECS", value)?;
        }
        if let Ok(value) = env::var("LEDGERLY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_secs_var("LEDGERLY_REQUEST_TIMEOUT_SECS", value)?;
        }
        if let Ok(path) = env::var("LEDGERLY_SESSION_PATH") {
            self.session_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Validate the complete configuration.
    ///
    /// # Errors
    /// Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("frontend_url", &self.frontend_url),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(format!("{name} must use http or https, got `{}`", url.scheme()));
            }
        }

        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Backend entry point of the Google OAuth flow.
    ///
    /// # Errors
    /// Fails only if the base URL cannot be a base (e.g. `data:` URLs).
    pub fn google_login_url(&self) -> Result<Url, url::ParseError> {
        with_trailing_slash(self.api_base_url.clone()).join("auth/google")
    }

    /// Freshness window for cached profile responses.
    #[must_use]
    pub fn profile_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_cache_ttl_secs)
    }

    /// Timeout applied to each API request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Ensure relative joins keep the last path segment (`/api` + `auth/login`).
#[must_use]
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_url_var(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|err| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

fn parse_secs_var(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value,
        reason: "expected a whole number of seconds".to_string(),
    })
}
