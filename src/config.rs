use std::{path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for talking to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Every endpoint path is appended to this.
    pub base_url: Url,
    pub timeout: Duration,
    /// The directory the session record is persisted in.
    pub storage_dir: PathBuf,
}

impl Config {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Config {
            base_url: parse_base_url(base_url)?,
            ..Config::default()
        })
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Config { timeout, ..self }
    }

    pub fn with_storage_dir<P: Into<PathBuf>>(self, dir: P) -> Self {
        Config {
            storage_dir: dir.into(),
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            base_url: Url::parse(DEFAULT_BASE_URL)
                .expect("The default base URL is always valid"),
            timeout: DEFAULT_TIMEOUT,
            storage_dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".skillchecker")
}

/// Parse a base URL, insisting on something we can make HTTP requests to.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|inner| ConfigError::BadUrl {
        url: raw.to_string(),
        inner,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("\"{}\" is not a valid URL", url)]
    BadUrl {
        url: String,
        #[source]
        inner: url::ParseError,
    },
    #[error("Only http and https are supported, not {0}")]
    UnsupportedScheme(String),
}
