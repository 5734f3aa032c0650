//! Configuration for the file-share function
//!
//! Settings are read once at startup from the environment (after loading a
//! `.env` file if present) and handed to the router as typed values. The
//! storage connection string is carried as-is; it is only parsed when a
//! storage client is built for an invocation.

use anyhow::{anyhow, bail, Context, Result};
use shared::observability::{LogFormat, LogLevel};
use std::env;
use std::str::FromStr;

use crate::storage::MAX_RANGE_BYTES;

/// Share the uploads land in.
pub const DEFAULT_SHARE_NAME: &str = "contractsshare";
/// Directory inside the share.
pub const DEFAULT_DIRECTORY: &str = "uploads";
/// Route the function host forwards the HTTP trigger to.
pub const DEFAULT_ROUTE: &str = "/api/FileShareFunction";

/// Request body limit; a whole form must fit in one range write.
const DEFAULT_MAX_UPLOAD_BYTES: usize = MAX_RANGE_BYTES as usize;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            storage: StorageConfig::from_lookup(&lookup)?,
            logging: LoggingConfig::from_lookup(&lookup)?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub route: String,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        // The function host assigns the port through FUNCTIONS_CUSTOMHANDLER_PORT.
        let port = match lookup("FUNCTIONS_CUSTOMHANDLER_PORT").or_else(|| lookup("SERVER_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid server port '{}'", raw))?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port,
            route: lookup("FUNCTION_ROUTE").unwrap_or(defaults.route),
            max_upload_bytes: parse_or(lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }

    fn validate(&self) -> Result<()> {
        if !self.route.starts_with('/') {
            bail!("Function route must start with '/': '{}'", self.route);
        }
        if self.max_upload_bytes == 0 {
            bail!("MAX_UPLOAD_BYTES must be greater than zero");
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            route: DEFAULT_ROUTE.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Which storage implementation serves the share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Azure,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(StorageBackend::Azure),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("Unknown storage backend '{}'", other)),
        }
    }
}

/// Storage configuration
#[derive(Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub connection_string: Option<String>,
    pub share_name: String,
    pub directory: String,
    pub request_timeout_seconds: Option<u64>,
}

impl StorageConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };
        let request_timeout_seconds = match lookup("STORAGE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .with_context(|| format!("Invalid STORAGE_REQUEST_TIMEOUT_SECS '{}'", raw))?,
            ),
            None => None,
        };

        Ok(Self {
            backend,
            connection_string: lookup("AzureWebJobsStorage"),
            share_name: lookup("FILE_SHARE_NAME").unwrap_or(defaults.share_name),
            directory: lookup("FILE_SHARE_DIRECTORY").unwrap_or(defaults.directory),
            request_timeout_seconds,
        })
    }

    fn validate(&self) -> Result<()> {
        validate_share_name(&self.share_name)?;
        if self.directory.trim_matches('/').is_empty() {
            bail!("FILE_SHARE_DIRECTORY must name a directory");
        }
        if self.request_timeout_seconds == Some(0) {
            bail!("STORAGE_REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Azure,
            connection_string: None,
            share_name: DEFAULT_SHARE_NAME.to_string(),
            directory: DEFAULT_DIRECTORY.to_string(),
            request_timeout_seconds: None,
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("share_name", &self.share_name)
            .field("directory", &self.directory)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LoggingConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            level: match lookup("LOG_LEVEL") {
                Some(raw) => raw.parse()?,
                None => defaults.level,
            },
            format: match lookup("LOG_FORMAT") {
                Some(raw) => raw.parse()?,
                None => defaults.format,
            },
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} '{}'", key, raw)),
        None => Ok(default),
    }
}

/// Share names: 3-63 characters of lowercase letters, digits and single hyphens,
/// starting and ending with a letter or digit.
fn validate_share_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid = (3..=63).contains(&name.len())
        && valid_chars
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");

    if !valid {
        bail!("Invalid file share name '{}'", name);
    }
    Ok(())
}
