//! Service configuration
//!
//! Every section falls back to its defaults when missing from the JSON file,
//! so an empty object `{}` is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pdf::{SplitOptions, WatermarkStyle};

/// Environment variable overriding `server.port`
pub const PORT_ENV: &str = "PORT";

/// Main configuration for the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener configuration
    pub server: ServerConfig,

    /// Where outputs and scratch files live
    pub storage: StorageConfig,

    /// Page selection behavior
    pub split: SplitConfig,

    /// Watermark appearance
    pub watermark: WatermarkStyle,

    /// Office converter configuration
    pub converter: ConverterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,

    /// Allow cross-origin requests from any origin
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            max_upload_bytes: 50 * 1024 * 1024,
            cors_permissive: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for downloadable artifacts (compressed outputs)
    pub output_dir: PathBuf,

    /// Parent of per-request workspaces; the system temp dir when unset
    pub temp_dir: Option<PathBuf>,

    /// Seconds a downloadable artifact is kept; `null` keeps them forever
    pub artifact_ttl_secs: Option<u64>,
}

impl StorageConfig {
    pub fn artifact_ttl(&self) -> Option<Duration> {
        self.artifact_ttl_secs.map(Duration::from_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            temp_dir: None,
            artifact_ttl_secs: Some(3600),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Return a zero-page PDF instead of failing when nothing is selected
    pub allow_empty_selection: bool,
}

impl SplitConfig {
    pub fn options(&self) -> SplitOptions {
        SplitOptions {
            allow_empty_selection: self.allow_empty_selection,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// LibreOffice executable
    pub soffice: PathBuf,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            soffice: PathBuf::from("soffice"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` when given, defaults otherwise, then apply the
    /// environment and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_value(std::env::var(PORT_ENV).ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply a `PORT` value; `None` or blank leaves the port alone
    pub fn apply_env_value(&mut self, port: Option<&str>) -> Result<()> {
        if let Some(value) = port.map(str::trim).filter(|v| !v.is_empty()) {
            self.server.port = value
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a valid port: '{}'", PORT_ENV, value)))?;
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.server.max_upload_bytes == 0 {
            return Err(Error::Config("server.max_upload_bytes must be greater than 0".to_string()));
        }
        self.watermark.validate()
    }

    /// Pretty JSON, as written by `docsuite config`
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
