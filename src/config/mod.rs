//! Configuration for wikidump

mod logging;
mod reader;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use reader::{ReaderConfig, TraverseConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "wikidump.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Indexed reader configuration
    #[serde(default)]
    pub reader: ReaderConfig,
    /// Traversal configuration
    #[serde(default)]
    pub traverse: TraverseConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `wikidump.toml` if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all configuration fields.
    ///
    /// Collects every problem and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.reader.workers == 0 {
            errors.push("workers must be positive".to_string());
        }
        if self.reader.work_queue_capacity == 0 {
            errors.push("work_queue_capacity must be positive".to_string());
        }
        if self.reader.result_queue_capacity == 0 {
            errors.push("result_queue_capacity must be positive".to_string());
        }
        if self.reader.read_buffer_size < 4096 {
            errors.push("read_buffer_size must be at least 4096 bytes".to_string());
        }

        if self.traverse.report_interval == 0 {
            errors.push("report_interval must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
