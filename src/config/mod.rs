//! Configuration management.
//!
//! Wireboard reads a small TOML file describing where to listen and how big
//! the shared canvas is. All values have sensible defaults; a missing config
//! file is only an error for `wireboard start` (run `wireboard init` to write
//! a starter file).
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 6005
//!
//! [canvas]
//! width = 800
//! height = 600
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Canvas dimensions are server-wide: every whiteboard created during the
//! process lifetime uses the same raster geometry, which clients must agree
//! on out-of-band.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Default listen port for the whiteboard protocol.
pub const DEFAULT_PORT: u16 = 6005;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the listening socket to.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port for the line protocol. Port 0 asks the OS for an ephemeral
    /// port (used by the integration tests).
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level: one of error, warn, info, debug, trace.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        CanvasConfig {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Write a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// The `host:port` string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
