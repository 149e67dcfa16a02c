use crate::error::{CensusError, Result};
use crate::infra::slack_client::DEFAULT_API_BASE;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "census.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chat: ChatConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Channel that receives quote announcements
    pub channel: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_prefix: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat: ChatConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            channel: "census-quotes".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            file_prefix: "census_quoter.log".to_string(),
        }
    }
}

impl Config {
    /// Load `census.toml` if present, then apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                CensusError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            Self::from_toml(&content)?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from `CENSUS_*` variables supplied by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(channel) = lookup("CENSUS_CHANNEL") {
            self.chat.channel = channel;
        }
        if let Some(base) = lookup("CENSUS_CHAT_API_BASE") {
            self.chat.api_base = base;
        }
        if let Some(port) = lookup("CENSUS_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| CensusError::Config(format!("CENSUS_PORT is not a port number: '{}'", port)))?;
        }
        if let Some(dir) = lookup("CENSUS_LOG_DIR") {
            self.logging.dir = dir;
        }
        if let Some(addr) = lookup("CENSUS_METRICS_ADDR") {
            self.metrics.addr = Some(addr);
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.chat.channel.trim().is_empty() {
            return Err(CensusError::Config("chat.channel must not be empty".to_string()));
        }
        self.metrics_addr()?;
        Ok(())
    }

    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>> {
        self.metrics
            .addr
            .as_deref()
            .map(|a| {
                a.parse::<SocketAddr>()
                    .map_err(|_| CensusError::Config(format!("invalid metrics address '{}'", a)))
            })
            .transpose()
    }
}
