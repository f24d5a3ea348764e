use crate::conf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("No usable RADIUS servers configured")]
    NoServersConfigured,
}

/// One server entry as written in a configuration source, before validation
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Label used in logs
    pub name: String,

    /// Hostname or address of the RADIUS server (required)
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Local source address (or hostname) to bind before sending
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub secret: String,

    /// Higher values are tried first
    #[serde(default)]
    pub priority: i32,

    /// Reply timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// "PAP" or "CHAP", case-insensitive (required)
    #[serde(default)]
    pub method: Option<String>,

    /// Send a Message-Authenticator and require one in the reply
    #[serde(default)]
    pub message_authenticator: bool,
}

fn default_port() -> u16 {
    1812 // Standard RADIUS authentication port
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_timeout() -> u64 {
    1000
}

fn default_retries() -> u32 {
    3
}

impl ServerConfig {
    /// An entry with every optional field at its default
    pub fn new(name: impl Into<String>) -> Self {
        ServerConfig {
            name: name.into(),
            host: String::new(),
            port: default_port(),
            bind: default_bind(),
            secret: String::new(),
            priority: 0,
            timeout: default_timeout(),
            method: None,
            message_authenticator: false,
        }
    }

    /// Apply one `key value` pair from the block grammar
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .parse()
                .map_err(|_| format!("{} expects a number, got '{}'", key, value))
        }

        match key {
            "host" => self.host = value.to_string(),
            "bind" => self.bind = value.to_string(),
            "secret" => self.secret = value.to_string(),
            "port" => self.port = number(key, value)?,
            "priority" => self.priority = number(key, value)?,
            "timeout" => self.timeout = number(key, value)?,
            "method" => self.method = Some(value.to_string()),
            "message_authenticator" => {
                self.message_authenticator = match value.to_ascii_lowercase().as_str() {
                    "yes" | "true" | "1" | "on" => true,
                    "no" | "false" | "0" | "off" => false,
                    _ => return Err(format!("{} expects yes or no, got '{}'", key, value)),
                }
            }
            _ => return Err(format!("wrong or unknown key: {}", key)),
        }
        Ok(())
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bind", &self.bind)
            .field("secret", &"<redacted>")
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("method", &self.method)
            .field("message_authenticator", &self.message_authenticator)
            .finish()
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Candidate RADIUS servers
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Number of rounds over the whole server list
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// NAS-Identifier sent with every request (optional)
    #[serde(default)]
    pub nas_identifier: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "warn")
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            servers: vec![],
            retries: default_retries(),
            nas_identifier: None,
            log_level: None,
        }
    }
}

impl Config {
    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load either format: `.json` files as JSON, anything else as server blocks
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            return Self::from_file(path);
        }

        debug!(path = %path.display(), "parsing server blocks");
        let contents = fs::read_to_string(path)?;
        Ok(Config {
            servers: conf::parse_server_blocks(&contents),
            ..Config::default()
        })
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// File-level checks only; individual server entries are checked (and
    /// dropped when unusable) by the registry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::Invalid("retries must be at least 1".to_string()));
        }
        if let Some(ref nas) = self.nas_identifier
            && nas.is_empty()
        {
            return Err(ConfigError::Invalid("nas_identifier cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn example() -> Self {
        let mut primary = ServerConfig::new("primary");
        primary.host = "radius1.example.org".to_string();
        primary.secret = "testing123".to_string();
        primary.priority = 10;
        primary.method = Some("PAP".to_string());

        let mut backup = ServerConfig::new("backup");
        backup.host = "192.0.2.20".to_string();
        backup.secret = "testing456".to_string();
        backup.timeout = 2000;
        backup.method = Some("CHAP".to_string());
        backup.message_authenticator = true;

        Config {
            servers: vec![primary, backup],
            retries: 3,
            nas_identifier: Some("radauth".to_string()),
            log_level: Some("info".to_string()),
        }
    }
}
