//! Validated, immutable server records and the sources they come from

use crate::config::{Config, ConfigError, ServerConfig};
use radauth_proto::AuthMethod;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Anything that can produce raw server entries
pub trait ServerSource: Send + Sync {
    fn load(&self) -> Result<Vec<ServerConfig>, ConfigError>;
}

/// A configuration file in either supported format
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl ServerSource for FileSource {
    fn load(&self) -> Result<Vec<ServerConfig>, ConfigError> {
        Ok(Config::load(&self.path)?.servers)
    }
}

/// Entries held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub Vec<ServerConfig>);

impl ServerSource for StaticSource {
    fn load(&self) -> Result<Vec<ServerConfig>, ConfigError> {
        Ok(self.0.clone())
    }
}

impl ServerSource for Config {
    fn load(&self) -> Result<Vec<ServerConfig>, ConfigError> {
        Ok(self.servers.clone())
    }
}

/// A configured RADIUS server that passed validation
#[derive(Clone)]
pub struct ServerRecord {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub bind_address: String,
    secret: Vec<u8>,
    pub priority: i32,
    pub timeout: Duration,
    pub method: AuthMethod,
    pub message_authenticator: bool,
}

impl ServerRecord {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        secret: impl Into<Vec<u8>>,
        method: AuthMethod,
    ) -> Self {
        let name = name.into();
        let defaults = ServerConfig::new(name.clone());
        ServerRecord {
            name,
            host: host.into(),
            port: defaults.port,
            bind_address: defaults.bind,
            secret: secret.into(),
            priority: defaults.priority,
            timeout: Duration::from_millis(defaults.timeout),
            method,
            message_authenticator: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.bind_address = bind_address.into();
        self
    }

    pub fn with_message_authenticator(mut self, enabled: bool) -> Self {
        self.message_authenticator = enabled;
        self
    }

    /// A record needs a host and a recognised method
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        if config.host.is_empty() {
            return Err(ConfigError::Invalid(format!("{}: 'host' is missing", config.name)));
        }
        let method = config
            .method
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid(format!("{}: 'method' is missing", config.name)))?
            .parse::<AuthMethod>()
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", config.name, e)))?;

        Ok(ServerRecord {
            name: config.name.clone(),
            host: config.host.clone(),
            port: config.port,
            bind_address: config.bind.clone(),
            secret: config.secret.as_bytes().to_vec(),
            priority: config.priority,
            timeout: Duration::from_millis(config.timeout),
            method,
            message_authenticator: config.message_authenticator,
        })
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for ServerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRecord")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bind_address", &self.bind_address)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("method", &self.method)
            .field("message_authenticator", &self.message_authenticator)
            .finish_non_exhaustive()
    }
}

/// The usable servers for one authentication call
#[derive(Debug, Clone)]
pub struct ServerRegistry {
    servers: Vec<ServerRecord>,
}

impl ServerRegistry {
    /// Read `source` once and keep the entries that validate.
    ///
    /// Fails if the source cannot be read or nothing usable remains.
    pub fn load(source: &dyn ServerSource) -> Result<Self, ConfigError> {
        let records = source
            .load()?
            .iter()
            .filter_map(|entry| match ServerRecord::from_config(entry) {
                Ok(record) => {
                    if record.secret.is_empty() {
                        warn!(server = %record.name, "server has an empty shared secret");
                    }
                    debug!(
                        server = %record.name,
                        host = %record.host,
                        port = record.port,
                        priority = record.priority,
                        timeout_ms = record.timeout.as_millis() as u64,
                        method = %record.method,
                        "added server"
                    );
                    Some(record)
                }
                Err(e) => {
                    warn!("discarding server entry: {}", e);
                    None
                }
            })
            .collect();

        Self::from_records(records)
    }

    pub fn from_records(servers: Vec<ServerRecord>) -> Result<Self, ConfigError> {
        if servers.is_empty() {
            return Err(ConfigError::NoServersConfigured);
        }
        Ok(ServerRegistry { servers })
    }

    pub fn servers(&self) -> &[ServerRecord] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
