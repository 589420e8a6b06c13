//! Connection configuration

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::key::DEFAULT_NAMESPACE;

/// Default store address
pub const DEFAULT_ADDRESS: &str = "localhost:6379";

pub const ENV_ADDRESS: &str = "MELON_REDIS_ADDRESS";
pub const ENV_USERNAME: &str = "MELON_REDIS_USERNAME";
pub const ENV_PASSWORD: &str = "MELON_REDIS_PASSWORD";
pub const ENV_DB: &str = "MELON_REDIS_DB";
pub const ENV_NAMESPACE: &str = "MELON_REDIS_NAMESPACE";

// Helper functions for serde defaults
fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Options used once to connect to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisOptions {
    /// Store address as `host:port`
    #[serde(default = "default_address")]
    pub address: String,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Logical database index
    #[serde(default)]
    pub db: i64,

    /// Prefix applied to every key and channel
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            address: default_address(),
            username: None,
            password: None,
            db: 0,
            namespace: default_namespace(),
        }
    }
}

impl RedisOptions {
    /// Load options from `MELON_REDIS_*` environment variables,
    /// falling back to defaults for anything unset
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(address) = lookup(ENV_ADDRESS) {
            options.address = address;
        }
        options.username = lookup(ENV_USERNAME).filter(|u| !u.is_empty());
        options.password = lookup(ENV_PASSWORD).filter(|p| !p.is_empty());
        if let Some(db) = lookup(ENV_DB) {
            options.db = db.trim().parse().map_err(|_| {
                StoreError::InvalidConfig(format!("{} must be an integer, got '{}'", ENV_DB, db))
            })?;
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            options.namespace = namespace;
        }

        // Surface a bad address here rather than at connect time
        options.host_port()?;

        Ok(options)
    }

    /// Split the address into host and port
    pub fn host_port(&self) -> Result<(String, u16), StoreError> {
        let (host, port) = self
            .address
            .rsplit_once(':')
            .ok_or_else(|| StoreError::InvalidAddress(self.address.clone()))?;

        if host.is_empty() {
            return Err(StoreError::InvalidAddress(self.address.clone()));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| StoreError::InvalidAddress(self.address.clone()))?;

        Ok((host.to_string(), port))
    }

    /// Build the client connection info
    pub fn connection_info(&self) -> Result<redis::ConnectionInfo, StoreError> {
        let (host, port) = self.host_port()?;

        Ok(redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(host, port),
            redis: redis::RedisConnectionInfo {
                db: self.db,
                username: self.username.clone(),
                password: self.password.clone(),
                ..Default::default()
            },
        })
    }
}
