//! Server configuration
//!
//! Configuration is loaded from environment variables. Every variable is optional;
//! unset or unparseable values keep the defaults below.

use std::env;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Upper bound for handling a single request
    pub request_timeout: Duration,

    /// Storage configuration
    pub storage: StorageConfig,
}

/// Which overlay store backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// MongoDB collection addressed by `StorageConfig::mongodb_uri`
    MongoDb,
    /// Process-local store, lost on restart
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mongodb" | "mongo" => Some(Self::MongoDb),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// MongoDB connection string
    pub mongodb_uri: String,
    /// Database holding the overlay collection
    pub database: String,
    /// Collection holding overlay documents
    pub collection: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            request_timeout: Duration::from_secs(30),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::MongoDb,
            mongodb_uri: "mongodb://localhost:27017/".to_string(),
            database: "livestream_studio".to_string(),
            collection: "overlays".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Server config
        if let Some(host) = lookup("HOST")
            && !host.is_empty()
        {
            config.host = host;
        }
        if let Some(port) = lookup("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Some(val) = lookup("REQUEST_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
            && secs > 0
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        // Storage config
        if let Some(val) = lookup("STORAGE_BACKEND")
            && let Some(backend) = StorageBackend::parse(&val)
        {
            config.storage.backend = backend;
        }
        if let Some(uri) = lookup("MONGODB_URI")
            && !uri.is_empty()
        {
            config.storage.mongodb_uri = uri;
        }
        if let Some(name) = lookup("MONGODB_DATABASE")
            && !name.is_empty()
        {
            config.storage.database = name;
        }
        if let Some(name) = lookup("MONGODB_COLLECTION")
            && !name.is_empty()
        {
            config.storage.collection = name;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.storage.backend, StorageBackend::MongoDb);
        assert_eq!(config.storage.mongodb_uri, "mongodb://localhost:27017/");
        assert_eq!(config.storage.database, "livestream_studio");
        assert_eq!(config.storage.collection, "overlays");
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8081"),
            ("MONGODB_URI", "mongodb://db.internal:27017/"),
            ("STORAGE_BACKEND", "Memory"),
            ("REQUEST_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.port, 8081);
        assert_eq!(config.storage.mongodb_uri, "mongodb://db.internal:27017/");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("STORAGE_BACKEND", "postgres"),
            ("REQUEST_TIMEOUT_SECS", "0"),
            ("MONGODB_URI", ""),
        ]));
        assert_eq!(config.port, 5000);
        assert_eq!(config.storage.backend, StorageBackend::MongoDb);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.storage.mongodb_uri, "mongodb://localhost:27017/");
    }
}
