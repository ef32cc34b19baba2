//! # Directory Configuration
//!
//! Unified configuration for the log, the subsystems and the runtime.
//!
//! ## Environment
//!
//! | Variable | Field |
//! |----------|-------|
//! | `PKD_HOSTNAME` | `hostname` |
//! | `PKD_DATA_DIR` | `storage.data_dir` |
//! | `PKD_MAX_ATTEMPTS` | `storage.max_attempts` |
//! | `PKD_BUSY_TIMEOUT_MS` | `storage.busy_timeout_ms` |
//! | `PKD_HPKE_SECRET_KEY` | `security.hpke_secret_key` (hex) |
//! | `PKD_WITNESSES` | `security.witnesses` (`host=hexkey,...`) |
//! | `PKD_LOG_LEVEL` | `log.level` |
//! | `PKD_JSON_LOGS` | `log.json` |
//!
//! ## Security Requirements
//!
//! - a production directory MUST have an HPKE secret, or it cannot accept
//!   relayed traffic
//! - a production directory MUST persist its log

use pkd_01_merkle_log::MerkleLogConfig;
use pkd_types::{Peer, PublicKey};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid {var}: {reason}")]
    InvalidVariable { var: &'static str, reason: String },

    /// No HPKE secret configured.
    #[error(
        "SECURITY VIOLATION: no HPKE secret key. \
         Set PKD_HPKE_SECRET_KEY to a 32-byte hex X25519 secret."
    )]
    MissingHpkeSecret,

    /// Log would live only in memory.
    #[error("no data directory: the log would not survive a restart. Set PKD_DATA_DIR.")]
    EphemeralStorage,

    /// Hostname unset or local.
    #[error("hostname {0:?} is not a public hostname. Set PKD_HOSTNAME.")]
    InvalidHostname(String),
}

/// Complete directory configuration.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Hostname this directory is published under.
    pub hostname: String,
    /// Logging.
    pub log: LogConfig,
    /// Storage and write path.
    pub storage: StorageConfig,
    /// Keys and allow-lists.
    pub security: SecurityConfig,
    /// Replica peers.
    pub replication: ReplicationConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            log: LogConfig::default(),
            storage: StorageConfig::default(),
            security: SecurityConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl DirectoryConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(hostname) = lookup("PKD_HOSTNAME") {
            config.hostname = hostname;
        }
        if let Some(dir) = lookup("PKD_DATA_DIR") {
            config.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(attempts) = lookup("PKD_MAX_ATTEMPTS") {
            config.storage.max_attempts = parse_number("PKD_MAX_ATTEMPTS", &attempts)?;
            if config.storage.max_attempts == 0 {
                return Err(ConfigError::InvalidVariable {
                    var: "PKD_MAX_ATTEMPTS",
                    reason: "must be at least 1".into(),
                });
            }
        }
        if let Some(timeout) = lookup("PKD_BUSY_TIMEOUT_MS") {
            config.storage.busy_timeout_ms = parse_number("PKD_BUSY_TIMEOUT_MS", &timeout)?;
        }
        if let Some(secret) = lookup("PKD_HPKE_SECRET_KEY") {
            config.security.hpke_secret_key = Some(parse_key("PKD_HPKE_SECRET_KEY", &secret)?);
        }
        if let Some(list) = lookup("PKD_WITNESSES") {
            config.security.witnesses = parse_witnesses(&list)?;
        }
        if let Some(level) = lookup("PKD_LOG_LEVEL") {
            config.log.level = level;
        }
        if let Some(json) = lookup("PKD_JSON_LOGS") {
            config.log.json = matches!(json.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the hostname is empty or `localhost`
    /// - no HPKE secret is configured
    /// - no data directory is configured
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        let host = self.hostname.trim();
        if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
            return Err(ConfigError::InvalidHostname(self.hostname.clone()));
        }
        if self.security.hpke_secret_key.is_none() {
            return Err(ConfigError::MissingHpkeSecret);
        }
        if self.storage.data_dir.is_none() {
            return Err(ConfigError::EphemeralStorage);
        }
        Ok(())
    }

    /// Merkle Log tuning derived from this configuration.
    pub fn merkle_log_config(&self) -> MerkleLogConfig {
        MerkleLogConfig {
            max_attempts: self.storage.max_attempts,
            busy_timeout: Duration::from_millis(self.storage.busy_timeout_ms),
            leaf_cache_size: self.storage.leaf_cache_size,
            max_page_size: self.replication.max_page_size,
            ..MerkleLogConfig::default()
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for the store file. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Attempts per leaf insertion, counting the first.
    pub max_attempts: u32,
    /// Writer wait for the critical section, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Leaves kept in the read cache.
    pub leaf_cache_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            max_attempts: 3,
            busy_timeout_ms: 5_000,
            leaf_cache_size: 256,
        }
    }
}

impl StorageConfig {
    /// Name of the store file inside `data_dir`.
    pub const STORE_FILE: &'static str = "pkd.store";

    /// Full path of the store file, if persistent.
    pub fn store_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(Self::STORE_FILE))
    }
}

/// Security configuration.
#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    /// X25519 secret for sealed messages. MUST be set in production.
    pub hpke_secret_key: Option<[u8; 32]>,
    /// Allow-listed witnesses: origin hostname to Ed25519 key.
    pub witnesses: BTreeMap<String, PublicKey>,
}

/// Replication configuration.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Peers registered at startup when not already known.
    pub peers: Vec<Peer>,
    /// Page size cap for `hashes_since`.
    pub max_page_size: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            max_page_size: 100,
        }
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidVariable {
            var,
            reason: e.to_string(),
        })
}

fn parse_key(var: &'static str, value: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(value.trim()).map_err(|e| ConfigError::InvalidVariable {
        var,
        reason: e.to_string(),
    })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ConfigError::InvalidVariable {
            var,
            reason: format!("must be 32 bytes (64 hex chars), got {}", bytes.len()),
        })
}

fn parse_witnesses(list: &str) -> Result<BTreeMap<String, PublicKey>, ConfigError> {
    let mut witnesses = BTreeMap::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (host, key) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidVariable {
                var: "PKD_WITNESSES",
                reason: format!("expected host=hexkey, got {entry:?}"),
            })?;
        witnesses.insert(host.trim().to_string(), parse_key("PKD_WITNESSES", key)?);
    }
    Ok(witnesses)
}
