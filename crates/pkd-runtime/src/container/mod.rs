//! # Directory Container
//!
//! Configuration plus the single owner of every subsystem instance. Built
//! once at startup and passed by reference; there is no process-global state.

pub mod config;
pub mod directory;

pub use config::{
    ConfigError, DirectoryConfig, LogConfig, ReplicationConfig, SecurityConfig, StorageConfig,
};
pub use directory::{ContainerError, DirectoryContainer};
