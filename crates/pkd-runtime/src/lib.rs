//! # Directory Runtime
//!
//! Everything between the process boundary and the subsystems.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and the [`DirectoryContainer`] that owns
//!   every subsystem
//! - `handler` - JSON request dispatch and structured error responses
//! - `telemetry` - `tracing-subscriber` bootstrap
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging
//! 3. Validate the configuration for production
//! 4. Open the store and build the subsystems in dependency order
//! 5. Serve requests

pub mod container;
pub mod handler;
pub mod telemetry;

pub use container::{ConfigError, ContainerError, DirectoryConfig, DirectoryContainer};
pub use handler::{Request, RequestHandler};
