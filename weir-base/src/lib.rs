//! # weir-base
//!
//! Ambient services for weir applications: configuration sections, tracing
//! setup and long-running daemons with graceful shutdown.
//!
//! ## Core Components
//!
//! - **Configuration**: JSON sections merged from several sources and read as typed values
//! - **Tracing**: A `tracing_subscriber` registry configured from the `tracing` section
//! - **Daemons**: Background services that start together and stop on the first exit
//! - **Defer**: Scope-exit guards for cleanup and logging
//!
//! ## Configuration Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use weir_base::{Config, ConfigSection};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct DatabaseConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl ConfigSection for DatabaseConfig {
//!     fn key() -> &'static str {
//!         "database"
//!     }
//! }
//!
//! let config = Config::new().with(
//!     "database",
//!     DatabaseConfig {
//!         host: "localhost".to_string(),
//!         port: 5432,
//!     },
//! );
//!
//! let database = config.section::<DatabaseConfig>().unwrap().unwrap();
//! assert_eq!(database.port, 5432);
//! ```
//!
//! ## Features
//!
//! - `macros` (default): Enables the `#[config_section("key")]` attribute macro

mod config;
mod daemon;
mod defer;
mod tracing;

pub use config::*;
pub use daemon::*;
pub use defer::*;
pub use tracing::*;

#[cfg(feature = "macros")]
pub use weir_base_macros::*;

pub use async_trait::async_trait;
