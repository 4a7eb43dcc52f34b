//! Configuration module for Port Manager.
//!
//! This module handles parsing, validation, and access to configuration
//! settings: where entries and logs live, the HTTP API listener, the
//! termination windows, and how command files are launched. Configurations
//! are JSON, loaded from files or strings.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use port_manager::config::Config;
//!
//! let config = Config::from_file("port-manager.json").unwrap();
//! println!("Entries are stored in {}", config.ports_file().display());
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use port_manager::config::{Config, TimingConfig, validate_config};
//!
//! let config = Config {
//!     api: None,
//!     timing: TimingConfig { grace_ms: 50, ..TimingConfig::default() },
//!     ..Config::default()
//! };
//! validate_config(&config).unwrap();
//! ```
mod parser;
pub mod validator;

pub use parser::{
    ApiConfig, Config, DEFAULT_API_PORT, DEFAULT_WORKERS, LaunchConfig, MIN_OPERATION_TIMEOUT_MS,
    TimingConfig,
};
pub use validator::validate_config;
