/// Error handling module for Port Manager.
///
/// This module defines the error types used throughout the library.
/// Every failure is scoped to the single request that produced it; none of
/// them is fatal to the manager itself.
///
/// # Example
///
/// ```
/// use port_manager::error::{Error, Result};
///
/// fn describe(result: Result<u32>) {
///     match result {
///         Ok(pid) => println!("Started with PID {}", pid),
///         Err(Error::Launch(msg)) => println!("Could not launch: {}", msg),
///         Err(Error::Probe(msg)) => println!("Port state unknown: {}", msg),
///         Err(Error::Timeout(msg)) => println!("Gave up: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the port-manager library.
#[derive(Error, Debug)]
pub enum Error {
    /// Enumerating the owners of a port failed.
    ///
    /// This error occurs when:
    /// - The socket-owner tool is missing or cannot be executed
    /// - The tool exits with an unexpected status
    /// - The tool output cannot be parsed
    ///
    /// Port state is unknown in this case; it is never treated as "not running".
    #[error("Port probe failed: {0}")]
    Probe(String),

    /// Spawning a command failed.
    ///
    /// This error occurs when:
    /// - The command file does not exist
    /// - Permission is denied
    /// - The interpreter is missing
    #[error("Failed to launch process: {0}")]
    Launch(String),

    /// A signal could not be delivered to a process.
    #[error("Signal delivery failed: {0}")]
    Signal(String),

    /// Operation exceeded its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Reading or writing the entry store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Failed to parse configuration from a file or string.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    ///
    /// This error occurs when:
    /// - The API port is zero
    /// - The worker count is zero
    /// - The operation timeout is shorter than the minimum
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A referenced entry or file was not found.
    #[error("Not found: {0}")]
    EntryNotFound(String),

    /// A request is missing required fields or carries bad values.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error in serializing or deserializing data.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for port-manager operations.
pub type Result<T> = std::result::Result<T, Error>;
