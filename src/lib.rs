//! # ClipShare
//!
//! Shared clipboard server. A short, human-chosen *code* names a bucket of
//! text snippets; anyone who knows the code can read and append to it, unless
//! the bucket was created private, in which case every call must carry the
//! matching passcode.
//!
//! The library exposes the pieces the `clipshare` binary wires together:
//! [`store`] persists one record per code, [`service`] enforces the access
//! rules and item invariants, and [`server`] maps them onto a small REST API.

pub mod cli;
pub mod config;
pub mod passcode;
pub mod server;
pub mod service;
pub mod store;

pub use config::Config;
pub use service::{ClipboardService, ServiceError};
pub use store::{ClipboardItem, ClipboardRecord, ClipboardStore};

/// Result type alias for ClipShare operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ClipShare operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] store::StoreError),

    /// Clipboard operation error
    #[error("Clipboard error: {0}")]
    Service(#[from] service::ServiceError),

    /// Passcode hashing error
    #[error("Passcode error: {0}")]
    Passcode(#[from] passcode::PasscodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
