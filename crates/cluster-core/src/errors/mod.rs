//! Error types for the replication core
//!
//! Three independent error kinds cross this crate's boundaries: storage
//! faults raised by distributed-store backends, reconstruction faults raised
//! while rebuilding live objects from stored snapshots, and configuration
//! faults that are fatal at node startup only. Storage and reconstruction
//! errors are always caught at the coordinator boundary and degraded to
//! "entry absent" / "write skipped"; they never reach the protocol engine.

use thiserror::Error;

use crate::engine::Transport;

/// Errors raised by a distributed-store backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),

    #[error("Backend fault: {0}")]
    Backend(String),
}

/// Errors raised while rebuilding a live dialog or transaction from a
/// stored snapshot.
#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("Unparsable stored last response for {key}: {detail}")]
    MalformedResponse { key: String, detail: String },

    #[error("Unparsable stored contact for {key}: {detail}")]
    MalformedContact { key: String, detail: String },

    #[error("Snapshot for {key} is missing required field '{field}'")]
    MissingField { key: String, field: &'static str },

    #[error("Snapshot for {key} has malformed field '{field}': {detail}")]
    MalformedField {
        key: String,
        field: &'static str,
        detail: String,
    },

    #[error("No local listening point for transport {0}")]
    NoLocalEndpoint(Transport),
}

/// Configuration errors, fatal at node startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown replication strategy '{0}'")]
    UnknownStrategy(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
pub type ReconstructionResult<T> = Result<T, ReconstructionError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
