//! Snapshot error types.

use thiserror::Error;

/// Errors raised while validating or (de)serializing a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot's configuration lists no active states.
    #[error("snapshot configuration is empty")]
    EmptyConfiguration,

    /// The snapshot references a state identity the machine does not have.
    #[error("snapshot references unknown state '{0}'")]
    UnknownState(String),

    /// Serialization to JSON or binary format failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Deserialization from JSON or binary format failed.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}
