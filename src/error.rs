//! Runtime error types for the statechart engine.

use crate::snapshot::SnapshotError;
use thiserror::Error;

/// Errors raised while operating a running machine.
///
/// Every variant is fatal for the operation that raised it: there is no
/// partial-failure mode and the engine never retries internally.
#[derive(Debug, Error)]
pub enum MachineError {
    /// An operation that requires a started machine was called before `start`.
    #[error("machine has not been started")]
    NotStarted,

    /// An operation that requires a fresh machine was called after `start`.
    #[error("machine has already been started")]
    AlreadyStarted,

    /// A guard expression referenced a predicate that was never registered.
    #[error("no guard named '{0}' is registered")]
    MissingGuard(String),

    /// A transition or entry/exit hook referenced an unregistered reducer.
    #[error("no reducer named '{0}' is registered")]
    MissingReducer(String),

    /// Eventless transitions kept firing past the iteration ceiling.
    ///
    /// This indicates a cyclic machine definition; retrying cannot change
    /// the outcome.
    #[error("eventless transitions did not settle within {limit} iterations")]
    InfiniteLoop { limit: usize },

    /// `rewind`/`fast_forward` was called on a machine built without the
    /// time-travel flag.
    #[error("time travel is not enabled for this machine")]
    TimeTravelDisabled,

    /// A snapshot failed validation or (de)serialization.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
