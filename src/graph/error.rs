//! Compile-time configuration errors.

use thiserror::Error;

/// Errors raised while compiling a declarative definition into a node
/// graph. All are fatal at construction; a machine is never built from a
/// partially valid definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// No top-level initial state was declared.
    #[error("no top-level initial state was declared")]
    MissingInitial,

    /// An `initial` key does not name an existing child.
    #[error("initial state '{initial}' is not a child of '{parent}'")]
    UnknownInitial { parent: String, initial: String },

    /// A transition target could not be resolved to any node.
    ///
    /// `state` is the identity of the node declaring the transition. (Not
    /// named `source`: thiserror reserves that field name for error
    /// chaining.)
    #[error("transition target '{target}' on '{state}' cannot be resolved")]
    UnresolvedTarget { state: String, target: String },

    /// A parallel state declared fewer than two regions.
    #[error("parallel state '{0}' must declare at least two regions")]
    TooFewRegions(String),

    /// A parallel state declared an initial child.
    #[error("parallel state '{0}' cannot declare an initial child")]
    ParallelWithInitial(String),

    /// A final state declared nested states.
    #[error("final state '{0}' cannot declare children")]
    FinalWithChildren(String),
}
