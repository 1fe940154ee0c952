//! The declarative definition, its compiler, and the resolved node graph.
//!
//! The graph is built once at machine construction and never mutated
//! afterward; every other component operates over it by id.

mod compiler;
pub mod definition;
mod error;
mod node;

pub use compiler::compile;
pub use definition::{StateDef, StateKind, TransitionDef};
pub use error::CompileError;
pub use node::{NodeGraph, NodeId, NodeKind, StateNode, Transition};
