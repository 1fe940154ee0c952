//! Waypoint: a synchronous statechart engine.
//!
//! Waypoint interprets hierarchical and parallel state machines
//! (SCXML-style statecharts) as pure computations: given a declarative
//! machine definition and a sequence of events, it deterministically
//! produces active-state configurations and an opaque application context,
//! with no side effects of its own.
//!
//! # Core Concepts
//!
//! - **States**: atomic leaves, compound states with one active child, and
//!   parallel states whose regions are all active at once
//! - **Guards**: named pure predicates combined with `and`/`or`/`not`
//! - **Reducers**: named pure functions producing context patches, merged
//!   shallowly over the previous context
//! - **History**: shallow per-compound memory of the last active child
//! - **Snapshots & time travel**: full machine state as serializable data,
//!   with an optional branching rewind/fast-forward log
//!
//! # Example
//!
//! ```rust
//! use waypoint::{MachineBuilder, StateDef, TransitionDef};
//! use serde_json::json;
//!
//! let mut machine = MachineBuilder::new()
//!     .initial("idle")
//!     .state("idle", StateDef::new().on("START", TransitionDef::to("running")))
//!     .state("running", StateDef::new().on("STOP", TransitionDef::to("idle")))
//!     .build()
//!     .unwrap();
//!
//! machine.start().unwrap();
//! machine.send("START").unwrap();
//! assert_eq!(machine.state_value(), json!("running"));
//! ```

pub mod core;
pub mod graph;
pub mod machine;
pub mod snapshot;

mod builder;
mod error;
mod timetravel;

// Re-export the public surface at the crate root.
pub use crate::core::{Event, GuardDef, GuardRegistry, ReducerRegistry};
pub use builder::MachineBuilder;
pub use error::MachineError;
pub use graph::{CompileError, StateDef, StateKind, TransitionDef};
pub use machine::{ActivityHandle, Machine, MachineConfig};
pub use snapshot::{Snapshot, SnapshotError};
