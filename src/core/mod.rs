//! Core value types of the engine: events, guard expressions, reducers.
//!
//! Everything in this module is pure. Guards and reducers are supplied by
//! the application through named registries; the engine only resolves names
//! and sequences calls.

mod event;
pub mod guard;
pub mod reducer;

pub use event::Event;
pub use guard::{GuardDef, GuardFn, GuardRegistry};
pub use reducer::{ReducerFn, ReducerRegistry};
