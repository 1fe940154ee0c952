//! Declarative machine definition types.
//!
//! These are plain data: the state tree shape, transition targets as raw
//! keys, and guard expressions by name. Functions live in the separate
//! guard/reducer registries, so a definition (minus behavior) can be
//! stored and loaded as JSON.

use crate::core::GuardDef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Explicit kind marker in a state definition (`type: 'final' | 'parallel'`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Final,
    Parallel,
}

/// A declarative transition.
///
/// `target` is a raw key resolved at compile time: an absolute
/// dot-delimited identity, a top-level state key, or a sibling key of the
/// defining state, preferred in that order. `None` marks an internal
/// transition.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionDef {
    pub target: Option<String>,
    pub guard: Option<GuardDef>,
    pub reducers: Vec<String>,
}

impl TransitionDef {
    /// Transition to a target state.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Internal transition: reducers only, configuration unchanged.
    pub fn internal() -> Self {
        Self::default()
    }

    /// Attach a guard expression.
    pub fn guarded(mut self, guard: GuardDef) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Append a reducer to run during the transition.
    pub fn reducer(mut self, name: impl Into<String>) -> Self {
        self.reducers.push(name.into());
        self
    }
}

/// A declarative state node.
///
/// A state with nested `states` and an `initial` key compiles to a
/// compound node; nested `states` without `initial` (or `type: parallel`)
/// compile to a parallel node; no nested states compiles to an atomic
/// node.
///
/// # Example
///
/// ```rust
/// use waypoint::{StateDef, TransitionDef};
///
/// let light = StateDef::new()
///     .initial("red")
///     .state("red", StateDef::new().on("NEXT", TransitionDef::to("yellow")))
///     .state("yellow", StateDef::new().on("NEXT", TransitionDef::to("green")))
///     .state("green", StateDef::new().on("NEXT", TransitionDef::to("red")));
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateDef {
    /// Event name to ordered transition list.
    pub on: IndexMap<String, Vec<TransitionDef>>,
    /// Eventless transitions.
    pub always: Vec<TransitionDef>,
    pub on_entry: Vec<String>,
    pub on_exit: Vec<String>,
    /// Activity identifiers owned by this state.
    pub activities: Vec<String>,
    /// Record shallow history for this compound state.
    pub history: bool,
    #[serde(rename = "type")]
    pub kind: Option<StateKind>,
    /// Initial child key; required for compound states.
    pub initial: Option<String>,
    /// Nested states in declaration order.
    pub states: IndexMap<String, StateDef>,
}

impl StateDef {
    /// Create an empty (atomic) state definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transition for an event; repeated calls for the same
    /// event append in declaration order.
    pub fn on(mut self, event: impl Into<String>, transition: TransitionDef) -> Self {
        self.on.entry(event.into()).or_default().push(transition);
        self
    }

    /// Append an eventless transition.
    pub fn always(mut self, transition: TransitionDef) -> Self {
        self.always.push(transition);
        self
    }

    /// Append an on-entry reducer.
    pub fn on_entry(mut self, name: impl Into<String>) -> Self {
        self.on_entry.push(name.into());
        self
    }

    /// Append an on-exit reducer.
    pub fn on_exit(mut self, name: impl Into<String>) -> Self {
        self.on_exit.push(name.into());
        self
    }

    /// Declare an activity identifier.
    pub fn activity(mut self, name: impl Into<String>) -> Self {
        self.activities.push(name.into());
        self
    }

    /// Enable shallow history.
    pub fn history(mut self) -> Self {
        self.history = true;
        self
    }

    /// Mark as a final state.
    pub fn final_state(mut self) -> Self {
        self.kind = Some(StateKind::Final);
        self
    }

    /// Mark as a parallel state explicitly.
    pub fn parallel(mut self) -> Self {
        self.kind = Some(StateKind::Parallel);
        self
    }

    /// Set the initial child key.
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.initial = Some(key.into());
        self
    }

    /// Add a nested state; declaration order is preserved.
    pub fn state(mut self, key: impl Into<String>, def: StateDef) -> Self {
        self.states.insert(key.into(), def);
        self
    }
}
