//! Fluent builder for machine construction.

use crate::core::{Event, GuardRegistry, ReducerRegistry};
use crate::graph::{CompileError, StateDef};
use crate::machine::{Machine, MachineConfig};
use indexmap::IndexMap;
use serde_json::Value;

/// Builder assembling a [`MachineConfig`] piece by piece.
///
/// # Example
///
/// ```rust
/// use waypoint::{MachineBuilder, StateDef, TransitionDef};
/// use serde_json::json;
///
/// let mut machine = MachineBuilder::new()
///     .initial_context(json!({ "cycleCount": 0 }))
///     .initial("red")
///     .state("red", StateDef::new().on("NEXT", TransitionDef::to("yellow").reducer("countCycle")))
///     .state("yellow", StateDef::new().on("NEXT", TransitionDef::to("green")))
///     .state("green", StateDef::new().on("NEXT", TransitionDef::to("red")))
///     .reducer("countCycle", |ctx, _, _| {
///         json!({ "cycleCount": ctx["cycleCount"].as_i64().unwrap_or(0) + 1 })
///     })
///     .build()
///     .unwrap();
///
/// machine.start().unwrap();
/// machine.send("NEXT").unwrap();
/// assert_eq!(machine.state_value(), json!("yellow"));
/// assert_eq!(machine.context()["cycleCount"], 1);
/// ```
#[derive(Default)]
pub struct MachineBuilder {
    initial_context: Value,
    initial: Option<String>,
    states: IndexMap<String, StateDef>,
    guards: GuardRegistry,
    reducers: ReducerRegistry,
    debug: bool,
    time_travel: bool,
}

impl MachineBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting context (defaults to `Null`).
    pub fn initial_context(mut self, context: Value) -> Self {
        self.initial_context = context;
        self
    }

    /// Set the top-level initial state key (required).
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.initial = Some(key.into());
        self
    }

    /// Add a top-level state; declaration order is preserved.
    pub fn state(mut self, key: impl Into<String>, def: StateDef) -> Self {
        self.states.insert(key.into(), def);
        self
    }

    /// Replace the whole state tree at once.
    pub fn states(mut self, states: IndexMap<String, StateDef>) -> Self {
        self.states = states;
        self
    }

    /// Register a named guard predicate.
    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &Event, &str) -> bool + Send + Sync + 'static,
    {
        self.guards.register(name, predicate);
        self
    }

    /// Register a named reducer.
    pub fn reducer<F>(mut self, name: impl Into<String>, reducer: F) -> Self
    where
        F: Fn(&Value, &Event, &str) -> Value + Send + Sync + 'static,
    {
        self.reducers.register(name, reducer);
        self
    }

    /// Emit structured trace events while processing.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Keep a snapshot log for `rewind`/`fast_forward`.
    pub fn time_travel(mut self, enabled: bool) -> Self {
        self.time_travel = enabled;
        self
    }

    /// Compile the machine.
    pub fn build(self) -> Result<Machine, CompileError> {
        let initial = self.initial.ok_or(CompileError::MissingInitial)?;
        Machine::new(MachineConfig {
            initial_context: self.initial_context,
            initial,
            states: self.states,
            guards: self.guards,
            reducers: self.reducers,
            debug: self.debug,
            time_travel: self.time_travel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TransitionDef;
    use serde_json::json;

    #[test]
    fn builder_requires_an_initial_state() {
        let result = MachineBuilder::new().state("a", StateDef::new()).build();
        assert!(matches!(result, Err(CompileError::MissingInitial)));
    }

    #[test]
    fn builder_surfaces_compile_errors() {
        let result = MachineBuilder::new()
            .initial("a")
            .state("a", StateDef::new().on("GO", TransitionDef::to("ghost")))
            .build();
        assert!(matches!(result, Err(CompileError::UnresolvedTarget { .. })));
    }

    #[test]
    fn built_machine_starts_in_the_initial_state() {
        let mut machine = MachineBuilder::new()
            .initial("idle")
            .state("idle", StateDef::new())
            .state("busy", StateDef::new())
            .build()
            .unwrap();
        machine.start().unwrap();
        assert_eq!(machine.state_value(), json!("idle"));
        assert_eq!(machine.active_state_nodes(), vec!["idle"]);
    }
}
