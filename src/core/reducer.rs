//! Context reducers and their sequential application.
//!
//! A reducer is a pure function from `(context, event, state_id)` to a
//! patch. The engine merges each patch over the previous context with a
//! shallow field-wise overwrite, producing a fresh context value; the
//! original is never mutated in place.

use crate::core::event::Event;
use crate::error::MachineError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Signature of a registered reducer.
///
/// Returns only the fields that changed; unchanged fields are carried over
/// from the previous context. Returning `Null` means "no change".
pub type ReducerFn = dyn Fn(&Value, &Event, &str) -> Value + Send + Sync;

/// Named registry of reducers.
#[derive(Clone, Default)]
pub struct ReducerRegistry {
    reducers: HashMap<String, Arc<ReducerFn>>,
}

impl ReducerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reducer under a name, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, reducer: F)
    where
        F: Fn(&Value, &Event, &str) -> Value + Send + Sync + 'static,
    {
        self.reducers.insert(name.into(), Arc::new(reducer));
    }

    fn get(&self, name: &str) -> Option<&Arc<ReducerFn>> {
        self.reducers.get(name)
    }
}

/// Apply reducers in list order, threading the context through each.
///
/// Each step computes `merge(context, reducer(context, event, state_id))`.
/// Fails with [`MachineError::MissingReducer`] when a name is absent; by
/// that point earlier reducers in the list have already been threaded, so
/// callers must treat the machine as possibly-corrupted on error.
pub fn apply(
    names: &[String],
    registry: &ReducerRegistry,
    context: &Value,
    event: &Event,
    state_id: &str,
) -> Result<Value, MachineError> {
    let mut current = context.clone();
    for name in names {
        let reducer = registry
            .get(name)
            .ok_or_else(|| MachineError::MissingReducer(name.clone()))?;
        let patch = reducer(&current, event, state_id);
        current = merge(current, patch);
    }
    Ok(current)
}

/// Shallow merge of a patch over a base value.
///
/// Object-over-object overwrites top-level fields; a `Null` patch leaves
/// the base untouched; any other combination replaces the base wholesale
/// (the context is opaque and need not be an object).
fn merge(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (base, Value::Null) => base,
        (Value::Object(mut fields), Value::Object(updates)) => {
            for (key, value) in updates {
                fields.insert(key, value);
            }
            Value::Object(fields)
        }
        (_, patch) => patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ReducerRegistry {
        let mut reg = ReducerRegistry::new();
        reg.register("increment", |ctx, _, _| {
            json!({ "count": ctx["count"].as_i64().unwrap_or(0) + 1 })
        });
        reg.register("stamp", |_, event, state_id| {
            json!({ "lastEvent": event.name, "lastState": state_id })
        });
        reg.register("noop", |_, _, _| Value::Null);
        reg
    }

    #[test]
    fn reducers_thread_context_in_order() {
        let reg = registry();
        let ctx = json!({ "count": 1, "label": "keep" });
        let names = vec!["increment".to_string(), "increment".to_string()];

        let next = apply(&names, &reg, &ctx, &Event::new("TICK"), "counter").unwrap();

        assert_eq!(next["count"], 3);
        // Untouched fields survive the shallow merge.
        assert_eq!(next["label"], "keep");
    }

    #[test]
    fn reducer_sees_event_and_state_id() {
        let reg = registry();
        let next = apply(
            &["stamp".to_string()],
            &reg,
            &json!({}),
            &Event::new("PING"),
            "net.idle",
        )
        .unwrap();

        assert_eq!(next["lastEvent"], "PING");
        assert_eq!(next["lastState"], "net.idle");
    }

    #[test]
    fn null_patch_leaves_context_unchanged() {
        let reg = registry();
        let ctx = json!({ "count": 7 });
        let next = apply(&["noop".to_string()], &reg, &ctx, &Event::new("X"), "s").unwrap();
        assert_eq!(next, ctx);
    }

    #[test]
    fn missing_reducer_is_an_error() {
        let reg = registry();
        let result = apply(
            &["ghost".to_string()],
            &reg,
            &json!({}),
            &Event::new("X"),
            "s",
        );
        assert!(matches!(result, Err(MachineError::MissingReducer(name)) if name == "ghost"));
    }

    #[test]
    fn non_object_patch_replaces_wholesale() {
        let mut reg = ReducerRegistry::new();
        reg.register("replace", |_, _, _| json!(42));

        let next = apply(
            &["replace".to_string()],
            &reg,
            &json!({ "old": true }),
            &Event::new("X"),
            "s",
        )
        .unwrap();

        assert_eq!(next, json!(42));
    }

    #[test]
    fn empty_reducer_list_is_identity() {
        let reg = registry();
        let ctx = json!({ "a": 1 });
        let next = apply(&[], &reg, &ctx, &Event::new("X"), "s").unwrap();
        assert_eq!(next, ctx);
    }
}
