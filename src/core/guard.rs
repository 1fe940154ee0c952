//! Guard expressions and their evaluation.
//!
//! Guards are pure boolean predicates over context and event. A transition
//! may name a single predicate or combine several with `and`/`or`/`not`.
//! Predicates are registered by name; referencing an unregistered name is a
//! first-class error, never a silent skip.

use crate::core::event::Event;
use crate::error::MachineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Signature of a registered guard predicate.
///
/// Receives the current context, the event being processed, and the
/// identity of the source state. Predicates must be pure: deterministic and
/// free of side effects. This is a documented contract, not an enforced
/// invariant — `and`/`or` evaluate left-to-right with short-circuiting, so
/// ordering is observable only for impure predicates.
pub type GuardFn = dyn Fn(&Value, &Event, &str) -> bool + Send + Sync;

/// A guard expression: a named predicate or a boolean combinator tree.
///
/// Constructed as a tree, never a graph, so evaluation always terminates.
///
/// # Example
///
/// ```rust
/// use waypoint::GuardDef;
///
/// let expr = GuardDef::all(vec![
///     GuardDef::named("doorClosed"),
///     GuardDef::negate(GuardDef::named("alarmActive")),
/// ]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardDef {
    /// Reference to a registered predicate by name.
    Ref(String),
    /// True when every child expression is true (short-circuits on false).
    And(Vec<GuardDef>),
    /// True when any child expression is true (short-circuits on true).
    Or(Vec<GuardDef>),
    /// Negation of a single nested expression.
    Not(Box<GuardDef>),
}

impl GuardDef {
    /// Reference a registered predicate by name.
    pub fn named(name: impl Into<String>) -> Self {
        GuardDef::Ref(name.into())
    }

    /// Conjunction of expressions.
    pub fn all(exprs: Vec<GuardDef>) -> Self {
        GuardDef::And(exprs)
    }

    /// Disjunction of expressions.
    pub fn any(exprs: Vec<GuardDef>) -> Self {
        GuardDef::Or(exprs)
    }

    /// Negation of an expression.
    pub fn negate(expr: GuardDef) -> Self {
        GuardDef::Not(Box::new(expr))
    }
}

/// Named registry of guard predicates.
#[derive(Clone, Default)]
pub struct GuardRegistry {
    predicates: HashMap<String, Arc<GuardFn>>,
}

impl GuardRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate under a name, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Event, &str) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    fn get(&self, name: &str) -> Option<&Arc<GuardFn>> {
        self.predicates.get(name)
    }
}

/// Evaluate a guard expression against context and event.
///
/// `source_state_id` is the identity of the state whose transition is being
/// considered; it is forwarded to predicates for context-sensitive rules.
pub fn evaluate(
    expr: &GuardDef,
    registry: &GuardRegistry,
    context: &Value,
    event: &Event,
    source_state_id: &str,
) -> Result<bool, MachineError> {
    match expr {
        GuardDef::Ref(name) => {
            let predicate = registry
                .get(name)
                .ok_or_else(|| MachineError::MissingGuard(name.clone()))?;
            Ok(predicate(context, event, source_state_id))
        }
        GuardDef::And(exprs) => {
            for child in exprs {
                if !evaluate(child, registry, context, event, source_state_id)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        GuardDef::Or(exprs) => {
            for child in exprs {
                if evaluate(child, registry, context, event, source_state_id)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        GuardDef::Not(inner) => {
            Ok(!evaluate(inner, registry, context, event, source_state_id)?)
        }
    }
}
