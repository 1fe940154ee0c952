//! Discrete events delivered to the machine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A discrete event: a name plus an opaque JSON payload.
///
/// The engine dispatches on `name` only; the payload is passed through to
/// guards and reducers untouched.
///
/// # Example
///
/// ```rust
/// use waypoint::Event;
/// use serde_json::json;
///
/// let plain = Event::new("NEXT");
/// assert_eq!(plain.name, "NEXT");
///
/// let with_data = Event::with_payload("SET_SPEED", json!({ "rpm": 1200 }));
/// assert_eq!(with_data.payload["rpm"], 1200);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, matched against each node's transition table.
    pub name: String,
    /// Application-defined payload; `Null` when the event carries no data.
    pub payload: Value,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Value::Null,
        }
    }

    /// Create an event carrying a payload.
    pub fn with_payload(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// The synthetic event used when evaluating eventless ("always")
    /// transitions.
    pub(crate) fn eventless() -> Self {
        Self {
            name: String::new(),
            payload: Value::Null,
        }
    }

    /// True for the synthetic eventless event.
    pub fn is_eventless(&self) -> bool {
        self.name.is_empty()
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Event::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Event::new(name)
    }
}
