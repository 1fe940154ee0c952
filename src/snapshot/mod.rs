//! Serializable snapshots of machine state.
//!
//! A snapshot captures everything needed to reconstruct a running machine:
//! context, active configuration, entry counters, shallow-history records,
//! and the halted flag. The persisted form round-trips losslessly through
//! JSON (camelCase field names) and through a compact binary encoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

mod error;

pub use error::SnapshotError;

/// Complete serializable machine state at a point in time.
///
/// # Example
///
/// ```rust
/// use waypoint::Snapshot;
///
/// let text = r#"{
///     "context": { "cycleCount": 1 },
///     "configuration": ["green"],
///     "stateCounters": { "red": 1, "yellow": 1, "green": 1 }
/// }"#;
/// let snapshot = Snapshot::from_json(text).unwrap();
/// assert_eq!(snapshot.configuration, vec!["green"]);
/// assert!(!snapshot.halted);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Application context at the time of capture.
    pub context: Value,
    /// Active state identities, in activation order. Never empty for a
    /// valid snapshot.
    pub configuration: Vec<String>,
    /// Per-state entry counters; keys are state identities.
    pub state_counters: BTreeMap<String, u64>,
    /// Shallow-history records: history-enabled compound state to the
    /// child active at its last exit. Absent when no history was recorded.
    #[serde(default)]
    pub state_history: Option<BTreeMap<String, String>>,
    /// Whether the machine had halted on a top-level final state.
    #[serde(default)]
    pub halted: bool,
}

impl Snapshot {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Deserialize from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(text).map_err(|e| SnapshotError::Deserialization(e.to_string()))
    }

    /// Serialize to a compact binary encoding.
    ///
    /// The opaque context travels as JSON text inside the binary envelope:
    /// the binary codec is not self-describing and cannot carry an
    /// arbitrary JSON value directly.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let form = BinaryForm {
            context: serde_json::to_string(&self.context)
                .map_err(|e| SnapshotError::Serialization(e.to_string()))?,
            configuration: self.configuration.clone(),
            state_counters: self.state_counters.clone(),
            state_history: self.state_history.clone(),
            halted: self.halted,
        };
        bincode::serialize(&form).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Deserialize from the binary encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let form: BinaryForm = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::Deserialization(e.to_string()))?;
        let context = serde_json::from_str(&form.context)
            .map_err(|e| SnapshotError::Deserialization(e.to_string()))?;
        Ok(Self {
            context,
            configuration: form.configuration,
            state_counters: form.state_counters,
            state_history: form.state_history,
            halted: form.halted,
        })
    }
}

/// Wire shape of the binary encoding; identical to [`Snapshot`] except the
/// context field is pre-encoded JSON text.
#[derive(Serialize, Deserialize)]
struct BinaryForm {
    context: String,
    configuration: Vec<String>,
    state_counters: BTreeMap<String, u64>,
    state_history: Option<BTreeMap<String, String>>,
    halted: bool,
}
