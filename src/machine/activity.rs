//! Activity tracking via per-state entry counters.
//!
//! The engine never runs activities; it only reports which declared
//! activity instances are live so an external runtime can start and stop
//! the side effects they stand for. Instance identity comes from the
//! owning state's entry counter: exiting and re-entering a state mints a
//! new instance, which is how a host detects that a previously started
//! side effect is stale.

use crate::machine::Machine;
use serde::{Deserialize, Serialize};

/// One live (or once-live) activity instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityHandle {
    /// Declared activity identifier.
    pub activity: String,
    /// Identity of the state that declares it.
    pub state_id: String,
    /// Entry-counter value of the state at the time the handle was issued.
    pub instance: u64,
}

impl ActivityHandle {
    /// Stable rendering of the instance identity: `"{state_id}_{instance}"`.
    pub fn instance_id(&self) -> String {
        format!("{}_{}", self.state_id, self.instance)
    }
}

impl Machine {
    /// Activities of every currently active state, paired with the state's
    /// current entry counter.
    pub fn active_activities(&self) -> Vec<ActivityHandle> {
        let mut active: Vec<_> = self.configuration.clone();
        active.sort();

        let mut handles = Vec::new();
        for id in active {
            let node = self.graph.node(id);
            let instance = self.counters.get(&id).copied().unwrap_or(0);
            for activity in &node.activities {
                handles.push(ActivityHandle {
                    activity: activity.clone(),
                    state_id: node.path.clone(),
                    instance,
                });
            }
        }
        handles
    }

    /// Whether a previously issued handle still refers to a live instance:
    /// its state must be active and its counter unchanged since issuance.
    pub fn is_activity_relevant(&self, handle: &ActivityHandle) -> bool {
        match self.graph.id_of(&handle.state_id) {
            Some(id) => {
                self.configuration.contains(&id)
                    && self.counters.get(&id).copied().unwrap_or(0) == handle.instance
            }
            None => false,
        }
    }

    /// Render a handle's instance identity.
    pub fn activity_instance(&self, handle: &ActivityHandle) -> String {
        handle.instance_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_joins_state_and_counter() {
        let handle = ActivityHandle {
            activity: "poll".to_string(),
            state_id: "net.online".to_string(),
            instance: 3,
        };
        assert_eq!(handle.instance_id(), "net.online_3");
    }
}
