//! Transition selection: ancestor climbing, shadowing, broadcast.

use crate::core::{guard, Event};
use crate::error::MachineError;
use crate::graph::{NodeId, NodeKind};
use crate::machine::Machine;
use std::collections::HashSet;

/// A transition chosen for one active leaf: the leaf that claimed it, the
/// node whose table it was found in, and its position in that table.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Selection {
    pub leaf: NodeId,
    pub owner: NodeId,
    pub index: usize,
}

impl Machine {
    /// Find the enabled transition for each active atomic leaf.
    ///
    /// Per leaf: walk the ancestor chain self-first; at each node scan the
    /// transitions registered for the event in declaration order and take
    /// the first whose guard passes; stop climbing once one is chosen.
    ///
    /// Then two corrections over the raw candidates:
    /// - shadowing: a candidate is dropped when another leaf claimed the
    ///   event strictly below it (parent handlers are suppressed whenever
    ///   any active child handles the event);
    /// - broadcast dedup: the same ancestor transition reached from several
    ///   parallel leaves fires once.
    pub(crate) fn select_transitions(
        &self,
        event: &Event,
    ) -> Result<Vec<Selection>, MachineError> {
        let graph = &self.graph;

        let mut leaves: Vec<NodeId> = self
            .configuration
            .iter()
            .copied()
            .filter(|id| graph.node(*id).kind == NodeKind::Atomic)
            .collect();
        // Region declaration order for deterministic broadcast.
        leaves.sort();

        let mut candidates = Vec::new();
        'leaves: for leaf in leaves {
            let leaf_path = graph.path_of(leaf);
            for owner in graph.ancestor_chain(leaf) {
                let Some(transitions) = graph.transitions_for(owner, event) else {
                    continue;
                };
                for (index, transition) in transitions.iter().enumerate() {
                    let enabled = match &transition.guard {
                        None => true,
                        Some(expr) => guard::evaluate(
                            expr,
                            &self.guards,
                            &self.context,
                            event,
                            leaf_path,
                        )?,
                    };
                    if enabled {
                        candidates.push(Selection { leaf, owner, index });
                        continue 'leaves;
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        let selections = candidates
            .iter()
            .copied()
            .filter(|pick| {
                !candidates
                    .iter()
                    .any(|other| graph.is_proper_ancestor(pick.owner, other.owner))
            })
            .filter(|pick| seen.insert((pick.owner, pick.index)))
            .collect();
        Ok(selections)
    }
}
