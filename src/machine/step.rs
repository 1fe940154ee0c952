//! Transition application: LCA scoping, exit/entry sets, activation,
//! deactivation, and the eventless microstep loop.

use crate::core::{reducer, Event};
use crate::error::MachineError;
use crate::graph::{NodeId, NodeKind};
use crate::machine::select::Selection;
use crate::machine::Machine;
use std::sync::Arc;
use tracing::{debug, trace};

/// Iteration ceiling for the eventless microstep loop.
pub(crate) const ALWAYS_LIMIT: usize = 100;

/// How far activation recurses below a node.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Descend {
    /// Enter the node's default substructure: initial (or history) child
    /// for a compound, every region for a parallel.
    Full,
    /// The node is a pass-through ancestor on an entry path; the next path
    /// node is entered by the caller. A parallel node still enters its
    /// off-path regions so all regions stay active together.
    PathOnly { next: NodeId },
}

impl Machine {
    /// Apply a batch of selected transitions in order.
    pub(crate) fn apply_selections(
        &mut self,
        selections: &[Selection],
        event: &Event,
    ) -> Result<(), MachineError> {
        let graph = Arc::clone(&self.graph);
        for selection in selections {
            // An earlier transition in this batch may have exited the leaf.
            if !self.configuration.contains(&selection.leaf) {
                continue;
            }
            let transition = graph
                .transitions_for(selection.owner, event)
                .expect("selection refers to an existing transition list")[selection.index]
                .clone();
            let source_path = graph.path_of(selection.leaf).to_string();

            let Some(target) = transition.target else {
                // Internal transition: reducers only.
                let next = reducer::apply(
                    &transition.reducers,
                    &self.reducers,
                    &self.context,
                    event,
                    &source_path,
                )?;
                self.context = next;
                continue;
            };

            let lca = graph.lca(selection.leaf, target);
            // Targeting the LCA itself (an ancestor, or the source for a
            // self-transition) fully exits and re-enters it. A parallel LCA
            // is exited wholesale too: a cross-region transition restarts
            // every sibling region, keeping all regions active together.
            let include_lca = target == lca || graph.node(lca).kind == NodeKind::Parallel;

            if self.debug {
                debug!(
                    source = source_path.as_str(),
                    target = graph.path_of(target),
                    lca = graph.path_of(lca),
                    "applying transition"
                );
            }

            let mut exit_set = Vec::new();
            for id in graph.ancestor_chain(selection.leaf) {
                if id == lca {
                    break;
                }
                exit_set.push(id);
            }
            if include_lca {
                exit_set.push(lca);
            }
            // Deactivating the topmost exited node tears down its whole
            // active subtree children-first, so exit reducers run leaf to
            // root and history is captured before teardown.
            if let Some(top) = exit_set.last() {
                self.deactivate(*top, event)?;
            }

            let next = reducer::apply(
                &transition.reducers,
                &self.reducers,
                &self.context,
                event,
                &source_path,
            )?;
            self.context = next;

            let mut entry_path = Vec::new();
            for id in graph.ancestor_chain(target) {
                if id == lca && !include_lca {
                    break;
                }
                entry_path.push(id);
                if id == lca {
                    break;
                }
            }
            entry_path.reverse();
            for (position, id) in entry_path.iter().enumerate() {
                if self.configuration.contains(id) {
                    // Already active; nothing to enter.
                    continue;
                }
                let descend = match entry_path.get(position + 1) {
                    Some(next_on_path) => Descend::PathOnly {
                        next: *next_on_path,
                    },
                    None => Descend::Full,
                };
                self.activate(*id, event, descend)?;
            }
        }
        Ok(())
    }

    /// Activate a node: bump its entry counter, run entry reducers, enter
    /// children per its kind, then add it to the configuration.
    pub(crate) fn activate(
        &mut self,
        id: NodeId,
        event: &Event,
        descend: Descend,
    ) -> Result<(), MachineError> {
        let graph = Arc::clone(&self.graph);
        let node = graph.node(id);

        *self.counters.entry(id).or_insert(0) += 1;
        if self.debug {
            debug!(state = node.path.as_str(), "entering state");
        }

        let next = reducer::apply(
            &node.on_entry,
            &self.reducers,
            &self.context,
            event,
            &node.path,
        )?;
        self.context = next;

        match node.kind {
            NodeKind::Atomic => {}
            NodeKind::Compound => {
                if let Descend::Full = descend {
                    let child = self.history.get(&id).copied().or(node.initial);
                    if let Some(child) = child {
                        self.activate(child, event, Descend::Full)?;
                    }
                }
            }
            NodeKind::Parallel => {
                let skip = match descend {
                    Descend::Full => None,
                    Descend::PathOnly { next } => Some(next),
                };
                for &region in &node.children {
                    if Some(region) != skip {
                        self.activate(region, event, Descend::Full)?;
                    }
                }
            }
        }

        self.configuration.push(id);
        Ok(())
    }

    /// Deactivate a node: tear down active children first, run exit
    /// reducers, record shallow history, then remove from the
    /// configuration.
    pub(crate) fn deactivate(&mut self, id: NodeId, event: &Event) -> Result<(), MachineError> {
        let graph = Arc::clone(&self.graph);
        let node = graph.node(id);

        // Capture the active child before teardown; shallow history records
        // the direct child only.
        let remembered = if node.history {
            node.children
                .iter()
                .copied()
                .find(|child| self.configuration.contains(child))
        } else {
            None
        };

        for &child in &node.children {
            if self.configuration.contains(&child) {
                self.deactivate(child, event)?;
            }
        }

        let next = reducer::apply(
            &node.on_exit,
            &self.reducers,
            &self.context,
            event,
            &node.path,
        )?;
        self.context = next;

        if let Some(child) = remembered {
            self.history.insert(id, child);
        }
        self.configuration.retain(|active| *active != id);
        if self.debug {
            debug!(state = node.path.as_str(), "exited state");
        }
        Ok(())
    }

    /// Re-evaluate eventless transitions until none apply or the iteration
    /// ceiling is hit.
    ///
    /// A batch made up solely of internal transitions converges after one
    /// application: internal microsteps cannot re-enable further eventless
    /// transitions on new children, so no rescan is needed.
    pub(crate) fn run_microsteps(&mut self) -> Result<(), MachineError> {
        let graph = Arc::clone(&self.graph);
        let event = Event::eventless();
        let mut iterations = 0usize;
        loop {
            let selections = self.select_transitions(&event)?;
            if selections.is_empty() {
                break;
            }
            iterations += 1;
            if iterations > ALWAYS_LIMIT {
                return Err(MachineError::InfiniteLoop {
                    limit: ALWAYS_LIMIT,
                });
            }
            if self.debug {
                trace!(iteration = iterations, count = selections.len(), "microstep");
            }
            let all_internal = selections.iter().all(|selection| {
                graph
                    .transitions_for(selection.owner, &event)
                    .expect("selection refers to an existing transition list")[selection.index]
                    .target
                    .is_none()
            });
            self.apply_selections(&selections, &event)?;
            if all_internal {
                break;
            }
        }
        Ok(())
    }

    /// A machine halts when a final state directly under the root becomes
    /// active.
    pub(crate) fn refresh_halted(&mut self) {
        let root = self.graph.root();
        self.halted = self.configuration.iter().any(|id| {
            let node = self.graph.node(*id);
            node.is_final && node.parent == Some(root)
        });
    }
}
