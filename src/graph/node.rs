//! The resolved node graph: an arena of state nodes.
//!
//! Nodes are stored in a flat arena and addressed by [`NodeId`] indices.
//! Parent and child links are indices into the arena, not owning
//! references, which keeps ancestor walks O(1) per step and the tree free
//! of reference cycles. The graph is immutable after compilation.

use crate::core::{Event, GuardDef};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Stable index of a node in the arena.
///
/// Ids are assigned in depth-first declaration order, so sorting a set of
/// ids yields document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Structural kind of a state node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf state with no children.
    Atomic,
    /// State with exactly one active child at a time.
    Compound,
    /// State whose region children are all simultaneously active.
    Parallel,
}

/// A transition with its target resolved to a node id.
///
/// `target == None` marks an internal transition: reducers run but the
/// configuration is untouched. At most one target is honored per
/// transition; list-based multi-target semantics are deliberately out of
/// scope.
#[derive(Clone, Debug)]
pub struct Transition {
    pub target: Option<NodeId>,
    pub guard: Option<GuardDef>,
    pub reducers: Vec<String>,
}

/// A single state node in the compiled graph.
#[derive(Debug)]
pub struct StateNode {
    pub id: NodeId,
    /// Dot-delimited absolute identity, e.g. `"player.track.playing"`.
    /// The synthetic root has the empty path.
    pub path: String,
    /// Last path segment; used when rendering nested state values.
    pub key: String,
    pub kind: NodeKind,
    /// True for `type: final` states; entering one directly under the root
    /// halts the machine.
    pub is_final: bool,
    pub parent: Option<NodeId>,
    /// Children in declaration order (doubles as region order).
    pub children: Vec<NodeId>,
    /// Designated initial child; present exactly for compound nodes.
    pub initial: Option<NodeId>,
    /// Event name to ordered transition list.
    pub on: IndexMap<String, Vec<Transition>>,
    /// Eventless transitions, re-evaluated after every stabilizing step.
    pub always: Vec<Transition>,
    pub on_entry: Vec<String>,
    pub on_exit: Vec<String>,
    /// Declared activity identifiers; tracked, never executed.
    pub activities: Vec<String>,
    /// Whether this compound node records shallow history.
    pub history: bool,
}

/// The immutable compiled graph.
#[derive(Debug)]
pub struct NodeGraph {
    nodes: Vec<StateNode>,
    ids_by_path: HashMap<String, NodeId>,
    root: NodeId,
}

impl NodeGraph {
    pub(crate) fn new(nodes: Vec<StateNode>, ids_by_path: HashMap<String, NodeId>) -> Self {
        Self {
            nodes,
            ids_by_path,
            root: NodeId(0),
        }
    }

    /// The synthetic root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> &StateNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut StateNode {
        &mut self.nodes[id.0]
    }

    /// Resolve an absolute path to a node id.
    pub fn id_of(&self, path: &str) -> Option<NodeId> {
        self.ids_by_path.get(path).copied()
    }

    /// Absolute identity of a node.
    pub fn path_of(&self, id: NodeId) -> &str {
        &self.nodes[id.0].path
    }

    /// Ancestor chain starting at the node itself and ending at the root.
    pub fn ancestor_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// True when `ancestor` lies strictly above `node`.
    pub fn is_proper_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes[node.0].parent;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    /// Least common ancestor of two nodes.
    ///
    /// A node counts as its own ancestor here: `lca(a, a) == a`, and the
    /// lca of a node and one of its ancestors is that ancestor. The
    /// synthetic root guarantees a common ancestor always exists.
    pub fn lca(&self, a: NodeId, b: NodeId) -> NodeId {
        let chain_a = self.ancestor_chain(a);
        let mut current = b;
        loop {
            if chain_a.contains(&current) {
                return current;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                // Unreachable for nodes of the same graph; fall back to root.
                None => return self.root,
            }
        }
    }

    /// The transition list a selection refers to: the node's `always` list
    /// for the synthetic eventless event, otherwise its table entry for the
    /// event name.
    pub(crate) fn transitions_for<'a>(
        &'a self,
        owner: NodeId,
        event: &Event,
    ) -> Option<&'a [Transition]> {
        let node = &self.nodes[owner.0];
        if event.is_eventless() {
            if node.always.is_empty() {
                None
            } else {
                Some(&node.always)
            }
        } else {
            node.on.get(&event.name).map(Vec::as_slice)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::compile;
    use crate::graph::definition::{StateDef, TransitionDef};
    use indexmap::IndexMap;

    fn nested_graph() -> NodeGraph {
        // a { b { c } d { e } }
        let mut states = IndexMap::new();
        states.insert(
            "a".to_string(),
            StateDef::new()
                .initial("b")
                .state(
                    "b",
                    StateDef::new()
                        .initial("c")
                        .state("c", StateDef::new().on("GO", TransitionDef::to("a.d.e"))),
                )
                .state("d", StateDef::new().initial("e").state("e", StateDef::new())),
        );
        compile("a", &states).unwrap()
    }

    #[test]
    fn paths_are_dot_delimited_and_unique() {
        let graph = nested_graph();
        for path in ["a", "a.b", "a.b.c", "a.d", "a.d.e"] {
            assert!(graph.id_of(path).is_some(), "missing {path}");
        }
        assert!(graph.id_of("a.e").is_none());
    }

    #[test]
    fn ancestor_chain_runs_self_to_root() {
        let graph = nested_graph();
        let c = graph.id_of("a.b.c").unwrap();
        let chain: Vec<&str> = graph
            .ancestor_chain(c)
            .iter()
            .map(|id| graph.path_of(*id))
            .collect();
        assert_eq!(chain, vec!["a.b.c", "a.b", "a", ""]);
    }

    #[test]
    fn lca_of_cousins_is_shared_ancestor() {
        let graph = nested_graph();
        let c = graph.id_of("a.b.c").unwrap();
        let e = graph.id_of("a.d.e").unwrap();
        assert_eq!(graph.lca(c, e), graph.id_of("a").unwrap());
    }

    #[test]
    fn lca_with_ancestor_is_the_ancestor() {
        let graph = nested_graph();
        let c = graph.id_of("a.b.c").unwrap();
        let a = graph.id_of("a").unwrap();
        assert_eq!(graph.lca(c, a), a);
        assert_eq!(graph.lca(c, c), c);
    }

    #[test]
    fn proper_ancestor_excludes_self() {
        let graph = nested_graph();
        let c = graph.id_of("a.b.c").unwrap();
        let b = graph.id_of("a.b").unwrap();
        assert!(graph.is_proper_ancestor(b, c));
        assert!(!graph.is_proper_ancestor(c, c));
        assert!(!graph.is_proper_ancestor(c, b));
    }

    #[test]
    fn ids_follow_document_order() {
        let graph = nested_graph();
        let a = graph.id_of("a").unwrap();
        let b = graph.id_of("a.b").unwrap();
        let d = graph.id_of("a.d").unwrap();
        assert!(a < b && b < d);
    }
}
