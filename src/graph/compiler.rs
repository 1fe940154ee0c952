//! Two-pass compilation of a declarative definition into a node graph.
//!
//! Pass 1 builds the arena depth-first, recording transition targets as
//! the raw keys the definition provided (a target may name a sibling that
//! has not been created yet). Pass 2 resolves every raw target to an
//! absolute identity, preferring an already-absolute path, then a
//! top-level state, then a sibling of the defining node.

use crate::graph::definition::{StateDef, StateKind, TransitionDef};
use crate::graph::error::CompileError;
use crate::graph::node::{NodeGraph, NodeId, NodeKind, StateNode, Transition};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Compile a top-level initial key and state tree into a node graph.
pub fn compile(
    initial: &str,
    states: &IndexMap<String, StateDef>,
) -> Result<NodeGraph, CompileError> {
    let mut builder = GraphBuilder::default();

    let root = builder.push(StateNode {
        id: NodeId(0),
        path: String::new(),
        key: String::new(),
        kind: NodeKind::Compound,
        is_final: false,
        parent: None,
        children: Vec::new(),
        initial: None,
        on: IndexMap::new(),
        always: Vec::new(),
        on_entry: Vec::new(),
        on_exit: Vec::new(),
        activities: Vec::new(),
        history: false,
    });

    let mut top_level = Vec::new();
    for (key, def) in states {
        top_level.push(builder.build_node(root, "", key, def)?);
    }

    let initial_id = builder
        .ids_by_path
        .get(initial)
        .copied()
        .filter(|id| top_level.contains(id))
        .ok_or_else(|| CompileError::UnknownInitial {
            parent: "machine".to_string(),
            initial: initial.to_string(),
        })?;

    {
        let root_node = &mut builder.nodes[root.0];
        root_node.children = top_level;
        root_node.initial = Some(initial_id);
    }

    builder.resolve_targets()?;

    Ok(NodeGraph::new(builder.nodes, builder.ids_by_path))
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<StateNode>,
    ids_by_path: HashMap<String, NodeId>,
    /// Raw transition tables deferred to pass 2, per node.
    raw: Vec<(NodeId, IndexMap<String, Vec<TransitionDef>>, Vec<TransitionDef>)>,
}

impl GraphBuilder {
    fn push(&mut self, node: StateNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        if !node.path.is_empty() {
            self.ids_by_path.insert(node.path.clone(), id);
        }
        self.nodes.push(node);
        id
    }

    fn build_node(
        &mut self,
        parent: NodeId,
        parent_path: &str,
        key: &str,
        def: &StateDef,
    ) -> Result<NodeId, CompileError> {
        let path = if parent_path.is_empty() {
            key.to_string()
        } else {
            format!("{parent_path}.{key}")
        };

        let id = self.push(StateNode {
            id: NodeId(0), // fixed up by push index below
            path: path.clone(),
            key: key.to_string(),
            kind: NodeKind::Atomic,
            is_final: def.kind == Some(StateKind::Final),
            parent: Some(parent),
            children: Vec::new(),
            initial: None,
            on: IndexMap::new(),
            always: Vec::new(),
            on_entry: def.on_entry.clone(),
            on_exit: def.on_exit.clone(),
            activities: def.activities.clone(),
            history: def.history,
        });
        self.nodes[id.0].id = id;
        self.raw.push((id, def.on.clone(), def.always.clone()));

        let mut children = Vec::new();
        for (child_key, child_def) in &def.states {
            children.push(self.build_node(id, &path, child_key, child_def)?);
        }

        let (kind, initial) = self.classify(&path, def, &children)?;
        let node = &mut self.nodes[id.0];
        node.kind = kind;
        node.initial = initial;
        node.children = children;
        Ok(id)
    }

    /// Decide a node's kind from its definition: explicit `final`, explicit
    /// `parallel`, compound when an initial child is declared, parallel
    /// when children are declared without one, atomic otherwise.
    fn classify(
        &self,
        path: &str,
        def: &StateDef,
        children: &[NodeId],
    ) -> Result<(NodeKind, Option<NodeId>), CompileError> {
        if def.kind == Some(StateKind::Final) {
            if !children.is_empty() {
                return Err(CompileError::FinalWithChildren(path.to_string()));
            }
            return Ok((NodeKind::Atomic, None));
        }

        if children.is_empty() {
            if def.kind == Some(StateKind::Parallel) {
                return Err(CompileError::TooFewRegions(path.to_string()));
            }
            return Ok((NodeKind::Atomic, None));
        }

        let parallel = def.kind == Some(StateKind::Parallel) || def.initial.is_none();
        if parallel {
            if def.kind == Some(StateKind::Parallel) && def.initial.is_some() {
                return Err(CompileError::ParallelWithInitial(path.to_string()));
            }
            if children.len() < 2 {
                return Err(CompileError::TooFewRegions(path.to_string()));
            }
            return Ok((NodeKind::Parallel, None));
        }

        let initial_key = def.initial.as_deref().unwrap_or_default();
        let initial_path = format!("{path}.{initial_key}");
        let initial_id = self.ids_by_path.get(&initial_path).copied().ok_or_else(|| {
            CompileError::UnknownInitial {
                parent: path.to_string(),
                initial: initial_key.to_string(),
            }
        })?;
        Ok((NodeKind::Compound, Some(initial_id)))
    }

    fn resolve_targets(&mut self) -> Result<(), CompileError> {
        let raw = std::mem::take(&mut self.raw);
        for (id, on, always) in raw {
            let mut resolved_on = IndexMap::new();
            for (event, defs) in on {
                let mut list = Vec::with_capacity(defs.len());
                for def in defs {
                    list.push(self.resolve_transition(id, def)?);
                }
                resolved_on.insert(event, list);
            }
            let mut resolved_always = Vec::with_capacity(always.len());
            for def in always {
                resolved_always.push(self.resolve_transition(id, def)?);
            }
            let node = &mut self.nodes[id.0];
            node.on = resolved_on;
            node.always = resolved_always;
        }
        Ok(())
    }

    fn resolve_transition(
        &self,
        source: NodeId,
        def: TransitionDef,
    ) -> Result<Transition, CompileError> {
        let target = match &def.target {
            None => None,
            Some(raw) => Some(self.resolve_target(source, raw)?),
        };
        Ok(Transition {
            target,
            guard: def.guard,
            reducers: def.reducers,
        })
    }

    /// Absolute paths and top-level keys share the path index (top-level
    /// nodes have `path == key`, and any dotted raw key only matches an
    /// absolute path), so one lookup covers the first two preference
    /// levels; siblings are tried last.
    fn resolve_target(&self, source: NodeId, raw: &str) -> Result<NodeId, CompileError> {
        if let Some(id) = self.ids_by_path.get(raw) {
            return Ok(*id);
        }
        if !raw.contains('.') {
            if let Some(parent) = self.nodes[source.0].parent {
                let parent_path = &self.nodes[parent.0].path;
                let sibling_path = if parent_path.is_empty() {
                    raw.to_string()
                } else {
                    format!("{parent_path}.{raw}")
                };
                if let Some(id) = self.ids_by_path.get(&sibling_path) {
                    return Ok(*id);
                }
            }
        }
        Err(CompileError::UnresolvedTarget {
            state: self.nodes[source.0].path.clone(),
            target: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::definition::{StateDef, TransitionDef};

    fn states(pairs: Vec<(&str, StateDef)>) -> IndexMap<String, StateDef> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn atomic_compound_parallel_kinds_are_inferred() {
        let defs = states(vec![
            ("lone", StateDef::new()),
            (
                "nested",
                StateDef::new()
                    .initial("inner")
                    .state("inner", StateDef::new()),
            ),
            (
                "split",
                StateDef::new()
                    .state("left", StateDef::new())
                    .state("right", StateDef::new()),
            ),
        ]);
        let graph = compile("lone", &defs).unwrap();

        let kind = |path: &str| graph.node(graph.id_of(path).unwrap()).kind;
        assert_eq!(kind("lone"), NodeKind::Atomic);
        assert_eq!(kind("nested"), NodeKind::Compound);
        assert_eq!(kind("split"), NodeKind::Parallel);
    }

    #[test]
    fn sibling_targets_resolve_against_the_defining_node() {
        let defs = states(vec![(
            "outer",
            StateDef::new()
                .initial("a")
                .state("a", StateDef::new().on("GO", TransitionDef::to("b")))
                .state("b", StateDef::new()),
        )]);
        let graph = compile("outer", &defs).unwrap();

        let a = graph.id_of("outer.a").unwrap();
        let transition = &graph.node(a).on["GO"][0];
        assert_eq!(transition.target, graph.id_of("outer.b"));
    }

    #[test]
    fn top_level_targets_win_over_missing_siblings() {
        let defs = states(vec![
            (
                "outer",
                StateDef::new()
                    .initial("a")
                    .state("a", StateDef::new().on("RESET", TransitionDef::to("home"))),
            ),
            ("home", StateDef::new()),
        ]);
        let graph = compile("outer", &defs).unwrap();

        let a = graph.id_of("outer.a").unwrap();
        assert_eq!(graph.node(a).on["RESET"][0].target, graph.id_of("home"));
    }

    #[test]
    fn absolute_targets_resolve_directly() {
        let defs = states(vec![
            (
                "outer",
                StateDef::new()
                    .initial("a")
                    .state("a", StateDef::new())
                    .state("b", StateDef::new()),
            ),
            (
                "other",
                StateDef::new().on("JUMP", TransitionDef::to("outer.b")),
            ),
        ]);
        let graph = compile("outer", &defs).unwrap();

        let other = graph.id_of("other").unwrap();
        assert_eq!(graph.node(other).on["JUMP"][0].target, graph.id_of("outer.b"));
    }

    #[test]
    fn unresolved_target_fails_compilation() {
        let defs = states(vec![(
            "a",
            StateDef::new().on("GO", TransitionDef::to("nowhere")),
        )]);
        let err = compile("a", &defs).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedTarget {
                state: "a".to_string(),
                target: "nowhere".to_string(),
            }
        );
    }

    #[test]
    fn unknown_top_level_initial_fails() {
        let defs = states(vec![("a", StateDef::new())]);
        let err = compile("missing", &defs).unwrap_err();
        assert!(matches!(err, CompileError::UnknownInitial { .. }));
    }

    #[test]
    fn unknown_nested_initial_fails() {
        let defs = states(vec![(
            "outer",
            StateDef::new().initial("ghost").state("a", StateDef::new()),
        )]);
        let err = compile("outer", &defs).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownInitial {
                parent: "outer".to_string(),
                initial: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn single_region_parallel_is_rejected() {
        let defs = states(vec![(
            "p",
            StateDef::new().parallel().state("only", StateDef::new()),
        )]);
        let err = compile("p", &defs).unwrap_err();
        assert_eq!(err, CompileError::TooFewRegions("p".to_string()));
    }

    #[test]
    fn implicit_parallel_without_enough_regions_is_rejected() {
        let defs = states(vec![("p", StateDef::new().state("only", StateDef::new()))]);
        let err = compile("p", &defs).unwrap_err();
        assert_eq!(err, CompileError::TooFewRegions("p".to_string()));
    }

    #[test]
    fn final_state_with_children_is_rejected() {
        let defs = states(vec![(
            "done",
            StateDef::new().final_state().state("x", StateDef::new()),
        )]);
        let err = compile("done", &defs).unwrap_err();
        assert_eq!(err, CompileError::FinalWithChildren("done".to_string()));
    }

    #[test]
    fn final_flag_is_recorded() {
        let defs = states(vec![
            ("run", StateDef::new()),
            ("done", StateDef::new().final_state()),
        ]);
        let graph = compile("run", &defs).unwrap();
        assert!(graph.node(graph.id_of("done").unwrap()).is_final);
        assert!(!graph.node(graph.id_of("run").unwrap()).is_final);
    }
}
