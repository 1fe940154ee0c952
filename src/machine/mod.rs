//! The machine facade: construction, event processing, and state access.
//!
//! A `Machine` owns the compiled node graph, the guard/reducer registries,
//! and the mutable run state (context, configuration, counters, history).
//! All mutation happens by wholesale replacement inside `start`/`send`/
//! `load`/`rewind`/`fast_forward`; between calls every getter observes a
//! fully consistent snapshot.

mod activity;
mod select;
mod step;

pub use activity::ActivityHandle;

use crate::core::{Event, GuardRegistry, ReducerRegistry};
use crate::error::MachineError;
use crate::graph::{compile, CompileError, NodeGraph, NodeId, NodeKind, StateDef};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::timetravel::HistoryLog;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use step::Descend;
use tracing::debug;

/// Everything needed to construct a machine.
///
/// Usually assembled through [`crate::MachineBuilder`]; constructing it
/// directly is equivalent.
pub struct MachineConfig {
    /// Opaque application context the machine starts with.
    pub initial_context: Value,
    /// Key of the top-level initial state.
    pub initial: String,
    /// Declarative state tree.
    pub states: IndexMap<String, StateDef>,
    pub guards: GuardRegistry,
    pub reducers: ReducerRegistry,
    /// Emit structured `tracing` events for every processing phase.
    pub debug: bool,
    /// Keep a snapshot log enabling `rewind`/`fast_forward`.
    pub time_travel: bool,
}

/// A synchronous, side-effect-free statechart interpreter.
pub struct Machine {
    pub(crate) graph: Arc<NodeGraph>,
    pub(crate) guards: GuardRegistry,
    pub(crate) reducers: ReducerRegistry,
    pub(crate) context: Value,
    /// Active node ids, in activation order.
    pub(crate) configuration: Vec<NodeId>,
    pub(crate) counters: HashMap<NodeId, u64>,
    /// Shallow-history records: compound node to last active direct child.
    pub(crate) history: HashMap<NodeId, NodeId>,
    pub(crate) started: bool,
    pub(crate) halted: bool,
    pub(crate) debug: bool,
    log: Option<HistoryLog>,
    /// State loaded via `load`, installed on the next `start`.
    pending: Option<Restored>,
}

struct Restored {
    context: Value,
    configuration: Vec<NodeId>,
    counters: HashMap<NodeId, u64>,
    history: HashMap<NodeId, NodeId>,
    halted: bool,
}

impl Machine {
    /// Compile a declarative config into a ready (but not yet started)
    /// machine.
    pub fn new(config: MachineConfig) -> Result<Self, CompileError> {
        let graph = compile(&config.initial, &config.states)?;
        Ok(Self {
            graph: Arc::new(graph),
            guards: config.guards,
            reducers: config.reducers,
            context: config.initial_context,
            configuration: Vec::new(),
            counters: HashMap::new(),
            history: HashMap::new(),
            started: false,
            halted: false,
            debug: config.debug,
            log: config.time_travel.then(HistoryLog::new),
            pending: None,
        })
    }

    /// Enter the initial configuration (or install a loaded snapshot) and
    /// settle eventless transitions.
    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.started {
            return Err(MachineError::AlreadyStarted);
        }
        self.started = true;

        match self.pending.take() {
            Some(restored) => {
                self.context = restored.context;
                self.configuration = restored.configuration;
                self.counters = restored.counters;
                self.history = restored.history;
                self.halted = restored.halted;
                // A loaded snapshot may predate eventless transitions that
                // its configuration now enables.
                self.run_microsteps()?;
            }
            None => {
                let initial = self
                    .graph
                    .node(self.graph.root())
                    .initial
                    .expect("the root always has an initial child");
                self.activate(initial, &Event::eventless(), Descend::Full)?;
                self.run_microsteps()?;
            }
        }

        self.refresh_halted();
        self.record_log_entry();
        Ok(())
    }

    /// Process one event to completion: select transitions, apply them,
    /// settle eventless transitions, update halt status, and append to the
    /// time-travel log.
    ///
    /// Sending an event no active state handles completes without touching
    /// configuration or context. A halted machine ignores events entirely.
    pub fn send(&mut self, event: impl Into<Event>) -> Result<(), MachineError> {
        if !self.started {
            return Err(MachineError::NotStarted);
        }
        let event = event.into();
        if self.halted {
            if self.debug {
                debug!(event = event.name.as_str(), "machine halted; event ignored");
            }
            return Ok(());
        }
        if self.debug {
            debug!(event = event.name.as_str(), "processing event");
        }

        let selections = self.select_transitions(&event)?;
        self.apply_selections(&selections, &event)?;
        self.run_microsteps()?;
        self.refresh_halted();
        self.record_log_entry();
        Ok(())
    }

    /// Current application context.
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// Whether `start` has been called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether a top-level final state is active.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Identities of every active state, in document order.
    pub fn active_state_nodes(&self) -> Vec<&str> {
        let mut active = self.configuration.clone();
        active.sort();
        active
            .iter()
            .map(|id| self.graph.path_of(*id))
            .collect()
    }

    /// Per-state entry counters, keyed by state identity.
    pub fn state_counters(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|(id, count)| (self.graph.path_of(*id).to_string(), *count))
            .collect()
    }

    /// Nested rendering of the active configuration: a string for an
    /// atomic leaf, an object keyed by child key for a compound, an object
    /// merging all regions for a parallel. `Null` before `start`.
    pub fn state_value(&self) -> Value {
        if self.configuration.is_empty() {
            return Value::Null;
        }
        self.render_value(self.graph.root())
    }

    fn render_value(&self, id: NodeId) -> Value {
        let node = self.graph.node(id);
        match node.kind {
            NodeKind::Atomic => Value::String(node.key.clone()),
            NodeKind::Compound => {
                let active = node
                    .children
                    .iter()
                    .copied()
                    .find(|child| self.configuration.contains(child));
                match active {
                    None => Value::Null,
                    Some(child) => {
                        let child_node = self.graph.node(child);
                        if child_node.kind == NodeKind::Atomic {
                            Value::String(child_node.key.clone())
                        } else {
                            let mut map = serde_json::Map::new();
                            map.insert(child_node.key.clone(), self.render_value(child));
                            Value::Object(map)
                        }
                    }
                }
            }
            NodeKind::Parallel => {
                let mut map = serde_json::Map::new();
                for &region in &node.children {
                    let region_node = self.graph.node(region);
                    let value = if region_node.kind == NodeKind::Atomic {
                        Value::Object(serde_json::Map::new())
                    } else {
                        self.render_value(region)
                    };
                    map.insert(region_node.key.clone(), value);
                }
                Value::Object(map)
            }
        }
    }

    /// Capture the complete machine state. Requires a started machine.
    pub fn dump(&self) -> Result<Snapshot, MachineError> {
        if !self.started {
            return Err(MachineError::NotStarted);
        }
        Ok(self.snapshot_now())
    }

    /// Stage a snapshot for restoration. Only valid before `start`; the
    /// restored state becomes live when `start` is called, which skips
    /// initial-state activation and settles eventless transitions against
    /// the restored configuration instead.
    pub fn load(&mut self, snapshot: Snapshot) -> Result<(), MachineError> {
        if self.started {
            return Err(MachineError::AlreadyStarted);
        }
        let restored = self.validate_snapshot(&snapshot)?;
        self.pending = Some(restored);
        Ok(())
    }

    /// Step the time-travel cursor back by `n` and restore that snapshot.
    /// Clamped at the oldest entry; a rewind past the boundary restores
    /// the oldest entry rather than erroring.
    pub fn rewind(&mut self, n: usize) -> Result<(), MachineError> {
        if self.log.is_none() {
            return Err(MachineError::TimeTravelDisabled);
        }
        if !self.started {
            return Err(MachineError::NotStarted);
        }
        let entry = self
            .log
            .as_mut()
            .and_then(|log| log.rewind(n).map(|e| (e.snapshot.clone(), e.recorded_at)));
        if let Some((snapshot, recorded_at)) = entry {
            if self.debug {
                debug!(steps = n, recorded_at = %recorded_at, "rewound");
            }
            self.restore(&snapshot)?;
        }
        Ok(())
    }

    /// Step the time-travel cursor forward by `n` and restore that
    /// snapshot. Clamped at the newest entry.
    pub fn fast_forward(&mut self, n: usize) -> Result<(), MachineError> {
        if self.log.is_none() {
            return Err(MachineError::TimeTravelDisabled);
        }
        if !self.started {
            return Err(MachineError::NotStarted);
        }
        let snapshot = self
            .log
            .as_mut()
            .and_then(|log| log.fast_forward(n).map(|entry| entry.snapshot.clone()));
        if let Some(snapshot) = snapshot {
            if self.debug {
                debug!(steps = n, "fast-forwarded");
            }
            self.restore(&snapshot)?;
        }
        Ok(())
    }

    /// Current cursor position in the time-travel log. Requires a started
    /// machine; before `start` the log is empty and has no cursor.
    pub fn history_index(&self) -> Result<usize, MachineError> {
        let log = self
            .log
            .as_ref()
            .ok_or(MachineError::TimeTravelDisabled)?;
        if !self.started {
            return Err(MachineError::NotStarted);
        }
        Ok(log.index())
    }

    /// Number of entries in the time-travel log; 0 before `start`.
    pub fn history_length(&self) -> Result<usize, MachineError> {
        self.log
            .as_ref()
            .map(HistoryLog::len)
            .ok_or(MachineError::TimeTravelDisabled)
    }

    fn record_log_entry(&mut self) {
        if self.log.is_some() {
            let snapshot = self.snapshot_now();
            if let Some(log) = self.log.as_mut() {
                log.record(snapshot);
            }
        }
    }

    fn snapshot_now(&self) -> Snapshot {
        let state_history = if self.history.is_empty() {
            None
        } else {
            Some(
                self.history
                    .iter()
                    .map(|(node, child)| {
                        (
                            self.graph.path_of(*node).to_string(),
                            self.graph.path_of(*child).to_string(),
                        )
                    })
                    .collect(),
            )
        };
        Snapshot {
            context: self.context.clone(),
            configuration: self
                .configuration
                .iter()
                .map(|id| self.graph.path_of(*id).to_string())
                .collect(),
            state_counters: self
                .counters
                .iter()
                .map(|(id, count)| (self.graph.path_of(*id).to_string(), *count))
                .collect(),
            state_history,
            halted: self.halted,
        }
    }

    fn validate_snapshot(&self, snapshot: &Snapshot) -> Result<Restored, MachineError> {
        if snapshot.configuration.is_empty() {
            return Err(SnapshotError::EmptyConfiguration.into());
        }
        let resolve = |path: &str| {
            self.graph
                .id_of(path)
                .ok_or_else(|| SnapshotError::UnknownState(path.to_string()))
        };

        let mut configuration = Vec::with_capacity(snapshot.configuration.len());
        for path in &snapshot.configuration {
            configuration.push(resolve(path)?);
        }
        let mut counters = HashMap::with_capacity(snapshot.state_counters.len());
        for (path, count) in &snapshot.state_counters {
            counters.insert(resolve(path)?, *count);
        }
        let mut history = HashMap::new();
        if let Some(records) = &snapshot.state_history {
            for (node, child) in records {
                history.insert(resolve(node)?, resolve(child)?);
            }
        }

        Ok(Restored {
            context: snapshot.context.clone(),
            configuration,
            counters,
            history,
            halted: snapshot.halted,
        })
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<(), MachineError> {
        let restored = self.validate_snapshot(snapshot)?;
        self.context = restored.context;
        self.configuration = restored.configuration;
        self.counters = restored.counters;
        self.history = restored.history;
        self.halted = restored.halted;
        Ok(())
    }
}
