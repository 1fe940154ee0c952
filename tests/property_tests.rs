//! Property-based tests over random event sequences and snapshots.

use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use waypoint::{Machine, MachineBuilder, Snapshot, StateDef, TransitionDef};

fn traffic_light(time_travel: bool) -> Machine {
    MachineBuilder::new()
        .initial_context(json!({ "cycleCount": 0 }))
        .initial("red")
        .state(
            "red",
            StateDef::new().on("NEXT", TransitionDef::to("yellow").reducer("countCycle")),
        )
        .state("yellow", StateDef::new().on("NEXT", TransitionDef::to("green")))
        .state("green", StateDef::new().on("NEXT", TransitionDef::to("red")))
        .reducer("countCycle", |ctx, _, _| {
            json!({ "cycleCount": ctx["cycleCount"].as_i64().unwrap_or(0) + 1 })
        })
        .time_travel(time_travel)
        .build()
        .unwrap()
}

fn nested_parallel() -> Machine {
    MachineBuilder::new()
        .initial("app")
        .state(
            "app",
            StateDef::new()
                .state(
                    "power",
                    StateDef::new()
                        .initial("on")
                        .state("on", StateDef::new().on("TOGGLE", TransitionDef::to("off")))
                        .state("off", StateDef::new().on("TOGGLE", TransitionDef::to("on"))),
                )
                .state(
                    "volume",
                    StateDef::new()
                        .initial("normal")
                        .state(
                            "normal",
                            StateDef::new().on("MUTE", TransitionDef::to("muted")),
                        )
                        .state(
                            "muted",
                            StateDef::new().on("MUTE", TransitionDef::to("normal")),
                        ),
                ),
        )
        .build()
        .unwrap()
}

fn known_event() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("NEXT"), Just("TOGGLE"), Just("MUTE")]
}

fn path_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,6}", 1..4).prop_map(|segments| segments.join("."))
}

fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    (
        proptest::collection::vec(path_strategy(), 1..6),
        proptest::collection::btree_map(path_strategy(), 1u64..1000, 0..6),
        proptest::option::of(proptest::collection::btree_map(
            path_strategy(),
            path_strategy(),
            0..4,
        )),
        any::<bool>(),
        -1000i64..1000,
    )
        .prop_map(|(configuration, state_counters, state_history, halted, n)| Snapshot {
            context: json!({ "n": n }),
            configuration,
            state_counters,
            state_history,
            halted,
        })
}

proptest! {
    #[test]
    fn unknown_events_never_change_anything(
        names in proptest::collection::vec("[A-Z]{3,8}", 1..20)
    ) {
        let mut machine = traffic_light(false);
        machine.start().unwrap();
        let context = machine.context().clone();
        let config: Vec<String> = machine
            .active_state_nodes()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for name in &names {
            prop_assume!(name != "NEXT");
            machine.send(name.as_str()).unwrap();
        }

        prop_assert_eq!(machine.context(), &context);
        let after: Vec<String> = machine
            .active_state_nodes()
            .iter()
            .map(|s| s.to_string())
            .collect();
        prop_assert_eq!(after, config);
    }

    #[test]
    fn parallel_configuration_invariant_holds(
        events in proptest::collection::vec(known_event(), 0..40)
    ) {
        let mut machine = nested_parallel();
        machine.start().unwrap();

        for event in events {
            machine.send(event).unwrap();

            let active: Vec<String> = machine
                .active_state_nodes()
                .iter()
                .map(|s| s.to_string())
                .collect();
            // Every region of the parallel state stays active.
            prop_assert!(active.contains(&"app".to_string()));
            prop_assert!(active.contains(&"app.power".to_string()));
            prop_assert!(active.contains(&"app.volume".to_string()));
            // Each compound region has exactly one active child.
            let power_children = active
                .iter()
                .filter(|p| *p == "app.power.on" || *p == "app.power.off")
                .count();
            let volume_children = active
                .iter()
                .filter(|p| *p == "app.volume.normal" || *p == "app.volume.muted")
                .count();
            prop_assert_eq!(power_children, 1);
            prop_assert_eq!(volume_children, 1);
        }
    }

    #[test]
    fn entry_counters_never_decrease(
        events in proptest::collection::vec(known_event(), 0..40)
    ) {
        let mut machine = traffic_light(false);
        machine.start().unwrap();
        let mut previous: BTreeMap<String, u64> = machine.state_counters();

        for event in events {
            machine.send(event).unwrap();
            let current = machine.state_counters();
            for (state, count) in &previous {
                prop_assert!(current.get(state).copied().unwrap_or(0) >= *count);
            }
            previous = current;
        }
    }

    #[test]
    fn snapshots_roundtrip_through_json_and_binary(snapshot in snapshot_strategy()) {
        let text = snapshot.to_json().unwrap();
        prop_assert_eq!(&Snapshot::from_json(&text).unwrap(), &snapshot);

        let bytes = snapshot.to_bytes().unwrap();
        prop_assert_eq!(&Snapshot::from_bytes(&bytes).unwrap(), &snapshot);
    }

    #[test]
    fn dump_load_preserves_observable_state(
        events in proptest::collection::vec(known_event(), 0..20)
    ) {
        let mut original = traffic_light(false);
        original.start().unwrap();
        for event in events {
            original.send(event).unwrap();
        }

        let snapshot = original.dump().unwrap();
        let mut restored = traffic_light(false);
        restored.load(snapshot).unwrap();
        restored.start().unwrap();

        prop_assert_eq!(restored.context(), original.context());
        prop_assert_eq!(restored.active_state_nodes(), original.active_state_nodes());
        prop_assert_eq!(restored.state_counters(), original.state_counters());
        prop_assert_eq!(restored.state_value(), original.state_value());
    }

    #[test]
    fn time_travel_cursor_stays_in_bounds(
        ops in proptest::collection::vec((0u8..3, 1usize..6), 0..30)
    ) {
        let mut machine = traffic_light(true);
        machine.start().unwrap();

        for (op, n) in ops {
            match op {
                0 => machine.send("NEXT").unwrap(),
                1 => machine.rewind(n).unwrap(),
                _ => machine.fast_forward(n).unwrap(),
            }
            let index = machine.history_index().unwrap();
            let length = machine.history_length().unwrap();
            prop_assert!(length >= 1);
            prop_assert!(index < length);
        }
    }
}
