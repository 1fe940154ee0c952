//! A three-phase traffic light with a cycle counter and time travel.
//!
//! Run with: cargo run --example traffic_light

use serde_json::json;
use waypoint::{MachineBuilder, StateDef, TransitionDef};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut machine = MachineBuilder::new()
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
        .time_travel(true)
        .build()?;

    machine.start()?;
    println!("light: {}", machine.state_value());

    for _ in 0..4 {
        machine.send("NEXT")?;
        println!(
            "light: {}  cycles: {}",
            machine.state_value(),
            machine.context()["cycleCount"]
        );
    }

    // Step two transitions back and replay a different future.
    machine.rewind(2)?;
    println!("\nafter rewind(2): {}", machine.state_value());

    machine.send("NEXT")?;
    println!(
        "replayed: {}  history length: {}",
        machine.state_value(),
        machine.history_length()?
    );

    Ok(())
}
