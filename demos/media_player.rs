//! A media player mixing nested states, a parallel settings region,
//! shallow history, and snapshot persistence.
//!
//! Run with: cargo run --example media_player

use serde_json::json;
use waypoint::{GuardDef, MachineBuilder, Snapshot, StateDef, TransitionDef};

fn build_player() -> Result<waypoint::Machine, waypoint::CompileError> {
    MachineBuilder::new()
        .initial_context(json!({ "track": 1, "trackCount": 3 }))
        .initial("player")
        .state(
            "player",
            StateDef::new()
                // Playback remembers where it was across a trip to settings.
                .state(
                    "playback",
                    StateDef::new()
                        .initial("stopped")
                        .history()
                        .state(
                            "stopped",
                            StateDef::new().on("PLAY", TransitionDef::to("playing")),
                        )
                        .state(
                            "playing",
                            StateDef::new()
                                .activity("audioOutput")
                                .on("PAUSE", TransitionDef::to("paused"))
                                .on(
                                    "SKIP",
                                    TransitionDef::internal()
                                        .guarded(GuardDef::named("hasNextTrack"))
                                        .reducer("nextTrack"),
                                ),
                        )
                        .state(
                            "paused",
                            StateDef::new()
                                .on("PLAY", TransitionDef::to("playing"))
                                .on("STOP", TransitionDef::to("stopped")),
                        ),
                )
                .state(
                    "display",
                    StateDef::new()
                        .initial("normal")
                        .state(
                            "normal",
                            StateDef::new().on("DIM", TransitionDef::to("dimmed")),
                        )
                        .state(
                            "dimmed",
                            StateDef::new().on("DIM", TransitionDef::to("normal")),
                        ),
                ),
        )
        .guard("hasNextTrack", |ctx, _, _| {
            ctx["track"].as_i64().unwrap_or(0) < ctx["trackCount"].as_i64().unwrap_or(0)
        })
        .reducer("nextTrack", |ctx, _, _| {
            json!({ "track": ctx["track"].as_i64().unwrap_or(0) + 1 })
        })
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut machine = build_player()?;
    machine.start()?;
    println!("initial: {}", machine.state_value());

    machine.send("PLAY")?;
    machine.send("SKIP")?;
    machine.send("DIM")?;
    println!(
        "playing: {}  track: {}",
        machine.state_value(),
        machine.context()["track"]
    );

    for handle in machine.active_activities() {
        println!("activity running: {}", machine.activity_instance(&handle));
    }

    // Persist the running machine and bring it back in a fresh instance.
    let saved = machine.dump()?.to_json()?;
    println!("\nsnapshot: {saved}");

    let mut restored = build_player()?;
    restored.load(Snapshot::from_json(&saved)?)?;
    restored.start()?;
    println!("restored: {}", restored.state_value());

    restored.send("PAUSE")?;
    println!("paused:   {}", restored.state_value());

    Ok(())
}
