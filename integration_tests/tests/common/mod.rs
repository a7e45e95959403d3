#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use serde_json::{json, Map, Value};

static INIT: Once = Once::new();

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_client_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test client config at {}",
            config_path.display()
        );

        std::env::set_var(client_core::CONFIG_ENV_VAR, &config_path);
    });
}

/// Agent record as it appears inside `snapshot.agents` of a Tick frame.
pub fn wire_agent(id: &str, name: &str, location: &str, activity: Value) -> Value {
    json!({
        "id": { "Uuid": id },
        "config": {
            "name": name,
            "personality": {
                "e_i": 0.2, "s_n": -0.1, "t_f": 0.4, "j_p": -0.3,
                "stability": 0.5, "mbti": "ENFP"
            },
            "career_aspiration": { "ideal_career": "Doctor", "clarity": 0.3 }
        },
        "location": location,
        "activity": activity,
        "emotion": { "valence": 0.2, "arousal": 0.4, "stress": 0.1 },
        "abilities": { "academic": 0.6, "social": 0.7, "resilience": 0.5, "creativity": 0.4 },
        "current_thought": null
    })
}

pub fn wire_event(id: &str, tick: u64, narrative: &str) -> Value {
    json!({
        "id": id,
        "event_type": "SocialInteraction",
        "timestamp": { "semester": 1, "week": 2, "day_of_week": 3, "hour": 10, "tick": tick },
        "involved_agents": [],
        "narrative": narrative,
        "intensity": 0.5
    })
}

/// Agent exactly as the simulation service serializes it: plain string id,
/// full personality and career records, and bookkeeping timestamps.
pub fn server_agent(id: &str, name: &str, location: &str, activity: Value) -> Value {
    let time = json!({ "semester": 1, "week": 2, "day_of_week": 3, "hour": 10, "tick": 0 });
    json!({
        "id": id,
        "config": {
            "name": name,
            "personality": {
                "e_i": -0.3, "s_n": 0.1, "t_f": 0.2, "j_p": 0.4, "stability": 0.3,
                "shift_history": []
            },
            "career_aspiration": {
                "ideal_career": "Engineer",
                "category": "Engineering",
                "subject_preferences": [{ "subject": "physics", "preference": 0.9 }],
                "clarity": 0.5
            },
            "background": null,
            "age": 16
        },
        "location": location,
        "activity": activity,
        "emotion": { "valence": 0.3, "arousal": 0.4, "stress": 0.2 },
        "abilities": { "academic": 0.5, "social": 0.5, "resilience": 0.5, "creativity": 0.5 },
        "current_thought": null,
        "created_at": time,
        "last_updated": time
    })
}

/// How `snapshot.agents` is laid out in a Tick frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentsShape {
    /// Mapping keyed by agent id.
    ById,
    /// Plain array, as the service sends it.
    List,
}

pub fn tick_frame(tick: u64, agents: &[Value], events: &[Value]) -> String {
    tick_frame_shaped(tick, agents, events, AgentsShape::ById)
}

pub fn tick_frame_shaped(
    tick: u64,
    agents: &[Value],
    events: &[Value],
    shape: AgentsShape,
) -> String {
    let agents = match shape {
        AgentsShape::ById => {
            let mut by_id = Map::new();
            for agent in agents {
                by_id.insert(sim_proto::normalize_id(&agent["id"]), agent.clone());
            }
            Value::Object(by_id)
        }
        AgentsShape::List => Value::Array(agents.to_vec()),
    };
    json!({
        "type": "Tick",
        "time": { "semester": 1, "week": 2, "day_of_week": 3, "hour": 10, "tick": tick },
        "snapshot": {
            "time": { "semester": 1, "week": 2, "day_of_week": 3, "hour": 10, "tick": tick },
            "agents": agents,
            "relationships": [],
            "active_events": []
        },
        "events": events
    })
    .to_string()
}

/// Tick frame with `count` events named `evt-{tick}-{n}`.
pub fn tick_with_events(tick: u64, count: usize) -> String {
    let events: Vec<Value> = (0..count)
        .map(|n| wire_event(&format!("evt-{tick}-{n}"), tick, "something happened"))
        .collect();
    tick_frame(tick, &[], &events)
}

pub fn simple_frame(kind: &str) -> String {
    json!({ "type": kind }).to_string()
}
