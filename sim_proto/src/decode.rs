//! Normalization of raw service payloads into the canonical model.
//!
//! The service is not consistent about shapes: identifiers arrive either as bare
//! strings or wrapped (`{"Uuid": "..."}`), activities arrive as bare tags,
//! externally-tagged objects, or `Debug` renderings, and careers are either a
//! string or an object. Every function here accepts all of them. Frame-level
//! structure problems are reported as [`DecodeError`] so the caller can drop the
//! frame. A single bad agent record inside a Tick is skipped with a warning.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::model::{
    AbilityMetrics, Agent, AgentActivity, AgentDetail, AgentRecord, EmotionalState, EventType,
    PersonalityParams, Relationship, SimulationEvent, SimulationSpeed, SimulationTime,
    SimulationUpdate, WorldSnapshot,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no `type` discriminator")]
    MissingType,
    #[error("unknown frame type {0}")]
    UnknownType(String),
    #[error("unknown agent activity {0}")]
    InvalidActivity(String),
    #[error("field `{field}` has unexpected shape: {found}")]
    InvalidShape { field: &'static str, found: String },
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("service reported error: {0}")]
    Service(String),
}

#[derive(Deserialize)]
struct WireTick {
    time: SimulationTime,
    snapshot: WireSnapshot,
    #[serde(default)]
    events: Vec<WireEvent>,
}

#[derive(Deserialize)]
struct WireSpeedChanged {
    speed: SimulationSpeed,
}

#[derive(Deserialize)]
struct WireSnapshot {
    #[serde(default)]
    time: Option<SimulationTime>,
    #[serde(default)]
    agents: Value,
    #[serde(default)]
    relationships: Vec<WireRelationship>,
    #[serde(default)]
    active_events: Vec<Value>,
}

#[derive(Deserialize)]
struct WireAgent {
    #[serde(default)]
    id: Value,
    config: WireAgentConfig,
    #[serde(default)]
    location: Value,
    activity: Value,
    #[serde(default)]
    emotion: EmotionalState,
    #[serde(default)]
    abilities: Option<AbilityMetrics>,
    #[serde(default)]
    current_thought: Option<String>,
}

#[derive(Deserialize)]
struct WireAgentConfig {
    #[serde(default)]
    name: String,
    #[serde(default)]
    personality: Option<PersonalityParams>,
    #[serde(default)]
    career_aspiration: Value,
}

/// Agent as returned by the REST list and detail endpoints.
#[derive(Deserialize)]
struct WireListedAgent {
    id: Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mbti: Option<String>,
    #[serde(default)]
    location: Value,
    activity: Value,
    #[serde(default)]
    emotion: EmotionalState,
    #[serde(default)]
    career: Value,
    #[serde(default)]
    personality: Option<PersonalityParams>,
    #[serde(default)]
    abilities: Option<AbilityMetrics>,
    #[serde(default)]
    current_thought: Option<String>,
}

#[derive(Deserialize)]
struct WireRelationship {
    agent_a: Value,
    agent_b: Value,
    #[serde(default)]
    closeness: f32,
    #[serde(default)]
    trust: f32,
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(default)]
    id: Value,
    event_type: EventType,
    #[serde(default)]
    timestamp: SimulationTime,
    #[serde(default)]
    involved_agents: Vec<Value>,
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    intensity: f32,
}

/// Decode one text frame from the push channel.
pub fn decode_update(text: &str) -> Result<SimulationUpdate, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    decode_update_value(value)
}

pub fn decode_update_value(value: Value) -> Result<SimulationUpdate, DecodeError> {
    let tag = match value.get("type") {
        Some(Value::String(tag)) => tag.clone(),
        Some(other) => return Err(DecodeError::UnknownType(other.to_string())),
        None => return Err(DecodeError::MissingType),
    };

    match tag.as_str() {
        "Tick" => {
            let frame: WireTick = serde_json::from_value(value)?;
            decode_tick(frame)
        }
        "SpeedChanged" => {
            let frame: WireSpeedChanged = serde_json::from_value(value)?;
            Ok(SimulationUpdate::SpeedChanged { speed: frame.speed })
        }
        "Started" => Ok(SimulationUpdate::Started),
        "Stopped" => Ok(SimulationUpdate::Stopped),
        _ => Err(DecodeError::UnknownType(tag)),
    }
}

fn decode_tick(frame: WireTick) -> Result<SimulationUpdate, DecodeError> {
    let WireTick {
        time,
        snapshot,
        events,
    } = frame;

    let records = decode_agent_records(snapshot.agents)?;
    let relationships = snapshot
        .relationships
        .into_iter()
        .map(|rel| Relationship {
            agent_a: normalize_id(&rel.agent_a),
            agent_b: normalize_id(&rel.agent_b),
            closeness: rel.closeness,
            trust: rel.trust,
        })
        .collect();
    let active_events = snapshot.active_events.iter().map(normalize_id).collect();

    let snapshot = WorldSnapshot {
        time: snapshot.time.unwrap_or_else(|| time.clone()),
        agents: records,
        relationships,
        active_events,
    };
    let agents = snapshot.agents();
    let events = events.into_iter().map(decode_event).collect();

    Ok(SimulationUpdate::Tick {
        time,
        snapshot,
        agents,
        events,
    })
}

/// Flatten the snapshot's agent collection. Object iteration order is the
/// document order of the frame and becomes the canonical agent order.
fn decode_agent_records(agents: Value) -> Result<Vec<AgentRecord>, DecodeError> {
    let entries: Vec<(String, Value)> = match agents {
        Value::Null => Vec::new(),
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        other => {
            return Err(DecodeError::InvalidShape {
                field: "snapshot.agents",
                found: other.to_string(),
            })
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|(key, value)| match decode_agent_record(key.clone(), value) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(target: "campus::decode", %key, error = %err, "agent.skipped");
                None
            }
        })
        .collect())
}

fn decode_agent_record(key: String, value: Value) -> Result<AgentRecord, DecodeError> {
    let wire: WireAgent = serde_json::from_value(value)?;
    let id = if wire.id.is_null() {
        key.clone()
    } else {
        normalize_id(&wire.id)
    };
    Ok(AgentRecord {
        key,
        id,
        name: wire.config.name,
        personality: wire.config.personality,
        career: career_text(&wire.config.career_aspiration),
        location: location_text(&wire.location),
        activity: activity_from_wire(&wire.activity)?,
        emotion: wire.emotion,
        abilities: wire.abilities,
        current_thought: wire.current_thought,
    })
}

fn decode_event(wire: WireEvent) -> SimulationEvent {
    let id = match &wire.id {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        other => Some(normalize_id(other)),
    };
    SimulationEvent {
        id,
        event_type: wire.event_type,
        timestamp: wire.timestamp,
        involved_agents: wire.involved_agents.iter().map(normalize_id).collect(),
        narrative: wire.narrative,
        intensity: wire.intensity,
    }
}

/// Canonical string form of an identifier: bare strings pass through, wrapped
/// identifiers yield their `Uuid` field, anything else is stringified.
pub fn normalize_id(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("Uuid") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}

fn location_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(map) if map.len() == 1 => map
            .values()
            .next()
            .map(location_text)
            .unwrap_or_default(),
        Value::Array(items) if items.len() == 1 => location_text(&items[0]),
        other => other.to_string(),
    }
}

fn career_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => ["ideal_career", "ideal"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn activity_from_wire(value: &Value) -> Result<AgentActivity, DecodeError> {
    let tag = match value {
        Value::String(text) => text
            .split(|c: char| !c.is_alphanumeric())
            .next()
            .unwrap_or_default(),
        Value::Object(map) if map.len() == 1 => {
            map.keys().next().map(String::as_str).unwrap_or_default()
        }
        other => return Err(DecodeError::InvalidActivity(other.to_string())),
    };
    tag.parse().map_err(DecodeError::InvalidActivity)
}

fn listed_agent(wire: WireListedAgent) -> Result<Agent, DecodeError> {
    let mbti = wire
        .mbti
        .clone()
        .or_else(|| wire.personality.as_ref().and_then(|p| p.mbti.clone()))
        .unwrap_or_default();
    Ok(Agent {
        id: normalize_id(&wire.id),
        name: wire.name,
        mbti,
        location: location_text(&wire.location),
        activity: activity_from_wire(&wire.activity)?,
        emotion: wire.emotion,
        career: career_text(&wire.career),
        personality: wire.personality,
        abilities: wire.abilities,
        current_thought: wire.current_thought,
    })
}

/// Decode `GET /api/agents`. Accepts `{"agents": [...]}` or a bare array.
pub fn decode_agent_list(value: Value) -> Result<Vec<Agent>, DecodeError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("agents") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(DecodeError::InvalidShape {
                    field: "agents",
                    found: other.to_string(),
                })
            }
            None => return Err(DecodeError::MissingField("agents")),
        },
        other => {
            return Err(DecodeError::InvalidShape {
                field: "agents",
                found: other.to_string(),
            })
        }
    };

    items
        .into_iter()
        .map(|item| {
            let wire: WireListedAgent = serde_json::from_value(item)?;
            listed_agent(wire)
        })
        .collect()
}

/// Decode `GET /api/agents/{id}`. The service answers an unknown id with a 200
/// carrying `{"error": ...}`, which is surfaced as [`DecodeError::Service`].
pub fn decode_agent_detail(value: Value) -> Result<AgentDetail, DecodeError> {
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(DecodeError::Service(message.to_string()));
    }
    let career_clarity = value
        .get("career")
        .and_then(|career| career.get("clarity"))
        .and_then(Value::as_f64)
        .map(|clarity| clarity as f32);

    let wire: WireListedAgent = serde_json::from_value(value)?;
    let personality = wire
        .personality
        .clone()
        .ok_or(DecodeError::MissingField("personality"))?;
    let abilities = wire.abilities.ok_or(DecodeError::MissingField("abilities"))?;
    let agent = listed_agent(wire)?;

    Ok(AgentDetail {
        agent,
        personality,
        abilities,
        career_clarity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agent_json(id: Value, location: Value, activity: Value) -> Value {
        json!({
            "id": id,
            "config": {
                "name": "Lin",
                "personality": { "e_i": -0.4, "s_n": 0.2, "t_f": -0.1, "j_p": 0.3, "stability": 0.6, "mbti": "ENTP" },
                "career_aspiration": { "ideal_career": "Engineer", "clarity": 0.4 }
            },
            "location": location,
            "activity": activity,
            "emotion": { "valence": 0.1, "arousal": 0.5, "stress": 0.3 },
            "abilities": { "academic": 0.7, "social": 0.5, "resilience": 0.6, "creativity": 0.8 },
            "current_thought": "exam soon"
        })
    }

    fn tick_with_agents(agents: Value) -> Value {
        json!({
            "type": "Tick",
            "time": { "semester": 1, "week": 2, "day_of_week": 3, "hour": 10, "tick": 42 },
            "snapshot": {
                "time": { "semester": 1, "week": 2, "day_of_week": 3, "hour": 10, "tick": 42 },
                "agents": agents,
                "relationships": [],
                "active_events": []
            },
            "events": []
        })
    }

    #[test]
    fn wrapped_and_bare_ids_normalize_identically() {
        assert_eq!(normalize_id(&json!("abc")), "abc");
        assert_eq!(normalize_id(&json!({ "Uuid": "abc" })), "abc");
        assert_eq!(normalize_id(&json!(17)), "17");
    }

    #[test]
    fn tick_flattens_agents_in_document_order() {
        let mut agents = serde_json::Map::new();
        agents.insert(
            "zeta".into(),
            agent_json(json!({ "Uuid": "z" }), json!("library"), json!("Resting")),
        );
        agents.insert(
            "alpha".into(),
            agent_json(json!("a"), json!("cafeteria"), json!("Studying")),
        );
        let update = decode_update_value(tick_with_agents(Value::Object(agents))).unwrap();

        let SimulationUpdate::Tick { time, agents, .. } = update else {
            panic!("expected tick");
        };
        assert_eq!(time.tick, 42);
        let ids: Vec<_> = agents.iter().map(|agent| agent.id.as_str()).collect();
        assert_eq!(ids, ["z", "a"]);
        assert_eq!(agents[0].name, "Lin");
        assert_eq!(agents[0].mbti, "ENTP");
        assert_eq!(agents[0].career, "Engineer");
        assert_eq!(agents[0].location, "library");
        assert_eq!(agents[0].current_thought.as_deref(), Some("exam soon"));
    }

    #[test]
    fn server_agent_array_decodes_in_array_order() {
        let time = json!({ "semester": 1, "week": 3, "day_of_week": 2, "hour": 9, "tick": 5 });
        let server_agent = |id: &str, name: &str, activity: Value| {
            json!({
                "id": id,
                "config": {
                    "name": name,
                    "personality": {
                        "e_i": 0.3, "s_n": -0.2, "t_f": 0.1, "j_p": 0.0, "stability": 0.4,
                        "shift_history": [{
                            "timestamp": time,
                            "trigger_event_id": "9999",
                            "dimension": "EI",
                            "delta": 0.05,
                            "reason": "club fair"
                        }]
                    },
                    "career_aspiration": {
                        "ideal_career": "Architect",
                        "category": "Engineering",
                        "subject_preferences": [{ "subject": "math", "preference": 0.8 }],
                        "clarity": 0.6
                    },
                    "background": null,
                    "age": 16
                },
                "location": "playground",
                "activity": activity,
                "emotion": { "valence": 0.3, "arousal": 0.5, "stress": 0.2 },
                "abilities": { "academic": 0.5, "social": 0.6, "resilience": 0.5, "creativity": 0.7 },
                "current_thought": null,
                "created_at": time,
                "last_updated": time
            })
        };
        let first = "22222222-0000-7000-8000-000000000000";
        let second = "11111111-0000-7000-8000-000000000000";
        let frame = json!({
            "type": "Tick",
            "time": time,
            "snapshot": {
                "time": time,
                "agents": [
                    server_agent(first, "Wen", json!({ "Socializing": { "with": [second] } })),
                    server_agent(second, "Hao", json!({ "Socializing": { "with": [first] } })),
                ],
                "relationships": [],
                "active_events": []
            },
            "events": [{
                "id": "evt-1",
                "event_type": "SocialInteraction",
                "timestamp": time,
                "involved_agents": [first, second],
                "narrative": "Wen and Hao talk",
                "intensity": 0.4,
                "trigger": "AgentAction",
                "state_changes": []
            }]
        });

        let SimulationUpdate::Tick { agents, events, .. } = decode_update_value(frame).unwrap()
        else {
            panic!("expected tick");
        };
        let ids: Vec<_> = agents.iter().map(|agent| agent.id.as_str()).collect();
        assert_eq!(ids, [first, second]);
        assert!(agents.iter().all(|a| a.activity == AgentActivity::Socializing));
        assert_eq!(agents[0].career, "Architect");
        assert_eq!(agents[0].mbti, "");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].involved_agents, [first, second]);
    }

    #[test]
    fn bad_agent_record_is_skipped_not_the_tick() {
        let agents = json!([
            agent_json(json!("a"), json!("library"), json!("Juggling")),
            agent_json(json!("b"), json!("library"), json!("Resting")),
        ]);
        let SimulationUpdate::Tick { time, agents, .. } =
            decode_update_value(tick_with_agents(agents)).unwrap()
        else {
            panic!("expected tick");
        };
        assert_eq!(time.tick, 42);
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id, "b");
    }

    #[test]
    fn activity_shapes_collapse_to_tag() {
        let shapes = [
            json!("Socializing"),
            json!({ "Socializing": { "with": [] } }),
            json!("Socializing { with: [AgentId(1)] }"),
        ];
        for shape in shapes {
            assert_eq!(
                activity_from_wire(&shape).unwrap(),
                AgentActivity::Socializing
            );
        }
        assert!(activity_from_wire(&json!("Juggling")).is_err());
        assert!(activity_from_wire(&json!(3)).is_err());
    }

    #[test]
    fn object_location_is_stringified() {
        let agents = json!({
            "k": agent_json(json!("a"), json!({ "LocationId": "dormitory" }), json!("Resting"))
        });
        let update = decode_update_value(tick_with_agents(agents)).unwrap();
        let SimulationUpdate::Tick { agents, .. } = update else {
            panic!("expected tick");
        };
        assert_eq!(agents[0].location, "dormitory");
    }

    #[test]
    fn missing_mbti_and_id_fall_back() {
        let agents = json!({
            "key-1": {
                "config": {
                    "name": "Wu",
                    "personality": { "e_i": 0.0, "s_n": 0.0, "t_f": 0.0, "j_p": 0.0 },
                    "career_aspiration": { "ideal_career": "Doctor" }
                },
                "location": "library",
                "activity": "Reflecting"
            }
        });
        let update = decode_update_value(tick_with_agents(agents)).unwrap();
        let SimulationUpdate::Tick { agents, .. } = update else {
            panic!("expected tick");
        };
        assert_eq!(agents[0].id, "key-1");
        assert_eq!(agents[0].mbti, "");
        assert!(agents[0].abilities.is_none());
    }

    #[test]
    fn events_without_id_stay_unkeyed() {
        let mut frame = tick_with_agents(json!({}));
        frame["events"] = json!([
            {
                "event_type": "Conflict",
                "timestamp": { "tick": 42 },
                "involved_agents": [{ "Uuid": "a" }, "b"],
                "narrative": "argument in the hallway",
                "intensity": 0.7
            },
            {
                "id": { "Uuid": "e-1" },
                "event_type": "Routine",
                "timestamp": { "tick": 42 },
                "narrative": "lunch"
            }
        ]);
        let update = decode_update_value(frame).unwrap();
        let SimulationUpdate::Tick { events, .. } = update else {
            panic!("expected tick");
        };
        assert_eq!(events[0].id, None);
        assert_eq!(events[0].involved_agents, ["a", "b"]);
        assert_eq!(events[1].id.as_deref(), Some("e-1"));
    }

    #[test]
    fn scalar_frames_decode() {
        assert_eq!(
            decode_update(r#"{"type":"SpeedChanged","speed":"VeryFast"}"#).unwrap(),
            SimulationUpdate::SpeedChanged {
                speed: SimulationSpeed::VeryFast
            }
        );
        assert_eq!(
            decode_update(r#"{"type":"Started"}"#).unwrap(),
            SimulationUpdate::Started
        );
        assert_eq!(
            decode_update(r#"{"type":"Stopped"}"#).unwrap(),
            SimulationUpdate::Stopped
        );
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert!(matches!(
            decode_update("{not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            decode_update(r#"{"speed":"Fast"}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            decode_update(r#"{"type":"Exploded"}"#),
            Err(DecodeError::UnknownType(tag)) if tag == "Exploded"
        ));
        assert!(matches!(
            decode_update(r#"{"type":"Tick","time":{}}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(decode_update(r#"{"type":"SpeedChanged","speed":"Warp"}"#).is_err());
    }

    #[test]
    fn agent_list_accepts_debug_activity() {
        let list = json!({
            "agents": [{
                "id": "a-1",
                "name": "Chen",
                "mbti": "ISFJ",
                "location": "library",
                "activity": "Studying { subject: \"math\" }",
                "emotion": { "valence": 0.0, "arousal": 0.2, "stress": 0.4 },
                "career": "Teacher"
            }]
        });
        let agents = decode_agent_list(list).unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].activity, AgentActivity::Studying);
        assert_eq!(agents[0].mbti, "ISFJ");
        assert_eq!(agents[0].career, "Teacher");
    }

    #[test]
    fn agent_detail_requires_personality_and_abilities() {
        let detail = json!({
            "id": "a-1",
            "name": "Chen",
            "personality": { "e_i": 0.1, "s_n": 0.1, "t_f": 0.1, "j_p": 0.1, "stability": 0.5, "mbti": "INFP" },
            "career": { "ideal": "Writer", "clarity": 0.25 },
            "location": "library",
            "activity": "Reflecting",
            "emotion": { "valence": 0.0, "arousal": 0.2, "stress": 0.4 },
            "abilities": { "academic": 0.7, "social": 0.5, "resilience": 0.6, "creativity": 0.8 },
            "current_thought": null
        });
        let parsed = decode_agent_detail(detail.clone()).unwrap();
        assert_eq!(parsed.agent.mbti, "INFP");
        assert_eq!(parsed.agent.career, "Writer");
        assert_eq!(parsed.career_clarity, Some(0.25));

        let mut missing = detail;
        missing.as_object_mut().unwrap().remove("abilities");
        assert!(matches!(
            decode_agent_detail(missing),
            Err(DecodeError::MissingField("abilities"))
        ));

        assert!(matches!(
            decode_agent_detail(json!({ "error": "Agent not found" })),
            Err(DecodeError::Service(_))
        ));
    }
}
