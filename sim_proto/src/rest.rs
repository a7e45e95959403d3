//! Request and response bodies of the simulation service's REST surface.

use serde::{Deserialize, Serialize};

use crate::model::{PresetEvent, SimulationSpeed};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub tick: u64,
    #[serde(default)]
    pub time_display: String,
    #[serde(default)]
    pub agent_count: usize,
    pub speed: SimulationSpeed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

fn default_success() -> bool {
    true
}

/// Result of `POST /api/simulation/step`. A failed step carries `success:
/// false` and an `error` string instead of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub events: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSpeedRequest {
    pub speed: SimulationSpeed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateAgentsRequest {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub e_i: f32,
    pub s_n: f32,
    pub t_f: f32,
    pub j_p: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal_career: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEventRequest {
    pub event: PresetEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub role: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub impact: String,
}
