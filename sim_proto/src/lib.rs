//! Wire contracts for the campus simulation dashboard.
//!
//! The simulation service pushes JSON frames over a WebSocket and answers REST
//! calls with loosely-shaped JSON. This crate owns the canonical in-memory model
//! those payloads are normalized into, plus the pure decoding functions that do
//! the normalization. Nothing here holds state.

mod decode;
mod model;
mod rest;

pub use decode::{
    decode_agent_detail, decode_agent_list, decode_update, decode_update_value, normalize_id,
    DecodeError,
};
pub use model::{
    AbilityMetrics, Agent, AgentActivity, AgentDetail, AgentId, AgentRecord, EmotionalState,
    EventId, EventScope, EventType, LocationId, PersonalityParams, PresetEvent, Relationship,
    SimulationEvent, SimulationSpeed, SimulationTime, SimulationUpdate, WorldSnapshot,
};
pub use rest::{
    ChatReply, ChatRequest, CreateAgentRequest, GenerateAgentsRequest, SetSpeedRequest,
    SimulationStatus, StepResult, SuccessResponse, TriggerEventRequest,
};
