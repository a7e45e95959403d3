use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type AgentId = String;
pub type LocationId = String;
pub type EventId = String;

/// Simulation clock as reported by the service. Only `tick` orders updates; the
/// calendar fields exist for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationTime {
    pub semester: u32,
    pub week: u32,
    pub day_of_week: u32,
    pub hour: u32,
    pub tick: u64,
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self {
            semester: 1,
            week: 1,
            day_of_week: 1,
            hour: 8,
            tick: 0,
        }
    }
}

impl SimulationTime {
    pub fn display(&self) -> String {
        let day = match self.day_of_week {
            1 => "Mon",
            2 => "Tue",
            3 => "Wed",
            4 => "Thu",
            5 => "Fri",
            6 => "Sat",
            7 => "Sun",
            _ => "???",
        };
        format!(
            "S{} W{} {} {:02}:00",
            self.semester, self.week, day, self.hour
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionalState {
    /// -1.0 (negative) to 1.0 (positive).
    pub valence: f32,
    /// 0.0 (calm) to 1.0 (agitated).
    pub arousal: f32,
    /// 0.0 to 1.0.
    pub stress: f32,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            valence: 0.3,
            arousal: 0.3,
            stress: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityParams {
    pub e_i: f32,
    pub s_n: f32,
    pub t_f: f32,
    pub j_p: f32,
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbti: Option<String>,
}

fn default_stability() -> f32 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityMetrics {
    pub academic: f32,
    pub social: f32,
    pub resilience: f32,
    pub creativity: f32,
}

/// Closed set of activities an agent can be engaged in. The service attaches
/// payloads to some variants (`Socializing { with }`, `Moving { to }`); the
/// dashboard only needs the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentActivity {
    Studying,
    Socializing,
    Resting,
    Reflecting,
    Activity,
    Moving,
    Troubled,
}

impl AgentActivity {
    pub const ALL: [AgentActivity; 7] = [
        AgentActivity::Studying,
        AgentActivity::Socializing,
        AgentActivity::Resting,
        AgentActivity::Reflecting,
        AgentActivity::Activity,
        AgentActivity::Moving,
        AgentActivity::Troubled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentActivity::Studying => "Studying",
            AgentActivity::Socializing => "Socializing",
            AgentActivity::Resting => "Resting",
            AgentActivity::Reflecting => "Reflecting",
            AgentActivity::Activity => "Activity",
            AgentActivity::Moving => "Moving",
            AgentActivity::Troubled => "Troubled",
        }
    }

    pub fn is_social(&self) -> bool {
        matches!(self, AgentActivity::Socializing)
    }
}

impl fmt::Display for AgentActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentActivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentActivity::ALL
            .iter()
            .copied()
            .find(|activity| activity.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Live, partial view of an agent as shown in lists and on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub mbti: String,
    pub location: LocationId,
    pub activity: AgentActivity,
    pub emotion: EmotionalState,
    pub career: String,
    pub personality: Option<PersonalityParams>,
    pub abilities: Option<AbilityMetrics>,
    pub current_thought: Option<String>,
}

/// Enriched agent fetched on selection. Personality and abilities are always
/// present, unlike the pushed [`Agent`].
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDetail {
    pub agent: Agent,
    pub personality: PersonalityParams,
    pub abilities: AbilityMetrics,
    pub career_clarity: Option<f32>,
}

/// One entry of the snapshot's agent collection, already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRecord {
    /// Key under which the service published this record.
    pub key: String,
    pub id: AgentId,
    pub name: String,
    pub personality: Option<PersonalityParams>,
    pub career: String,
    pub location: LocationId,
    pub activity: AgentActivity,
    pub emotion: EmotionalState,
    pub abilities: Option<AbilityMetrics>,
    pub current_thought: Option<String>,
}

impl AgentRecord {
    pub fn to_agent(&self) -> Agent {
        let mbti = self
            .personality
            .as_ref()
            .and_then(|personality| personality.mbti.clone())
            .unwrap_or_default();
        Agent {
            id: self.id.clone(),
            name: self.name.clone(),
            mbti,
            location: self.location.clone(),
            activity: self.activity,
            emotion: self.emotion,
            career: self.career.clone(),
            personality: self.personality.clone(),
            abilities: self.abilities,
            current_thought: self.current_thought.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub agent_a: AgentId,
    pub agent_b: AgentId,
    pub closeness: f32,
    pub trust: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldSnapshot {
    pub time: SimulationTime,
    pub agents: Vec<AgentRecord>,
    pub relationships: Vec<Relationship>,
    pub active_events: Vec<EventId>,
}

impl WorldSnapshot {
    /// Canonical agent sequence, in the order the service published them.
    pub fn agents(&self) -> Vec<Agent> {
        self.agents.iter().map(AgentRecord::to_agent).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Routine,
    SocialInteraction,
    Academic,
    Conflict,
    Cooperation,
    SpecialEvent,
    System,
    Intervention,
}

impl EventType {
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Routine => "Routine",
            EventType::SocialInteraction => "Social",
            EventType::Academic => "Academic",
            EventType::Conflict => "Conflict",
            EventType::Cooperation => "Cooperation",
            EventType::SpecialEvent => "Special",
            EventType::System => "System",
            EventType::Intervention => "Intervention",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationEvent {
    /// Absent when the service omitted it; consumers that need a key synthesize
    /// one from the tick.
    pub id: Option<EventId>,
    pub event_type: EventType,
    pub timestamp: SimulationTime,
    pub involved_agents: Vec<AgentId>,
    pub narrative: String,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationSpeed {
    Paused,
    Normal,
    Fast,
    VeryFast,
    Maximum,
    Unlimited,
}

impl SimulationSpeed {
    const ORDER: [SimulationSpeed; 6] = [
        SimulationSpeed::Paused,
        SimulationSpeed::Normal,
        SimulationSpeed::Fast,
        SimulationSpeed::VeryFast,
        SimulationSpeed::Maximum,
        SimulationSpeed::Unlimited,
    ];

    fn position(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|speed| speed == self)
            .unwrap_or(0)
    }

    pub fn faster(&self) -> Self {
        let next = (self.position() + 1).min(Self::ORDER.len() - 1);
        Self::ORDER[next]
    }

    pub fn slower(&self) -> Self {
        Self::ORDER[self.position().saturating_sub(1)]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SimulationSpeed::Paused => "paused",
            SimulationSpeed::Normal => "1x",
            SimulationSpeed::Fast => "2x",
            SimulationSpeed::VeryFast => "5x",
            SimulationSpeed::Maximum => "10x",
            SimulationSpeed::Unlimited => "max",
        }
    }
}

/// Intervention templates accepted by `POST /api/interventions/event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresetEvent {
    MidtermExam,
    ClubRecruitment,
    SportsMeet,
    FriendshipConflict { agent_a: AgentId, agent_b: AgentId },
    NewStudent { name: String },
    TeacherPraise { target: AgentId },
    TeacherCriticism { target: AgentId },
    Custom { description: String, scope: EventScope },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventScope {
    Global,
    Agents(Vec<AgentId>),
    Location(LocationId),
}

/// Decoded push frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationUpdate {
    Tick {
        time: SimulationTime,
        snapshot: WorldSnapshot,
        agents: Vec<Agent>,
        events: Vec<SimulationEvent>,
    },
    SpeedChanged {
        speed: SimulationSpeed,
    },
    Started,
    Stopped,
}

impl SimulationUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            SimulationUpdate::Tick { .. } => "Tick",
            SimulationUpdate::SpeedChanged { .. } => "SpeedChanged",
            SimulationUpdate::Started => "Started",
            SimulationUpdate::Stopped => "Stopped",
        }
    }
}
