//! Local mirror of the remote simulation.
//!
//! The store has exactly two writers: decoded push frames ([`SimulationStore::apply_update`])
//! and completed REST calls ([`SimulationStore::apply_outcome`]). Everything else
//! reads it.

use std::collections::VecDeque;

use sim_proto::{
    Agent, AgentDetail, AgentId, ChatReply, CreateAgentRequest, PresetEvent, SimulationEvent,
    SimulationSpeed, SimulationStatus, SimulationTime, SimulationUpdate, StepResult,
    SuccessResponse, WorldSnapshot,
};
use tracing::{debug, info, warn};

use crate::error::ClientError;

pub const DEFAULT_EVENT_LOG_LIMIT: usize = 100;

/// Shown in the transcript when a chat request fails.
pub const CHAT_UNAVAILABLE_REPLY: &str = "(chat service unavailable)";

/// Roles the user can speak as, in selector order.
pub const CHAT_ROLES: [&str; 3] = ["teacher", "principal", "counselor"];

/// Requests the client can make of the simulation service.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Step,
    SetSpeed(SimulationSpeed),
    GenerateAgents(usize),
    CreateAgent(CreateAgentRequest),
    TriggerEvent(PresetEvent),
    Chat {
        agent_id: AgentId,
        role: String,
        message: String,
    },
    FetchStatus,
    FetchAgents,
    FetchDetail {
        agent_id: AgentId,
        token: u64,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Step => "step",
            Command::SetSpeed(_) => "set_speed",
            Command::GenerateAgents(_) => "generate_agents",
            Command::CreateAgent(_) => "create_agent",
            Command::TriggerEvent(_) => "trigger_event",
            Command::Chat { .. } => "chat",
            Command::FetchStatus => "fetch_status",
            Command::FetchAgents => "fetch_agents",
            Command::FetchDetail { .. } => "fetch_detail",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Ack(SuccessResponse),
    Step(StepResult),
    Status(SimulationStatus),
    Agents(Vec<Agent>),
    Detail(AgentDetail),
    Chat(ChatReply),
}

/// A command paired with whatever the service answered.
#[derive(Debug)]
pub struct CommandOutcome {
    pub command: Command,
    pub result: Result<CommandReply, ClientError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RightPanel {
    #[default]
    Detail,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub speaker: Speaker,
    pub text: String,
    pub impact: Option<String>,
}

/// Live record of the selected agent plus the fetched detail, when present.
#[derive(Debug, Clone, Copy)]
pub struct AgentView<'a> {
    pub agent: &'a Agent,
    pub detail: Option<&'a AgentDetail>,
}

#[derive(Debug)]
pub struct SimulationStore {
    connected: bool,
    running: bool,
    speed: SimulationSpeed,
    time: SimulationTime,
    tick: u64,
    agents: Vec<Agent>,
    snapshot: WorldSnapshot,
    latest_events: Vec<SimulationEvent>,
    event_log: VecDeque<SimulationEvent>,
    event_log_limit: usize,
    events_seen: u64,
    selected_agent_id: Option<AgentId>,
    selected_detail: Option<AgentDetail>,
    detail_token: u64,
    right_panel: RightPanel,
    chat: Vec<ChatLine>,
    chat_pending: bool,
    chat_role: String,
    default_chat_role: String,
}

impl Default for SimulationStore {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_LIMIT, "teacher")
    }
}

impl SimulationStore {
    pub fn new(event_log_limit: usize, chat_role: impl Into<String>) -> Self {
        let chat_role = chat_role.into();
        Self {
            connected: false,
            running: false,
            speed: SimulationSpeed::Normal,
            time: SimulationTime::default(),
            tick: 0,
            agents: Vec::new(),
            snapshot: WorldSnapshot::default(),
            latest_events: Vec::new(),
            event_log: VecDeque::with_capacity(event_log_limit),
            event_log_limit: event_log_limit.max(1),
            events_seen: 0,
            selected_agent_id: None,
            selected_detail: None,
            detail_token: 0,
            right_panel: RightPanel::Detail,
            chat: Vec::new(),
            chat_pending: false,
            default_chat_role: chat_role.clone(),
            chat_role,
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn speed(&self) -> SimulationSpeed {
        self.speed
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshot
    }

    pub fn latest_events(&self) -> &[SimulationEvent] {
        &self.latest_events
    }

    /// Most recent events, oldest first.
    pub fn event_log(&self) -> &VecDeque<SimulationEvent> {
        &self.event_log
    }

    /// Total number of events ever appended to the log. Unlike the log length
    /// this keeps growing once the log is capped.
    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }

    pub fn selected_agent_id(&self) -> Option<&AgentId> {
        self.selected_agent_id.as_ref()
    }

    pub fn selected_detail(&self) -> Option<&AgentDetail> {
        self.selected_detail.as_ref()
    }

    pub fn right_panel(&self) -> RightPanel {
        self.right_panel
    }

    pub fn chat(&self) -> &[ChatLine] {
        &self.chat
    }

    pub fn chat_pending(&self) -> bool {
        self.chat_pending
    }

    /// Role the next chat message is sent as.
    pub fn chat_role(&self) -> &str {
        &self.chat_role
    }

    pub fn set_chat_role(&mut self, role: impl Into<String>) {
        self.chat_role = role.into();
    }

    /// Step to the next entry of [`CHAT_ROLES`]. A role outside the list
    /// restarts the cycle.
    pub fn cycle_chat_role(&mut self) -> &str {
        let next = CHAT_ROLES
            .iter()
            .position(|role| *role == self.chat_role)
            .map_or(0, |index| (index + 1) % CHAT_ROLES.len());
        self.chat_role = CHAT_ROLES[next].to_string();
        &self.chat_role
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            debug!(connected, "store.connection");
        }
        self.connected = connected;
    }

    pub fn apply_update(&mut self, update: SimulationUpdate) {
        match update {
            SimulationUpdate::Tick {
                time,
                snapshot,
                agents,
                events,
            } => {
                self.tick = time.tick;
                self.time = time;
                self.snapshot = snapshot;
                self.agents = agents;
                self.append_events(&events);
                self.latest_events = events;
            }
            SimulationUpdate::SpeedChanged { speed } => self.speed = speed,
            SimulationUpdate::Started => self.running = true,
            SimulationUpdate::Stopped => self.running = false,
        }
    }

    fn append_events(&mut self, events: &[SimulationEvent]) {
        self.event_log.extend(events.iter().cloned());
        while self.event_log.len() > self.event_log_limit {
            self.event_log.pop_front();
        }
        self.events_seen += events.len() as u64;
    }

    /// Apply the optimistic local effect of `command` and hand it back for
    /// sending. Optimistic flags are never rolled back.
    pub fn issue(&mut self, command: Command) -> Command {
        match &command {
            Command::Start => self.running = true,
            Command::Stop => self.running = false,
            Command::SetSpeed(speed) => self.speed = *speed,
            Command::Chat { message, .. } => {
                self.chat.push(ChatLine {
                    speaker: Speaker::User,
                    text: message.clone(),
                    impact: None,
                });
                self.chat_pending = true;
            }
            _ => {}
        }
        debug!(command = command.name(), "command.issued");
        command
    }

    /// Merge a completed command. Returns follow-up commands to send.
    pub fn apply_outcome(&mut self, outcome: CommandOutcome) -> Vec<Command> {
        let CommandOutcome { command, result } = outcome;
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                self.apply_failure(&command, &err);
                return Vec::new();
            }
        };

        match (command, reply) {
            (Command::Step, CommandReply::Step(result)) => {
                if result.success {
                    self.tick = result.tick;
                    for warning in &result.warnings {
                        warn!(tick = result.tick, %warning, "step.warning");
                    }
                    vec![Command::FetchAgents]
                } else {
                    warn!(error = ?result.error, "step.rejected");
                    Vec::new()
                }
            }
            (
                command @ (Command::GenerateAgents(_) | Command::CreateAgent(_)),
                CommandReply::Ack(ack),
            ) => {
                if !ack.success {
                    warn!(command = command.name(), message = %ack.message, "command.rejected");
                }
                vec![Command::FetchAgents]
            }
            (command, CommandReply::Ack(ack)) => {
                if !ack.success {
                    warn!(command = command.name(), message = %ack.message, "command.rejected");
                }
                Vec::new()
            }
            (_, CommandReply::Status(status)) => {
                self.apply_status(status);
                Vec::new()
            }
            (_, CommandReply::Agents(agents)) => {
                self.agents = agents;
                Vec::new()
            }
            (Command::FetchDetail { agent_id, token }, CommandReply::Detail(detail)) => {
                if token == self.detail_token
                    && self.selected_agent_id.as_deref() == Some(agent_id.as_str())
                {
                    self.selected_detail = Some(detail);
                } else {
                    debug!(%agent_id, token, current = self.detail_token, "detail.stale");
                }
                Vec::new()
            }
            (Command::Chat { agent_id, .. }, CommandReply::Chat(reply)) => {
                if self.selected_agent_id.as_deref() == Some(agent_id.as_str()) {
                    self.chat.push(ChatLine {
                        speaker: Speaker::Agent,
                        text: reply.reply,
                        impact: (!reply.impact.is_empty()).then_some(reply.impact),
                    });
                    self.chat_pending = false;
                } else {
                    debug!(%agent_id, "chat.reply_dropped");
                }
                Vec::new()
            }
            (command, reply) => {
                warn!(command = command.name(), ?reply, "command.unexpected_reply");
                Vec::new()
            }
        }
    }

    fn apply_failure(&mut self, command: &Command, err: &ClientError) {
        match command {
            Command::Chat { agent_id, .. } => {
                warn!(%agent_id, error = %err, "chat.failed");
                if self.selected_agent_id.as_deref() == Some(agent_id.as_str()) {
                    self.chat.push(ChatLine {
                        speaker: Speaker::Agent,
                        text: CHAT_UNAVAILABLE_REPLY.to_string(),
                        impact: None,
                    });
                    self.chat_pending = false;
                }
            }
            Command::FetchDetail { agent_id, .. } => {
                info!(%agent_id, error = %err, "detail.unavailable");
            }
            other => warn!(command = other.name(), error = %err, "command.failed"),
        }
    }

    pub fn apply_status(&mut self, status: SimulationStatus) {
        self.running = status.running;
        self.tick = status.tick;
        self.speed = status.speed;
    }

    /// Change the selection. Detail, chat transcript and chat role are reset at
    /// once; the returned fetch carries a token so a late answer for an older
    /// selection is ignored. `None` deselects.
    pub fn select_agent(&mut self, agent_id: Option<AgentId>) -> Option<Command> {
        self.detail_token += 1;
        self.selected_detail = None;
        self.chat.clear();
        self.chat_pending = false;
        self.chat_role.clone_from(&self.default_chat_role);
        self.selected_agent_id = agent_id.clone();
        agent_id.map(|agent_id| Command::FetchDetail {
            agent_id,
            token: self.detail_token,
        })
    }

    pub fn toggle_panel(&mut self) -> RightPanel {
        self.right_panel = match self.right_panel {
            RightPanel::Detail => RightPanel::Chat,
            RightPanel::Chat => RightPanel::Detail,
        };
        self.right_panel
    }

    /// Build and issue a chat message to the selected agent. Nothing is sent
    /// while an earlier message is still waiting for its reply.
    pub fn send_chat(&mut self, message: &str) -> Option<Command> {
        let message = message.trim();
        if message.is_empty() || self.chat_pending {
            return None;
        }
        let agent_id = self.selected_agent_id.clone()?;
        let command = Command::Chat {
            agent_id,
            role: self.chat_role.clone(),
            message: message.to_string(),
        };
        Some(self.issue(command))
    }

    pub fn selected_agent(&self) -> Option<&Agent> {
        let id = self.selected_agent_id.as_ref()?;
        self.agents.iter().find(|agent| &agent.id == id)
    }

    /// Live fields win; the fetched detail supplies what the live record lacks.
    pub fn selected_view(&self) -> Option<AgentView<'_>> {
        let detail = self.selected_detail.as_ref();
        let agent = self
            .selected_agent()
            .or_else(|| detail.map(|detail| &detail.agent))?;
        Some(AgentView { agent, detail })
    }
}
