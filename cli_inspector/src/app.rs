use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use client_core::{
    compute_layout, CampusLayout, ChannelEvent, ClientConfig, Clock, Command, CommandOutcome,
    RightPanel, SimulationStore, SystemClock, ToastQueue, CAMPUS_ZONES,
};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use sim_proto::{CreateAgentRequest, PresetEvent, SimulationUpdate};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{error, info, trace};

use crate::ui::{draw_ui, UiState, View};

const GENERATE_BATCH: usize = 5;

pub struct InspectorApp {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    ui_state: UiState,
    store: SimulationStore,
    toasts: ToastQueue,
    layout: CampusLayout,
    clock: SystemClock,
    channel_receiver: UnboundedReceiver<ChannelEvent>,
    command_sender: UnboundedSender<Command>,
    outcome_receiver: UnboundedReceiver<CommandOutcome>,
    log_receiver: Receiver<String>,
}

impl InspectorApp {
    pub fn new(
        config: &ClientConfig,
        channel_receiver: UnboundedReceiver<ChannelEvent>,
        command_sender: UnboundedSender<Command>,
        outcome_receiver: UnboundedReceiver<CommandOutcome>,
        log_receiver: Receiver<String>,
    ) -> Result<Self> {
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        crossterm::terminal::enable_raw_mode()?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(Self {
            terminal,
            ui_state: UiState::default(),
            store: SimulationStore::new(config.event_log_limit, config.chat_role.clone()),
            toasts: ToastQueue::new(config.toast_settings()),
            layout: CampusLayout::default(),
            clock: SystemClock::new(),
            channel_receiver,
            command_sender,
            outcome_receiver,
            log_receiver,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let mut last_draw: Option<Instant> = None;

        self.send(Command::FetchStatus);
        self.send(Command::FetchAgents);

        loop {
            while let Ok(event) = self.channel_receiver.try_recv() {
                self.on_channel_event(event);
            }

            while let Ok(outcome) = self.outcome_receiver.try_recv() {
                for follow_up in self.store.apply_outcome(outcome) {
                    self.send(follow_up);
                }
            }

            while let Ok(line) = self.log_receiver.try_recv() {
                self.ui_state.push_log(line);
            }

            let now = self.clock.now();
            self.toasts.observe(&self.store, now);
            self.toasts.advance(now);

            if last_draw.map_or(true, |at| at.elapsed() >= Duration::from_millis(33)) {
                self.layout = compute_layout(self.store.agents(), &CAMPUS_ZONES);
                self.ui_state.clamp_cursor(self.store.agents().len());
                let view = View {
                    state: &self.ui_state,
                    store: &self.store,
                    layout: &self.layout,
                    toasts: &self.toasts,
                };
                self.terminal.draw(|frame| draw_ui(frame, &view))?;
                last_draw = Some(Instant::now());
            }

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && !self.handle_key(key) {
                        break;
                    }
                }
            }
        }

        self.terminal.show_cursor()?;
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }

    fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connecting { attempt } => {
                self.ui_state.channel_status = format!("connecting (attempt {attempt})");
            }
            ChannelEvent::Opened => {
                self.store.set_connected(true);
                self.ui_state.channel_status = "connected".to_string();
            }
            ChannelEvent::Update(update) => {
                if let SimulationUpdate::Tick { time, .. } = &update {
                    trace!(tick = time.tick, "frame.tick");
                }
                self.store.apply_update(update);
            }
            ChannelEvent::Closed { reason, retry_in } => {
                self.store.set_connected(false);
                self.ui_state.channel_status = format!(
                    "disconnected ({reason}), retry in {:.1}s",
                    retry_in.as_secs_f32()
                );
            }
        }
    }

    /// Returns `false` when the inspector should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.ui_state.chat_input.is_some() {
            self.handle_chat_key(key.code);
            return true;
        }
        match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('s') => {
                let command = if self.store.running() {
                    Command::Stop
                } else {
                    Command::Start
                };
                self.dispatch(command);
            }
            KeyCode::Char('.') => self.dispatch(Command::Step),
            KeyCode::Char(']') | KeyCode::Char('}') => {
                self.dispatch(Command::SetSpeed(self.store.speed().faster()));
            }
            KeyCode::Char('[') | KeyCode::Char('{') => {
                self.dispatch(Command::SetSpeed(self.store.speed().slower()));
            }
            KeyCode::Char('g') => self.dispatch(Command::GenerateAgents(GENERATE_BATCH)),
            KeyCode::Char('n') => {
                let name = format!("New Student {}", self.store.agents().len() + 1);
                self.dispatch(Command::CreateAgent(CreateAgentRequest {
                    name,
                    e_i: 0.0,
                    s_n: 0.0,
                    t_f: 0.0,
                    j_p: 0.0,
                    ideal_career: None,
                    age: None,
                }));
            }
            KeyCode::Char('e') => self.dispatch(Command::TriggerEvent(PresetEvent::MidtermExam)),
            KeyCode::Char('c') => {
                self.dispatch(Command::TriggerEvent(PresetEvent::ClubRecruitment));
            }
            KeyCode::Char('m') => self.dispatch(Command::TriggerEvent(PresetEvent::SportsMeet)),
            KeyCode::Char('j') | KeyCode::Down => {
                self.ui_state.move_cursor(1, self.store.agents().len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.ui_state.move_cursor(-1, self.store.agents().len());
            }
            KeyCode::Enter => {
                let agent_id = self
                    .store
                    .agents()
                    .get(self.ui_state.cursor)
                    .map(|agent| agent.id.clone())
                    .filter(|id| self.store.selected_agent_id() != Some(id));
                if let Some(command) = self.store.select_agent(agent_id) {
                    self.send(command);
                }
            }
            KeyCode::Char('d') => {
                self.store.select_agent(None);
            }
            KeyCode::Tab => {
                let panel = self.store.toggle_panel();
                trace!(?panel, "panel.toggled");
            }
            KeyCode::Char('x') => {
                let newest = self.toasts.toasts().back().map(|toast| toast.id.clone());
                if let Some(id) = newest {
                    self.toasts.dismiss(&id, self.clock.now());
                }
            }
            KeyCode::Char('i') => {
                if self.store.selected_agent_id().is_some() {
                    if self.store.right_panel() != RightPanel::Chat {
                        self.store.toggle_panel();
                    }
                    self.ui_state.chat_input = Some(String::new());
                } else {
                    self.ui_state.push_log("Select an agent before chatting");
                }
            }
            _ => {}
        }
        true
    }

    fn handle_chat_key(&mut self, code: KeyCode) {
        let Some(input) = self.ui_state.chat_input.as_mut() else {
            return;
        };
        match code {
            KeyCode::Char(ch) => input.push(ch),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Esc => self.ui_state.chat_input = None,
            KeyCode::Tab => {
                let role = self.store.cycle_chat_role();
                trace!(role, "chat.role");
            }
            KeyCode::Enter => {
                if self.store.chat_pending() {
                    self.ui_state.push_log("Waiting for the previous reply");
                    return;
                }
                let message = self.ui_state.chat_input.take().unwrap_or_default();
                if let Some(command) = self.store.send_chat(&message) {
                    self.send(command);
                }
            }
            _ => {}
        }
    }

    /// Apply the optimistic local effect, then send.
    fn dispatch(&mut self, command: Command) {
        let command = self.store.issue(command);
        info!(command = command.name(), "command.sent");
        self.send(command);
    }

    fn send(&self, command: Command) {
        if let Err(err) = self.command_sender.send(command) {
            error!("Failed to queue command: {}", err);
        }
    }
}
