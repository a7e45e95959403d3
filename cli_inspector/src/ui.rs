use std::collections::VecDeque;

use client_core::layout::{MAP_HEIGHT, MAP_WIDTH};
use client_core::store::AgentView;
use client_core::{
    CampusLayout, RightPanel, SimulationStore, Speaker, ToastPhase, ToastQueue, CAMPUS_ZONES,
};
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Rectangle};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

pub struct UiState {
    pub logs: VecDeque<String>,
    pub max_logs: usize,
    /// Highlighted row in the agent list.
    pub cursor: usize,
    pub chat_input: Option<String>,
    pub channel_status: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            logs: VecDeque::new(),
            max_logs: 8,
            cursor: 0,
            chat_input: None,
            channel_status: "disconnected".to_string(),
        }
    }
}

impl UiState {
    pub fn push_log<S: Into<String>>(&mut self, line: S) {
        let mut text: String = line.into();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        if text.is_empty() {
            return;
        }
        self.logs.push_front(text);
        while self.logs.len() > self.max_logs {
            self.logs.pop_back();
        }
    }

    pub fn move_cursor(&mut self, step: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let last = len as isize - 1;
        self.cursor = (self.cursor as isize + step).clamp(0, last) as usize;
    }

    pub fn clamp_cursor(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

pub struct View<'a> {
    pub state: &'a UiState,
    pub store: &'a SimulationStore,
    pub layout: &'a CampusLayout,
    pub toasts: &'a ToastQueue,
}

pub fn draw_ui(frame: &mut Frame, view: &View<'_>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(10),
        ])
        .split(frame.size());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(20),
            Constraint::Percentage(30),
        ])
        .split(rows[1]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(9)])
        .split(body[2]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[2]);

    draw_header(frame, rows[0], view);
    draw_map(frame, body[0], view);
    draw_agents(frame, body[1], view);
    match view.store.right_panel() {
        RightPanel::Detail => draw_detail(frame, right[0], view),
        RightPanel::Chat => draw_chat(frame, right[0], view),
    }
    draw_toasts(frame, right[1], view);
    draw_events(frame, bottom[0], view);
    draw_logs(frame, bottom[1], view.state);
}

fn inner(area: Rect) -> Rect {
    area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    })
}

fn key(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(Color::Yellow))
}

fn draw_header(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let store = view.store;
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Campus Simulation Inspector");
    let (link, link_color) = if store.connected() {
        ("Connected".to_string(), Color::Green)
    } else {
        (view.state.channel_status.clone(), Color::Red)
    };
    let (run, run_color) = if store.running() {
        ("running", Color::Green)
    } else {
        ("stopped", Color::DarkGray)
    };
    let line = Line::from(vec![
        Span::styled(link, Style::default().fg(link_color)),
        Span::raw(" | "),
        Span::styled(run, Style::default().fg(run_color)),
        Span::raw(format!(" | speed {}", store.speed().label())),
        Span::raw(format!(" | tick {} | {}", store.tick(), store.time().display())),
        Span::raw(" | "),
        key("s"),
        Span::raw(" start/stop "),
        key("."),
        Span::raw(" step "),
        key("[ ]"),
        Span::raw(" speed "),
        key("g"),
        Span::raw(" +5 "),
        key("n"),
        Span::raw(" new "),
        key("e c m"),
        Span::raw(" events "),
        key("enter d"),
        Span::raw(" select/clear "),
        key("tab"),
        Span::raw(" panel "),
        key("i"),
        Span::raw(" chat "),
        key("q"),
        Span::raw(" quit"),
    ]);
    let text = Paragraph::new(line).wrap(Wrap { trim: true });
    frame.render_widget(block, area);
    frame.render_widget(text, inner(area));
}

fn mbti_color(mbti: &str) -> Color {
    match mbti.chars().next() {
        Some('E') => Color::Cyan,
        Some('I') => Color::Magenta,
        _ => Color::Gray,
    }
}

fn draw_map(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let store = view.store;
    let layout = view.layout;
    let selected = store.selected_agent_id();
    // Map coordinates grow downwards; the canvas grows upwards.
    let flip = |y: f32| f64::from(MAP_HEIGHT - y);

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Campus"))
        .marker(Marker::Braille)
        .x_bounds([0.0, f64::from(MAP_WIDTH)])
        .y_bounds([0.0, f64::from(MAP_HEIGHT)])
        .paint(|ctx| {
            for zone in CAMPUS_ZONES.iter() {
                let bounds = zone.bounds;
                ctx.draw(&Rectangle {
                    x: f64::from(bounds.x),
                    y: flip(bounds.y + bounds.h),
                    width: f64::from(bounds.w),
                    height: f64::from(bounds.h),
                    color: Color::DarkGray,
                });
                let count = layout.occupancy_of(zone.id);
                let label = if count > 0 {
                    format!("{} ({count})", zone.name)
                } else {
                    zone.name.to_string()
                };
                ctx.print(
                    f64::from(bounds.x + 2.0),
                    flip(bounds.y + 4.0),
                    Span::styled(label, Style::default().fg(Color::DarkGray)),
                );
            }
            ctx.layer();
            for link in &layout.links {
                ctx.draw(&CanvasLine {
                    x1: f64::from(link.from.x),
                    y1: flip(link.from.y),
                    x2: f64::from(link.to.x),
                    y2: flip(link.to.y),
                    color: Color::Green,
                });
            }
            ctx.layer();
            for (agent, placement) in store.agents().iter().zip(&layout.placements) {
                let initial: String = agent.name.chars().take(1).collect();
                let mut style = Style::default().fg(mbti_color(&agent.mbti));
                if selected == Some(&agent.id) {
                    style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
                }
                ctx.print(
                    f64::from(placement.point.x),
                    flip(placement.point.y),
                    Span::styled(initial, style),
                );
            }
        });
    frame.render_widget(canvas, area);
}

fn draw_agents(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let store = view.store;
    let selected = store.selected_agent_id();
    let items: Vec<ListItem> = store
        .agents()
        .iter()
        .map(|agent| {
            let marker = if selected == Some(&agent.id) { "*" } else { " " };
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::styled(
                    format!("{:<4}", agent.mbti),
                    Style::default().fg(mbti_color(&agent.mbti)),
                ),
                Span::raw(format!(" {} ", agent.name)),
                Span::styled(agent.activity.as_str(), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    let title = format!("Agents ({})", items.len());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default();
    if !store.agents().is_empty() {
        list_state.select(Some(view.state.cursor));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn bar(label: &str, value: f32) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<11}"), Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{value:>6.2}")),
    ])
}

fn detail_lines(view: AgentView<'_>) -> Vec<Line<'static>> {
    let agent = view.agent;
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                agent.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}", agent.mbti)),
        ]),
        Line::from(format!("at {} | {}", agent.location, agent.activity)),
    ];
    let career = match view.detail.and_then(|detail| detail.career_clarity) {
        Some(clarity) => format!("career {} (clarity {clarity:.2})", agent.career),
        None => format!("career {}", agent.career),
    };
    lines.push(Line::from(career));
    if let Some(thought) = &agent.current_thought {
        lines.push(Line::from(Span::styled(
            format!("\"{thought}\""),
            Style::default().fg(Color::Cyan),
        )));
    }
    lines.push(bar("valence", agent.emotion.valence));
    lines.push(bar("arousal", agent.emotion.arousal));
    lines.push(bar("stress", agent.emotion.stress));

    let personality = view
        .detail
        .map(|detail| &detail.personality)
        .or(agent.personality.as_ref());
    if let Some(p) = personality {
        lines.push(Line::from(""));
        lines.push(bar("E-I", p.e_i));
        lines.push(bar("S-N", p.s_n));
        lines.push(bar("T-F", p.t_f));
        lines.push(bar("J-P", p.j_p));
        lines.push(bar("stability", p.stability));
    }
    let abilities = view
        .detail
        .map(|detail| detail.abilities)
        .or(agent.abilities);
    if let Some(a) = abilities {
        lines.push(Line::from(""));
        lines.push(bar("academic", a.academic));
        lines.push(bar("social", a.social));
        lines.push(bar("resilience", a.resilience));
        lines.push(bar("creativity", a.creativity));
    }
    lines
}

fn draw_detail(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let block = Block::default().borders(Borders::ALL).title("Detail");
    let lines = match view.store.selected_view() {
        Some(agent_view) => detail_lines(agent_view),
        None => vec![Line::from(Span::styled(
            "enter selects the highlighted agent",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner(area));
}

fn draw_chat(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let store = view.store;
    let title = match store.selected_agent() {
        Some(agent) => format!("Chat with {} as {}", agent.name, store.chat_role()),
        None => "Chat".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let mut lines: Vec<Line> = store
        .chat()
        .iter()
        .map(|line| {
            let (who, color) = match line.speaker {
                Speaker::User => ("you", Color::Yellow),
                Speaker::Agent => ("them", Color::Cyan),
            };
            let mut spans = vec![
                Span::styled(format!("{who}: "), Style::default().fg(color)),
                Span::raw(line.text.clone()),
            ];
            if let Some(impact) = &line.impact {
                spans.push(Span::styled(
                    format!(" [{impact}]"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        })
        .collect();
    if store.chat_pending() {
        lines.push(Line::from(Span::styled(
            "...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    match &view.state.chat_input {
        Some(input) => {
            lines.push(Line::from(vec![key("> "), Span::raw(input.clone())]));
            lines.push(Line::from(Span::styled(
                "tab role, esc cancel",
                Style::default().fg(Color::DarkGray),
            )));
        }
        None if store.selected_agent_id().is_some() => lines.push(Line::from(Span::styled(
            "i to type",
            Style::default().fg(Color::DarkGray),
        ))),
        None => {}
    }
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner(area));
}

fn draw_toasts(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let block = Block::default().borders(Borders::ALL).title("New Events");
    let lines: Vec<Line> = view
        .toasts
        .toasts()
        .iter()
        .rev()
        .map(|toast| {
            let style = match toast.phase {
                ToastPhase::Entering | ToastPhase::Exiting => {
                    Style::default().fg(Color::DarkGray)
                }
                ToastPhase::Steady => Style::default(),
            };
            Line::from(vec![
                Span::styled(
                    format!("T{} {} ", toast.event.timestamp.tick, toast.event.event_type.label()),
                    style.fg(Color::Yellow),
                ),
                Span::styled(toast.event.narrative.clone(), style),
            ])
        })
        .collect();
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner(area));
}

fn draw_events(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let block = Block::default().borders(Borders::ALL).title("Event Log");
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = view
        .store
        .event_log()
        .iter()
        .rev()
        .take(visible)
        .map(|event| {
            Line::from(vec![
                Span::styled(
                    format!("T{:>5} ", event.timestamp.tick),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("{:<12}", event.event_type.label()),
                    Style::default().fg(Color::Magenta),
                ),
                Span::raw(event.narrative.clone()),
            ])
        })
        .collect();
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(lines), inner(area));
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Logs");
    let lines: Vec<Line> = state
        .logs
        .iter()
        .map(|entry| Line::from(Span::raw(entry)))
        .collect();
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(paragraph, inner(area));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_log_trims_and_caps() {
        let mut state = UiState::default();
        state.push_log("\n");
        assert!(state.logs.is_empty());
        for n in 0..20 {
            state.push_log(format!("line {n}\n"));
        }
        assert_eq!(state.logs.len(), state.max_logs);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 19"));
    }

    #[test]
    fn cursor_stays_in_range() {
        let mut state = UiState::default();
        state.move_cursor(-1, 3);
        assert_eq!(state.cursor, 0);
        state.move_cursor(5, 3);
        assert_eq!(state.cursor, 2);
        state.clamp_cursor(1);
        assert_eq!(state.cursor, 0);
        state.move_cursor(1, 0);
        assert_eq!(state.cursor, 0);
    }
}
