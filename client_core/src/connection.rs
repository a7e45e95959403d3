//! Push channel lifecycle.
//!
//! [`ConnectionManager`] is the synchronous state machine; [`run_channel`] is the
//! tokio driver that owns the socket and reports everything it sees as
//! [`ChannelEvent`]s.

use std::time::Duration;

use futures_util::StreamExt;
use sim_proto::{decode_update, SimulationUpdate};
use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::timer::{TimerHandle, Timers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    reconnect_delay: Duration,
    timers: Timers<()>,
    reconnect: Option<TimerHandle>,
    attempts: u64,
}

impl ConnectionManager {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_delay,
            timers: Timers::new(),
            reconnect: None,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Start a connection attempt. Returns the attempt number, or the current
    /// state when an attempt is already live.
    pub fn begin_connect(&mut self) -> Result<u64, ConnectionState> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => Err(self.state),
            ConnectionState::Disconnected => {
                self.cancel_reconnect();
                self.state = ConnectionState::Connecting;
                self.attempts += 1;
                Ok(self.attempts)
            }
        }
    }

    pub fn on_open(&mut self) {
        self.cancel_reconnect();
        self.state = ConnectionState::Connected;
    }

    /// Record a lost or failed connection and schedule the single retry.
    /// Returns the retry deadline.
    pub fn on_close(&mut self, now: Duration) -> Duration {
        self.cancel_reconnect();
        self.state = ConnectionState::Disconnected;
        let due = now + self.reconnect_delay;
        self.reconnect = Some(self.timers.schedule(due, ()));
        due
    }

    pub fn disconnect(&mut self) {
        self.cancel_reconnect();
        self.state = ConnectionState::Disconnected;
    }

    pub fn reconnect_due(&self) -> Option<Duration> {
        self.reconnect.and_then(|handle| self.timers.due_at(handle))
    }

    /// True once the pending reconnect deadline has passed. The deadline is
    /// consumed, so this reports `true` at most once per close.
    pub fn poll_reconnect(&mut self, now: Duration) -> bool {
        if self.timers.fire_due(now).is_empty() {
            return false;
        }
        self.reconnect = None;
        true
    }

    fn cancel_reconnect(&mut self) {
        if let Some(handle) = self.reconnect.take() {
            self.timers.cancel(handle);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connecting { attempt: u64 },
    Opened,
    Update(SimulationUpdate),
    Closed { reason: String, retry_in: Duration },
}

/// Decode one text frame. Malformed frames are logged and dropped.
pub fn decode_frame(text: &str) -> Option<SimulationUpdate> {
    match decode_update(text) {
        Ok(update) => {
            trace!(kind = update.kind(), "frame.decoded");
            Some(update)
        }
        Err(err) => {
            warn!(error = %err, bytes = text.len(), "frame.malformed");
            None
        }
    }
}

enum PumpEnd {
    Closed(String),
    Shutdown,
    ReceiverGone,
}

/// Keep a push channel to `url` open until `shutdown` flips to `true` or the
/// event receiver is dropped.
pub async fn run_channel(
    url: String,
    reconnect_delay: Duration,
    events: UnboundedSender<ChannelEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let clock = SystemClock::new();
    let mut manager = ConnectionManager::new(reconnect_delay);

    loop {
        if *shutdown.borrow() {
            break;
        }
        let attempt = match manager.begin_connect() {
            Ok(attempt) => attempt,
            Err(state) => {
                debug!(?state, "channel.connect_skipped");
                break;
            }
        };
        info!(%url, attempt, "channel.connecting");
        if events.send(ChannelEvent::Connecting { attempt }).is_err() {
            break;
        }

        let connected = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = shutdown.changed() => {
                manager.disconnect();
                break;
            }
        };

        let reason = match connected {
            Ok((stream, _response)) => {
                manager.on_open();
                info!(%url, "channel.opened");
                if events.send(ChannelEvent::Opened).is_err() {
                    break;
                }
                match pump_frames(stream, &events, &mut shutdown).await {
                    PumpEnd::Closed(reason) => reason,
                    PumpEnd::Shutdown | PumpEnd::ReceiverGone => {
                        manager.disconnect();
                        break;
                    }
                }
            }
            Err(err) => err.to_string(),
        };

        let due = manager.on_close(clock.now());
        let retry_in = due.saturating_sub(clock.now());
        warn!(%reason, retry_ms = retry_in.as_millis() as u64, "channel.closed");
        if events
            .send(ChannelEvent::Closed {
                reason,
                retry_in,
            })
            .is_err()
        {
            break;
        }

        loop {
            let wait = manager
                .reconnect_due()
                .map(|due| due.saturating_sub(clock.now()))
                .unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => {
                    manager.disconnect();
                    return;
                }
            }
            if manager.poll_reconnect(clock.now()) {
                break;
            }
        }
    }
    info!(%url, "channel.stopped");
}

async fn pump_frames<S>(
    mut stream: S,
    events: &UnboundedSender<ChannelEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> PumpEnd
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    loop {
        let next = tokio::select! {
            next = stream.next() => next,
            _ = shutdown.changed() => return PumpEnd::Shutdown,
        };
        match next {
            Some(Ok(Message::Text(text))) => {
                if let Some(update) = decode_frame(&text) {
                    if events.send(ChannelEvent::Update(update)).is_err() {
                        return PumpEnd::ReceiverGone;
                    }
                }
            }
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|frame| frame.reason.to_string())
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| "server closed the channel".to_string());
                return PumpEnd::Closed(reason);
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => return PumpEnd::Closed(err.to_string()),
            None => return PumpEnd::Closed("stream ended".to_string()),
        }
    }
}
