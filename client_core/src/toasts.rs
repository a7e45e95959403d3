//! Transient notifications for newly arrived simulation events.
//!
//! Each toast moves `Entering -> Steady -> Exiting` and is then removed. Phase
//! changes are driven by timers owned by the queue; a timer whose toast has
//! already left the queue does nothing when it fires.

use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sim_proto::SimulationEvent;
use tracing::trace;

use crate::store::SimulationStore;
use crate::timer::Timers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Entering,
    Steady,
    Exiting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: String,
    pub event: SimulationEvent,
    pub phase: ToastPhase,
    pub created_at: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToastSettings {
    pub limit: usize,
    pub enter_delay: Duration,
    pub lifetime: Duration,
    pub exit_duration: Duration,
}

impl Default for ToastSettings {
    fn default() -> Self {
        Self {
            limit: 5,
            enter_delay: Duration::from_millis(16),
            lifetime: Duration::from_millis(6_000),
            exit_duration: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToastTimer {
    Settle,
    Expire,
    Remove,
}

#[derive(Debug)]
pub struct ToastQueue {
    settings: ToastSettings,
    toasts: VecDeque<Toast>,
    timers: Timers<(ToastTimer, String)>,
    baseline: u64,
    rng: SmallRng,
}

impl ToastQueue {
    pub fn new(settings: ToastSettings) -> Self {
        Self::with_rng(settings, SmallRng::from_entropy())
    }

    /// Deterministic synthetic ids, for tests.
    pub fn with_seed(settings: ToastSettings, seed: u64) -> Self {
        Self::with_rng(settings, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(settings: ToastSettings, rng: SmallRng) -> Self {
        Self {
            settings,
            toasts: VecDeque::new(),
            timers: Timers::new(),
            baseline: 0,
            rng,
        }
    }

    pub fn settings(&self) -> &ToastSettings {
        &self.settings
    }

    /// Oldest first.
    pub fn toasts(&self) -> &VecDeque<Toast> {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Enqueue toasts for events appended to `store` since the last call.
    /// Nothing happens while the simulation is stopped, and the first growth
    /// seen after a cold start or a reset is only recorded. Returns the number
    /// of toasts created.
    pub fn observe(&mut self, store: &SimulationStore, now: Duration) -> usize {
        if !store.running() {
            return 0;
        }
        let seen = store.events_seen();
        let previous = self.baseline;
        self.baseline = seen;
        if seen <= previous || previous == 0 {
            return 0;
        }

        let log = store.event_log();
        let fresh = ((seen - previous) as usize).min(log.len());
        let mut created = 0;
        for event in log.iter().skip(log.len() - fresh) {
            let id = match &event.id {
                Some(id) => id.clone(),
                None => format!("{}-{}", event.timestamp.tick, self.rng.gen::<u32>()),
            };
            self.timers
                .schedule(now + self.settings.enter_delay, (ToastTimer::Settle, id.clone()));
            self.timers
                .schedule(now + self.settings.lifetime, (ToastTimer::Expire, id.clone()));
            self.toasts.push_back(Toast {
                id,
                event: event.clone(),
                phase: ToastPhase::Entering,
                created_at: now,
            });
            created += 1;
        }
        while self.toasts.len() > self.settings.limit {
            self.toasts.pop_front();
        }
        trace!(created, queued = self.toasts.len(), "toasts.observed");
        created
    }

    /// Fire every timer due at or before `now`, including removals scheduled
    /// by expiries that fire in the same call.
    pub fn advance(&mut self, now: Duration) {
        loop {
            let fired = self.timers.fire_due(now);
            if fired.is_empty() {
                break;
            }
            for (due, (timer, id)) in fired {
                match timer {
                    ToastTimer::Settle => {
                        if let Some(toast) = self.find_mut(&id) {
                            if toast.phase == ToastPhase::Entering {
                                toast.phase = ToastPhase::Steady;
                            }
                        }
                    }
                    ToastTimer::Expire => {
                        self.begin_exit(&id, due);
                    }
                    ToastTimer::Remove => {
                        self.toasts.retain(|toast| toast.id != id);
                    }
                }
            }
        }
    }

    /// User dismissal. Returns `false` for unknown or already exiting toasts.
    pub fn dismiss(&mut self, id: &str, now: Duration) -> bool {
        self.begin_exit(id, now)
    }

    fn begin_exit(&mut self, id: &str, at: Duration) -> bool {
        let exit = self.settings.exit_duration;
        let Some(toast) = self.find_mut(id) else {
            return false;
        };
        if toast.phase == ToastPhase::Exiting {
            return false;
        }
        toast.phase = ToastPhase::Exiting;
        self.timers
            .schedule(at + exit, (ToastTimer::Remove, id.to_string()));
        true
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Toast> {
        self.toasts.iter_mut().find(|toast| toast.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_proto::{EventType, SimulationTime, SimulationUpdate, WorldSnapshot};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn frame(tick: u64, ids: &[&str]) -> SimulationUpdate {
        let time = SimulationTime {
            tick,
            ..SimulationTime::default()
        };
        SimulationUpdate::Tick {
            time: time.clone(),
            snapshot: WorldSnapshot::default(),
            agents: Vec::new(),
            events: ids
                .iter()
                .map(|id| SimulationEvent {
                    id: (!id.is_empty()).then(|| id.to_string()),
                    event_type: EventType::Academic,
                    timestamp: time.clone(),
                    involved_agents: Vec::new(),
                    narrative: format!("narrative {id}"),
                    intensity: 0.4,
                })
                .collect(),
        }
    }

    fn running_store() -> SimulationStore {
        let mut store = SimulationStore::default();
        store.apply_update(SimulationUpdate::Started);
        store.apply_update(frame(1, &["seed"]));
        store
    }

    fn primed(store: &SimulationStore) -> ToastQueue {
        let mut queue = ToastQueue::with_seed(ToastSettings::default(), 7);
        assert_eq!(queue.observe(store, Duration::ZERO), 0);
        queue
    }

    #[test]
    fn first_growth_is_suppressed() {
        let store = running_store();
        let queue = primed(&store);
        assert!(queue.is_empty());
    }

    #[test]
    fn stopped_simulation_creates_nothing() {
        let mut store = running_store();
        let mut queue = primed(&store);
        store.apply_update(SimulationUpdate::Stopped);
        store.apply_update(frame(2, &["a"]));
        assert_eq!(queue.observe(&store, ms(10)), 0);

        // Events from the pause surface once running again.
        store.apply_update(SimulationUpdate::Started);
        assert_eq!(queue.observe(&store, ms(20)), 1);
        assert_eq!(queue.toasts()[0].id, "a");
    }

    #[test]
    fn queue_keeps_latest_five() {
        let mut store = running_store();
        let mut queue = primed(&store);
        store.apply_update(frame(2, &["a", "b", "c", "d", "e", "f", "g"]));
        assert_eq!(queue.observe(&store, ms(0)), 7);
        let ids: Vec<_> = queue.toasts().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["c", "d", "e", "f", "g"]);
    }

    #[test]
    fn lifecycle_follows_timers() {
        let mut store = running_store();
        let mut queue = primed(&store);
        store.apply_update(frame(2, &["a"]));
        queue.observe(&store, ms(1_000));
        assert_eq!(queue.toasts()[0].phase, ToastPhase::Entering);

        queue.advance(ms(1_049));
        assert_eq!(queue.toasts()[0].phase, ToastPhase::Steady);

        queue.advance(ms(6_999));
        assert_eq!(queue.toasts()[0].phase, ToastPhase::Steady);
        queue.advance(ms(7_000));
        assert_eq!(queue.toasts()[0].phase, ToastPhase::Exiting);
        queue.advance(ms(7_300));
        assert!(queue.is_empty());
    }

    #[test]
    fn late_advance_still_removes_on_time() {
        let mut store = running_store();
        let mut queue = primed(&store);
        store.apply_update(frame(2, &["a"]));
        queue.observe(&store, ms(0));
        queue.advance(ms(6_300));
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn dismissal_removes_within_exit_duration() {
        let mut store = running_store();
        let mut queue = primed(&store);
        store.apply_update(frame(2, &["a", "b"]));
        queue.observe(&store, ms(0));
        queue.advance(ms(100));

        assert!(queue.dismiss("a", ms(100)));
        assert!(!queue.dismiss("a", ms(150)));
        assert!(!queue.dismiss("missing", ms(150)));
        queue.advance(ms(399));
        assert_eq!(queue.toasts().len(), 2);
        queue.advance(ms(400));
        let ids: Vec<_> = queue.toasts().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["b"]);

        // The expiry timer of the dismissed toast is a no-op.
        queue.advance(ms(6_000));
        assert_eq!(queue.toasts()[0].phase, ToastPhase::Exiting);
        queue.advance(ms(6_300));
        assert!(queue.is_empty());
    }

    #[test]
    fn events_without_id_get_synthetic_ids() {
        let mut store = running_store();
        let mut queue = primed(&store);
        store.apply_update(frame(9, &["", ""]));
        queue.observe(&store, ms(0));
        let ids: Vec<_> = queue.toasts().iter().map(|t| t.id.clone()).collect();
        assert!(ids.iter().all(|id| id.starts_with("9-")));
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn growth_past_log_cap_is_still_seen() {
        let mut store = SimulationStore::new(2, "teacher");
        store.apply_update(SimulationUpdate::Started);
        store.apply_update(frame(1, &["x", "y"]));
        let mut queue = primed(&store);
        store.apply_update(frame(2, &["z"]));
        assert_eq!(queue.observe(&store, ms(0)), 1);
        assert_eq!(queue.toasts()[0].id, "z");
    }
}
