//! Client-side synchronization layer for the campus simulation dashboard.
//!
//! A [`SimulationStore`] mirrors the remote simulation. It is fed by the push
//! channel driver in [`connection`] and by REST command outcomes from
//! [`ApiClient`]. Presentation data ([`layout`], [`toasts`]) is derived from the
//! store on every frame. All time-dependent state takes `now` explicitly so it
//! can be driven by a [`ManualClock`] in tests.

pub mod api;
pub mod clock;
pub mod config;
pub mod connection;
mod error;
pub mod layout;
pub mod store;
pub mod timer;
pub mod toasts;

pub use api::ApiClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_client_config, ClientConfig, ConfigError, CONFIG_ENV_VAR};
pub use connection::{run_channel, ChannelEvent, ConnectionManager, ConnectionState};
pub use error::ClientError;
pub use layout::{compute_layout, CampusLayout, Placement, Point, SocialLink, Zone, CAMPUS_ZONES};
pub use store::{
    ChatLine, Command, CommandOutcome, CommandReply, RightPanel, SimulationStore, Speaker,
    CHAT_ROLES,
};
pub use timer::{TimerHandle, Timers};
pub use toasts::{Toast, ToastPhase, ToastQueue, ToastSettings};
