//! Playback tracking, credits detection scheduling and the next-episode
//! popup decision loop.

pub mod events;
pub mod host;
pub mod playback;
pub mod session;
pub mod settings;
pub mod tracker;

pub use events::{SessionEvent, SessionEvents};
pub use host::{NextItemProvider, Player, PlayerFrameSource, Popup, PopupFactory, PopupStyle};
pub use playback::{PlaybackDecisionEngine, Resolution};
pub use session::{SessionHandle, SessionSnapshot};
pub use settings::{ConfigError, EffectiveSettings, SettingsOverrides, resolve_settings};
pub use tracker::{TrackingScheduler, TrackingSignals};

#[cfg(test)]
mod tests;
