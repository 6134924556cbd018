use std::fmt;
use std::time::Duration;

use autonext_types::NextItem;

/// Which prompt the popup renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupStyle {
    /// Countdown to the next episode.
    UpNext,
    /// Confirmation prompt shown after several unattended auto-plays.
    StillWatching,
}

impl PopupStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PopupStyle::UpNext => "up-next",
            PopupStyle::StillWatching => "still-watching",
        }
    }
}

impl fmt::Display for PopupStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live popup owned by the host UI. The decision engine polls the `is_*`
/// accessors every tick; implementations surface user input through them.
pub trait Popup: Send + Sync {
    fn show(&self);
    /// Updates the countdown with the time left before the window resolves.
    fn update_progress(&self, remaining: Duration);
    /// False once the host has torn the window down on its own.
    fn is_alive(&self) -> bool;
    fn is_cancelled(&self) -> bool;
    fn is_play_now(&self) -> bool;
    fn is_stopped(&self) -> bool;
    fn is_shuffle_on(&self) -> bool;
    fn close(&self);
}

/// Builds popups on demand so the engine never carries UI objects across
/// episodes.
pub trait PopupFactory: Send + Sync {
    fn build(&self, style: PopupStyle, next: &NextItem) -> Box<dyn Popup>;
}
