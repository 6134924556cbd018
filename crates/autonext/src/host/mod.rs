//! Traits the embedding host implements to wire the engine to its player,
//! UI and library.

mod player;
mod popup;
mod provider;

pub use player::{Player, PlayerFrameSource};
pub use popup::{Popup, PopupFactory, PopupStyle};
pub use provider::NextItemProvider;
