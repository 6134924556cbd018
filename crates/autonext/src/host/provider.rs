use autonext_types::{MediaItem, NextItem};

use crate::session::SessionSnapshot;

/// Supplies the next playable item and records watch state.
pub trait NextItemProvider: Send + Sync {
    /// Resolves what should play after the current file. `None` ends the
    /// cycle without a popup.
    fn next_item(&self, session: &SessionSnapshot) -> Option<NextItem>;
    /// Marks a finished item watched in the host library.
    fn mark_watched(&self, item: &MediaItem);
}
