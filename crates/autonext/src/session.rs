use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use autonext_types::MediaItem;

use crate::settings::EffectiveSettings;

/// Point-in-time copy of the tracked playback state.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub file: Option<PathBuf>,
    pub item: Option<MediaItem>,
    pub total_time: Option<Duration>,
    /// Offset at which the popup opens. Cue-supplied or derived from the
    /// popup duration.
    pub popup_time: Option<Duration>,
    /// Offset at which credits detection starts. `None` when detection is
    /// disabled.
    pub detect_time: Option<Duration>,
    /// Whether `popup_time` came from an external cue point.
    pub popup_cue: bool,
    pub played_in_a_row: u32,
    pub played_limit: u32,
    pub shuffle_on: bool,
    pub tracking: bool,
    pub queued: bool,
    pub playing_next: bool,
}

#[derive(Default)]
struct SessionStore {
    file: Option<PathBuf>,
    item: Option<MediaItem>,
    total_time: Option<Duration>,
    popup_time: Option<Duration>,
    detect_time: Option<Duration>,
    popup_cue: bool,
    played_in_a_row: u32,
    played_limit: u32,
    shuffle_on: bool,
    tracking: bool,
    queued: bool,
    playing_next: bool,
}

/// Shared handle over the playback session state. Clones observe the same
/// store; the scheduler, the decision engine and the host all hold one.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionStore>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms tracking for a freshly started file. The consecutive-play counter
    /// survives re-arming so the still-watching prompt can build up across
    /// episodes; everything else is reset.
    pub fn arm(
        &self,
        file: PathBuf,
        item: Option<MediaItem>,
        total_time: Duration,
        cue: Option<Duration>,
        settings: &EffectiveSettings,
    ) {
        let mut store = self.inner.lock();
        store.file = Some(file);
        store.item = item;
        store.total_time = Some(total_time);
        store.popup_cue = cue.is_some();
        store.popup_time = Some(
            cue.unwrap_or_else(|| total_time.saturating_sub(settings.playback.popup_duration)),
        );
        store.detect_time = settings
            .detection
            .period
            .map(|period| total_time.saturating_sub(period));
        store.played_limit = settings.playback.played_limit;
        if store.played_in_a_row == 0 {
            store.played_in_a_row = 1;
        }
        store.tracking = true;
        store.queued = false;
        store.playing_next = false;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let store = self.inner.lock();
        SessionSnapshot {
            file: store.file.clone(),
            item: store.item.clone(),
            total_time: store.total_time,
            popup_time: store.popup_time,
            detect_time: store.detect_time,
            popup_cue: store.popup_cue,
            played_in_a_row: store.played_in_a_row,
            played_limit: store.played_limit,
            shuffle_on: store.shuffle_on,
            tracking: store.tracking,
            queued: store.queued,
            playing_next: store.playing_next,
        }
    }

    pub fn tracking_enabled(&self) -> bool {
        self.inner.lock().tracking
    }

    pub fn set_tracking(&self, enabled: bool) {
        self.inner.lock().tracking = enabled;
    }

    /// Moves the popup offset. Detection results land here, so a cue-derived
    /// offset stops being one.
    pub fn set_popup_time(&self, at: Duration) {
        let mut store = self.inner.lock();
        store.popup_time = Some(at);
        store.popup_cue = false;
    }

    pub fn increment_played(&self) {
        let mut store = self.inner.lock();
        store.played_in_a_row = store.played_in_a_row.saturating_add(1);
    }

    pub fn reset_played(&self) {
        self.inner.lock().played_in_a_row = 1;
    }

    pub fn set_queued(&self, queued: bool) {
        self.inner.lock().queued = queued;
    }

    pub fn set_playing_next(&self, playing_next: bool) {
        self.inner.lock().playing_next = playing_next;
    }

    pub fn set_shuffle(&self, shuffle_on: bool) {
        self.inner.lock().shuffle_on = shuffle_on;
    }

    /// Clears everything, the consecutive-play counter included. For host
    /// teardown between shows.
    pub fn reset(&self) {
        *self.inner.lock() = SessionStore::default();
    }
}
