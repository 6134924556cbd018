use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use autonext_detector::FrameSource;
use autonext_types::{HostError, MediaItem, RawFrame};

/// Playback surface the engine drives. Implementations wrap the host player
/// and must tolerate calls from worker threads.
pub trait Player: Send + Sync {
    /// Absolute path of the file currently playing, if any.
    fn playing_file(&self) -> Option<PathBuf>;
    fn total_time(&self) -> Option<Duration>;
    fn current_time(&self) -> Option<Duration>;
    /// Playback speed multiplier, `1.0` for normal playback.
    fn speed(&self) -> f64;
    /// Grabs the current video frame scaled to the requested size.
    fn capture_frame(&self, width: u32, height: u32) -> Option<RawFrame>;
    /// Starts whatever is queued after the current file.
    fn request_play_next(&self);
    fn request_stop(&self);
    fn queue_item(&self, item: &MediaItem) -> Result<(), HostError>;
    fn dequeue_item(&self) -> Result<(), HostError>;
    /// True once the host is shutting down and workers should wind down.
    fn abort_requested(&self) -> bool;
}

/// Adapter that exposes a [`Player`] as a detector frame source.
pub struct PlayerFrameSource {
    player: Arc<dyn Player>,
}

impl PlayerFrameSource {
    pub fn new(player: Arc<dyn Player>) -> Self {
        Self { player }
    }
}

impl FrameSource for PlayerFrameSource {
    fn capture_frame(&self, width: u32, height: u32) -> Option<RawFrame> {
        self.player.capture_frame(width, height)
    }

    fn speed(&self) -> f64 {
        self.player.speed()
    }

    fn current_time(&self) -> Option<Duration> {
        self.player.current_time()
    }

    fn abort_requested(&self) -> bool {
        self.player.abort_requested()
    }
}
