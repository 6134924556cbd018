use std::time::Duration;

use autonext_types::RawFrame;

/// Host-side frame access for the detector worker.
///
/// Implementations are polled from a worker task and must tolerate calls
/// after playback already stopped. `capture_frame` returning `None` is the
/// normal failure path and never fatal; the worker counts it as a tick
/// without a usable frame.
pub trait FrameSource: Send + Sync {
    /// Best-effort screenshot of the playing video, scaled to roughly
    /// `width` x `height`. Hosts may hand back a different size.
    fn capture_frame(&self, width: u32, height: u32) -> Option<RawFrame>;

    /// Current playback speed, 1.0 for normal playback.
    fn speed(&self) -> f64;

    /// Current playback position, `None` when nothing is playing.
    fn current_time(&self) -> Option<Duration>;

    /// Host shutdown flag, checked every tick.
    fn abort_requested(&self) -> bool;
}
