use thiserror::Error;

/// Failure taxonomy for calls into the hosting media player.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("no playback session is active")]
    NotPlaying,
    #[error("host capability unavailable: {0}")]
    Unavailable(&'static str),
    #[error("host call failed: {0}")]
    Backend(String),
}
