//! Polling end-credits detection over perceptual fingerprints.

pub mod config;
pub mod detector;
pub mod source;
pub mod window;

mod reference;

pub use config::{
    CAPTURE_SCALE, DEFAULT_DETECT_LEVEL, DEFAULT_HASH_SIZE, DEFAULT_MATCH_NUMBER, DEFAULT_TICK,
    DetectorConfig, DetectorError, MIN_MATCH_NUMBER, REFERENCE_MATCH_LEVEL,
};
pub use detector::CreditsDetector;
pub use source::FrameSource;
pub use window::DetectionWindow;
