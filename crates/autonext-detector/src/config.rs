use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_HASH_SIZE: u32 = 16;
pub const DEFAULT_DETECT_LEVEL: f64 = 0.85;
pub const DEFAULT_MATCH_NUMBER: u32 = 5;
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
/// Minimum weighted agreement against the credits reference pattern.
pub const REFERENCE_MATCH_LEVEL: f64 = 0.25;
/// The decaying match threshold never drops below this.
pub const MIN_MATCH_NUMBER: u32 = 3;
/// Capture requests ask for the hash grid scaled by this factor so the box
/// filter averages real pixel blocks.
pub const CAPTURE_SCALE: u32 = 8;
pub(crate) const UNUSABLE_DECAY_TICKS: u32 = 10;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("hash size {0} must be greater than 8 and divisible by 4")]
    InvalidHashSize(u32),
    #[error("detect level {0} must be within (0, 1]")]
    InvalidDetectLevel(f64),
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Side length of the square fingerprint grid. Must be divisible by 4
    /// and greater than 8; the reference pattern margins depend on it.
    pub hash_size: u32,
    /// Minimum pairwise similarity for consecutive frames to count matched.
    pub detect_level: f64,
    /// Consecutive matches required before detection latches.
    pub match_number: u32,
    /// Poll interval of the detector worker.
    pub tick: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
            detect_level: DEFAULT_DETECT_LEVEL,
            match_number: DEFAULT_MATCH_NUMBER,
            tick: DEFAULT_TICK,
        }
    }
}

impl DetectorConfig {
    pub fn validated(self) -> Result<Self, DetectorError> {
        if self.hash_size <= 8 || self.hash_size % 4 != 0 {
            return Err(DetectorError::InvalidHashSize(self.hash_size));
        }
        if !(self.detect_level > 0.0 && self.detect_level <= 1.0) {
            return Err(DetectorError::InvalidDetectLevel(self.detect_level));
        }
        Ok(self)
    }

    pub fn capture_size(&self) -> (u32, u32) {
        (
            self.hash_size * CAPTURE_SCALE,
            self.hash_size * CAPTURE_SCALE,
        )
    }
}
