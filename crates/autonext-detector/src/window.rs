use std::time::Duration;

use autonext_hash::Fingerprint;

use crate::config::{MIN_MATCH_NUMBER, REFERENCE_MATCH_LEVEL, UNUSABLE_DECAY_TICKS};

/// Rolling per-run detection state: the two newest fingerprints, the current
/// match streak, and the decaying match threshold.
#[derive(Debug)]
pub struct DetectionWindow {
    previous: Option<Fingerprint>,
    current: Option<Fingerprint>,
    match_count: u32,
    match_threshold: u32,
    unusable_ticks: u32,
    detected: bool,
    detected_at: Option<Duration>,
}

impl DetectionWindow {
    pub fn new(match_threshold: u32) -> Self {
        Self {
            previous: None,
            current: None,
            match_count: 0,
            match_threshold,
            unusable_ticks: 0,
            detected: false,
            detected_at: None,
        }
    }

    pub fn push(&mut self, print: Fingerprint) {
        self.previous = self.current.take();
        self.current = Some(print);
    }

    pub fn previous(&self) -> Option<&Fingerprint> {
        self.previous.as_ref()
    }

    pub fn current(&self) -> Option<&Fingerprint> {
        self.current.as_ref()
    }

    /// Counts a tick that produced no usable frame. Every
    /// [`UNUSABLE_DECAY_TICKS`] of those lower the match threshold by one,
    /// floored at [`MIN_MATCH_NUMBER`], so long stretches of paused or
    /// fast-forwarded playback still leave detection a chance.
    pub fn record_unusable(&mut self) {
        self.unusable_ticks += 1;
        if self.unusable_ticks % UNUSABLE_DECAY_TICKS == 0
            && self.match_threshold > MIN_MATCH_NUMBER
        {
            self.match_threshold -= 1;
        }
    }

    /// Applies one scored comparison. Returns true when this call latched
    /// detection; the latch stays set until [`DetectionWindow::reset`].
    pub fn score(&mut self, pairwise: f64, reference: f64, detect_level: f64) -> bool {
        if pairwise >= detect_level && reference >= REFERENCE_MATCH_LEVEL {
            self.match_count += 1;
        } else {
            self.match_count = 0;
        }
        if !self.detected && self.match_count >= self.match_threshold {
            self.detected = true;
            return true;
        }
        false
    }

    /// Records the playback position the latch fired at. Only the first
    /// recording sticks.
    pub fn note_detection(&mut self, at: Option<Duration>) {
        if self.detected_at.is_none() {
            self.detected_at = at;
        }
    }

    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn detected_at(&self) -> Option<Duration> {
        self.detected_at
    }

    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    pub fn match_threshold(&self) -> u32 {
        self.match_threshold
    }

    pub fn reset(&mut self, match_threshold: u32) {
        *self = Self::new(match_threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_latches_at_threshold() {
        let mut window = DetectionWindow::new(3);
        assert!(!window.score(0.9, 0.5, 0.85));
        assert!(!window.score(0.9, 0.5, 0.85));
        assert!(window.score(0.9, 0.5, 0.85));
        // Latched; further scores never report a fresh detection.
        assert!(!window.score(0.9, 0.5, 0.85));
        assert!(window.detected());
    }

    #[test]
    fn weak_pairwise_match_resets_streak() {
        let mut window = DetectionWindow::new(3);
        window.score(0.9, 0.5, 0.85);
        window.score(0.9, 0.5, 0.85);
        window.score(0.5, 0.5, 0.85);
        assert_eq!(window.match_count(), 0);
        assert!(!window.detected());
    }

    #[test]
    fn weak_reference_match_resets_streak() {
        let mut window = DetectionWindow::new(3);
        window.score(0.9, 0.5, 0.85);
        window.score(0.95, 0.1, 0.85);
        assert_eq!(window.match_count(), 0);
    }

    #[test]
    fn threshold_decays_to_floor() {
        let mut window = DetectionWindow::new(5);
        for _ in 0..10 {
            window.record_unusable();
        }
        assert_eq!(window.match_threshold(), 4);
        for _ in 0..60 {
            window.record_unusable();
        }
        assert_eq!(window.match_threshold(), MIN_MATCH_NUMBER);
    }

    #[test]
    fn first_detection_time_sticks() {
        let mut window = DetectionWindow::new(1);
        window.score(0.9, 0.5, 0.85);
        window.note_detection(Some(Duration::from_secs(100)));
        window.note_detection(Some(Duration::from_secs(200)));
        assert_eq!(window.detected_at(), Some(Duration::from_secs(100)));
    }

    #[test]
    fn reset_restores_a_fresh_window() {
        let mut window = DetectionWindow::new(1);
        window.push(Fingerprint::zeroed(16, 16));
        window.score(0.9, 0.5, 0.85);
        window.note_detection(Some(Duration::from_secs(7)));
        window.record_unusable();
        window.reset(5);
        assert!(!window.detected());
        assert_eq!(window.detected_at(), None);
        assert_eq!(window.match_count(), 0);
        assert_eq!(window.match_threshold(), 5);
        assert!(window.current().is_none());
    }
}
