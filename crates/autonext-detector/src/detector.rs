use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use autonext_hash::{Fingerprint, ImageHasher, similarity, weighted_similarity};

use crate::config::{DetectorConfig, DetectorError};
use crate::reference::reference_pattern;
use crate::source::FrameSource;
use crate::window::DetectionWindow;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// End-credits detector.
///
/// While running, a worker task captures a frame per tick, fingerprints it,
/// and latches detection once enough consecutive frames stay static while
/// resembling the credits reference pattern. The latch and its timestamp
/// survive a stop and are only cleared by [`CreditsDetector::reset`].
pub struct CreditsDetector {
    config: DetectorConfig,
    source: Arc<dyn FrameSource>,
    window: Arc<Mutex<DetectionWindow>>,
    running: Arc<AtomicBool>,
    stop_tx: Option<watch::Sender<bool>>,
    worker: Option<JoinHandle<()>>,
}

impl CreditsDetector {
    pub fn new(
        config: DetectorConfig,
        source: Arc<dyn FrameSource>,
    ) -> Result<Self, DetectorError> {
        let config = config.validated()?;
        let window = DetectionWindow::new(config.match_number);
        Ok(Self {
            config,
            source,
            window: Arc::new(Mutex::new(window)),
            running: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            worker: None,
        })
    }

    /// Starts the capture worker. Calling this while already running is a
    /// no-op; after a stop the detector can be started again.
    pub fn start(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            return;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = DetectorWorker {
            hasher: ImageHasher::square(self.config.hash_size),
            reference: reference_pattern(self.config.hash_size, self.config.hash_size),
            config: self.config.clone(),
            source: Arc::clone(&self.source),
            window: Arc::clone(&self.window),
            running: Arc::clone(&self.running),
        };
        self.running.store(true, Ordering::SeqCst);
        self.stop_tx = Some(stop_tx);
        self.worker = Some(tokio::spawn(worker.run(stop_rx)));
    }

    /// Signals the worker to stop and waits for it to exit. The worker is
    /// never interrupted mid-frame; if it fails to stop within
    /// [`STOP_TIMEOUT`] (a host call that never returns), it is aborted.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        match tokio::time::timeout(STOP_TIMEOUT, &mut worker).await {
            Ok(_) => {}
            Err(_) => {
                warn!("credits detector worker did not stop within {STOP_TIMEOUT:?}, aborting it");
                worker.abort();
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Clears the detection latch and all rolling state.
    pub fn reset(&self) {
        self.lock_window().reset(self.config.match_number);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn detected(&self) -> bool {
        self.lock_window().detected()
    }

    /// Playback position at the moment detection latched.
    pub fn detected_at(&self) -> Option<Duration> {
        self.lock_window().detected_at()
    }

    pub fn match_count(&self) -> u32 {
        self.lock_window().match_count()
    }

    pub fn match_threshold(&self) -> u32 {
        self.lock_window().match_threshold()
    }

    fn lock_window(&self) -> MutexGuard<'_, DetectionWindow> {
        self.window.lock().expect("detection window mutex poisoned")
    }
}

struct DetectorWorker {
    hasher: ImageHasher,
    reference: Fingerprint,
    config: DetectorConfig,
    source: Arc<dyn FrameSource>,
    window: Arc<Mutex<DetectionWindow>>,
    running: Arc<AtomicBool>,
}

impl DetectorWorker {
    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(tick = ?self.config.tick, "credits detector worker started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.source.abort_requested() {
                        debug!("host abort observed, detector worker exiting");
                        break;
                    }
                    self.handle_tick().await;
                }
                _ = stop_rx.changed() => break,
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    async fn handle_tick(&self) {
        if self.source.speed() != 1.0 {
            self.lock_window().record_unusable();
            return;
        }

        let (width, height) = self.config.capture_size();
        let source = Arc::clone(&self.source);
        let frame = tokio::task::spawn_blocking(move || source.capture_frame(width, height))
            .await
            .ok()
            .flatten();
        let Some(frame) = frame else {
            self.lock_window().record_unusable();
            return;
        };

        let luma = frame.luma();
        let print = match self.hasher.fingerprint(&luma, frame.width(), frame.height()) {
            Ok(print) => print,
            Err(err) => {
                debug!("frame fingerprint failed: {err}");
                self.lock_window().record_unusable();
                return;
            }
        };

        let mut window = self.lock_window();
        window.push(print);
        let (Some(previous), Some(current)) = (window.previous(), window.current()) else {
            // First usable frame, nothing to compare against yet.
            return;
        };
        let Ok(pairwise) = similarity(previous, current) else {
            return;
        };
        let Ok(reference_score) = weighted_similarity(&self.reference, current) else {
            return;
        };
        if window.score(pairwise, reference_score, self.config.detect_level) {
            window.note_detection(self.source.current_time());
            info!(pairwise, reference_score, "credits detected");
        }
    }

    fn lock_window(&self) -> MutexGuard<'_, DetectionWindow> {
        self.window.lock().expect("detection window mutex poisoned")
    }
}
