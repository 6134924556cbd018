use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use autonext_detector::{CreditsDetector, DetectorError};

use crate::events::{SessionEvent, SessionEvents};
use crate::host::{NextItemProvider, Player, PlayerFrameSource, PopupFactory};
use crate::playback::{PlaybackDecisionEngine, Resolution};
use crate::session::SessionHandle;
use crate::settings::EffectiveSettings;

/// Poll ticks granted to the worker before `stop` aborts it.
const STOP_TICKS: u32 = 5;

/// Flags shared between the scheduler worker, the decision engine and the
/// host. `stop` asks the worker to wind down; `terminate` additionally marks
/// a host shutdown.
#[derive(Default)]
pub struct TrackingSignals {
    running: AtomicBool,
    stop: AtomicBool,
    terminate: AtomicBool,
}

impl TrackingSignals {
    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn terminate_requested(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    fn begin(&self) -> bool {
        !self.running.swap(true, Ordering::SeqCst)
    }

    fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn request_stop(&self, terminate: bool) {
        self.stop.store(true, Ordering::SeqCst);
        if terminate {
            self.terminate.store(true, Ordering::SeqCst);
        }
    }

    fn clear(&self) {
        self.stop.store(false, Ordering::SeqCst);
        self.terminate.store(false, Ordering::SeqCst);
    }
}

struct SchedulerInner {
    player: Arc<dyn Player>,
    provider: Arc<dyn NextItemProvider>,
    popups: Arc<dyn PopupFactory>,
    session: SessionHandle,
    events: SessionEvents,
    settings: Arc<EffectiveSettings>,
    signals: Arc<TrackingSignals>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the per-file tracking worker. The host arms the session when a file
/// starts, calls [`TrackingScheduler::start`], and stops the scheduler on
/// playback end or shutdown.
#[derive(Clone)]
pub struct TrackingScheduler {
    inner: Arc<SchedulerInner>,
}

impl TrackingScheduler {
    pub fn new(
        player: Arc<dyn Player>,
        provider: Arc<dyn NextItemProvider>,
        popups: Arc<dyn PopupFactory>,
        session: SessionHandle,
        events: SessionEvents,
        settings: Arc<EffectiveSettings>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                player,
                provider,
                popups,
                session,
                events,
                settings,
                signals: Arc::new(TrackingSignals::default()),
                stop_tx: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn signals(&self) -> Arc<TrackingSignals> {
        Arc::clone(&self.inner.signals)
    }

    pub fn is_running(&self) -> bool {
        self.inner.signals.running()
    }

    /// Spawns the tracking worker. A no-op while one is already running;
    /// after the worker exits the scheduler can be started again.
    pub fn start(&self) {
        let inner = &self.inner;
        if !inner.signals.begin() {
            debug!("tracking already running");
            return;
        }
        inner.signals.clear();
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = TrackerWorker {
            player: Arc::clone(&inner.player),
            provider: Arc::clone(&inner.provider),
            popups: Arc::clone(&inner.popups),
            session: inner.session.clone(),
            events: inner.events.clone(),
            settings: Arc::clone(&inner.settings),
            signals: Arc::clone(&inner.signals),
        };
        *inner.stop_tx.lock() = Some(stop_tx);
        *inner.worker.lock() = Some(tokio::spawn(worker.run(stop_rx)));
        info!("tracking started");
    }

    /// Signals the worker to stop and waits for it to exit. With `terminate`
    /// set the popup loop aborts as well, for host shutdown.
    pub async fn stop(&self, terminate: bool) {
        self.inner.signals.request_stop(terminate);
        if let Some(stop_tx) = self.inner.stop_tx.lock().take() {
            let _ = stop_tx.send(true);
        }
        let worker = self.inner.worker.lock().take();
        let Some(mut worker) = worker else {
            return;
        };
        let grace = self.inner.settings.detection.tick * STOP_TICKS;
        match tokio::time::timeout(grace, &mut worker).await {
            Ok(_) => {}
            Err(_) => {
                warn!("tracking worker did not stop within {grace:?}, aborting it");
                worker.abort();
            }
        }
    }
}

struct TrackerWorker {
    player: Arc<dyn Player>,
    provider: Arc<dyn NextItemProvider>,
    popups: Arc<dyn PopupFactory>,
    session: SessionHandle,
    events: SessionEvents,
    settings: Arc<EffectiveSettings>,
    signals: Arc<TrackingSignals>,
}

impl TrackerWorker {
    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let tick = self.settings.detection.tick;
        let engine = PlaybackDecisionEngine::new(
            Arc::clone(&self.player),
            Arc::clone(&self.provider),
            Arc::clone(&self.popups),
            self.session.clone(),
            self.events.clone(),
            Arc::clone(&self.settings),
            Arc::clone(&self.signals),
        );
        let mut detector: Option<CreditsDetector> = None;
        let mut credits_detected = false;
        let mut detector_failed = false;
        debug!(tick = ?tick, "tracking worker started");

        loop {
            if self.signals.stop_requested() || self.player.abort_requested() {
                break;
            }
            let snapshot = self.session.snapshot();
            if !snapshot.tracking {
                break;
            }
            if self.player.playing_file().as_deref() != snapshot.file.as_deref() {
                info!("tracked file no longer playing");
                self.session.set_tracking(false);
                break;
            }

            let mut wait = tick;
            if let Some(position) = self.player.current_time() {
                if let Some(detect_time) = snapshot.detect_time
                    && !credits_detected
                    && !detector_failed
                    && detector.is_none()
                    && position >= detect_time
                {
                    match self.start_detector() {
                        Ok(started) => {
                            info!(seconds = position.as_secs(), "credits detection started");
                            detector = Some(started);
                        }
                        Err(err) => {
                            warn!(error = %err, "credits detection unavailable");
                            detector_failed = true;
                        }
                    }
                }

                if let Some(det) = detector.as_mut()
                    && !credits_detected
                    && det.detected()
                {
                    credits_detected = true;
                    let at = det.detected_at().unwrap_or(position);
                    self.session.set_popup_time(at);
                    info!(seconds = at.as_secs(), "credits detected, popup rescheduled");
                    det.stop().await;
                }

                // Re-read the offset: a detection above may just have moved it.
                if let Some(popup_time) = self.session.snapshot().popup_time {
                    if position >= popup_time {
                        self.session.set_tracking(false);
                        if let Some(mut det) = detector.take() {
                            det.stop().await;
                        }

                        let resolution = loop {
                            let resolution = engine.run().await;
                            if resolution == Resolution::ShuffleRestart {
                                debug!("shuffle toggled, re-rolling the next item");
                                continue;
                            }
                            break resolution;
                        };

                        if resolution == Resolution::Cancelled
                            && credits_detected
                            && !self.session.snapshot().playing_next
                        {
                            // The user dismissed a detection-driven popup.
                            // Park the offset past the end of the file and
                            // let a fresh detection bring it back.
                            if let Some(total) = snapshot.total_time {
                                self.session.set_popup_time(total.saturating_add(tick));
                            }
                            credits_detected = false;
                            self.session.set_tracking(true);
                            continue;
                        }
                        break;
                    }
                    wait = popup_time.saturating_sub(position).min(tick);
                }
            }

            tokio::select! {
                _ = sleep(wait) => {}
                _ = stop_rx.changed() => break,
            }
        }

        if let Some(mut det) = detector.take() {
            det.stop().await;
        }
        self.events.emit(SessionEvent::TrackingStopped);
        self.signals.set_running(false);
        info!("tracking worker stopped");
    }

    fn start_detector(&self) -> Result<CreditsDetector, DetectorError> {
        let config = self.settings.detection.detector_config();
        let source = Arc::new(PlayerFrameSource::new(Arc::clone(&self.player)));
        let mut detector = CreditsDetector::new(config, source)?;
        detector.start();
        Ok(detector)
    }
}
