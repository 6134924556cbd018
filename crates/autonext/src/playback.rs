use std::fmt;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::events::{SessionEvent, SessionEvents};
use crate::host::{NextItemProvider, Player, Popup, PopupFactory, PopupStyle};
use crate::session::{SessionHandle, SessionSnapshot};
use crate::settings::EffectiveSettings;
use crate::tracker::TrackingSignals;

/// How a popup cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The user asked for the next item immediately.
    PlayNow,
    /// The countdown ran out with auto-play enabled.
    AutoPlay,
    /// The user confirmed the still-watching prompt.
    StillWatchingAccepted,
    /// The user dismissed the popup and kept watching.
    Cancelled,
    /// The user chose to stop playback.
    Stopped,
    /// The user toggled shuffle; the queue must be re-rolled.
    ShuffleRestart,
    /// Playback ended, changed files or the host shut down mid-window.
    Aborted,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::PlayNow => "play-now",
            Resolution::AutoPlay => "auto-play",
            Resolution::StillWatchingAccepted => "still-watching-accepted",
            Resolution::Cancelled => "cancelled",
            Resolution::Stopped => "stopped",
            Resolution::ShuffleRestart => "shuffle-restart",
            Resolution::Aborted => "aborted",
        }
    }

    /// True when the resolution starts the next item.
    pub fn advances(&self) -> bool {
        matches!(
            self,
            Resolution::PlayNow | Resolution::AutoPlay | Resolution::StillWatchingAccepted
        )
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives one popup cycle from next-item resolution to a final
/// [`Resolution`] applied to the player and the session.
pub struct PlaybackDecisionEngine {
    player: Arc<dyn Player>,
    provider: Arc<dyn NextItemProvider>,
    popups: Arc<dyn PopupFactory>,
    session: SessionHandle,
    events: SessionEvents,
    settings: Arc<EffectiveSettings>,
    signals: Arc<TrackingSignals>,
}

impl PlaybackDecisionEngine {
    pub fn new(
        player: Arc<dyn Player>,
        provider: Arc<dyn NextItemProvider>,
        popups: Arc<dyn PopupFactory>,
        session: SessionHandle,
        events: SessionEvents,
        settings: Arc<EffectiveSettings>,
        signals: Arc<TrackingSignals>,
    ) -> Self {
        Self {
            player,
            provider,
            popups,
            session,
            events,
            settings,
            signals,
        }
    }

    pub async fn run(&self) -> Resolution {
        let snapshot = self.session.snapshot();
        let Some(next) = self.provider.next_item(&snapshot) else {
            debug!("no next item resolved; nothing to offer");
            self.events.emit(SessionEvent::Resolved {
                resolution: Resolution::Aborted,
            });
            return Resolution::Aborted;
        };

        let style = pick_style(&snapshot);
        let auto_play_armed = self.settings.playback.auto_play && style == PopupStyle::UpNext;

        // Queue up front when the window can time out into auto-play, so the
        // player can prebuffer while the popup counts down.
        let mut queued = false;
        if auto_play_armed {
            match self.player.queue_item(&next.item) {
                Ok(()) => {
                    queued = true;
                    self.session.set_queued(true);
                }
                Err(err) => warn!(error = %err, "failed to queue next item"),
            }
        }

        let popup = self.popups.build(style, &next);
        popup.show();
        self.events.emit(SessionEvent::PopupShown {
            style,
            next: next.item.clone(),
        });
        info!(style = %style, title = %next.item.title, "popup opened");

        let resolution = self
            .poll_popup(popup.as_ref(), &snapshot, style, auto_play_armed)
            .await;

        if resolution.advances() {
            popup.close();
            if !queued {
                match self.player.queue_item(&next.item) {
                    Ok(()) => {
                        queued = true;
                        self.session.set_queued(true);
                    }
                    Err(err) => warn!(error = %err, "failed to queue next item"),
                }
            }
            if queued {
                self.session.set_playing_next(true);
                if let Some(item) = snapshot.item.as_ref() {
                    self.provider.mark_watched(item);
                    self.events.emit(SessionEvent::Watched { item: item.clone() });
                }
                self.player.request_play_next();
                if resolution == Resolution::AutoPlay {
                    self.session.increment_played();
                } else {
                    self.session.reset_played();
                }
            }
        } else {
            if popup.is_alive() {
                popup.close();
            }
            if queued {
                match self.player.dequeue_item() {
                    Ok(()) => self.session.set_queued(false),
                    Err(err) => warn!(error = %err, "failed to dequeue next item"),
                }
            }
            match resolution {
                Resolution::Stopped => self.player.request_stop(),
                Resolution::ShuffleRestart => self.session.set_shuffle(true),
                _ => {}
            }
        }

        info!(resolution = %resolution, "popup resolved");
        self.events.emit(SessionEvent::Resolved { resolution });
        resolution
    }

    async fn poll_popup(
        &self,
        popup: &dyn Popup,
        snapshot: &SessionSnapshot,
        style: PopupStyle,
        auto_play_armed: bool,
    ) -> Resolution {
        let tick = self.settings.detection.tick;
        let (Some(total), Some(opened_at)) = (snapshot.total_time, self.player.current_time())
        else {
            return Resolution::Aborted;
        };
        let remaining_to_eof = total.saturating_sub(opened_at);
        // A cue-derived popup runs a short fixed window instead of counting
        // down all the way to the end of the file.
        let window = if snapshot.popup_cue {
            remaining_to_eof.min(self.settings.playback.cue_popup_duration)
        } else {
            remaining_to_eof
        };
        let deadline = opened_at + window;

        loop {
            if self.signals.stop_requested() || self.player.abort_requested() {
                return Resolution::Aborted;
            }
            if !popup.is_alive() {
                debug!("popup torn down by the host");
                return Resolution::Aborted;
            }
            if self.player.playing_file().as_deref() != snapshot.file.as_deref() {
                debug!("player switched files under the popup");
                return Resolution::Aborted;
            }
            let Some(position) = self.player.current_time() else {
                return Resolution::Aborted;
            };

            if popup.is_shuffle_on() && !snapshot.shuffle_on {
                return Resolution::ShuffleRestart;
            }
            if popup.is_stopped() {
                return Resolution::Stopped;
            }
            if popup.is_cancelled() {
                return Resolution::Cancelled;
            }
            if popup.is_play_now() {
                return if style == PopupStyle::StillWatching {
                    Resolution::StillWatchingAccepted
                } else {
                    Resolution::PlayNow
                };
            }

            let remaining = deadline.saturating_sub(position);
            if remaining <= tick {
                // Timing out only advances when auto-play armed the queue.
                // A still-watching prompt left unanswered means nobody is
                // there, so playback is left to end on its own.
                return if auto_play_armed {
                    Resolution::AutoPlay
                } else {
                    Resolution::Aborted
                };
            }
            popup.update_progress(remaining);

            let speed = self.player.speed();
            sleep(tick.div_f64(speed.max(1.0))).await;
        }
    }
}

fn pick_style(snapshot: &SessionSnapshot) -> PopupStyle {
    if snapshot.played_limit != 0 && snapshot.played_in_a_row >= snapshot.played_limit {
        PopupStyle::StillWatching
    } else {
        PopupStyle::UpNext
    }
}
