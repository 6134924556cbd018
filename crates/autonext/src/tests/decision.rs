use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::events::{SessionEvent, SessionEvents};
use crate::host::{NextItemProvider, Player, PopupFactory, PopupStyle};
use crate::playback::{PlaybackDecisionEngine, Resolution};
use crate::session::SessionHandle;
use crate::settings::SettingsOverrides;
use crate::tests::harness::{
    PopupBehavior, ScriptedPlayer, ScriptedPopupFactory, ScriptedProvider, drain_events,
    media_item, settings,
};
use crate::tracker::TrackingSignals;

const FILE: &str = "/media/show/ep1.mkv";

struct Fixture {
    player: Arc<ScriptedPlayer>,
    provider: Arc<ScriptedProvider>,
    popups: Arc<ScriptedPopupFactory>,
    session: SessionHandle,
    events: SessionEvents,
    signals: Arc<TrackingSignals>,
    engine: PlaybackDecisionEngine,
}

fn fixture(
    overrides: SettingsOverrides,
    total_secs: u64,
    offset_secs: u64,
    cue: Option<Duration>,
    behaviors: Vec<PopupBehavior>,
    provider: ScriptedProvider,
) -> Fixture {
    let settings = settings(overrides);
    let player = Arc::new(ScriptedPlayer::new(
        FILE,
        Duration::from_secs(total_secs),
        Duration::from_secs(offset_secs),
    ));
    let provider = Arc::new(provider);
    let popups = Arc::new(ScriptedPopupFactory::with_behaviors(behaviors));
    let session = SessionHandle::new();
    session.arm(
        PathBuf::from(FILE),
        Some(media_item("Episode 1", FILE)),
        Duration::from_secs(total_secs),
        cue,
        &settings,
    );
    let events = SessionEvents::default();
    let signals = Arc::new(TrackingSignals::default());
    let engine = PlaybackDecisionEngine::new(
        Arc::clone(&player) as Arc<dyn Player>,
        Arc::clone(&provider) as Arc<dyn NextItemProvider>,
        Arc::clone(&popups) as Arc<dyn PopupFactory>,
        session.clone(),
        events.clone(),
        Arc::clone(&settings),
        Arc::clone(&signals),
    );
    Fixture {
        player,
        provider,
        popups,
        session,
        events,
        signals,
        engine,
    }
}

fn next_episode() -> ScriptedProvider {
    ScriptedProvider::with_next(media_item("Episode 2", "/media/show/ep2.mkv"))
}

#[tokio::test(start_paused = true)]
async fn up_next_timeout_auto_plays() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        290,
        None,
        vec![PopupBehavior::Idle],
        next_episode(),
    );
    let mut rx = f.events.subscribe();

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::AutoPlay);
    assert_eq!(f.player.play_next_requests(), 1);
    assert_eq!(f.popups.styles(), vec![PopupStyle::UpNext]);
    assert_eq!(f.provider.watched().len(), 1);
    assert_eq!(f.provider.watched()[0].title, "Episode 1");
    assert_eq!(f.session.snapshot().played_in_a_row, 2);
    assert!(f.session.snapshot().playing_next);

    let popup = &f.popups.built()[0];
    assert!(popup.was_closed());
    assert_eq!(popup.progress()[0], Duration::from_secs(10));

    let events = drain_events(&mut rx);
    assert!(matches!(events[0], SessionEvent::PopupShown { .. }));
    assert!(matches!(events[1], SessionEvent::Watched { .. }));
    assert!(matches!(
        events[2],
        SessionEvent::Resolved {
            resolution: Resolution::AutoPlay,
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn play_now_resets_the_counter() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::PlayNowAfter(1)],
        next_episode(),
    );
    f.session.increment_played();
    assert_eq!(f.session.snapshot().played_in_a_row, 2);

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::PlayNow);
    assert_eq!(f.player.play_next_requests(), 1);
    assert_eq!(f.session.snapshot().played_in_a_row, 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_without_auto_play_aborts() {
    let overrides = SettingsOverrides {
        auto_play: Some(false),
        ..SettingsOverrides::default()
    };
    let f = fixture(
        overrides,
        300,
        290,
        None,
        vec![PopupBehavior::Idle],
        next_episode(),
    );

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::Aborted);
    assert_eq!(f.player.play_next_requests(), 0);
    assert!(f.player.queued_items().is_empty());
    assert!(f.popups.built()[0].was_closed());
}

#[tokio::test(start_paused = true)]
async fn played_limit_switches_to_still_watching() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        290,
        None,
        vec![PopupBehavior::Idle],
        next_episode(),
    );
    f.session.increment_played();
    f.session.increment_played();

    let resolution = f.engine.run().await;

    assert_eq!(f.popups.styles(), vec![PopupStyle::StillWatching]);
    // A still-watching window never auto-plays and never queues up front.
    assert_eq!(resolution, Resolution::Aborted);
    assert_eq!(f.player.play_next_requests(), 0);
    assert!(f.player.queued_items().is_empty());
}

#[tokio::test(start_paused = true)]
async fn still_watching_confirm_advances() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::PlayNowAfter(1)],
        next_episode(),
    );
    f.session.increment_played();
    f.session.increment_played();

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::StillWatchingAccepted);
    assert_eq!(f.player.play_next_requests(), 1);
    assert_eq!(f.player.queued_items().len(), 1);
    assert_eq!(f.provider.watched().len(), 1);
    assert_eq!(f.session.snapshot().played_in_a_row, 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_dequeues_the_preloaded_item() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::CancelAfter(2)],
        next_episode(),
    );

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::Cancelled);
    assert_eq!(f.player.play_next_requests(), 0);
    assert_eq!(f.player.dequeues(), 1);
    assert!(f.player.queued_items().is_empty());
    assert!(f.popups.built()[0].was_closed());
    assert!(!f.session.snapshot().queued);
}

#[tokio::test(start_paused = true)]
async fn stop_choice_stops_the_player() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::StopAfter(1)],
        next_episode(),
    );

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::Stopped);
    assert_eq!(f.player.stop_requests(), 1);
    assert_eq!(f.player.dequeues(), 1);
    assert_eq!(f.player.play_next_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn shuffle_toggle_requests_a_restart() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::ShuffleAfter(1)],
        next_episode(),
    );

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::ShuffleRestart);
    assert!(f.session.snapshot().shuffle_on);
    assert_eq!(f.player.dequeues(), 1);
    assert_eq!(f.player.play_next_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn dead_popup_aborts_the_window() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::DieAfter(1)],
        next_episode(),
    );

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::Aborted);
    // The host already tore the window down, so it is never closed twice.
    assert!(!f.popups.built()[0].was_closed());
    assert_eq!(f.player.dequeues(), 1);
}

#[tokio::test(start_paused = true)]
async fn no_next_item_resolves_without_a_popup() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        290,
        None,
        Vec::new(),
        ScriptedProvider::empty(),
    );
    let mut rx = f.events.subscribe();

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::Aborted);
    assert!(f.popups.built().is_empty());
    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        SessionEvent::Resolved {
            resolution: Resolution::Aborted,
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn queue_failure_blocks_advancing() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::PlayNowAfter(1)],
        next_episode(),
    );
    f.player.fail_queueing();

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::PlayNow);
    assert_eq!(f.player.play_next_requests(), 0);
    assert!(f.provider.watched().is_empty());
    assert!(!f.session.snapshot().playing_next);
}

#[tokio::test(start_paused = true)]
async fn cue_popup_runs_a_short_window() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        Some(Duration::from_secs(270)),
        vec![PopupBehavior::Idle],
        next_episode(),
    );

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::AutoPlay);
    // Ten second window from the cue, not thirty seconds to the end.
    assert_eq!(f.popups.built()[0].progress()[0], Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn ejected_file_aborts_the_window() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::Idle],
        next_episode(),
    );
    f.player.eject_file();

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::Aborted);
    assert_eq!(f.player.play_next_requests(), 0);
    assert_eq!(f.player.dequeues(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_signal_aborts_the_window() {
    let f = fixture(
        SettingsOverrides::default(),
        300,
        270,
        None,
        vec![PopupBehavior::Idle],
        next_episode(),
    );
    f.signals.request_stop(true);

    let resolution = f.engine.run().await;

    assert_eq!(resolution, Resolution::Aborted);
    assert_eq!(f.player.play_next_requests(), 0);
}
