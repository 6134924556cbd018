use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use autonext_types::MediaItem;

use crate::host::PopupStyle;
use crate::playback::Resolution;

const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Notifications emitted while a session is tracked. Hosts subscribe to
/// drive UI state or scrobbling without polling the session handle.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PopupShown { style: PopupStyle, next: MediaItem },
    Resolved { resolution: Resolution },
    Watched { item: MediaItem },
    TrackingStopped,
}

/// Fan-out sender for [`SessionEvent`]s. Cloning shares the channel; events
/// emitted with no live subscriber are dropped.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn stream(&self) -> BroadcastStream<SessionEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let events = SessionEvents::default();
        events.emit(SessionEvent::TrackingStopped);
    }

    #[test]
    fn subscribers_receive_emitted_events() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();
        events.emit(SessionEvent::Resolved {
            resolution: Resolution::Cancelled,
        });
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            SessionEvent::Resolved {
                resolution: Resolution::Cancelled,
            }
        ));
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let events = SessionEvents::default();
        events.emit(SessionEvent::TrackingStopped);
        let mut rx = events.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
