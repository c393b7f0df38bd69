use std::sync::{Arc, PoisonError, RwLock};

/// The session events a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    Connected,
    Disconnected,
    Reconnecting,
    ParticipantConnected,
    ParticipantDisconnected,
    ConnectionQualityChanged,
    TrackSubscribed,
    TrackUnsubscribed,
}

impl SessionEventKind {
    pub const ALL: [SessionEventKind; 8] = [
        Self::Connected,
        Self::Disconnected,
        Self::Reconnecting,
        Self::ParticipantConnected,
        Self::ParticipantDisconnected,
        Self::ConnectionQualityChanged,
        Self::TrackSubscribed,
        Self::TrackUnsubscribed,
    ];
}

/// Events reported by the wrapped session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    Disconnected { reason: String },
    Reconnecting,
    ParticipantConnected { identity: String },
    ParticipantDisconnected { identity: String },
    /// `identity` is `None` for the local participant.
    ConnectionQualityChanged {
        identity: Option<String>,
        quality: ConnectionQuality,
    },
    TrackSubscribed {
        identity: String,
        track_sid: String,
        kind: TrackKind,
    },
    TrackUnsubscribed {
        identity: String,
        track_sid: String,
        kind: TrackKind,
    },
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            Self::Connected => SessionEventKind::Connected,
            Self::Disconnected { .. } => SessionEventKind::Disconnected,
            Self::Reconnecting => SessionEventKind::Reconnecting,
            Self::ParticipantConnected { .. } => SessionEventKind::ParticipantConnected,
            Self::ParticipantDisconnected { .. } => SessionEventKind::ParticipantDisconnected,
            Self::ConnectionQualityChanged { .. } => SessionEventKind::ConnectionQualityChanged,
            Self::TrackSubscribed { .. } => SessionEventKind::TrackSubscribed,
            Self::TrackUnsubscribed { .. } => SessionEventKind::TrackUnsubscribed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    ScreenShare,
    ScreenShareAudio,
    Unknown,
}

/// Callback invoked for a subscribed event kind.
/// Runs on the session's event task, so it must be Send + Sync.
pub type EventHandler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Per-kind subscription registry owned by a session.
#[derive(Clone, Default)]
pub struct EventEmitter {
    handlers: Arc<RwLock<Vec<(SessionEventKind, EventHandler)>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: SessionEventKind, handler: EventHandler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, handler));
    }

    /// Deliver `event` to every handler subscribed to its kind, in
    /// registration order. The registry lock is released before handlers run.
    pub fn emit(&self, event: &SessionEvent) {
        let kind = event.kind();
        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in matching {
            handler(event);
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(count: &Arc<AtomicUsize>) -> EventHandler {
        let count = count.clone();
        Arc::new(move |_: &SessionEvent| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn emitter_dispatches_to_matching_kind_only() {
        let emitter = EventEmitter::new();
        let connected = Arc::new(AtomicUsize::new(0));
        let reconnecting = Arc::new(AtomicUsize::new(0));

        emitter.on(SessionEventKind::Connected, counter(&connected));
        emitter.on(SessionEventKind::Reconnecting, counter(&reconnecting));
        emitter.emit(&SessionEvent::Connected);

        assert_eq!(connected.load(Ordering::SeqCst), 1);
        assert_eq!(reconnecting.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn emitter_dispatches_to_multiple_handlers() {
        let emitter = EventEmitter::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.on(SessionEventKind::Reconnecting, counter(&count1));
        emitter.on(SessionEventKind::Reconnecting, counter(&count2));
        emitter.emit(&SessionEvent::Reconnecting);

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.subscription_count(), 2);
    }

    #[test]
    fn emitter_delivers_event_payload() {
        let emitter = EventEmitter::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        emitter.on(
            SessionEventKind::ParticipantDisconnected,
            Arc::new(move |e: &SessionEvent| sink.lock().unwrap().push(e.clone())),
        );

        emitter.emit(&SessionEvent::ParticipantDisconnected {
            identity: "p1".to_string(),
        });

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        match &captured[0] {
            SessionEvent::ParticipantDisconnected { identity } => assert_eq!(identity, "p1"),
            _ => panic!("expected ParticipantDisconnected"),
        }
    }

    #[test]
    fn handler_may_subscribe_while_being_dispatched() {
        let emitter = EventEmitter::new();
        let inner = emitter.clone();
        emitter.on(
            SessionEventKind::Connected,
            Arc::new(move |_: &SessionEvent| {
                inner.on(SessionEventKind::Disconnected, Arc::new(|_: &SessionEvent| {}))
            }),
        );
        emitter.emit(&SessionEvent::Connected);
        assert_eq!(emitter.subscription_count(), 2);
    }

    #[test]
    fn every_kind_is_listed_once() {
        let kinds = SessionEventKind::ALL;
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
