use std::sync::{Arc, Mutex, PoisonError, RwLock};

use livekit::participant::ConnectionQuality as LkConnectionQuality;
use livekit::prelude::{
    ConnectionState as LkConnectionState, LocalParticipant, Participant, RemoteParticipant, Room,
    RoomEvent, RoomOptions,
};
use livekit::track::{TrackKind as LkTrackKind, TrackSource as LkTrackSource};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::errors::SessionError;
use crate::events::{
    ConnectionQuality, EventEmitter, EventHandler, SessionEvent, SessionEventKind, TrackKind,
    TrackSource,
};
use crate::options::{ConnectSettings, SessionSettings};
use crate::session::{ParticipantState, PublicationInfo, RoomSession, SessionState};

type RoomSlot = Arc<RwLock<Option<Arc<Room>>>>;

/// [`RoomSession`] backed by a LiveKit room.
///
/// The `livekit::Room` only exists once connected, so subscriptions are
/// kept here and fed from a task draining the room's event channel.
pub struct LiveKitSession {
    settings: SessionSettings,
    room: RoomSlot,
    emitter: EventEmitter,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveKitSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            room: Arc::new(RwLock::new(None)),
            emitter: EventEmitter::new(),
            event_task: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// The underlying LiveKit room, while connected.
    pub fn room(&self) -> Option<Arc<Room>> {
        self.room.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn room_options(&self, options: ConnectSettings) -> RoomOptions {
        let mut room_options = RoomOptions::default();
        room_options.auto_subscribe = options.auto_subscribe;
        room_options.adaptive_stream = self.settings.adaptive_stream;
        room_options.dynacast = self.settings.dynacast;
        if let Some(retries) = options.join_retries {
            room_options.join_retries = retries;
        }
        room_options
    }

    async fn event_loop(
        mut events: UnboundedReceiver<RoomEvent>,
        emitter: EventEmitter,
        slot: RoomSlot,
        own: Arc<Room>,
    ) {
        while let Some(event) = events.recv().await {
            let disconnected = matches!(event, RoomEvent::Disconnected { .. });
            if disconnected && !release_slot(&slot, &own) {
                // A newer room has replaced this one; its events are stale.
                break;
            }
            match translate(event) {
                Some(event) => emitter.emit(&event),
                None => continue,
            }
            if disconnected {
                break;
            }
        }
        tracing::debug!("room event loop ended");
    }

    /// Close and forget the current room, if any, and stop its event task.
    async fn release_current(&self) -> Result<(), SessionError> {
        if let Some(handle) = self.event_task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
        let room = self.room.write().unwrap_or_else(PoisonError::into_inner).take();
        match room {
            Some(room) => room
                .close()
                .await
                .map_err(|e| SessionError::Disconnect(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Empty `slot` if it still holds `own`. Returns `false` when another
/// room has taken its place.
fn release_slot<T>(slot: &RwLock<Option<Arc<T>>>, own: &Arc<T>) -> bool {
    let mut slot = slot.write().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        Some(current) if !Arc::ptr_eq(current, own) => false,
        _ => {
            *slot = None;
            true
        }
    }
}

impl Drop for LiveKitSession {
    fn drop(&mut self) {
        if let Some(handle) = self.event_task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
    }
}

impl RoomSession for LiveKitSession {
    fn on(&self, kind: SessionEventKind, handler: EventHandler) {
        self.emitter.on(kind, handler);
    }

    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: ConnectSettings,
    ) -> Result<(), SessionError> {
        if let Err(e) = self.release_current().await {
            tracing::warn!("failed to close previous room before reconnecting: {e}");
        }

        let (room, events) = Room::connect(url, token, self.room_options(options))
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;

        let room = Arc::new(room);
        *self.room.write().unwrap_or_else(PoisonError::into_inner) = Some(room.clone());

        let handle = tokio::spawn(Self::event_loop(
            events,
            self.emitter.clone(),
            self.room.clone(),
            room,
        ));
        *self.event_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        let room = self.room.write().unwrap_or_else(PoisonError::into_inner).take();
        match room {
            Some(room) => room
                .close()
                .await
                .map_err(|e| SessionError::Disconnect(e.to_string())),
            None => Ok(()),
        }
    }

    fn name(&self) -> String {
        self.room().map(|r| r.name()).unwrap_or_default()
    }

    fn metadata(&self) -> String {
        self.room().map(|r| r.metadata()).unwrap_or_default()
    }

    fn state(&self) -> SessionState {
        match self.room().map(|r| r.connection_state()) {
            Some(LkConnectionState::Connected) => SessionState::Connected,
            Some(LkConnectionState::Reconnecting) => SessionState::Reconnecting,
            _ => SessionState::Disconnected,
        }
    }

    fn participant_count(&self) -> usize {
        let Some(room) = self.room() else { return 0 };
        let local = usize::from(matches!(room.connection_state(), LkConnectionState::Connected));
        room.remote_participants().len() + local
    }

    fn local_participant(&self) -> Option<ParticipantState> {
        self.room().map(|r| local_state(&r.local_participant()))
    }

    fn remote_participants(&self) -> Vec<ParticipantState> {
        let Some(room) = self.room() else {
            return Vec::new();
        };
        room.remote_participants().values().map(remote_state).collect()
    }
}

fn translate(event: RoomEvent) -> Option<SessionEvent> {
    let event = match event {
        // A completed reconnect is reported the same way as the first connect.
        RoomEvent::Connected { .. } | RoomEvent::Reconnected => SessionEvent::Connected,
        RoomEvent::Disconnected { reason } => SessionEvent::Disconnected {
            reason: format!("{reason:?}"),
        },
        RoomEvent::Reconnecting => SessionEvent::Reconnecting,
        RoomEvent::ParticipantConnected(p) => SessionEvent::ParticipantConnected {
            identity: p.identity().to_string(),
        },
        RoomEvent::ParticipantDisconnected(p) => SessionEvent::ParticipantDisconnected {
            identity: p.identity().to_string(),
        },
        RoomEvent::ConnectionQualityChanged { quality, participant } => {
            SessionEvent::ConnectionQualityChanged {
                identity: match participant {
                    Participant::Local(_) => None,
                    Participant::Remote(p) => Some(p.identity().to_string()),
                },
                quality: quality_from(quality),
            }
        }
        RoomEvent::TrackSubscribed { track, publication, participant } => {
            SessionEvent::TrackSubscribed {
                identity: participant.identity().to_string(),
                track_sid: track.sid().to_string(),
                kind: kind_from(publication.kind()),
            }
        }
        RoomEvent::TrackUnsubscribed { track, publication, participant } => {
            SessionEvent::TrackUnsubscribed {
                identity: participant.identity().to_string(),
                track_sid: track.sid().to_string(),
                kind: kind_from(publication.kind()),
            }
        }
        other => {
            tracing::trace!("unhandled room event: {other:?}");
            return None;
        }
    };
    Some(event)
}

fn quality_from(quality: LkConnectionQuality) -> ConnectionQuality {
    match quality {
        LkConnectionQuality::Excellent => ConnectionQuality::Excellent,
        LkConnectionQuality::Good => ConnectionQuality::Good,
        LkConnectionQuality::Poor => ConnectionQuality::Poor,
        LkConnectionQuality::Lost => ConnectionQuality::Lost,
    }
}

fn kind_from(kind: LkTrackKind) -> TrackKind {
    match kind {
        LkTrackKind::Audio => TrackKind::Audio,
        LkTrackKind::Video => TrackKind::Video,
    }
}

fn source_from(source: LkTrackSource) -> TrackSource {
    match source {
        LkTrackSource::Microphone => TrackSource::Microphone,
        LkTrackSource::Camera => TrackSource::Camera,
        LkTrackSource::Screenshare => TrackSource::ScreenShare,
        LkTrackSource::ScreenshareAudio => TrackSource::ScreenShareAudio,
        _ => TrackSource::Unknown,
    }
}

fn local_state(p: &LocalParticipant) -> ParticipantState {
    ParticipantState {
        identity: p.identity().to_string(),
        name: p.name(),
        metadata: p.metadata(),
        is_speaking: p.is_speaking(),
        publications: p
            .track_publications()
            .values()
            .map(|publication| PublicationInfo {
                sid: publication.sid().to_string(),
                name: publication.name(),
                kind: kind_from(publication.kind()),
                source: source_from(publication.source()),
                is_muted: publication.is_muted(),
            })
            .collect(),
    }
}

fn remote_state(p: &RemoteParticipant) -> ParticipantState {
    ParticipantState {
        identity: p.identity().to_string(),
        name: p.name(),
        metadata: p.metadata(),
        is_speaking: p.is_speaking(),
        publications: p
            .track_publications()
            .values()
            .map(|publication| PublicationInfo {
                sid: publication.sid().to_string(),
                name: publication.name(),
                kind: kind_from(publication.kind()),
                source: source_from(publication.source()),
                is_muted: publication.is_muted(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconnected_session_reports_nothing() {
        let session = LiveKitSession::new(SessionSettings::default());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.participant_count(), 0);
        assert_eq!(session.name(), "");
        assert!(session.local_participant().is_none());
        assert!(session.remote_participants().is_empty());
    }

    #[test]
    fn room_options_follow_merged_settings() {
        let session = LiveKitSession::new(SessionSettings {
            adaptive_stream: false,
            dynacast: true,
        });
        let options = session.room_options(ConnectSettings {
            auto_subscribe: false,
            join_retries: Some(7),
        });
        assert!(!options.adaptive_stream);
        assert!(options.dynacast);
        assert!(!options.auto_subscribe);
        assert_eq!(options.join_retries, 7);
    }

    #[tokio::test]
    async fn disconnect_without_room_is_a_no_op() {
        let session = LiveKitSession::new(SessionSettings::default());
        assert!(session.disconnect().await.is_ok());
    }

    #[test]
    fn stale_room_does_not_clear_its_replacement() {
        let first = Arc::new(1u8);
        let second = Arc::new(2u8);
        let slot = RwLock::new(Some(second.clone()));

        assert!(!release_slot(&slot, &first));
        assert!(slot.read().unwrap().as_ref().is_some_and(|r| Arc::ptr_eq(r, &second)));

        assert!(release_slot(&slot, &second));
        assert!(slot.read().unwrap().is_none());
        // Already released by an explicit disconnect: the event still counts.
        assert!(release_slot(&slot, &second));
    }

    #[tokio::test]
    async fn releasing_an_idle_session_is_a_no_op() {
        let session = LiveKitSession::new(SessionSettings::default());
        assert!(session.release_current().await.is_ok());
        assert!(session.room().is_none());
        assert!(session.event_task.lock().unwrap().is_none());
    }

    #[test]
    fn quality_maps_one_to_one() {
        assert_eq!(quality_from(LkConnectionQuality::Excellent), ConnectionQuality::Excellent);
        assert_eq!(quality_from(LkConnectionQuality::Lost), ConnectionQuality::Lost);
    }

    #[test]
    fn reconnecting_event_is_translated() {
        assert_eq!(translate(RoomEvent::Reconnecting), Some(SessionEvent::Reconnecting));
        assert_eq!(translate(RoomEvent::Reconnected), Some(SessionEvent::Connected));
    }
}
