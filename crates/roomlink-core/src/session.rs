//! The seam between [`RoomClient`](crate::room::RoomClient) and the
//! real-time library it wraps.

use std::future::Future;

use crate::errors::SessionError;
use crate::events::{EventHandler, SessionEventKind, TrackKind, TrackSource};
use crate::options::ConnectSettings;

/// Low-level state as reported by the session itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    Reconnecting,
}

/// One track publication of a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationInfo {
    pub sid: String,
    pub name: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub is_muted: bool,
}

/// A participant as the session reports it. Empty strings mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantState {
    pub identity: String,
    pub name: String,
    pub metadata: String,
    pub is_speaking: bool,
    pub publications: Vec<PublicationInfo>,
}

/// A live room session.
///
/// Implementations own connection establishment, media and reconnection.
/// Subscriptions may be registered before the first connect and stay
/// valid across reconnects.
pub trait RoomSession: Send + Sync + 'static {
    fn on(&self, kind: SessionEventKind, handler: EventHandler);

    fn connect(
        &self,
        url: &str,
        token: &str,
        options: ConnectSettings,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn name(&self) -> String;

    fn metadata(&self) -> String;

    fn state(&self) -> SessionState;

    /// Remote participants plus the local one while connected.
    fn participant_count(&self) -> usize;

    fn local_participant(&self) -> Option<ParticipantState>;

    /// Remote participants in the session's own iteration order.
    fn remote_participants(&self) -> Vec<ParticipantState>;
}
