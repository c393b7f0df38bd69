use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::config::{ClientConfiguration, ConnectionParams};
use crate::errors::SdkError;
use crate::events::{SessionEvent, SessionEventKind};
use crate::livekit_session::LiveKitSession;
use crate::logger::Logger;
use crate::options::{ConnectSettings, SessionSettings};
use crate::participants::{ParticipantSnapshot, non_empty};
use crate::session::{RoomSession, SessionState};
use crate::token;

/// Coarse connection status tracked by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status shared between the client and its event handlers.
#[derive(Clone)]
struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    fn new(status: ConnectionStatus) -> Self {
        Self(Arc::new(AtomicU8::new(status as u8)))
    }

    fn get(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, status: ConnectionStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }
}

/// Room state computed on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub name: String,
    pub participant_count: usize,
    pub session_state: SessionState,
    pub connection_status: ConnectionStatus,
    pub metadata: Option<String>,
}

/// Connects to one room at a time through a [`RoomSession`].
///
/// The client owns its configuration and the session. Session events
/// drive [`ConnectionStatus`]:
///
/// - `Connected` sets `Connected`
/// - `Disconnected` sets `Disconnected`
/// - `Reconnecting` sets `Connecting`
///
/// `connect_to_room` does not itself move the status to `Connecting`: until
/// the session reports in, the status still reads `Disconnected`.
pub struct RoomClient<S: RoomSession = LiveKitSession> {
    config: ClientConfiguration,
    session: Arc<S>,
    status: StatusCell,
}

impl RoomClient<LiveKitSession> {
    pub fn new(config: ClientConfiguration) -> Result<Self, SdkError> {
        Self::with_session(config, LiveKitSession::new)
    }
}

impl<S: RoomSession> RoomClient<S> {
    /// Build a client around a session created by `make_session` from the
    /// merged session options.
    pub fn with_session<F>(config: ClientConfiguration, make_session: F) -> Result<Self, SdkError>
    where
        F: FnOnce(SessionSettings) -> S,
    {
        validate_server_url(&config.server_url)?;

        let settings = SessionSettings::merged(config.session_options.as_ref());
        let session = Arc::new(make_session(settings));
        let status = StatusCell::new(ConnectionStatus::Disconnected);

        for kind in SessionEventKind::ALL {
            let status = status.clone();
            session.on(kind, Arc::new(move |event: &SessionEvent| on_session_event(&status, event)));
        }

        Logger::info("RoomClient initialized with config", &[("url", &config.server_url)]);

        Ok(Self {
            config,
            session,
            status,
        })
    }

    pub fn config(&self) -> &ClientConfiguration {
        &self.config
    }

    /// The wrapped session, for pass-through use by the host application.
    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// Acquire a token for `params` and connect the session with it.
    ///
    /// On failure the status is forced to `Disconnected` and the original
    /// error is returned.
    pub async fn connect_to_room(&self, params: &ConnectionParams) -> Result<(), SdkError> {
        Logger::info(
            "Attempting to connect to room",
            &[
                ("room_name", &params.room_name),
                ("participant_identity", &params.participant_identity),
            ],
        );

        match self.try_connect(params).await {
            Ok(()) => {
                Logger::info(
                    "Successfully connected to room",
                    &[
                        ("room_name", &params.room_name),
                        ("participant_count", &self.session.participant_count()),
                    ],
                );
                Ok(())
            }
            Err(e) => {
                self.status.set(ConnectionStatus::Disconnected);
                Logger::error("Failed to connect to room", Some(&e), &[]);
                Err(e)
            }
        }
    }

    async fn try_connect(&self, params: &ConnectionParams) -> Result<(), SdkError> {
        params.validate()?;
        let token = token::acquire_token(&self.config, params).await?;
        let options = ConnectSettings::merged(self.config.connect_options.as_ref());
        self.session
            .connect(&self.config.server_url, &token, options)
            .await?;
        Ok(())
    }

    /// Disconnect the session. The status ends up `Disconnected` even when
    /// the session reports an error.
    pub async fn disconnect_from_room(&self) -> Result<(), SdkError> {
        Logger::info("Disconnecting from room...", &[]);
        let result = self.session.disconnect().await;
        self.status.set(ConnectionStatus::Disconnected);

        match result {
            Ok(()) => {
                Logger::info("Successfully disconnected from room", &[]);
                Ok(())
            }
            Err(e) => {
                Logger::error("Error during disconnection", Some(&e), &[]);
                Err(e.into())
            }
        }
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.status.get()
    }

    pub fn room_info(&self) -> RoomSnapshot {
        RoomSnapshot {
            name: self.session.name(),
            participant_count: self.session.participant_count(),
            session_state: self.session.state(),
            connection_status: self.status.get(),
            metadata: non_empty(self.session.metadata()),
        }
    }

    pub fn local_participant(&self) -> Option<ParticipantSnapshot> {
        self.session.local_participant().map(ParticipantSnapshot::from)
    }

    pub fn remote_participants(&self) -> Vec<ParticipantSnapshot> {
        self.session
            .remote_participants()
            .into_iter()
            .map(ParticipantSnapshot::from)
            .collect()
    }
}

fn on_session_event(status: &StatusCell, event: &SessionEvent) {
    match event {
        SessionEvent::Connected => {
            status.set(ConnectionStatus::Connected);
            Logger::info("Successfully connected to room", &[]);
        }
        SessionEvent::Disconnected { reason } => {
            status.set(ConnectionStatus::Disconnected);
            Logger::info("Disconnected from room", &[("reason", reason)]);
        }
        SessionEvent::Reconnecting => {
            status.set(ConnectionStatus::Connecting);
            Logger::info("Reconnecting to room...", &[]);
        }
        SessionEvent::ParticipantConnected { identity } => {
            Logger::info("Participant joined", &[("identity", identity)]);
        }
        SessionEvent::ParticipantDisconnected { identity } => {
            Logger::info("Participant left", &[("identity", identity)]);
        }
        SessionEvent::ConnectionQualityChanged { identity, quality } => {
            let participant = identity.as_deref().unwrap_or("local");
            Logger::debug(
                "Connection quality changed",
                &[("quality", quality), ("participant", &participant)],
            );
        }
        SessionEvent::TrackSubscribed { identity, kind, .. } => {
            Logger::debug(
                "Track subscribed",
                &[("track_kind", kind), ("participant", identity)],
            );
        }
        SessionEvent::TrackUnsubscribed { identity, kind, .. } => {
            Logger::debug(
                "Track unsubscribed",
                &[("track_kind", kind), ("participant", identity)],
            );
        }
    }
}

fn validate_server_url(raw: &str) -> Result<(), SdkError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| SdkError::Configuration(format!("invalid server URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "ws" | "wss" | "http" | "https" => Ok(()),
        other => Err(SdkError::Configuration(format!(
            "unsupported server URL scheme '{other}' in '{raw}'"
        ))),
    }
}
