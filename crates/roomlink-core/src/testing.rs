//! In-memory [`RoomSession`] for exercising the client without a server.

use std::sync::{Mutex, MutexGuard};

use crate::errors::SessionError;
use crate::events::{EventEmitter, EventHandler, SessionEvent, SessionEventKind};
use crate::options::{ConnectSettings, SessionSettings};
use crate::session::{ParticipantState, RoomSession, SessionState};

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectCall {
    pub url: String,
    pub token: String,
    pub options: ConnectSettings,
}

#[derive(Default)]
pub struct FakeState {
    pub name: String,
    pub metadata: String,
    pub state: SessionState,
    pub local: Option<ParticipantState>,
    pub remotes: Vec<ParticipantState>,
    pub connect_error: Option<SessionError>,
    pub disconnect_error: Option<SessionError>,
    pub connect_calls: Vec<ConnectCall>,
    pub disconnect_calls: usize,
}

pub struct FakeSession {
    pub settings: SessionSettings,
    emitter: EventEmitter,
    state: Mutex<FakeState>,
}

impl FakeSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            emitter: EventEmitter::new(),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn state_mut(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fire(&self, event: SessionEvent) {
        self.emitter.emit(&event);
    }

    pub fn subscription_count(&self) -> usize {
        self.emitter.subscription_count()
    }

    /// Add a remote participant and announce it.
    pub fn join(&self, identity: &str) {
        self.state_mut().remotes.push(ParticipantState {
            identity: identity.to_string(),
            ..Default::default()
        });
        self.fire(SessionEvent::ParticipantConnected {
            identity: identity.to_string(),
        });
    }

    pub fn leave(&self, identity: &str) {
        self.state_mut().remotes.retain(|p| p.identity != identity);
        self.fire(SessionEvent::ParticipantDisconnected {
            identity: identity.to_string(),
        });
    }
}

impl RoomSession for FakeSession {
    fn on(&self, kind: SessionEventKind, handler: EventHandler) {
        self.emitter.on(kind, handler);
    }

    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: ConnectSettings,
    ) -> Result<(), SessionError> {
        let mut state = self.state_mut();
        state.connect_calls.push(ConnectCall {
            url: url.to_string(),
            token: token.to_string(),
            options,
        });
        match state.connect_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        let mut state = self.state_mut();
        state.disconnect_calls += 1;
        match state.disconnect_error.clone() {
            Some(e) => Err(e),
            None => {
                state.state = SessionState::Disconnected;
                Ok(())
            }
        }
    }

    fn name(&self) -> String {
        self.state_mut().name.clone()
    }

    fn metadata(&self) -> String {
        self.state_mut().metadata.clone()
    }

    fn state(&self) -> SessionState {
        self.state_mut().state
    }

    fn participant_count(&self) -> usize {
        let state = self.state_mut();
        state.remotes.len() + usize::from(state.local.is_some())
    }

    fn local_participant(&self) -> Option<ParticipantState> {
        self.state_mut().local.clone()
    }

    fn remote_participants(&self) -> Vec<ParticipantState> {
        self.state_mut().remotes.clone()
    }
}
