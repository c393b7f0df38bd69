//! Roomlink core: a small client layer over LiveKit rooms.
//!
//! Loads connection settings, mints or fetches access tokens, and exposes
//! a connect/disconnect/status API with read-only room snapshots.

pub mod config;
pub mod errors;
pub mod events;
pub mod livekit_session;
pub mod logger;
pub mod options;
pub mod participants;
pub mod room;
pub mod session;
pub mod token;

#[cfg(test)]
mod testing;

pub use config::{ClientConfiguration, Config, ConnectionParams, EnvConfig, HostCapabilities};
pub use errors::{SdkError, SessionError, TokenEndpointError};
pub use livekit_session::LiveKitSession;
pub use logger::{LogLevel, Logger, init_logging};
pub use options::{ConnectOptions, SessionOptions};
pub use participants::ParticipantSnapshot;
pub use room::{ConnectionStatus, RoomClient, RoomSnapshot};
pub use session::{RoomSession, SessionState};
pub use token::{TokenEndpoint, TokenProvider};

use config::{EnvSource, ProcessEnv};

/// Create a client from `LIVEKIT_URL`, `LIVEKIT_API_KEY` and
/// `LIVEKIT_API_SECRET`. Fails when the key or secret is missing.
pub fn create_client() -> Result<RoomClient, SdkError> {
    create_client_from(&ProcessEnv)
}

fn create_client_from(env: &impl EnvSource) -> Result<RoomClient, SdkError> {
    let result = Config::validate_environment_from(env)
        .and_then(|()| RoomClient::new(Config::livekit_config_from(env).into_client_config()));
    match result {
        Ok(client) => {
            Logger::info("Room client initialized successfully", &[]);
            Ok(client)
        }
        Err(e) => {
            Logger::error("Failed to create room client", Some(&e), &[]);
            Err(SdkError::Initialization(Box::new(e)))
        }
    }
}

/// Create a client from an explicit configuration, without looking at
/// the environment. Use this with a token provider or inline credentials.
pub fn create_client_with_config(config: ClientConfiguration) -> Result<RoomClient, SdkError> {
    match RoomClient::new(config) {
        Ok(client) => {
            Logger::info("Room client initialized with custom config", &[]);
            Ok(client)
        }
        Err(e) => {
            Logger::error("Failed to create room client with custom config", Some(&e), &[]);
            Err(SdkError::Initialization(Box::new(e)))
        }
    }
}

/// Set the minimum level the SDK logger emits.
pub fn set_log_level(level: LogLevel) {
    Logger::set_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::config::{API_KEY_VAR, API_SECRET_VAR, URL_VAR};
    use crate::errors::BoxError;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn create_client_without_credentials_fails() {
        let err = create_client_from(&env(&[])).err().unwrap();
        assert!(err.to_string().contains("required"));
        match err {
            SdkError::Initialization(cause) => assert!(matches!(*cause, SdkError::Configuration(_))),
            other => panic!("expected Initialization, got {other:?}"),
        }
    }

    #[test]
    fn create_client_with_credentials_uses_env_url() {
        let client = create_client_from(&env(&[
            (URL_VAR, "wss://test.livekit.cloud"),
            (API_KEY_VAR, "k"),
            (API_SECRET_VAR, "s"),
        ]))
        .unwrap();
        assert_eq!(client.config().server_url, "wss://test.livekit.cloud");
        assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn create_client_with_invalid_env_url_is_wrapped() {
        let err = create_client_from(&env(&[
            (URL_VAR, "localhost"),
            (API_KEY_VAR, "k"),
            (API_SECRET_VAR, "s"),
        ]))
        .err()
        .unwrap();
        assert!(err.to_string().starts_with("failed to initialize room client"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("invalid server URL"));
        match err {
            SdkError::Initialization(cause) => assert!(matches!(*cause, SdkError::Configuration(_))),
            other => panic!("expected Initialization, got {other:?}"),
        }
    }

    #[test]
    fn create_client_with_token_provider_starts_disconnected() {
        let config = ClientConfiguration::new("ws://localhost:7881").with_token_provider(
            TokenProvider::new(|_| async { Ok::<_, BoxError>("tok".to_string()) }),
        );
        let client = create_client_with_config(config).unwrap();
        assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
        assert_eq!(client.connection_status().to_string(), "disconnected");
    }

    #[test]
    fn create_client_with_config_skips_environment_validation() {
        let client = create_client_with_config(ClientConfiguration::new("ws://localhost:7881"));
        assert!(client.is_ok());
    }

    #[test]
    fn set_log_level_updates_logger() {
        let _guard = logger::LEVEL_LOCK.lock().unwrap();
        set_log_level(LogLevel::Error);
        assert_eq!(Logger::level(), LogLevel::Error);
        assert!(!Logger::enabled(LogLevel::Info));
        set_log_level(LogLevel::Info);
    }
}
