use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::SdkError;
use crate::options::{ConnectOptions, SessionOptions};
use crate::token::TokenProvider;

pub const URL_VAR: &str = "LIVEKIT_URL";
pub const API_KEY_VAR: &str = "LIVEKIT_API_KEY";
pub const API_SECRET_VAR: &str = "LIVEKIT_API_SECRET";

pub const DEFAULT_URL: &str = "ws://localhost:7881";

/// Where configuration values are read from.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The current process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

fn lookup(env: &impl EnvSource, name: &str) -> Option<String> {
    env.var(name).filter(|v| !v.trim().is_empty())
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

/// Connection settings as found in the environment or a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub connect_options: Option<ConnectOptions>,
}

impl EnvConfig {
    pub fn into_client_config(self) -> ClientConfiguration {
        ClientConfiguration {
            server_url: self.url,
            api_key: self.api_key,
            api_secret: self.api_secret,
            token_provider: None,
            session_options: self.session_options,
            connect_options: self.connect_options,
            host: HostCapabilities::default(),
        }
    }
}

/// Reads connection settings. Holds no state of its own.
pub struct Config;

impl Config {
    pub fn livekit_url() -> String {
        Self::livekit_url_from(&ProcessEnv)
    }

    pub fn livekit_url_from(env: &impl EnvSource) -> String {
        lookup(env, URL_VAR).unwrap_or_else(default_url)
    }

    pub fn api_key() -> Option<String> {
        Self::api_key_from(&ProcessEnv)
    }

    pub fn api_key_from(env: &impl EnvSource) -> Option<String> {
        lookup(env, API_KEY_VAR)
    }

    pub fn api_secret() -> Option<String> {
        Self::api_secret_from(&ProcessEnv)
    }

    pub fn api_secret_from(env: &impl EnvSource) -> Option<String> {
        lookup(env, API_SECRET_VAR)
    }

    pub fn livekit_config() -> EnvConfig {
        Self::livekit_config_from(&ProcessEnv)
    }

    pub fn livekit_config_from(env: &impl EnvSource) -> EnvConfig {
        EnvConfig {
            url: Self::livekit_url_from(env),
            api_key: Self::api_key_from(env),
            api_secret: Self::api_secret_from(env),
            session_options: None,
            connect_options: None,
        }
    }

    /// Check that server-side signing credentials are present.
    ///
    /// Only needed for local signing; clients with a token provider skip it.
    pub fn validate_environment() -> Result<(), SdkError> {
        Self::validate_environment_from(&ProcessEnv)
    }

    pub fn validate_environment_from(env: &impl EnvSource) -> Result<(), SdkError> {
        if Self::api_key_from(env).is_none() || Self::api_secret_from(env).is_none() {
            return Err(SdkError::Configuration(format!(
                "{API_KEY_VAR} and {API_SECRET_VAR} environment variables are required for \
                 server-side token generation. Provide a custom token provider instead when \
                 signing is not available."
            )));
        }
        Ok(())
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load_file(path: impl AsRef<Path>) -> Result<EnvConfig, SdkError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SdkError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            SdkError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }
}

/// What the embedding host allows this crate to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Whether access tokens may be signed in-process with the API secret.
    pub can_sign_locally: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            can_sign_locally: !cfg!(target_arch = "wasm32"),
        }
    }
}

/// Everything a [`RoomClient`](crate::room::RoomClient) needs to connect.
#[derive(Clone)]
pub struct ClientConfiguration {
    pub server_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Takes precedence over key/secret when set.
    pub token_provider: Option<TokenProvider>,
    pub session_options: Option<SessionOptions>,
    pub connect_options: Option<ConnectOptions>,
    pub host: HostCapabilities,
}

impl ClientConfiguration {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_key: None,
            api_secret: None,
            token_provider: None,
            session_options: None,
            connect_options: None,
            host: HostCapabilities::default(),
        }
    }

    pub fn with_credentials(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self.api_secret = Some(secret.into());
        self
    }

    pub fn with_token_provider(mut self, provider: TokenProvider) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.session_options = Some(options);
        self
    }

    pub fn with_connect_options(mut self, options: ConnectOptions) -> Self {
        self.connect_options = Some(options);
        self
    }

    pub fn with_host(mut self, host: HostCapabilities) -> Self {
        self.host = host;
        self
    }
}

impl fmt::Debug for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("server_url", &self.server_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("token_provider", &self.token_provider.is_some())
            .field("session_options", &self.session_options)
            .field("connect_options", &self.connect_options)
            .field("host", &self.host)
            .finish()
    }
}

/// Per-call connection parameters. Also the body sent to token endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParams {
    pub room_name: String,
    pub participant_identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_metadata: Option<String>,
}

impl ConnectionParams {
    pub fn new(room_name: impl Into<String>, participant_identity: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            participant_identity: participant_identity.into(),
            participant_metadata: None,
            room_metadata: None,
        }
    }

    pub fn with_participant_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.participant_metadata = Some(metadata.into());
        self
    }

    pub fn with_room_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.room_metadata = Some(metadata.into());
        self
    }

    pub fn validate(&self) -> Result<(), SdkError> {
        if self.room_name.trim().is_empty() {
            return Err(SdkError::InvalidParams("room name must not be empty".into()));
        }
        if self.participant_identity.trim().is_empty() {
            return Err(SdkError::InvalidParams(
                "participant identity must not be empty".into(),
            ));
        }
        Ok(())
    }
}
