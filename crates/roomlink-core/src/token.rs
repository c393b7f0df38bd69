use std::fmt;
use std::future::Future;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::BoxFuture;
use livekit_api::access_token::{AccessToken, AccessTokenError, VideoGrants};
use serde::Deserialize;

use crate::config::{ClientConfiguration, ConnectionParams};
use crate::errors::{BoxError, SdkError, TokenEndpointError};
use crate::logger::Logger;

/// Lifetime of the unsigned fallback token, in seconds.
const FALLBACK_TTL_SECS: i64 = 3600;

/// Caller-supplied async function producing an access token for a connect call.
#[derive(Clone)]
pub struct TokenProvider(Arc<dyn Fn(ConnectionParams) -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync>);

impl TokenProvider {
    pub fn new<F, Fut, E>(f: F) -> Self
    where
        F: Fn(ConnectionParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self(Arc::new(move |params| {
            let fut = f(params);
            Box::pin(async move { fut.await.map_err(Into::into) })
        }))
    }

    pub async fn fetch(&self, params: &ConnectionParams) -> Result<String, BoxError> {
        (self.0)(params.clone()).await
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenProvider(..)")
    }
}

/// How a client obtains its access token, resolved from its configuration.
pub enum CredentialSource<'a> {
    Provided(&'a TokenProvider),
    Signed { key: &'a str, secret: &'a str },
    Unavailable,
}

impl<'a> CredentialSource<'a> {
    pub fn resolve(config: &'a ClientConfiguration) -> Self {
        if let Some(provider) = &config.token_provider {
            return Self::Provided(provider);
        }
        match (config.api_key.as_deref(), config.api_secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Self::Signed { key, secret }
            }
            _ => Self::Unavailable,
        }
    }
}

/// Obtain a token for `params` according to the client's configuration.
///
/// Provider errors come back as [`SdkError::TokenProvider`] holding the
/// provider's own error. A signing failure degrades to [`fallback_token`].
pub async fn acquire_token(
    config: &ClientConfiguration,
    params: &ConnectionParams,
) -> Result<String, SdkError> {
    match CredentialSource::resolve(config) {
        CredentialSource::Provided(provider) => {
            Logger::info("Using custom token provider", &[]);
            provider.fetch(params).await.map_err(SdkError::TokenProvider)
        }
        CredentialSource::Unavailable => Err(SdkError::Configuration(
            "API key and secret are required for server-side token generation, \
             or provide a custom token provider"
                .into(),
        )),
        CredentialSource::Signed { key, secret } => {
            if !config.host.can_sign_locally {
                return Err(SdkError::Environment(
                    "server-side token generation is not available on this host; \
                     provide a token provider that calls your token endpoint"
                        .into(),
                ));
            }
            match sign_grant(key, secret, params) {
                Ok(token) => Ok(token),
                Err(e) => {
                    Logger::warn(
                        "Using fallback token generation - implement server-side token generation for production",
                        &[("cause", &e.to_string())],
                    );
                    Ok(fallback_token(key, params))
                }
            }
        }
    }
}

/// Mint a signed access token granting join, publish, subscribe and
/// publish-data in `params.room_name`.
pub fn sign_grant(
    key: &str,
    secret: &str,
    params: &ConnectionParams,
) -> Result<String, AccessTokenError> {
    AccessToken::with_api_key(key, secret)
        .with_identity(&params.participant_identity)
        .with_metadata(params.participant_metadata.as_deref().unwrap_or_default())
        .with_grants(VideoGrants {
            room_join: true,
            room: params.room_name.clone(),
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
            ..Default::default()
        })
        .to_jwt()
}

/// Unsigned placeholder token: base64 of a JSON claim set.
///
/// Not accepted by a real server. Only kept so local demos keep running
/// when signing breaks.
pub fn fallback_token(key: &str, params: &ConnectionParams) -> String {
    let claims = serde_json::json!({
        "iss": key,
        "sub": params.participant_identity,
        "exp": chrono::Utc::now().timestamp() + FALLBACK_TTL_SECS,
        "room": params.room_name,
        "metadata": params.participant_metadata.as_deref().unwrap_or_default(),
    });
    STANDARD.encode(claims.to_string())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

/// Client for an HTTP token endpoint.
///
/// Posts the connection params as JSON and expects `{"token": "..."}` back;
/// errors come as `{"error": "...", "details": "..."}`.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    url: String,
    client: reqwest::Client,
}

impl TokenEndpoint {
    /// `url` is the full endpoint URL, e.g. `http://localhost:3000/api/token`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request_token(&self, params: &ConnectionParams) -> Result<String, TokenEndpointError> {
        Logger::debug(
            "Requesting token from endpoint",
            &[("url", &self.url), ("room_name", &params.room_name)],
        );

        let resp = self.client.post(&self.url).json(params).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body: Option<TokenResponse> = resp.json().await.ok();
            let message = body
                .and_then(|b| match (b.error, b.details) {
                    (Some(error), Some(details)) => Some(format!("{error} ({details})")),
                    (Some(error), None) => Some(error),
                    (None, details) => details,
                })
                .unwrap_or_else(|| status.to_string());
            return Err(TokenEndpointError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp.bytes().await?;
        let body: TokenResponse =
            serde_json::from_slice(&bytes).map_err(TokenEndpointError::Decode)?;
        body.token
            .filter(|t| !t.is_empty())
            .ok_or(TokenEndpointError::MissingToken)
    }

    /// Wrap this endpoint as a [`TokenProvider`].
    pub fn into_provider(self) -> TokenProvider {
        TokenProvider::new(move |params| {
            let endpoint = self.clone();
            async move { endpoint.request_token(&params).await }
        })
    }
}
