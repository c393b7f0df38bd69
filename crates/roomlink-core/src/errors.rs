use thiserror::Error;

/// Boxed error returned by caller-supplied token providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("environment error: {0}")]
    Environment(String),
    #[error("invalid connection params: {0}")]
    InvalidParams(String),
    /// The token provider failed; its error is passed through untouched.
    #[error(transparent)]
    TokenProvider(BoxError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to initialize room client: {0}")]
    Initialization(#[source] Box<SdkError>),
}

/// Failures reported by the wrapped session object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("disconnect failed: {0}")]
    Disconnect(String),
}

/// Failures talking to a remote token endpoint.
#[derive(Debug, Error)]
pub enum TokenEndpointError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid token endpoint response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("token endpoint response did not contain a token")]
    MissingToken,
}
