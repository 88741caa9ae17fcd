use thiserror::Error;

/// Errors raised while talking to the OAuth token endpoint.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token endpoint returned status {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by [`crate::CredentialStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no stored credential at '{0}'")]
    NotFound(String),

    #[error("failed to read credential file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write credential file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credential file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize credential: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
