mod credential;
mod error;
mod store;

pub use credential::Credential;
use credential::now_millis;
pub use error::{OAuthError, StoreError};
pub use store::CredentialStore;

/// Default Google authorization endpoint
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Default Google token endpoint
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Read-only access to the user's YouTube account
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// OAuth configuration
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect URI for OAuth callback
    pub redirect_uri: String,
    /// OAuth scope(s)
    pub scope: String,
    /// Consent screen endpoint
    pub auth_endpoint: String,
    /// Code exchange endpoint
    pub token_endpoint: String,
}

impl OAuthConfig {
    /// Create new OAuth configuration with YouTube read-only defaults
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            scope: YOUTUBE_READONLY_SCOPE.to_string(),
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoints(
        mut self,
        auth_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        self.auth_endpoint = auth_endpoint.into();
        self.token_endpoint = token_endpoint.into();
        self
    }
}

/// Generate the consent screen URL requesting offline access
pub fn generate_auth_url(config: &OAuthConfig) -> String {
    let separator = if config.auth_endpoint.contains('?') {
        '&'
    } else {
        '?'
    };

    format!(
        "{}{}\
        access_type=offline&\
        scope={}&\
        response_type=code&\
        client_id={}&\
        redirect_uri={}",
        config.auth_endpoint,
        separator,
        urlencoding::encode(&config.scope),
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
    )
}

/// Exchange authorization code for a credential
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<Credential, OAuthError> {
    tracing::info!("Exchanging authorization code for tokens...");

    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];

    let response = client
        .post(&config.token_endpoint)
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(OAuthError::TokenEndpoint {
            status: status.as_u16(),
            body,
        });
    }

    let credential = Credential::from_token_response(&body, now_millis())?;

    tracing::info!(
        has_refresh_token = credential.refresh_token.is_some(),
        "Successfully obtained OAuth tokens"
    );

    Ok(credential)
}
