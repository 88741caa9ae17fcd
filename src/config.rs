use clap::{Parser, ValueEnum};
use yt_oauth::{DEFAULT_AUTH_ENDPOINT, DEFAULT_TOKEN_ENDPOINT, OAuthConfig};

/// YouTube Liked Fetcher - Authorize with Google and log your playlists and liked videos
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// OAuth client ID
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Redirect URI registered for the OAuth client (default: http://localhost:<port>/oauth2callback)
    #[arg(long, env = "REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Address to bind the HTTP server to
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path of the JSON file holding the OAuth credential
    #[arg(long, env = "TOKEN_PATH", default_value = "token.json")]
    pub token_path: String,

    /// YouTube Data API base address
    #[arg(long, env = "REST_API_ADDRESS", default_value = yt_data_client::DEFAULT_API_ADDRESS)]
    pub rest_api_address: String,

    /// OAuth consent screen endpoint
    #[arg(long, env = "OAUTH_AUTH_ENDPOINT", default_value = DEFAULT_AUTH_ENDPOINT)]
    pub auth_endpoint: String,

    /// OAuth token endpoint
    #[arg(long, env = "OAUTH_TOKEN_ENDPOINT", default_value = DEFAULT_TOKEN_ENDPOINT)]
    pub token_endpoint: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Args {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Build the OAuth client configuration.
    ///
    /// Missing client credentials are not fatal here: the provider rejects
    /// the first request made with them.
    pub fn oauth_config(&self) -> OAuthConfig {
        if self.client_id.is_none() {
            tracing::warn!("CLIENT_ID is not set; the authorization flow will fail");
        }
        if self.client_secret.is_none() {
            tracing::warn!("CLIENT_SECRET is not set; the code exchange will fail");
        }

        let redirect_uri = self
            .redirect_uri
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}/oauth2callback", self.port));

        OAuthConfig::new(
            self.client_id.clone().unwrap_or_default(),
            self.client_secret.clone().unwrap_or_default(),
            redirect_uri,
        )
        .with_endpoints(&self.auth_endpoint, &self.token_endpoint)
    }
}
