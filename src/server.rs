use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use yt_data_client::YouTubeClient;
use yt_oauth::{Credential, CredentialStore, OAuthConfig};

use crate::fetch::{self, FetchRegistry};

/// Response header carrying the id of a spawned fetch
pub const FETCH_ID_HEADER: &str = "x-fetch-id";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub oauth: Arc<OAuthConfig>,
    pub store: CredentialStore,
    pub http: reqwest::Client,
    pub api_address: Arc<str>,
    pub fetches: FetchRegistry,
}

impl AppState {
    pub fn new(oauth: OAuthConfig, store: CredentialStore, api_address: &str) -> Self {
        Self {
            oauth: Arc::new(oauth),
            store,
            http: reqwest::Client::new(),
            api_address: Arc::from(api_address),
            fetches: FetchRegistry::new(),
        }
    }

    fn youtube_client(&self, credential: &Credential) -> YouTubeClient {
        YouTubeClient::new(
            self.http.clone(),
            self.api_address.as_ref(),
            credential.authorization_header(),
        )
    }

    async fn spawn_fetch(&self, credential: &Credential) -> Uuid {
        fetch::spawn_fetch(&self.fetches, self.youtube_client(credential), credential).await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/liked", get(liked))
        .route("/oauth2callback", get(oauth_callback))
        .route("/fetches/:id", get(fetch_status))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// `302 Found` redirect
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn with_fetch_id(id: Uuid, body: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        headers.insert(FETCH_ID_HEADER, value);
    }
    (StatusCode::OK, headers, body).into_response()
}

/// GET /login - Redirect to the consent screen
async fn login(State(state): State<AppState>) -> Response {
    let auth_url = yt_oauth::generate_auth_url(&state.oauth);
    tracing::debug!(%auth_url, "Redirecting to consent screen");
    found(&auth_url)
}

/// GET /liked - Fetch with the stored credential, or start the flow if there is none
async fn liked(State(state): State<AppState>) -> Response {
    match state.store.load().await {
        Ok(credential) => {
            let id = state.spawn_fetch(&credential).await;
            tracing::info!(fetch_id = %id, "Fetch triggered from stored credential");
            with_fetch_id(id, "Liked videos fetched!")
        }
        Err(e) if e.is_not_found() => {
            tracing::info!("No stored credential, redirecting to /login");
            found("/login")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load stored credential");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error retrieving access token: {e}"),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthCallback {
    code: Option<String>,
    error: Option<String>,
}

/// GET /oauth2callback - Exchange the code, store the credential and start a fetch
async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<AuthCallback>,
) -> Response {
    if let Some(error) = params.error {
        tracing::warn!(%error, "Authorization denied by provider");
        return (
            StatusCode::BAD_REQUEST,
            format!("Error: authorization denied ({error})."),
        )
            .into_response();
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("Callback received without authorization code");
        return (
            StatusCode::BAD_REQUEST,
            "Error: No authorization code received.",
        )
            .into_response();
    };

    let credential = match yt_oauth::exchange_code(&state.http, &state.oauth, &code).await {
        Ok(credential) => credential,
        Err(e) => {
            tracing::error!(error = %e, "Code exchange failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error retrieving access token: {e}"),
            )
                .into_response();
        }
    };

    if let Err(e) = state.store.save(&credential).await {
        tracing::error!(error = %e, "Failed to store credential");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error saving access token: {e}"),
        )
            .into_response();
    }

    tracing::info!(path = %state.store.path().display(), "Credential stored");

    let id = state.spawn_fetch(&credential).await;
    with_fetch_id(
        id,
        "Authorization successful! You can now close this window.",
    )
}

/// GET /fetches/:id - Status of a background fetch
async fn fetch_status(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.fetches.get(id).await {
        Some(status) => Json(status).into_response(),
        None => (StatusCode::NOT_FOUND, format!("Unknown fetch id: {id}")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Form,
        body::{Body, to_bytes},
        http::Request,
        routing::post,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    use crate::fetch::FetchState;

    /// Stand-in for both the Google token endpoint and the Data API
    async fn spawn_provider() -> String {
        async fn token(Form(params): Form<HashMap<String, String>>) -> Response {
            match params.get("code").map(String::as_str) {
                Some("XYZ") => Json(json!({
                    "access_token": "ya29.granted",
                    "expires_in": 3599,
                    "refresh_token": "1//refresh",
                    "scope": "https://www.googleapis.com/auth/youtube.readonly",
                    "token_type": "Bearer"
                }))
                .into_response(),
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant"})),
                )
                    .into_response(),
            }
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/token", post(token))
            .route(
                "/youtube/v3/playlists",
                get(|| async { Json(json!({"items": [{"id": "PL1", "snippet": {"title": "Mix"}}]})) }),
            )
            .route(
                "/youtube/v3/playlistItems",
                get(|| async {
                    Json(json!({"items": [{"id": "i", "snippet": {"title": "Song", "resourceId": {"videoId": "v"}}}]}))
                }),
            );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    struct Harness {
        state: AppState,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        async fn new() -> Self {
            Self::with_token_path("token.json").await
        }

        async fn with_token_path(relative: &str) -> Self {
            let provider = spawn_provider().await;
            let dir = tempfile::tempdir().unwrap();
            let oauth = OAuthConfig::new(
                "client".to_string(),
                "secret".to_string(),
                "http://localhost:8000/oauth2callback".to_string(),
            )
            .with_endpoints(
                "https://accounts.google.com/o/oauth2/v2/auth",
                format!("{provider}/token"),
            );
            let store = CredentialStore::new(dir.path().join(relative));
            Self {
                state: AppState::new(oauth, store, &provider),
                _dir: dir,
            }
        }

        fn token_path(&self) -> std::path::PathBuf {
            self.state.store.path().to_path_buf()
        }

        async fn get(&self, uri: &str) -> Response {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            router(self.state.clone()).oneshot(request).await.unwrap()
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    fn fetch_id(response: &Response) -> Uuid {
        response
            .headers()
            .get(FETCH_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap()
    }

    async fn wait_for_completion(state: &AppState, id: Uuid) -> fetch::FetchStatus {
        for _ in 0..100 {
            if let Some(status) = state.fetches.get(id).await {
                if status.state == FetchState::Completed {
                    return status;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("fetch {id} did not complete");
    }

    #[tokio::test]
    async fn login_redirects_to_consent_screen() {
        let harness = Harness::new().await;

        let response = harness.get("/login").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let target = location(&response);
        assert!(target.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(target.contains("access_type=offline"));
        assert!(target.contains("youtube.readonly"));
    }

    #[tokio::test]
    async fn liked_without_credential_redirects_to_login() {
        let harness = Harness::new().await;

        let response = harness.get("/liked").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn liked_with_corrupt_credential_is_a_server_error() {
        let harness = Harness::new().await;
        std::fs::write(harness.token_path(), "not json").unwrap();

        let response = harness.get("/liked").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.starts_with("Error retrieving access token"));
    }

    #[tokio::test]
    async fn liked_with_credential_returns_fixed_text_and_tracks_fetch() {
        let harness = Harness::new().await;
        std::fs::write(
            harness.token_path(),
            r#"{"access_token":"ya29.saved","token_type":"Bearer"}"#,
        )
        .unwrap();

        let response = harness.get("/liked").await;

        assert_eq!(response.status(), StatusCode::OK);
        let id = fetch_id(&response);
        assert_eq!(body_text(response).await, "Liked videos fetched!");

        let status = wait_for_completion(&harness.state, id).await;
        assert_eq!(
            status.playlists,
            Some(fetch::ListOutcome::Succeeded { count: 1 })
        );
        assert_eq!(
            status.liked_videos,
            Some(fetch::ListOutcome::Succeeded { count: 1 })
        );
    }

    #[tokio::test]
    async fn callback_without_code_reports_error() {
        let harness = Harness::new().await;

        let response = harness.get("/oauth2callback").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("No authorization code"));
        assert!(!harness.token_path().exists());
    }

    #[tokio::test]
    async fn callback_with_provider_error_reports_denial() {
        let harness = Harness::new().await;

        let response = harness.get("/oauth2callback?error=access_denied").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("access_denied"));
    }

    #[tokio::test]
    async fn callback_with_rejected_code_leaves_credential_untouched() {
        let harness = Harness::new().await;
        let existing = r#"{"access_token":"ya29.old","token_type":"Bearer"}"#;
        std::fs::write(harness.token_path(), existing).unwrap();

        let response = harness.get("/oauth2callback?code=nope").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("invalid_grant"));
        assert_eq!(std::fs::read_to_string(harness.token_path()).unwrap(), existing);
    }

    #[tokio::test]
    async fn callback_with_accepted_code_stores_exchanged_credential() {
        let harness = Harness::new().await;

        let response = harness.get("/oauth2callback?code=XYZ").await;

        assert_eq!(response.status(), StatusCode::OK);
        let id = fetch_id(&response);
        assert!(body_text(response).await.starts_with("Authorization successful!"));

        let stored = harness.state.store.load().await.unwrap();
        assert_eq!(stored.access_token, "ya29.granted");
        assert_eq!(stored.refresh_token.as_deref(), Some("1//refresh"));

        wait_for_completion(&harness.state, id).await;
    }

    #[tokio::test]
    async fn callback_with_unwritable_token_path_reports_save_failure() {
        let harness = Harness::with_token_path("missing/token.json").await;

        let response = harness.get("/oauth2callback?code=XYZ").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(FETCH_ID_HEADER).is_none());
        assert!(body_text(response).await.starts_with("Error saving access token"));
        assert!(!harness.token_path().exists());
    }

    #[tokio::test]
    async fn full_flow_reaches_authorized_state() {
        let harness = Harness::new().await;

        let response = harness.get("/liked").await;
        assert_eq!(location(&response), "/login");

        let response = harness.get("/login").await;
        assert!(response.status().is_redirection());

        let response = harness.get("/oauth2callback?code=XYZ").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(harness.token_path().exists());

        let response = harness.get("/liked").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::LOCATION).is_none());
        assert_eq!(body_text(response).await, "Liked videos fetched!");
    }

    #[tokio::test]
    async fn fetch_status_endpoint_reports_known_and_unknown_ids() {
        let harness = Harness::new().await;
        let id = harness.state.fetches.begin().await;

        let response = harness.get(&format!("/fetches/{id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["state"], "running");
        assert_eq!(body["id"], id.to_string());

        let response = harness.get(&format!("/fetches/{}", Uuid::new_v4())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
