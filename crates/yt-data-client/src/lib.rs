mod types;

pub use types::*;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Default REST API address
pub const DEFAULT_API_ADDRESS: &str = "https://www.googleapis.com";

#[derive(Debug, Error)]
pub enum DataApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API request failed (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse API response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only YouTube Data API v3 client authorized with a bearer credential
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    api_address: String,
    authorization: String,
}

impl YouTubeClient {
    /// `authorization` is the full `Authorization` header value, e.g. `Bearer ya29...`
    pub fn new(
        http: reqwest::Client,
        api_address: impl Into<String>,
        authorization: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_address: api_address.into().trim_end_matches('/').to_string(),
            authorization: authorization.into(),
        }
    }

    /// `playlists.list` for the authorized user's own playlists.
    ///
    /// Only the first page is returned; the page size is the API default.
    pub async fn list_my_playlists(&self) -> Result<ListResponse<Playlist>, DataApiError> {
        self.get("playlists", &[("part", "snippet"), ("mine", "true")])
            .await
    }

    /// `playlistItems.list` for one playlist, capped at `max_results` items
    pub async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
    ) -> Result<ListResponse<PlaylistItem>, DataApiError> {
        let max_results = max_results.to_string();
        self.get(
            "playlistItems",
            &[
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", max_results.as_str()),
            ],
        )
        .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DataApiError> {
        let url = format!("{}/youtube/v3/{}", self.api_address, resource);
        tracing::debug!(%url, "Calling YouTube Data API");

        let response = self
            .http
            .get(&url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DataApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
