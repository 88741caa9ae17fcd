//! Background fetch of the authorized user's playlists and liked videos.
//!
//! Each fetch gets an id that is returned to the HTTP client, attached to
//! every log line through a span, and used as the key of [`FetchRegistry`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;
use yt_data_client::{LIKED_VIDEOS_PLAYLIST_ID, YouTubeClient};
use yt_oauth::Credential;

/// Number of liked videos requested
pub const LIKED_VIDEOS_LIMIT: u32 = 10;

/// Number of fetch records kept in memory
const REGISTRY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    Running,
    Completed,
}

/// Outcome of one list call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ListOutcome {
    Succeeded { count: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchStatus {
    pub id: Uuid,
    pub state: FetchState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub playlists: Option<ListOutcome>,
    pub liked_videos: Option<ListOutcome>,
}

#[derive(Default)]
struct RegistryInner {
    entries: HashMap<Uuid, FetchStatus>,
    order: VecDeque<Uuid>,
}

/// In-memory record of recent fetches
#[derive(Clone, Default)]
pub struct FetchRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl FetchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running fetch and return its id
    pub async fn begin(&self) -> Uuid {
        let id = Uuid::new_v4();
        let status = FetchStatus {
            id,
            state: FetchState::Running,
            started_at: Utc::now(),
            finished_at: None,
            playlists: None,
            liked_videos: None,
        };

        let mut inner = self.inner.lock().await;
        if inner.order.len() >= REGISTRY_CAPACITY {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.order.push_back(id);
        inner.entries.insert(id, status);
        id
    }

    pub async fn finish(&self, id: Uuid, playlists: ListOutcome, liked_videos: ListOutcome) {
        let mut inner = self.inner.lock().await;
        if let Some(status) = inner.entries.get_mut(&id) {
            status.state = FetchState::Completed;
            status.finished_at = Some(Utc::now());
            status.playlists = Some(playlists);
            status.liked_videos = Some(liked_videos);
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<FetchStatus> {
        self.inner.lock().await.entries.get(&id).cloned()
    }
}

/// Hand a fetch off to a background task and return its id immediately
pub async fn spawn_fetch(
    registry: &FetchRegistry,
    client: YouTubeClient,
    credential: &Credential,
) -> Uuid {
    let id = registry.begin().await;

    if credential.is_expired() {
        tracing::warn!(fetch_id = %id, "Stored access token has expired; API calls will likely fail");
    }

    let registry = registry.clone();
    let span = tracing::info_span!("fetch", fetch_id = %id);
    tokio::spawn(
        async move {
            let (playlists, liked_videos) = fetch_liked_videos(&client).await;
            registry.finish(id, playlists, liked_videos).await;
            tracing::info!("Fetch finished");
        }
        .instrument(span),
    );

    id
}

/// Run both list calls concurrently; a failure in one does not stop the other
pub async fn fetch_liked_videos(client: &YouTubeClient) -> (ListOutcome, ListOutcome) {
    tracing::info!("Fetching liked videos...");
    tokio::join!(log_playlists(client), log_liked_videos(client))
}

async fn log_playlists(client: &YouTubeClient) -> ListOutcome {
    match client.list_my_playlists().await {
        Ok(page) => {
            for playlist in &page.items {
                tracing::info!(
                    playlist_id = %playlist.id,
                    title = playlist.title(),
                    url = %playlist.browse_url(),
                    "Playlist"
                );
            }
            ListOutcome::Succeeded {
                count: page.items.len(),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Error fetching playlists");
            ListOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

async fn log_liked_videos(client: &YouTubeClient) -> ListOutcome {
    match client
        .list_playlist_items(LIKED_VIDEOS_PLAYLIST_ID, LIKED_VIDEOS_LIMIT)
        .await
    {
        Ok(page) => {
            for video in &page.items {
                match video.watch_url() {
                    Some(url) => tracing::info!(title = video.title(), %url, "Liked video"),
                    None => tracing::info!(title = video.title(), "Liked video without video id"),
                }
            }
            ListOutcome::Succeeded {
                count: page.items.len(),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Error fetching liked videos");
            ListOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}
