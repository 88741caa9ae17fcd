use serde::{Deserialize, Serialize};

/// Reserved playlist id of the authenticated user's liked videos
pub const LIKED_VIDEOS_PLAYLIST_ID: &str = "LL";

/// One page of a `*.list` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub results_per_page: Option<u64>,
}

/// Playlist resource (snippet part only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<PlaylistSnippet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl Playlist {
    pub fn title(&self) -> &str {
        self.snippet.as_ref().map(|s| s.title.as_str()).unwrap_or("")
    }

    /// Browser URL of the playlist
    pub fn browse_url(&self) -> String {
        format!("https://www.youtube.com/playlist?list={}", self.id)
    }
}

/// PlaylistItem resource (snippet part only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<PlaylistItemSnippet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
}

impl PlaylistItem {
    pub fn title(&self) -> &str {
        self.snippet.as_ref().map(|s| s.title.as_str()).unwrap_or("")
    }

    pub fn video_id(&self) -> Option<&str> {
        self.snippet
            .as_ref()
            .and_then(|s| s.resource_id.as_ref())
            .and_then(|r| r.video_id.as_deref())
    }

    /// Watch URL of the underlying video, if the item points at one
    pub fn watch_url(&self) -> Option<String> {
        self.video_id()
            .map(|id| format!("https://www.youtube.com/watch?v={id}"))
    }
}
