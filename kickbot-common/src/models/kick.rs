use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response from the public "channels" endpoint.
#[derive(Debug, Deserialize)]
pub struct ChannelsResponse {
    #[serde(default)]
    pub data: Vec<KickChannel>,
}

/// Single channel record from a slug lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct KickChannel {
    pub broadcaster_user_id: i64,
    pub slug: String,
    #[serde(default)]
    pub category: Option<KickCategory>,
}

/// Response from the public "livestreams" endpoint. An empty `data` array
/// means the broadcaster is offline, which is the common case.
#[derive(Debug, Deserialize)]
pub struct LivestreamsResponse {
    #[serde(default)]
    pub data: Vec<KickLivestream>,
}

/// Single live session record.
#[derive(Debug, Clone, Deserialize)]
pub struct KickLivestream {
    pub broadcaster_user_id: i64,
    #[serde(default)]
    pub stream_title: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub viewer_count: Option<u64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub category: Option<KickCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickCategory {
    pub name: String,
}

impl KickLivestream {
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }
}
