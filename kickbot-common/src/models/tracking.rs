use chrono::{DateTime, Utc};

/// One tracked Kick streamer within one Discord guild.
///
/// Keyed by `(guild_id, streamer_id)`; a guild can track a given streamer
/// at most once. `was_live` and the `last_stream_*` snapshot are owned by
/// the reconciliation engine and must not be mutated anywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedStream {
    pub guild_id: String,
    /// Discord channel the notification card is posted in.
    pub channel_id: String,
    /// Kick numeric broadcaster user id.
    pub streamer_id: i64,
    /// Kick channel slug, e.g. "xqc".
    pub streamer_name: String,

    /// Last observed live state.
    pub was_live: bool,

    /// Snapshot of the most recent live session, retained while live so the
    /// went-offline summary can be rendered, then cleared.
    pub last_stream_started_at: Option<DateTime<Utc>>,
    pub last_stream_title: Option<String>,
    pub last_stream_thumbnail: Option<String>,

    /// Optional role to mention in the notification content.
    pub role_id: Option<String>,
    /// Optional custom text prepended to the notification.
    pub custom_message: Option<String>,

    /// Discord message id of the current notification card; set on the
    /// first successful went-live send and edited in place afterwards.
    pub notification_message_id: Option<String>,

    /// Best-effort category name, display only.
    pub last_category: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedStream {
    /// Stable composite key, e.g. `"123456789:42"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.guild_id, self.streamer_id)
    }

    pub fn channel_url(&self) -> String {
        format!("https://kick.com/{}", self.streamer_name)
    }
}
