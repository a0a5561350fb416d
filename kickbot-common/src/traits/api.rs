use async_trait::async_trait;

use crate::error::Error;
use crate::models::discord::{DiscordEmbed, DiscordEmbedField, DiscordLinkButton};
use crate::models::kick::{KickChannel, KickLivestream};

/// Read surface of the Kick public API.
#[async_trait]
pub trait KickApi: Send + Sync {
    /// Channel lookup by human-readable slug. `Ok(None)` means the slug is
    /// unknown upstream; `Error::Fetch` is reserved for transport, HTTP, or
    /// parse failures.
    async fn fetch_channel(&self, token: &str, slug: &str) -> Result<Option<KickChannel>, Error>;

    /// Live session lookup by numeric broadcaster id. `Ok(None)` means the
    /// broadcaster is offline — the expected common case, not a failure.
    async fn fetch_livestream(
        &self,
        token: &str,
        broadcaster_user_id: i64,
    ) -> Result<Option<KickLivestream>, Error>;
}

/// Outcome of an edit against an existing notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// The stored message no longer exists (deleted by a moderator, channel
    /// purged). Callers skip the edit and never re-send.
    MessageGone,
}

/// The narrow slice of the chat platform the notifier consumes.
#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// Whether the guild and channel are currently reachable and the bot
    /// holds view + send permission there.
    async fn channel_sendable(&self, guild_id: &str, channel_id: &str) -> Result<bool, Error>;

    /// Sends a notification card; returns the new message id.
    async fn send_notification(
        &self,
        channel_id: &str,
        content: Option<&str>,
        embed: &DiscordEmbed,
        buttons: &[DiscordLinkButton],
    ) -> Result<String, Error>;

    /// Replaces the stored message's embed and buttons wholesale. The
    /// implementation re-fetches the message by id first.
    async fn edit_notification(
        &self,
        channel_id: &str,
        message_id: &str,
        embed: &DiscordEmbed,
        buttons: &[DiscordLinkButton],
    ) -> Result<EditOutcome, Error>;

    /// Replaces only the field list of the stored message's embed, keeping
    /// title, image, and components as they are.
    async fn edit_notification_fields(
        &self,
        channel_id: &str,
        message_id: &str,
        fields: &[DiscordEmbedField],
    ) -> Result<EditOutcome, Error>;
}
