use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{info, warn};

use kickbot_common::models::kick::KickLivestream;
use kickbot_common::models::tracking::TrackedStream;
use kickbot_common::traits::api::KickApi;
use kickbot_common::traits::auth_traits::TokenProvider;
use kickbot_common::traits::repository_traits::TrackedStreamRepository;

use crate::Error;

/// Validated input for tracking a new streamer in a guild.
#[derive(Debug, Clone)]
pub struct AddTrackedStream {
    pub guild_id: String,
    pub channel_id: String,
    pub streamer_slug: String,
    pub role_id: Option<String>,
    pub custom_message: Option<String>,
}

/// CRUD over the tracked-streamer set, invoked from the command surface.
/// Slugs are resolved upstream before any store mutation, so a record
/// always carries the canonical numeric broadcaster id.
pub struct TrackingService {
    repo: Arc<dyn TrackedStreamRepository>,
    tokens: Arc<dyn TokenProvider>,
    kick: Arc<dyn KickApi>,
}

impl TrackingService {
    pub fn new(
        repo: Arc<dyn TrackedStreamRepository>,
        tokens: Arc<dyn TokenProvider>,
        kick: Arc<dyn KickApi>,
    ) -> Self {
        Self { repo, tokens, kick }
    }

    /// Adds a tracking record. Fails with `Error::NotFound` when the slug
    /// is unknown on Kick and `Error::Duplicate` when the guild already
    /// tracks the streamer; the existing record is left untouched.
    pub async fn add_tracked_stream(&self, req: AddTrackedStream) -> Result<TrackedStream, Error> {
        let token = self.tokens.get_token().await?;
        let channel = self
            .kick
            .fetch_channel(&token, &req.streamer_slug)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("no Kick streamer found with name '{}'", req.streamer_slug))
            })?;

        let now = Utc::now();
        let record = TrackedStream {
            guild_id: req.guild_id,
            channel_id: req.channel_id,
            streamer_id: channel.broadcaster_user_id,
            streamer_name: channel.slug.clone(),
            was_live: false,
            last_stream_started_at: None,
            last_stream_title: None,
            last_stream_thumbnail: None,
            role_id: req.role_id,
            custom_message: req.custom_message,
            notification_message_id: None,
            last_category: channel.category.map(|c| c.name),
            created_at: now,
            updated_at: now,
        };

        self.repo.add(&record).await?;
        info!(
            "Tracking added for {} (guild {})",
            record.streamer_name, record.guild_id
        );
        Ok(record)
    }

    /// Removes the guild's record for the given slug. The slug is resolved
    /// upstream first so renames don't strand records addressed by name.
    pub async fn remove_tracked_stream(
        &self,
        guild_id: &str,
        streamer_slug: &str,
    ) -> Result<TrackedStream, Error> {
        let token = self.tokens.get_token().await?;
        let channel = self
            .kick
            .fetch_channel(&token, streamer_slug)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("no Kick streamer found with name '{streamer_slug}'"))
            })?;

        let existing = self
            .repo
            .get(guild_id, channel.broadcaster_user_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "'{streamer_slug}' is not tracked in this guild"
                ))
            })?;

        self.repo.remove(guild_id, channel.broadcaster_user_id).await?;
        info!("Tracking removed for {streamer_slug} (guild {guild_id})");
        Ok(existing)
    }

    pub async fn list_tracked_streams(&self, guild_id: &str) -> Result<Vec<TrackedStream>, Error> {
        self.repo.list_for_guild(guild_id).await
    }

    /// The guild's records paired with their current live session, for the
    /// list command. Viewer lookups are best-effort: a failed fetch leaves
    /// that entry's status as `None` rather than failing the overview.
    pub async fn live_overview(
        &self,
        guild_id: &str,
    ) -> Result<Vec<(TrackedStream, Option<KickLivestream>)>, Error> {
        let records = self.repo.list_for_guild(guild_id).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.tokens.get_token().await?;
        let lookups = records.into_iter().map(|record| {
            let token = token.clone();
            async move {
                let live = match self.kick.fetch_livestream(&token, record.streamer_id).await {
                    Ok(live) => live,
                    Err(e) => {
                        warn!(
                            "Viewer lookup failed for {}: {e:?}",
                            record.streamer_name
                        );
                        None
                    }
                };
                (record, live)
            }
        });

        Ok(join_all(lookups).await)
    }
}
