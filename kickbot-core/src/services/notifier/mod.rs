// The poll-driven reconciliation engine: compares each record's persisted
// live state against a fresh fetch and sends, edits, or leaves the
// notification card alone accordingly.

pub mod render;
pub mod transitions;

use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use kickbot_common::models::kick::KickLivestream;
use kickbot_common::models::tracking::TrackedStream;
use kickbot_common::traits::api::{DiscordApi, EditOutcome, KickApi};
use kickbot_common::traits::auth_traits::TokenProvider;
use kickbot_common::traits::repository_traits::TrackedStreamRepository;

use crate::Error;
use self::transitions::{LiveState, Transition};

/// Per-record checks running at once within a tick. Records own disjoint
/// keys, so they may proceed concurrently; work on a single record stays
/// sequential inside its own future.
const MAX_CONCURRENT_CHECKS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Unchanged,
    Sent,
    Edited,
    Skipped,
}

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub checked: usize,
    pub sent: usize,
    pub edited: usize,
    pub skipped: usize,
}

pub struct StreamNotifier {
    repo: Arc<dyn TrackedStreamRepository>,
    tokens: Arc<dyn TokenProvider>,
    kick: Arc<dyn KickApi>,
    discord: Arc<dyn DiscordApi>,
    invite_url: String,
}

impl StreamNotifier {
    pub fn new(
        repo: Arc<dyn TrackedStreamRepository>,
        tokens: Arc<dyn TokenProvider>,
        kick: Arc<dyn KickApi>,
        discord: Arc<dyn DiscordApi>,
        invite_url: String,
    ) -> Self {
        Self {
            repo,
            tokens,
            kick,
            discord,
            invite_url,
        }
    }

    /// One full poll-and-reconcile pass over all tracked records.
    ///
    /// Only a store scan failure or a token issuance failure aborts the
    /// pass; everything below that is caught at the per-record boundary so
    /// one bad record never stops the rest. The caller logs the error and
    /// retries on the next tick.
    pub async fn run_tick(&self) -> Result<TickSummary, Error> {
        let records = self.repo.list_all().await?;
        info!("Checking {} tracked stream(s)", records.len());

        if records.is_empty() {
            return Ok(TickSummary::default());
        }

        // One token for the whole fan-out.
        let token = self.tokens.get_token().await?;

        let outcomes: Vec<RecordOutcome> = stream::iter(records)
            .map(|record| {
                let token = token.as_str();
                async move { self.process_record(token, record).await }
            })
            .buffer_unordered(MAX_CONCURRENT_CHECKS)
            .collect()
            .await;

        let mut summary = TickSummary::default();
        for outcome in outcomes {
            summary.checked += 1;
            match outcome {
                RecordOutcome::Sent => summary.sent += 1,
                RecordOutcome::Edited => summary.edited += 1,
                RecordOutcome::Skipped => summary.skipped += 1,
                RecordOutcome::Unchanged => {}
            }
        }
        info!(
            "Stream update pass complete: {} checked, {} sent, {} edited, {} skipped",
            summary.checked, summary.sent, summary.edited, summary.skipped
        );
        Ok(summary)
    }

    /// Error boundary around one record: failures are logged and become a
    /// skip, to be retried on the next tick with state untouched.
    async fn process_record(&self, token: &str, record: TrackedStream) -> RecordOutcome {
        let key = record.key();
        match self.check_record(token, &record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Skipping tracked stream {key} this tick: {e:?}");
                RecordOutcome::Skipped
            }
        }
    }

    async fn check_record(
        &self,
        token: &str,
        record: &TrackedStream,
    ) -> Result<RecordOutcome, Error> {
        if !self
            .discord
            .channel_sendable(&record.guild_id, &record.channel_id)
            .await?
        {
            debug!(
                "Channel {} in guild {} not sendable; skipping {}",
                record.channel_id, record.guild_id, record.streamer_name
            );
            return Ok(RecordOutcome::Skipped);
        }

        // A fetch failure means "unknown" - skip the record with state
        // untouched and let the next tick retry.
        let live = match self.kick.fetch_livestream(token, record.streamer_id).await {
            Ok(live) => live,
            Err(e) => {
                warn!(
                    "Livestream fetch failed for {}; retrying next tick: {e:?}",
                    record.streamer_name
                );
                return Ok(RecordOutcome::Skipped);
            }
        };

        let previous = LiveState::from_flag(record.was_live);
        let current = LiveState::from_flag(live.is_some());

        match (Transition::between(previous, current), live) {
            (Transition::WentLive, Some(live)) => self.announce_went_live(record, &live).await,
            (Transition::StillLive, Some(live)) => self.refresh_live_card(record, &live).await,
            (Transition::WentOffline, _) => self.finish_session(record).await,
            _ => Ok(RecordOutcome::Unchanged),
        }
    }

    /// offline -> live: send a fresh card, then persist the new state with
    /// the session snapshot and the sent message id.
    async fn announce_went_live(
        &self,
        record: &TrackedStream,
        live: &KickLivestream,
    ) -> Result<RecordOutcome, Error> {
        info!("{} went live; sending notification", record.streamer_name);

        let parts = render::went_live(record, live, &self.invite_url);
        let message_id = self
            .discord
            .send_notification(
                &record.channel_id,
                parts.content.as_deref(),
                &parts.embed,
                &parts.buttons,
            )
            .await?;

        let mut updated = record.clone();
        updated.was_live = true;
        updated.last_stream_started_at = Some(live.started_at);
        updated.last_stream_title = live.stream_title.clone();
        updated.last_stream_thumbnail = live.thumbnail.clone();
        updated.last_category = live.category_name().map(str::to_string);
        updated.notification_message_id = Some(message_id);
        updated.updated_at = Utc::now();
        self.repo.update(&updated).await?;

        Ok(RecordOutcome::Sent)
    }

    /// live -> live: refresh category/viewers on the existing card. Always
    /// edits, even when nothing changed. No state to persist.
    async fn refresh_live_card(
        &self,
        record: &TrackedStream,
        live: &KickLivestream,
    ) -> Result<RecordOutcome, Error> {
        let Some(message_id) = record.notification_message_id.as_deref() else {
            return Ok(RecordOutcome::Unchanged);
        };

        let fields = render::live_update_fields(live);
        match self
            .discord
            .edit_notification_fields(&record.channel_id, message_id, &fields)
            .await?
        {
            EditOutcome::Edited => Ok(RecordOutcome::Edited),
            EditOutcome::MessageGone => {
                debug!(
                    "Notification message {} for {} is gone; not re-sending",
                    message_id, record.streamer_name
                );
                Ok(RecordOutcome::Unchanged)
            }
        }
    }

    /// live -> offline: rewrite the card into a session summary, then clear
    /// the snapshot. The state update persists even when the message has
    /// vanished - a lost card is never re-sent.
    async fn finish_session(&self, record: &TrackedStream) -> Result<RecordOutcome, Error> {
        let mut edited = false;

        if let Some(message_id) = record.notification_message_id.as_deref() {
            info!(
                "{} went offline; rewriting notification into summary",
                record.streamer_name
            );
            let parts = render::went_offline(record, Utc::now(), &self.invite_url);
            match self
                .discord
                .edit_notification(&record.channel_id, message_id, &parts.embed, &parts.buttons)
                .await?
            {
                EditOutcome::Edited => edited = true,
                EditOutcome::MessageGone => {
                    debug!(
                        "Notification message {} for {} is gone; skipping summary edit",
                        message_id, record.streamer_name
                    );
                }
            }
        }

        let mut updated = record.clone();
        updated.was_live = false;
        updated.last_stream_started_at = None;
        updated.last_stream_title = None;
        updated.last_stream_thumbnail = None;
        updated.updated_at = Utc::now();
        self.repo.update(&updated).await?;

        if edited {
            Ok(RecordOutcome::Edited)
        } else {
            Ok(RecordOutcome::Unchanged)
        }
    }
}
