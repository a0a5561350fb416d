//! tests/notifier_tests.rs
//!
//! Exercises the reconciliation engine against in-memory collaborators:
//! every send/edit is recorded, every state write observable.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use kickbot_common::models::discord::{DiscordEmbed, DiscordEmbedField, DiscordLinkButton};
use kickbot_common::models::kick::{KickCategory, KickChannel, KickLivestream};
use kickbot_common::models::tracking::TrackedStream;
use kickbot_common::traits::api::{DiscordApi, EditOutcome, KickApi};
use kickbot_common::traits::auth_traits::TokenProvider;
use kickbot_common::traits::repository_traits::TrackedStreamRepository;
use kickbot_common::Error;
use kickbot_core::services::notifier::StreamNotifier;

// ---------- Mock repository ----------

#[derive(Default)]
struct MemoryTrackedStreamRepository {
    records: Mutex<HashMap<(String, i64), TrackedStream>>,
}

impl MemoryTrackedStreamRepository {
    fn insert(&self, record: TrackedStream) {
        self.records
            .lock()
            .unwrap()
            .insert((record.guild_id.clone(), record.streamer_id), record);
    }

    fn get_record(&self, guild_id: &str, streamer_id: i64) -> Option<TrackedStream> {
        self.records
            .lock()
            .unwrap()
            .get(&(guild_id.to_string(), streamer_id))
            .cloned()
    }

    fn delete(&self, guild_id: &str, streamer_id: i64) {
        self.records
            .lock()
            .unwrap()
            .remove(&(guild_id.to_string(), streamer_id));
    }
}

#[async_trait]
impl TrackedStreamRepository for MemoryTrackedStreamRepository {
    async fn add(&self, record: &TrackedStream) -> Result<(), Error> {
        let mut lock = self.records.lock().unwrap();
        let key = (record.guild_id.clone(), record.streamer_id);
        if lock.contains_key(&key) {
            return Err(Error::Duplicate(format!(
                "'{}' is already tracked in guild {}",
                record.streamer_name, record.guild_id
            )));
        }
        lock.insert(key, record.clone());
        Ok(())
    }

    async fn remove(&self, guild_id: &str, streamer_id: i64) -> Result<(), Error> {
        let mut lock = self.records.lock().unwrap();
        match lock.remove(&(guild_id.to_string(), streamer_id)) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!(
                "no tracked stream for streamer {streamer_id} in guild {guild_id}"
            ))),
        }
    }

    async fn get(&self, guild_id: &str, streamer_id: i64) -> Result<Option<TrackedStream>, Error> {
        Ok(self.get_record(guild_id, streamer_id))
    }

    async fn list_all(&self) -> Result<Vec<TrackedStream>, Error> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn list_for_guild(&self, guild_id: &str) -> Result<Vec<TrackedStream>, Error> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn update(&self, record: &TrackedStream) -> Result<(), Error> {
        let mut lock = self.records.lock().unwrap();
        let key = (record.guild_id.clone(), record.streamer_id);
        if !lock.contains_key(&key) {
            return Err(Error::NotFound(format!("no tracked stream for key {}", record.key())));
        }
        lock.insert(key, record.clone());
        Ok(())
    }
}

// ---------- Mock token provider ----------

struct MockTokenProvider {
    fail: bool,
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn get_token(&self) -> Result<String, Error> {
        if self.fail {
            Err(Error::Auth("token endpoint returned HTTP 500".into()))
        } else {
            Ok("test-token".into())
        }
    }
}

// ---------- Mock Kick API ----------

#[derive(Default)]
struct MockKickApi {
    livestreams: Mutex<HashMap<i64, KickLivestream>>,
    failing: Mutex<HashSet<i64>>,
}

impl MockKickApi {
    fn set_live(&self, live: KickLivestream) {
        self.livestreams
            .lock()
            .unwrap()
            .insert(live.broadcaster_user_id, live);
    }

    fn set_offline(&self, broadcaster_user_id: i64) {
        self.livestreams.lock().unwrap().remove(&broadcaster_user_id);
    }

    fn fail_for(&self, broadcaster_user_id: i64) {
        self.failing.lock().unwrap().insert(broadcaster_user_id);
    }
}

#[async_trait]
impl KickApi for MockKickApi {
    async fn fetch_channel(&self, _token: &str, _slug: &str) -> Result<Option<KickChannel>, Error> {
        Ok(None)
    }

    async fn fetch_livestream(
        &self,
        _token: &str,
        broadcaster_user_id: i64,
    ) -> Result<Option<KickLivestream>, Error> {
        if self.failing.lock().unwrap().contains(&broadcaster_user_id) {
            return Err(Error::Fetch(format!(
                "livestream lookup for {broadcaster_user_id}: HTTP 502"
            )));
        }
        Ok(self
            .livestreams
            .lock()
            .unwrap()
            .get(&broadcaster_user_id)
            .cloned())
    }
}

// ---------- Mock Discord API ----------

#[derive(Default)]
struct MockDiscordApi {
    unsendable_channels: Mutex<HashSet<String>>,
    gone_messages: Mutex<HashSet<String>>,
    sends: Mutex<Vec<(String, Option<String>, DiscordEmbed)>>,
    edits: Mutex<Vec<(String, String, DiscordEmbed)>>,
    field_edits: Mutex<Vec<(String, String, Vec<DiscordEmbedField>)>>,
    next_message_id: AtomicU64,
}

impl MockDiscordApi {
    fn mark_unsendable(&self, channel_id: &str) {
        self.unsendable_channels
            .lock()
            .unwrap()
            .insert(channel_id.to_string());
    }

    fn mark_message_gone(&self, message_id: &str) {
        self.gone_messages
            .lock()
            .unwrap()
            .insert(message_id.to_string());
    }

    fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }

    fn field_edit_count(&self) -> usize {
        self.field_edits.lock().unwrap().len()
    }
}

#[async_trait]
impl DiscordApi for MockDiscordApi {
    async fn channel_sendable(&self, _guild_id: &str, channel_id: &str) -> Result<bool, Error> {
        Ok(!self.unsendable_channels.lock().unwrap().contains(channel_id))
    }

    async fn send_notification(
        &self,
        channel_id: &str,
        content: Option<&str>,
        embed: &DiscordEmbed,
        _buttons: &[DiscordLinkButton],
    ) -> Result<String, Error> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sends.lock().unwrap().push((
            channel_id.to_string(),
            content.map(str::to_string),
            embed.clone(),
        ));
        Ok(format!("msg-{id}"))
    }

    async fn edit_notification(
        &self,
        channel_id: &str,
        message_id: &str,
        embed: &DiscordEmbed,
        _buttons: &[DiscordLinkButton],
    ) -> Result<EditOutcome, Error> {
        if self.gone_messages.lock().unwrap().contains(message_id) {
            return Ok(EditOutcome::MessageGone);
        }
        self.edits.lock().unwrap().push((
            channel_id.to_string(),
            message_id.to_string(),
            embed.clone(),
        ));
        Ok(EditOutcome::Edited)
    }

    async fn edit_notification_fields(
        &self,
        channel_id: &str,
        message_id: &str,
        fields: &[DiscordEmbedField],
    ) -> Result<EditOutcome, Error> {
        if self.gone_messages.lock().unwrap().contains(message_id) {
            return Ok(EditOutcome::MessageGone);
        }
        self.field_edits.lock().unwrap().push((
            channel_id.to_string(),
            message_id.to_string(),
            fields.to_vec(),
        ));
        Ok(EditOutcome::Edited)
    }
}

// ---------- Helpers ----------

fn make_record(guild_id: &str, channel_id: &str, streamer_id: i64, name: &str) -> TrackedStream {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
    TrackedStream {
        guild_id: guild_id.into(),
        channel_id: channel_id.into(),
        streamer_id,
        streamer_name: name.into(),
        was_live: false,
        last_stream_started_at: None,
        last_stream_title: None,
        last_stream_thumbnail: None,
        role_id: None,
        custom_message: None,
        notification_message_id: None,
        last_category: None,
        created_at: now,
        updated_at: now,
    }
}

fn make_live(streamer_id: i64, title: &str, viewers: u64) -> KickLivestream {
    KickLivestream {
        broadcaster_user_id: streamer_id,
        stream_title: Some(title.into()),
        started_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
        viewer_count: Some(viewers),
        thumbnail: Some("https://example.com/thumb.jpg".into()),
        category: Some(KickCategory {
            name: "Just Chatting".into(),
        }),
    }
}

struct Harness {
    repo: Arc<MemoryTrackedStreamRepository>,
    kick: Arc<MockKickApi>,
    discord: Arc<MockDiscordApi>,
    notifier: StreamNotifier,
}

fn harness() -> Harness {
    harness_with_token(false)
}

fn harness_with_token(fail_token: bool) -> Harness {
    let repo = Arc::new(MemoryTrackedStreamRepository::default());
    let kick = Arc::new(MockKickApi::default());
    let discord = Arc::new(MockDiscordApi::default());
    let notifier = StreamNotifier::new(
        repo.clone(),
        Arc::new(MockTokenProvider { fail: fail_token }),
        kick.clone(),
        discord.clone(),
        "https://example.com/invite".into(),
    );
    Harness {
        repo,
        kick,
        discord,
        notifier,
    }
}

// ---------- Tests ----------

#[tokio::test]
async fn went_live_sends_once_and_updates_record() {
    let h = harness();
    h.repo.insert(make_record("g1", "c1", 42, "teststreamer"));
    h.kick.set_live(make_live(42, "Speedrunning", 512));

    let summary = h.notifier.run_tick().await.unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(h.discord.send_count(), 1);
    assert_eq!(h.discord.edit_count(), 0);

    let record = h.repo.get_record("g1", 42).unwrap();
    assert!(record.was_live);
    assert_eq!(record.notification_message_id.as_deref(), Some("msg-1"));
    assert!(record.last_stream_started_at.is_some());
    assert_eq!(record.last_stream_title.as_deref(), Some("Speedrunning"));
    assert_eq!(
        record.last_stream_thumbnail.as_deref(),
        Some("https://example.com/thumb.jpg")
    );
    assert_eq!(record.last_category.as_deref(), Some("Just Chatting"));
}

#[tokio::test]
async fn went_live_content_carries_role_mention_and_custom_message() {
    let h = harness();
    let mut record = make_record("g1", "c1", 42, "teststreamer");
    record.role_id = Some("777".into());
    record.custom_message = Some("we live!".into());
    h.repo.insert(record);
    h.kick.set_live(make_live(42, "Speedrunning", 512));

    h.notifier.run_tick().await.unwrap();

    let sends = h.discord.sends.lock().unwrap();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].1.as_deref(), Some("<@&777> we live!"));
}

#[tokio::test]
async fn went_offline_edits_and_clears_snapshot() {
    let h = harness();
    let mut record = make_record("g1", "c1", 42, "teststreamer");
    record.was_live = true;
    record.notification_message_id = Some("msg-1".into());
    record.last_stream_started_at = Some(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap());
    record.last_stream_title = Some("Speedrunning".into());
    record.last_stream_thumbnail = Some("https://example.com/thumb.jpg".into());
    h.repo.insert(record);
    // No livestream registered: the fetch reports offline.

    let summary = h.notifier.run_tick().await.unwrap();

    assert_eq!(summary.edited, 1);
    assert_eq!(h.discord.send_count(), 0);
    assert_eq!(h.discord.edit_count(), 1);

    let record = h.repo.get_record("g1", 42).unwrap();
    assert!(!record.was_live);
    assert!(record.last_stream_started_at.is_none());
    assert!(record.last_stream_title.is_none());
    assert!(record.last_stream_thumbnail.is_none());
    // The id of the most recent session's card is retained.
    assert_eq!(record.notification_message_id.as_deref(), Some("msg-1"));
}

#[tokio::test]
async fn still_live_always_edits_even_when_unchanged() {
    let h = harness();
    let mut record = make_record("g1", "c1", 42, "teststreamer");
    record.was_live = true;
    record.notification_message_id = Some("msg-1".into());
    record.last_stream_started_at = Some(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap());
    h.repo.insert(record);
    h.kick.set_live(make_live(42, "Speedrunning", 512));

    h.notifier.run_tick().await.unwrap();
    h.notifier.run_tick().await.unwrap();

    // Identical data both ticks, but the metadata refresh is issued anyway.
    assert_eq!(h.discord.field_edit_count(), 2);
    assert_eq!(h.discord.send_count(), 0);

    let record = h.repo.get_record("g1", 42).unwrap();
    assert!(record.was_live);
}

#[tokio::test]
async fn offline_steady_state_is_a_no_op() {
    let h = harness();
    h.repo.insert(make_record("g1", "c1", 42, "teststreamer"));

    let summary = h.notifier.run_tick().await.unwrap();

    assert_eq!(summary.checked, 1);
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.edited, 0);
    assert_eq!(h.discord.send_count(), 0);
    assert_eq!(h.discord.edit_count(), 0);
    assert_eq!(h.discord.field_edit_count(), 0);
}

#[tokio::test]
async fn fetch_failure_skips_only_that_record() {
    let h = harness();
    h.repo.insert(make_record("g1", "c1", 1, "one"));
    h.repo.insert(make_record("g1", "c1", 2, "two"));
    h.repo.insert(make_record("g1", "c1", 3, "three"));
    h.kick.set_live(make_live(1, "A", 10));
    h.kick.set_live(make_live(3, "C", 30));
    h.kick.fail_for(2);

    let summary = h.notifier.run_tick().await.unwrap();

    assert_eq!(summary.checked, 3);
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.skipped, 1);

    // The failing record's state is untouched and will be retried.
    let record = h.repo.get_record("g1", 2).unwrap();
    assert!(!record.was_live);
    assert!(record.notification_message_id.is_none());
}

#[tokio::test]
async fn unsendable_channel_skips_record_without_state_change() {
    let h = harness();
    h.repo.insert(make_record("g1", "dead-channel", 42, "teststreamer"));
    h.kick.set_live(make_live(42, "Speedrunning", 512));
    h.discord.mark_unsendable("dead-channel");

    let summary = h.notifier.run_tick().await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(h.discord.send_count(), 0);
    let record = h.repo.get_record("g1", 42).unwrap();
    assert!(!record.was_live);
}

#[tokio::test]
async fn vanished_message_on_offline_still_persists_state() {
    let h = harness();
    let mut record = make_record("g1", "c1", 42, "teststreamer");
    record.was_live = true;
    record.notification_message_id = Some("msg-1".into());
    record.last_stream_started_at = Some(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap());
    h.repo.insert(record);
    h.discord.mark_message_gone("msg-1");

    h.notifier.run_tick().await.unwrap();

    // No edit and, crucially, no replacement send.
    assert_eq!(h.discord.edit_count(), 0);
    assert_eq!(h.discord.send_count(), 0);

    let record = h.repo.get_record("g1", 42).unwrap();
    assert!(!record.was_live);
    assert!(record.last_stream_started_at.is_none());
}

#[tokio::test]
async fn token_failure_aborts_tick_before_any_record_work() {
    let h = harness_with_token(true);
    h.repo.insert(make_record("g1", "c1", 42, "teststreamer"));
    h.kick.set_live(make_live(42, "Speedrunning", 512));

    let result = h.notifier.run_tick().await;

    assert!(matches!(result, Err(Error::Auth(_))));
    assert_eq!(h.discord.send_count(), 0);
    let record = h.repo.get_record("g1", 42).unwrap();
    assert!(!record.was_live);
}

#[tokio::test]
async fn repeated_ticks_send_once_then_edit() {
    let h = harness();
    h.repo.insert(make_record("g1", "c1", 42, "teststreamer"));
    h.kick.set_live(make_live(42, "Speedrunning", 512));

    h.notifier.run_tick().await.unwrap();
    h.notifier.run_tick().await.unwrap();

    assert_eq!(h.discord.send_count(), 1);
    assert_eq!(h.discord.field_edit_count(), 1);

    // Full cycle: going offline rewrites the original card...
    h.kick.set_offline(42);
    h.notifier.run_tick().await.unwrap();
    assert_eq!(h.discord.edit_count(), 1);
    assert_eq!(h.discord.send_count(), 1);

    // ...and the next session gets a fresh card.
    h.kick.set_live(make_live(42, "Back again", 100));
    h.notifier.run_tick().await.unwrap();
    assert_eq!(h.discord.send_count(), 2);

    let record = h.repo.get_record("g1", 42).unwrap();
    assert_eq!(record.notification_message_id.as_deref(), Some("msg-2"));
}

#[tokio::test]
async fn deleted_record_is_not_referenced_by_following_tick() {
    let h = harness();
    h.repo.insert(make_record("g1", "c1", 42, "teststreamer"));
    h.kick.set_live(make_live(42, "Speedrunning", 512));

    let summary = h.notifier.run_tick().await.unwrap();
    assert_eq!(summary.checked, 1);

    h.repo.delete("g1", 42);

    let summary = h.notifier.run_tick().await.unwrap();
    assert_eq!(summary.checked, 0);
    assert_eq!(h.discord.send_count(), 1);
}
