// Pure rendering of tracking records + live status into notification
// payloads. No I/O and no clock access; callers pass timestamps in.

use chrono::{DateTime, Duration, Utc};

use kickbot_common::models::discord::{
    DiscordColor, DiscordEmbed, DiscordEmbedField, DiscordEmbedImage, DiscordLinkButton,
};
use kickbot_common::models::kick::KickLivestream;
use kickbot_common::models::tracking::TrackedStream;

/// Shown when Kick supplies no stream thumbnail.
pub const STREAM_THUMBNAIL_PLACEHOLDER: &str = "https://i.imgur.com/IuEgile.png";

/// Everything needed to send or rewrite one notification card.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationParts {
    pub content: Option<String>,
    pub embed: DiscordEmbed,
    pub buttons: Vec<DiscordLinkButton>,
}

/// Role mention plus custom message, or `None` when the record carries
/// neither.
pub fn mention_content(record: &TrackedStream) -> Option<String> {
    let role = record
        .role_id
        .as_ref()
        .map(|r| format!("<@&{r}> "))
        .unwrap_or_default();
    let custom = record.custom_message.as_deref().unwrap_or_default();
    let combined = format!("{role}{custom}").trim().to_string();
    if combined.is_empty() { None } else { Some(combined) }
}

/// The "went live" card.
pub fn went_live(
    record: &TrackedStream,
    live: &KickLivestream,
    invite_url: &str,
) -> NotificationParts {
    let url = record.channel_url();

    let mut embed = DiscordEmbed::new();
    embed.title = Some(format!("{} is now live!", record.streamer_name));
    embed.url = Some(url.clone());
    embed.color = Some(DiscordColor::KICK_GREEN);
    embed.description = Some(live.stream_title.clone().unwrap_or_else(|| "N/A".into()));
    embed.image = Some(DiscordEmbedImage {
        url: live
            .thumbnail
            .clone()
            .unwrap_or_else(|| STREAM_THUMBNAIL_PLACEHOLDER.into()),
    });
    embed.fields = live_update_fields(live);

    NotificationParts {
        content: mention_content(record),
        embed,
        buttons: vec![
            DiscordLinkButton {
                label: format!("Watch {} on Kick!", record.streamer_name),
                url,
            },
            invite_button(invite_url),
        ],
    }
}

/// The metadata fields refreshed on every tick while the stream stays
/// live.
pub fn live_update_fields(live: &KickLivestream) -> Vec<DiscordEmbedField> {
    vec![
        DiscordEmbedField {
            name: "Category".into(),
            value: live.category_name().unwrap_or("N/A").to_string(),
            inline: true,
        },
        DiscordEmbedField {
            name: "Viewers".into(),
            value: live
                .viewer_count
                .map(format_viewers)
                .unwrap_or_else(|| "N/A".into()),
            inline: true,
        },
    ]
}

/// The "went offline" summary the live card is rewritten into, built from
/// the record's retained session snapshot.
pub fn went_offline(
    record: &TrackedStream,
    ended_at: DateTime<Utc>,
    invite_url: &str,
) -> NotificationParts {
    let url = record.channel_url();

    let duration_text = record
        .last_stream_started_at
        .map(|started| format_duration(ended_at - started))
        .unwrap_or_else(|| "N/A".into());

    let mut embed = DiscordEmbed::new();
    embed.title = Some(format!("{} is now offline!", record.streamer_name));
    embed.url = Some(url.clone());
    embed.color = Some(DiscordColor::KICK_GREEN);
    embed.description =
        Some("You can still watch their past broadcasts, click the button below!".into());
    embed.image = Some(DiscordEmbedImage {
        url: record
            .last_stream_thumbnail
            .clone()
            .unwrap_or_else(|| STREAM_THUMBNAIL_PLACEHOLDER.into()),
    });
    embed.fields = vec![
        DiscordEmbedField {
            name: "Duration".into(),
            value: duration_text,
            inline: false,
        },
        DiscordEmbedField {
            name: "Stream Title".into(),
            value: record
                .last_stream_title
                .clone()
                .unwrap_or_else(|| "N/A".into()),
            inline: false,
        },
    ];

    NotificationParts {
        content: None,
        embed,
        buttons: vec![
            DiscordLinkButton {
                label: "Missed the stream? Watch it on Kick!".into(),
                url,
            },
            invite_button(invite_url),
        ],
    }
}

fn invite_button(invite_url: &str) -> DiscordLinkButton {
    DiscordLinkButton {
        label: "Invite Kick Updates".into(),
        url: invite_url.to_string(),
    }
}

/// `hh:mm:ss` with the hours component omitted entirely when zero:
/// 95 seconds renders as `01:35`, not `00:01:35`.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Display-only viewer count: exact below 1000, one decimal of thousands
/// above (10234 => "10.2K"). Never persisted.
pub fn format_viewers(count: u64) -> String {
    if count >= 1000 {
        let rounded = ((count as f64) / 100.0).round() / 10.0;
        if rounded.fract() == 0.0 {
            format!("{}K", rounded as u64)
        } else {
            format!("{rounded:.1}K")
        }
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> TrackedStream {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        TrackedStream {
            guild_id: "g1".into(),
            channel_id: "c1".into(),
            streamer_id: 42,
            streamer_name: "teststreamer".into(),
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

    fn sample_live() -> KickLivestream {
        KickLivestream {
            broadcaster_user_id: 42,
            stream_title: Some("Speedrunning".into()),
            started_at: Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap(),
            viewer_count: Some(10234),
            thumbnail: Some("https://example.com/thumb.jpg".into()),
            category: Some(kickbot_common::models::kick::KickCategory {
                name: "Just Chatting".into(),
            }),
        }
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::milliseconds(0)), "00:00");
        assert_eq!(format_duration(Duration::milliseconds(95_000)), "01:35");
        assert_eq!(format_duration(Duration::milliseconds(3_661_000)), "01:01:01");
    }

    #[test]
    fn viewer_formatting() {
        assert_eq!(format_viewers(999), "999");
        assert_eq!(format_viewers(1000), "1K");
        assert_eq!(format_viewers(10234), "10.2K");
        assert_eq!(format_viewers(1950), "2K");
        assert_eq!(format_viewers(0), "0");
    }

    #[test]
    fn mention_content_combines_role_and_message() {
        let mut record = sample_record();
        assert_eq!(mention_content(&record), None);

        record.role_id = Some("777".into());
        assert_eq!(mention_content(&record), Some("<@&777>".into()));

        record.custom_message = Some("we live!".into());
        assert_eq!(mention_content(&record), Some("<@&777> we live!".into()));

        record.role_id = None;
        assert_eq!(mention_content(&record), Some("we live!".into()));
    }

    #[test]
    fn went_live_card_carries_title_and_fields() {
        let record = sample_record();
        let live = sample_live();
        let parts = went_live(&record, &live, "https://example.com/invite");

        assert_eq!(parts.embed.title.as_deref(), Some("teststreamer is now live!"));
        assert_eq!(parts.embed.description.as_deref(), Some("Speedrunning"));
        assert_eq!(parts.embed.color, Some(DiscordColor::KICK_GREEN));
        assert_eq!(parts.embed.fields.len(), 2);
        assert_eq!(parts.embed.fields[0].value, "Just Chatting");
        assert_eq!(parts.embed.fields[1].value, "10.2K");
        assert_eq!(parts.buttons.len(), 2);
        assert_eq!(parts.buttons[0].url, "https://kick.com/teststreamer");
    }

    #[test]
    fn went_live_falls_back_to_placeholder_thumbnail() {
        let record = sample_record();
        let mut live = sample_live();
        live.thumbnail = None;
        let parts = went_live(&record, &live, "https://example.com/invite");
        assert_eq!(
            parts.embed.image.as_ref().map(|i| i.url.as_str()),
            Some(STREAM_THUMBNAIL_PLACEHOLDER)
        );
    }

    #[test]
    fn went_offline_summary_uses_retained_snapshot() {
        let mut record = sample_record();
        record.was_live = true;
        record.last_stream_started_at =
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).unwrap());
        record.last_stream_title = Some("Speedrunning".into());
        record.last_stream_thumbnail = Some("https://example.com/thumb.jpg".into());

        let ended_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 5).unwrap();
        let parts = went_offline(&record, ended_at, "https://example.com/invite");

        assert_eq!(
            parts.embed.title.as_deref(),
            Some("teststreamer is now offline!")
        );
        assert_eq!(parts.embed.fields[0].value, "01:30:05");
        assert_eq!(parts.embed.fields[1].value, "Speedrunning");
        assert_eq!(parts.content, None);
    }

    #[test]
    fn went_offline_without_snapshot_renders_na() {
        let mut record = sample_record();
        record.was_live = true;

        let ended_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let parts = went_offline(&record, ended_at, "https://example.com/invite");

        assert_eq!(parts.embed.fields[0].value, "N/A");
        assert_eq!(parts.embed.fields[1].value, "N/A");
    }
}
