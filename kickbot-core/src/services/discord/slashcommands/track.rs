// File: kickbot-core/src/services/discord/slashcommands/track.rs

use std::sync::Arc;

use tracing::debug;
use twilight_http::Client as HttpClient;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::application_command::{
    CommandData, CommandDataOption, CommandOptionValue,
};
use twilight_model::application::interaction::Interaction;
use twilight_model::channel::message::embed::Embed;
use twilight_model::channel::message::MessageFlags;
use twilight_model::http::interaction::{
    InteractionResponse, InteractionResponseData, InteractionResponseType,
};
use twilight_model::id::marker::ApplicationMarker;
use twilight_model::id::Id;
use twilight_util::builder::command::{
    ChannelBuilder, CommandBuilder, RoleBuilder, StringBuilder, SubCommandBuilder,
};
use twilight_util::builder::embed::EmbedBuilder;

use kickbot_common::models::discord::DiscordColor;

use crate::services::notifier::render::format_viewers;
use crate::services::tracking_service::{AddTrackedStream, TrackingService};
use crate::Error;

/// Create the CommandBuilder output for `/track`.
pub fn create_track_command() -> Command {
    CommandBuilder::new(
        "track",
        "Manage Kick stream notifications",
        CommandType::ChatInput,
    )
    .option(
        SubCommandBuilder::new("add", "Start tracking a Kick streamer")
            .option(StringBuilder::new("streamer", "Kick streamer name").required(true))
            .option(
                ChannelBuilder::new("channel", "Discord channel for notifications").required(true),
            )
            .option(RoleBuilder::new("role", "Optional role to mention"))
            .option(StringBuilder::new("message", "Optional custom message")),
    )
    .option(
        SubCommandBuilder::new("remove", "Stop tracking a Kick streamer")
            .option(StringBuilder::new("streamer", "Kick streamer name").required(true)),
    )
    .option(SubCommandBuilder::new(
        "list",
        "List tracked Kick streamers in this server",
    ))
    .build()
}

fn status_embed(title: &str, description: &str, color: u32) -> Embed {
    EmbedBuilder::new()
        .title(title)
        .description(description)
        .color(color)
        .build()
}

fn category_link(name: &str) -> String {
    let slug = name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    format!("[{name}](https://kick.com/category/{slug})")
}

/// Handle an incoming `/track` interaction and reply with an ephemeral
/// status embed.
pub async fn handle_track_interaction(
    http: &Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
    interaction: &Interaction,
    data: &CommandData,
    tracking: &TrackingService,
) -> Result<(), Error> {
    let embed = match interaction.guild_id {
        Some(guild_id) => {
            run_subcommand(&guild_id.to_string(), &data.options, tracking).await
        }
        None => status_embed(
            "Error",
            "`/track` can only be used inside a server.",
            DiscordColor::ERROR_RED,
        ),
    };

    http.interaction(application_id)
        .create_response(
            interaction.id,
            &interaction.token,
            &InteractionResponse {
                kind: InteractionResponseType::ChannelMessageWithSource,
                data: Some(InteractionResponseData {
                    embeds: Some(vec![embed]),
                    flags: Some(MessageFlags::EPHEMERAL),
                    ..Default::default()
                }),
            },
        )
        .await
        .map_err(|e| Error::Platform(format!("Error responding to `/track`: {e}")))?;

    Ok(())
}

async fn run_subcommand(
    guild_id: &str,
    options: &[CommandDataOption],
    tracking: &TrackingService,
) -> Embed {
    let Some(sub) = options.first() else {
        return status_embed("Error", "Missing subcommand.", DiscordColor::ERROR_RED);
    };
    let CommandOptionValue::SubCommand(sub_options) = &sub.value else {
        return status_embed("Error", "Missing subcommand.", DiscordColor::ERROR_RED);
    };

    debug!("Handling /track {} for guild {}", sub.name, guild_id);

    match sub.name.as_str() {
        "add" => handle_add(guild_id, sub_options, tracking).await,
        "remove" => handle_remove(guild_id, sub_options, tracking).await,
        "list" => handle_list(guild_id, tracking).await,
        other => status_embed(
            "Error",
            &format!("Unknown subcommand `{other}`."),
            DiscordColor::ERROR_RED,
        ),
    }
}

async fn handle_add(
    guild_id: &str,
    options: &[CommandDataOption],
    tracking: &TrackingService,
) -> Embed {
    let mut streamer = None;
    let mut channel = None;
    let mut role = None;
    let mut message = None;

    for opt in options {
        match (opt.name.as_str(), &opt.value) {
            ("streamer", CommandOptionValue::String(s)) => streamer = Some(s.clone()),
            ("channel", CommandOptionValue::Channel(id)) => channel = Some(id.to_string()),
            ("role", CommandOptionValue::Role(id)) => role = Some(id.to_string()),
            ("message", CommandOptionValue::String(s)) => message = Some(s.clone()),
            _ => {}
        }
    }

    let (Some(streamer_slug), Some(channel_id)) = (streamer, channel) else {
        return status_embed(
            "Error",
            "Both `streamer` and `channel` are required.",
            DiscordColor::ERROR_RED,
        );
    };

    let req = AddTrackedStream {
        guild_id: guild_id.to_string(),
        channel_id,
        streamer_slug,
        role_id: role,
        custom_message: message,
    };

    match tracking.add_tracked_stream(req).await {
        Ok(record) => status_embed(
            "Update Added",
            &format!(
                "[**{}**]({}) has been added to your updates.",
                record.streamer_name,
                record.channel_url()
            ),
            DiscordColor::KICK_GREEN,
        ),
        Err(Error::Duplicate(msg)) => status_embed("Already Tracked", &msg, DiscordColor::ERROR_RED),
        Err(Error::NotFound(msg)) => {
            status_embed("Streamer Not Found", &msg, DiscordColor::ERROR_RED)
        }
        Err(Error::Fetch(msg)) => status_embed("Kick API Error", &msg, DiscordColor::ERROR_RED),
        Err(e) => status_embed(
            "Error",
            &format!("An error occurred: {e}"),
            DiscordColor::ERROR_RED,
        ),
    }
}

async fn handle_remove(
    guild_id: &str,
    options: &[CommandDataOption],
    tracking: &TrackingService,
) -> Embed {
    let streamer = options.iter().find_map(|opt| match (&opt.name[..], &opt.value) {
        ("streamer", CommandOptionValue::String(s)) => Some(s.clone()),
        _ => None,
    });

    let Some(streamer_slug) = streamer else {
        return status_embed("Error", "`streamer` is required.", DiscordColor::ERROR_RED);
    };

    match tracking.remove_tracked_stream(guild_id, &streamer_slug).await {
        Ok(record) => status_embed(
            "Update Deleted",
            &format!("Stream update deleted for **{}**.", record.streamer_name),
            DiscordColor::KICK_GREEN,
        ),
        Err(Error::NotFound(msg)) => {
            status_embed("Update Not Found", &msg, DiscordColor::ERROR_RED)
        }
        Err(Error::Fetch(msg)) => status_embed("Kick API Error", &msg, DiscordColor::ERROR_RED),
        Err(e) => status_embed(
            "Error",
            &format!("An error occurred: {e}"),
            DiscordColor::ERROR_RED,
        ),
    }
}

async fn handle_list(guild_id: &str, tracking: &TrackingService) -> Embed {
    let overview = match tracking.live_overview(guild_id).await {
        Ok(overview) => overview,
        Err(e) => {
            return status_embed(
                "Error",
                &format!("An error occurred: {e}"),
                DiscordColor::ERROR_RED,
            )
        }
    };

    if overview.is_empty() {
        return status_embed(
            "No Updates",
            "No Kick streamers are tracked in this server.",
            DiscordColor::ERROR_RED,
        );
    }

    let lines: Vec<String> = overview
        .iter()
        .enumerate()
        .map(|(i, (record, live))| {
            let index = i + 1;
            let link = format!("[**{}**]({})", record.streamer_name, record.channel_url());
            match live {
                Some(live) => {
                    let viewers = live
                        .viewer_count
                        .map(format_viewers)
                        .map(|v| format!(" {v}"))
                        .unwrap_or_default();
                    let category = live
                        .category_name()
                        .or(record.last_category.as_deref())
                        .map(|name| format!(" {}", category_link(name)))
                        .unwrap_or_default();
                    format!("` {index} ` {link} LIVE{viewers}{category}")
                }
                None => format!("` {index} ` {link}"),
            }
        })
        .collect();

    status_embed("Active Kick Updates", &lines.join("\n"), DiscordColor::KICK_GREEN)
}
