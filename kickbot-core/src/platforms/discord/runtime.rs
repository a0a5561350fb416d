use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway,
    CloseFrame,
    Config,
    Event,
    EventTypeFlags,
    Intents,
    MessageSender,
    Shard,
    StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::Client as HttpClient;
use twilight_model::application::interaction::{Interaction, InteractionData};
use twilight_model::channel::message::component::{ActionRow, Button, ButtonStyle, Component};
use twilight_model::channel::message::embed::{Embed, EmbedField};
use twilight_model::channel::Message;
use twilight_model::gateway::payload::incoming::Ready as ReadyPayload;
use twilight_model::gateway::payload::outgoing::update_presence::UpdatePresencePayload;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{ApplicationMarker, ChannelMarker, GuildMarker, MessageMarker};
use twilight_model::id::Id;
use twilight_model::util::Timestamp;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, ImageSource};

use kickbot_common::models::discord::{DiscordEmbed, DiscordEmbedField, DiscordLinkButton};
use kickbot_common::traits::api::{DiscordApi, EditOutcome};

use crate::services::discord::slashcommands::{create_track_command, handle_track_interaction};
use crate::services::tracking_service::TrackingService;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
}

/// The shard runner:
///   - calls `shard.next_event(...)`
///   - updates the in-memory cache
///   - registers slash commands on Ready
///   - dispatches `/track` interactions to the command handlers.
async fn shard_runner(
    mut shard: Shard,
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    tracking: Arc<TrackingService>,
    application_id: Id<ApplicationMarker>,
) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(event) => {
                cache.update(&event);

                match &event {
                    Event::Ready(ready) => {
                        let data: &ReadyPayload = ready.as_ref();
                        info!(
                            "Shard {shard_id} => READY as {} (ID={})",
                            data.user.name, data.user.id
                        );
                        register_global_commands(&http, application_id).await;
                    }
                    Event::InteractionCreate(interaction_create) => {
                        let interaction: &Interaction = interaction_create;
                        if let Some(InteractionData::ApplicationCommand(data)) = &interaction.data {
                            if data.name == "track" {
                                if let Err(e) = handle_track_interaction(
                                    &http,
                                    application_id,
                                    interaction,
                                    data,
                                    &tracking,
                                )
                                .await
                                {
                                    error!("Error handling /track interaction: {e:?}");
                                }
                            }
                        }
                    }
                    _ => {
                        trace!("Shard {shard_id} => unhandled event: {event:?}");
                    }
                }
            }
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

async fn register_global_commands(http: &Arc<HttpClient>, application_id: Id<ApplicationMarker>) {
    let commands = [create_track_command()];
    match http
        .interaction(application_id)
        .set_global_commands(&commands)
        .await
    {
        Ok(_) => info!("Slash commands registered."),
        Err(e) => error!("Failed to register slash commands: {e:?}"),
    }
}

pub struct DiscordPlatform {
    pub token: String,
    pub connection_status: ConnectionStatus,

    pub shard_tasks: Vec<JoinHandle<()>>,
    pub shard_senders: Vec<MessageSender>,

    pub http: Option<Arc<HttpClient>>,
    pub cache: Option<Arc<InMemoryCache>>,

    application_id: Option<Id<ApplicationMarker>>,
    tracking: Arc<TrackingService>,
}

impl DiscordPlatform {
    pub fn new(token: String, tracking: Arc<TrackingService>) -> Self {
        Self {
            token,
            connection_status: ConnectionStatus::Disconnected,
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
            http: None,
            cache: None,
            application_id: None,
            tracking,
        }
    }

    /// OAuth authorize link for the bot's own application; rendered as the
    /// invite button under every notification card.
    pub fn invite_url(&self) -> Result<String, Error> {
        let application_id = self
            .application_id
            .ok_or_else(|| Error::Platform("Discord platform is not connected".into()))?;
        Ok(format!(
            "https://discord.com/oauth2/authorize?client_id={application_id}"
        ))
    }

    pub async fn connect(&mut self) -> Result<(), Error> {
        if matches!(self.connection_status, ConnectionStatus::Connected) {
            info!("(DiscordPlatform) Already connected => skipping");
            return Ok(());
        }
        if self.token.is_empty() {
            return Err(Error::Auth("Discord token is empty".into()));
        }

        let http_client = Arc::new(
            ClientBuilder::new()
                .token(self.token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        self.http = Some(http_client.clone());

        // Resolve the application id up front; command registration and the
        // invite link both need it.
        let application = http_client
            .current_user_application()
            .await
            .map_err(|e| Error::Platform(format!("Error fetching current application: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error parsing current application: {e}")))?;
        self.application_id = Some(application.id);

        // Guilds, channels, roles, and the bot's own member record feed the
        // per-channel permission checks.
        let cache = InMemoryCache::builder()
            .resource_types(
                ResourceType::GUILD
                    | ResourceType::CHANNEL
                    | ResourceType::MEMBER
                    | ResourceType::ROLE
                    | ResourceType::USER_CURRENT,
            )
            .build();
        let cache = Arc::new(cache);
        self.cache = Some(cache.clone());

        let config = Config::new(self.token.clone(), Intents::GUILDS);

        let presence = UpdatePresencePayload::new(
            vec![MinimalActivity {
                kind: ActivityType::Watching,
                name: "kick.com".to_string(),
                url: None,
            }
            .into()],
            false,
            None,
            Status::Online,
        )
        .ok();

        let shards = gateway::create_recommended(&http_client, config, |_, builder| {
            match presence.clone() {
                Some(presence) => builder.presence(presence).build(),
                None => builder.build(),
            }
        })
        .await
        .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

        for shard in shards {
            self.shard_senders.push(shard.sender());

            let http_for_shard = http_client.clone();
            let cache_for_shard = cache.clone();
            let tracking_for_shard = self.tracking.clone();
            let application_id = application.id;

            let handle = tokio::spawn(async move {
                shard_runner(
                    shard,
                    http_for_shard,
                    cache_for_shard,
                    tracking_for_shard,
                    application_id,
                )
                .await;
            });
            self.shard_tasks.push(handle);
        }

        self.connection_status = ConnectionStatus::Connected;
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<(), Error> {
        self.connection_status = ConnectionStatus::Disconnected;

        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in &mut self.shard_tasks {
            let _ = task.await;
        }

        self.shard_senders.clear();
        self.shard_tasks.clear();

        Ok(())
    }

    fn connected_parts(&self) -> Result<(&Arc<HttpClient>, &Arc<InMemoryCache>), Error> {
        match (&self.http, &self.cache) {
            (Some(http), Some(cache)) => Ok((http, cache)),
            _ => Err(Error::Platform("Discord platform is not connected".into())),
        }
    }

    async fn fetch_message(
        &self,
        http: &HttpClient,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Option<Message> {
        match http.message(channel_id, message_id).await {
            Ok(resp) => resp.model().await.ok(),
            Err(_) => None,
        }
    }
}

fn parse_channel_id(channel: &str) -> Result<Id<ChannelMarker>, Error> {
    let raw: u64 = channel
        .parse()
        .map_err(|_| Error::ChannelUnreachable(format!("Invalid channel ID: {channel}")))?;
    Ok(Id::new(raw))
}

fn parse_message_id(message: &str) -> Result<Id<MessageMarker>, Error> {
    let raw: u64 = message
        .parse()
        .map_err(|_| Error::Platform(format!("Invalid message ID: {message}")))?;
    Ok(Id::new(raw))
}

fn build_embed(embed: &DiscordEmbed) -> Result<Embed, Error> {
    let mut builder = EmbedBuilder::new();
    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    if let Some(url) = &embed.url {
        builder = builder.url(url);
    }
    if let Some(color) = embed.color {
        builder = builder.color(color);
    }
    if let Some(image) = &embed.image {
        let source = ImageSource::url(&image.url)
            .map_err(|e| Error::Platform(format!("Invalid embed image URL: {e}")))?;
        builder = builder.image(source);
    }
    for field in &embed.fields {
        let mut field_builder = EmbedFieldBuilder::new(&field.name, &field.value);
        if field.inline {
            field_builder = field_builder.inline();
        }
        builder = builder.field(field_builder);
    }
    if let Some(ts) = embed.timestamp {
        if let Ok(ts) = Timestamp::from_secs(ts.timestamp()) {
            builder = builder.timestamp(ts);
        }
    }
    Ok(builder.build())
}

fn to_embed_field(field: &DiscordEmbedField) -> EmbedField {
    EmbedField {
        inline: field.inline,
        name: field.name.clone(),
        value: field.value.clone(),
    }
}

/// One link button per action row, stacked vertically under the card.
fn build_components(buttons: &[DiscordLinkButton]) -> Vec<Component> {
    buttons
        .iter()
        .map(|button| {
            Component::ActionRow(ActionRow {
                components: vec![Component::Button(Button {
                    custom_id: None,
                    disabled: false,
                    emoji: None,
                    label: Some(button.label.clone()),
                    style: ButtonStyle::Link,
                    url: Some(button.url.clone()),
                    sku_id: None,
                })],
            })
        })
        .collect()
}

#[async_trait]
impl DiscordApi for DiscordPlatform {
    async fn channel_sendable(&self, guild_id: &str, channel_id: &str) -> Result<bool, Error> {
        let (http, cache) = self.connected_parts()?;

        let guild_raw: u64 = match guild_id.parse() {
            Ok(raw) => raw,
            Err(_) => {
                warn!("Invalid guild ID format: {guild_id}");
                return Ok(false);
            }
        };
        let guild = Id::<GuildMarker>::new(guild_raw);
        if cache.guild(guild).is_none() {
            return Ok(false);
        }

        let channel = parse_channel_id(channel_id)?;
        if http.channel(channel).await.is_err() {
            return Ok(false);
        }

        let Some(current_user) = cache.current_user() else {
            return Ok(false);
        };
        match cache.permissions().in_channel(current_user.id, channel) {
            Ok(perms) => {
                Ok(perms.contains(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES))
            }
            Err(e) => {
                debug!("Permission lookup failed for channel {channel_id}: {e:?}");
                Ok(false)
            }
        }
    }

    async fn send_notification(
        &self,
        channel_id: &str,
        content: Option<&str>,
        embed: &DiscordEmbed,
        buttons: &[DiscordLinkButton],
    ) -> Result<String, Error> {
        let (http, _cache) = self.connected_parts()?;
        let channel = parse_channel_id(channel_id)?;

        let embeds = [build_embed(embed)?];
        let components = build_components(buttons);

        let mut request = http
            .create_message(channel)
            .embeds(&embeds)
            .components(&components);
        if let Some(content) = content {
            request = request.content(content);
        }

        let message = request
            .await
            .map_err(|e| Error::Platform(format!("Error sending Discord message: {e:?}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error parsing sent message: {e:?}")))?;

        Ok(message.id.to_string())
    }

    async fn edit_notification(
        &self,
        channel_id: &str,
        message_id: &str,
        embed: &DiscordEmbed,
        buttons: &[DiscordLinkButton],
    ) -> Result<EditOutcome, Error> {
        let (http, _cache) = self.connected_parts()?;
        let channel = parse_channel_id(channel_id)?;
        let message = parse_message_id(message_id)?;

        // The stored id may point at a message a moderator has since
        // deleted; confirm it still exists before editing.
        if self.fetch_message(http, channel, message).await.is_none() {
            return Ok(EditOutcome::MessageGone);
        }

        let embeds = [build_embed(embed)?];
        let components = build_components(buttons);

        http.update_message(channel, message)
            .embeds(Some(&embeds))
            .components(Some(&components))
            .await
            .map_err(|e| Error::Platform(format!("Error editing Discord message: {e:?}")))?;

        Ok(EditOutcome::Edited)
    }

    async fn edit_notification_fields(
        &self,
        channel_id: &str,
        message_id: &str,
        fields: &[DiscordEmbedField],
    ) -> Result<EditOutcome, Error> {
        let (http, _cache) = self.connected_parts()?;
        let channel = parse_channel_id(channel_id)?;
        let message = parse_message_id(message_id)?;

        let Some(existing) = self.fetch_message(http, channel, message).await else {
            return Ok(EditOutcome::MessageGone);
        };
        let Some(mut embed) = existing.embeds.into_iter().next() else {
            return Ok(EditOutcome::MessageGone);
        };

        embed.fields = fields.iter().map(to_embed_field).collect();
        let embeds = [embed];

        // Components are left untouched so the link buttons survive.
        http.update_message(channel, message)
            .embeds(Some(&embeds))
            .await
            .map_err(|e| Error::Platform(format!("Error editing Discord message: {e:?}")))?;

        Ok(EditOutcome::Edited)
    }
}
