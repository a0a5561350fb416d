use chrono::{DateTime, Utc};

/// Transport-agnostic embed payload. The Discord runtime converts this
/// into twilight's wire types; the renderer and its tests never touch
/// twilight directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscordEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub image: Option<DiscordEmbedImage>,
    pub fields: Vec<DiscordEmbedField>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl DiscordEmbed {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscordEmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscordEmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A link-style button rendered under the notification card.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscordLinkButton {
    pub label: String,
    pub url: String,
}

pub struct DiscordColor;

impl DiscordColor {
    pub const KICK_GREEN: u32 = 0x53FC18;
    pub const ERROR_RED: u32 = 0xED4345;
}
