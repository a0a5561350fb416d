pub mod discord;
pub mod kick;
pub mod tracking;

pub use discord::{DiscordColor, DiscordEmbed, DiscordEmbedField, DiscordEmbedImage, DiscordLinkButton};
pub use kick::{KickCategory, KickChannel, KickLivestream};
pub use tracking::TrackedStream;
