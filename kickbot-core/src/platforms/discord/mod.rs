pub mod runtime;

pub use runtime::{ConnectionStatus, DiscordPlatform};
