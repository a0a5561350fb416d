pub mod auth;
pub mod client;
pub mod requests;

pub use auth::KickAuthenticator;
pub use client::KickApiClient;
