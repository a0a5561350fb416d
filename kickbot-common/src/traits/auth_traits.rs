use async_trait::async_trait;

use crate::error::Error;

/// Source of a currently valid bearer token for the Kick API.
///
/// Implementations cache the credential and refresh it before expiry;
/// callers obtain the token once per poll tick, before fanning out.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self) -> Result<String, Error>;
}
