use async_trait::async_trait;

use crate::error::Error;
use crate::models::tracking::TrackedStream;

/// Store of tracked-stream records, keyed by `(guild_id, streamer_id)`.
///
/// Writers always read-modify-write the complete record; there is no
/// partial-field update. The reconciliation engine is the only writer per
/// key apart from user-issued add/remove.
#[async_trait]
pub trait TrackedStreamRepository: Send + Sync {
    /// Fails with `Error::Duplicate` if a record already exists for the
    /// `(guild_id, streamer_id)` pair.
    async fn add(&self, record: &TrackedStream) -> Result<(), Error>;

    /// Fails with `Error::NotFound` if no record exists for the pair.
    async fn remove(&self, guild_id: &str, streamer_id: i64) -> Result<(), Error>;

    async fn get(&self, guild_id: &str, streamer_id: i64) -> Result<Option<TrackedStream>, Error>;

    /// All records across all guilds, unordered. Scanned once per poll tick.
    async fn list_all(&self) -> Result<Vec<TrackedStream>, Error>;

    async fn list_for_guild(&self, guild_id: &str) -> Result<Vec<TrackedStream>, Error>;

    /// Full replace of the record identified by its composite key.
    async fn update(&self, record: &TrackedStream) -> Result<(), Error>;
}
