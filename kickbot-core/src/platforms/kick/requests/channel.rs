// ========================================================
// File: kickbot-core/src/platforms/kick/requests/channel.rs
// ========================================================
use tracing::debug;

use kickbot_common::models::kick::{ChannelsResponse, KickChannel};

use crate::Error;
use crate::platforms::kick::client::{KickApiClient, KICK_API_BASE};

/// Looks up a Kick channel by its human-readable slug.
///
/// Returns `Ok(None)` when the slug is unknown upstream; `Error::Fetch`
/// only on transport failure, non-success status, or an unparsable body.
pub async fn fetch_channel_by_slug(
    client: &KickApiClient,
    token: &str,
    slug: &str,
) -> Result<Option<KickChannel>, Error> {
    let url = format!("{KICK_API_BASE}/channels?slug={}", urlencoding::encode(slug));

    let resp = client
        .http_client()
        .get(&url)
        .header("Authorization", format!("Bearer {token}"))
        .header("Accept", "*/*")
        .send()
        .await
        .map_err(|e| Error::Fetch(format!("channel lookup network error for '{slug}': {e}")))?;

    if !resp.status().is_success() {
        return Err(Error::Fetch(format!(
            "channel lookup for '{slug}': HTTP {}",
            resp.status()
        )));
    }

    let body: ChannelsResponse = resp
        .json()
        .await
        .map_err(|e| Error::Fetch(format!("channel lookup parse error for '{slug}': {e}")))?;

    let channel = body.data.into_iter().next();
    debug!(
        "Channel lookup for '{}' => {:?}",
        slug,
        channel.as_ref().map(|c| c.broadcaster_user_id)
    );
    Ok(channel)
}
