// ========================================================
// File: kickbot-core/src/platforms/kick/requests/livestream.rs
// ========================================================
use kickbot_common::models::kick::{KickLivestream, LivestreamsResponse};

use crate::Error;
use crate::platforms::kick::client::{KickApiClient, KICK_API_BASE};

/// Fetches the active live session for a broadcaster.
///
/// An empty `data` array means the broadcaster is offline and maps to
/// `Ok(None)` — that is the expected common case, not a failure.
pub async fn fetch_livestream(
    client: &KickApiClient,
    token: &str,
    broadcaster_user_id: i64,
) -> Result<Option<KickLivestream>, Error> {
    let url = format!("{KICK_API_BASE}/livestreams?broadcaster_user_id={broadcaster_user_id}");

    let resp = client
        .http_client()
        .get(&url)
        .header("Authorization", format!("Bearer {token}"))
        .header("Accept", "*/*")
        .send()
        .await
        .map_err(|e| {
            Error::Fetch(format!(
                "livestream lookup network error for {broadcaster_user_id}: {e}"
            ))
        })?;

    if !resp.status().is_success() {
        return Err(Error::Fetch(format!(
            "livestream lookup for {broadcaster_user_id}: HTTP {}",
            resp.status()
        )));
    }

    let body: LivestreamsResponse = resp.json().await.map_err(|e| {
        Error::Fetch(format!(
            "livestream lookup parse error for {broadcaster_user_id}: {e}"
        ))
    })?;

    Ok(body.data.into_iter().next())
}
