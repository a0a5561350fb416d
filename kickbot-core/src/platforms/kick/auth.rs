use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::debug;

use kickbot_common::traits::auth_traits::TokenProvider;

use crate::Error;

const TOKEN_URL: &str = "https://id.kick.com/oauth/token";

/// Subtracted from the reported TTL so a token is never used in its final
/// seconds before real expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Deserialize)]
struct KickTokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// App-access-token authenticator for the Kick public API, using the
/// client-credentials grant. The cached token is process-wide; the lock is
/// held across a refresh so concurrent callers cause at most one in-flight
/// token request.
pub struct KickAuthenticator {
    client_id: String,
    client_secret: String,
    http: ReqwestClient,
    cached: tokio::sync::Mutex<Option<CachedToken>>,
}

impl KickAuthenticator {
    pub fn new(client_id: String, client_secret: String) -> Self {
        let http = ReqwestClient::builder()
            .timeout(StdDuration::from_secs(30))
            .build()
            .expect("reqwest client construction failed");
        Self {
            client_id,
            client_secret,
            http,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<CachedToken, Error> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP error requesting Kick token: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Auth(format!(
                "Kick token endpoint returned HTTP {}",
                resp.status()
            )));
        }

        let body: KickTokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Parse error on Kick token JSON: {e}")))?;

        let ttl = (body.expires_in - EXPIRY_MARGIN_SECS).max(0);
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Utc::now() + Duration::seconds(ttl),
        })
    }
}

#[async_trait]
impl TokenProvider for KickAuthenticator {
    async fn get_token(&self) -> Result<String, Error> {
        let mut guard = self.cached.lock().await;

        if let Some(cached) = guard.as_ref() {
            if Utc::now() < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
            debug!("Cached Kick token expired; requesting a new one");
        }

        let fresh = self.request_token().await?;
        let token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(token)
    }
}
