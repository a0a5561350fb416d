// File: kickbot-core/src/platforms/kick/client.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;

use kickbot_common::models::kick::{KickChannel, KickLivestream};
use kickbot_common::traits::api::KickApi;

use crate::Error;
use crate::platforms::kick::requests::{channel, livestream};

pub const KICK_API_BASE: &str = "https://api.kick.com/public/v1";

/// A small wrapper client for calling the Kick public API read endpoints.
/// Per-endpoint request logic lives under `requests::`.
pub struct KickApiClient {
    http: ReqwestClient,
}

impl KickApiClient {
    pub fn new() -> Self {
        Self {
            http: ReqwestClient::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client construction failed"),
        }
    }

    pub fn http_client(&self) -> &ReqwestClient {
        &self.http
    }
}

impl Default for KickApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KickApi for KickApiClient {
    async fn fetch_channel(&self, token: &str, slug: &str) -> Result<Option<KickChannel>, Error> {
        channel::fetch_channel_by_slug(self, token, slug).await
    }

    async fn fetch_livestream(
        &self,
        token: &str,
        broadcaster_user_id: i64,
    ) -> Result<Option<KickLivestream>, Error> {
        livestream::fetch_livestream(self, token, broadcaster_user_id).await
    }
}
