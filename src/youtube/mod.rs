use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, warn};

use crate::model::{ChannelRef, PlaylistPage};
use crate::youtube::model::{ChannelListResponse, PlaylistItemListResponse};

pub mod model;

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";
/// Largest page the playlistItems endpoint hands out.
pub const MAX_RESULTS: u32 = 50;

/// Read side of the video platform: channel lookup, playlist listing and
/// thumbnail images.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Uploads playlist of the channel, `None` when the channel is unknown.
    async fn uploads_playlist(&self, channel: &ChannelRef) -> Result<Option<String>>;

    /// One page of a playlist. An empty `page_token` asks for the first page.
    async fn playlist_page(&self, playlist_id: &str, page_token: &str) -> Result<PlaylistPage>;

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct YoutubeClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for YoutubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YoutubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YoutubeClient {
    pub fn new(api_key: String) -> Result<Self> {
        let base_url = Url::parse(YOUTUBE_API_BASE).context("invalid YouTube API URL")?;
        Self::with_base_url(api_key, base_url)
    }

    pub fn with_base_url(api_key: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("tg-ytchan/0.1")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn channels_url(&self, channel: &ChannelRef) -> Result<Url> {
        let mut url = self
            .base_url
            .join("channels")
            .context("invalid YouTube base URL")?;
        let (param, value) = channel.query();
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("part", "contentDetails")
            .append_pair(param, value);
        Ok(url)
    }

    pub fn playlist_items_url(&self, playlist_id: &str, page_token: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join("playlistItems")
            .context("invalid YouTube base URL")?;
        url.query_pairs_mut()
            .append_pair("maxResults", &MAX_RESULTS.to_string())
            .append_pair("part", "snippet")
            .append_pair("playlistId", playlist_id)
            .append_pair("key", &self.api_key)
            .append_pair("pageToken", page_token);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let path = url.path().to_string();
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to reach YouTube {path}"))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, %path, "YouTube API error");
            return Err(anyhow!("youtube error {}: {}", status, body));
        }
        res.json::<T>()
            .await
            .with_context(|| format!("invalid YouTube response JSON from {path}"))
    }
}

#[async_trait]
impl VideoCatalog for YoutubeClient {
    async fn uploads_playlist(&self, channel: &ChannelRef) -> Result<Option<String>> {
        let url = self.channels_url(channel)?;
        let channels: ChannelListResponse = self
            .get_json(url)
            .await
            .context("failed to get channels list")?;
        let Some(first) = channels.items.into_iter().next() else {
            return Ok(None);
        };
        debug!(channel_id = %first.id, "resolved channel");
        let uploads = first.content_details.related_playlists.uploads;
        Ok(Some(uploads).filter(|id| !id.is_empty()))
    }

    async fn playlist_page(&self, playlist_id: &str, page_token: &str) -> Result<PlaylistPage> {
        let url = self.playlist_items_url(playlist_id, page_token)?;
        let page: PlaylistItemListResponse = self
            .get_json(url)
            .await
            .context("failed to get playlist items")?;
        Ok(page.into())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to download {url}"))?;
        if !res.status().is_success() {
            return Err(anyhow!("download {} failed: {}", url, res.status()));
        }
        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("failed to read {url}"))?;
        Ok(bytes.to_vec())
    }
}
