use anyhow::anyhow;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tg_ytchan::model::{ChannelRef, PlaylistItem, PlaylistPage};
use tg_ytchan::youtube::VideoCatalog;

#[derive(Clone, Default)]
pub struct MockCatalog {
    pub uploads: Option<String>,
    /// (playlist id, page token) -> page
    pub pages: HashMap<(String, String), PlaylistPage>,
    pub channel_calls: Arc<Mutex<Vec<ChannelRef>>>,
    pub page_calls: Arc<Mutex<Vec<(String, String)>>>,
    pub image_calls: Arc<Mutex<Vec<String>>>,
    pub fail_images: bool,
}

impl MockCatalog {
    /// One playlist served as a single page.
    pub fn with_items(playlist_id: &str, items: Vec<PlaylistItem>) -> Self {
        Self::default().page(playlist_id, "", None, items)
    }

    pub fn page(
        mut self,
        playlist_id: &str,
        token: &str,
        next: Option<&str>,
        items: Vec<PlaylistItem>,
    ) -> Self {
        self.pages.insert(
            (playlist_id.to_string(), token.to_string()),
            PlaylistPage {
                next_page_token: next.map(str::to_string),
                items,
            },
        );
        self
    }

    pub fn uploads(mut self, playlist_id: &str) -> Self {
        self.uploads = Some(playlist_id.to_string());
        self
    }
}

#[async_trait::async_trait]
impl VideoCatalog for MockCatalog {
    async fn uploads_playlist(&self, channel: &ChannelRef) -> anyhow::Result<Option<String>> {
        self.channel_calls.lock().unwrap().push(channel.clone());
        Ok(self.uploads.clone())
    }

    async fn playlist_page(
        &self,
        playlist_id: &str,
        page_token: &str,
    ) -> anyhow::Result<PlaylistPage> {
        self.page_calls
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), page_token.to_string()));
        self.pages
            .get(&(playlist_id.to_string(), page_token.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no page {playlist_id}/{page_token}"))
    }

    async fn fetch_image(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.image_calls.lock().unwrap().push(url.to_string());
        if self.fail_images {
            return Err(anyhow!("download {url} failed: 404 Not Found"));
        }
        Ok(url.as_bytes().to_vec())
    }
}
