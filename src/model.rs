use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// How a channel is looked up when no playlist id is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `@handle` style name.
    Handle(String),
    /// Legacy username.
    Username(String),
    /// `UC...` channel id.
    Id(String),
}

impl ChannelRef {
    /// Query parameter name and value understood by the channels endpoint.
    pub fn query(&self) -> (&'static str, &str) {
        match self {
            ChannelRef::Handle(h) => ("forHandle", h.as_str()),
            ChannelRef::Username(u) => ("forUsername", u.as_str()),
            ChannelRef::Id(id) => ("id", id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
}

/// Thumbnail URLs of a video, one per resolution tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thumbnails {
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub high: Option<Thumbnail>,
    #[serde(default)]
    pub standard: Option<Thumbnail>,
    #[serde(default)]
    pub maxres: Option<Thumbnail>,
}

fn non_empty(t: &Option<Thumbnail>) -> Option<&str> {
    t.as_ref().map(|t| t.url.as_str()).filter(|u| !u.is_empty())
}

impl Thumbnails {
    /// Best available cover: maxres, then standard, high, medium.
    pub fn cover_url(&self) -> Option<&str> {
        non_empty(&self.maxres)
            .or_else(|| non_empty(&self.standard))
            .or_else(|| non_empty(&self.high))
            .or_else(|| non_empty(&self.medium))
    }

    /// Fixed-size image attached to the audio as its thumbnail.
    pub fn thumb_url(&self) -> Option<&str> {
        non_empty(&self.medium)
    }
}

/// One entry of a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub thumbnails: Thumbnails,
}

impl PlaylistItem {
    /// Sync cursor for this item: `YYYYMMDD.HHMMSS.<videoId>`.
    ///
    /// Sorts lexicographically in publish order, which is what makes a plain
    /// string comparison against the watermark meaningful.
    pub fn audio_name(&self) -> String {
        format!(
            "{}.{}",
            self.published_at.format("%Y%m%d.%H%M%S"),
            self.video_id
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPage {
    pub next_page_token: Option<String>,
    pub items: Vec<PlaylistItem>,
}

/// A downloadable encoding of a video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoding {
    pub mime_type: String,
    /// Bits per second.
    pub bitrate: u64,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl Encoding {
    pub fn new(mime_type: impl Into<String>, bitrate: u64) -> Self {
        Self {
            mime_type: mime_type.into(),
            bitrate,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    pub duration: Duration,
    pub encodings: Vec<Encoding>,
}

/// Everything needed to upload the audio attachment.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub title: String,
    pub audio: Vec<u8>,
    pub thumb: Vec<u8>,
    pub duration_secs: u32,
}
