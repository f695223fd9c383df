use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{PlaylistItem, PlaylistPage, Thumbnails};

#[derive(Deserialize, Debug)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<Channel>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub content_details: ContentDetails,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Deserialize, Debug)]
pub struct RelatedPlaylists {
    #[serde(default)]
    pub uploads: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<PlaylistItemResource>,
}

#[derive(Deserialize, Debug)]
pub struct PlaylistItemResource {
    pub snippet: Snippet,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    pub resource_id: ResourceId,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub video_id: String,
}

impl From<PlaylistItemResource> for PlaylistItem {
    fn from(res: PlaylistItemResource) -> Self {
        let s = res.snippet;
        PlaylistItem {
            video_id: s.resource_id.video_id,
            title: s.title,
            description: s.description,
            published_at: s.published_at,
            thumbnails: s.thumbnails,
        }
    }
}

impl From<PlaylistItemListResponse> for PlaylistPage {
    fn from(res: PlaylistItemListResponse) -> Self {
        PlaylistPage {
            next_page_token: res.next_page_token,
            items: res.items.into_iter().map(PlaylistItem::from).collect(),
        }
    }
}
