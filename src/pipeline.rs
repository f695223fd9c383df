//! Incremental sync: list every playlist item, keep the ones newer than the
//! watermark and publish them oldest first, advancing the watermark after
//! each fully published item. The first failure stops the run so nothing is
//! skipped or published out of order.
use anyhow::{Context, Result};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::config::LAST_KEY;
use crate::error::SyncError;
use crate::media::{select_audio_encoding, MediaSource};
use crate::model::{AudioUpload, ChannelRef, Encoding, PlaylistItem};
use crate::telegram::{cover_caption, Publisher};
use crate::title::TitleCleaner;
use crate::transcode::Transcoder;
use crate::watermark::WatermarkStore;
use crate::youtube::VideoCatalog;

/// Downloads below this size are treated as broken.
pub const MIN_AUDIO_BYTES: usize = 1_000_000;

#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    /// Explicit playlists; when empty the channel's uploads playlist is used.
    pub playlist_ids: Vec<String>,
    pub channel: Option<ChannelRef>,
    pub audio_bitrate: String,
    pub title: TitleCleaner,
    /// Where the raw and transcoded audio files are written.
    pub work_dir: PathBuf,
    /// Used when the store holds no watermark yet.
    pub initial_watermark: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub discovered: usize,
    pub published: usize,
    pub watermark: String,
}

pub struct SyncPipeline {
    settings: PipelineSettings,
    catalog: Box<dyn VideoCatalog>,
    media: Box<dyn MediaSource>,
    transcoder: Box<dyn Transcoder>,
    publisher: Box<dyn Publisher>,
    store: Box<dyn WatermarkStore>,
}

impl SyncPipeline {
    pub fn new(
        settings: PipelineSettings,
        catalog: Box<dyn VideoCatalog>,
        media: Box<dyn MediaSource>,
        transcoder: Box<dyn Transcoder>,
        publisher: Box<dyn Publisher>,
        store: Box<dyn WatermarkStore>,
    ) -> Self {
        Self {
            settings,
            catalog,
            media,
            transcoder,
            publisher,
            store,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let playlists = self.playlist_ids().await?;
        if playlists.is_empty() {
            info!("empty YtPlaylistId and YtUsername and YtChannelId, nothing to do");
            return Ok(RunReport::default());
        }

        let mut watermark = self.load_watermark().await?;
        let items = self.collect_items(&playlists).await?;
        info!(videos = items.len(), "listed playlists");

        let mut report = RunReport {
            discovered: items.len(),
            published: 0,
            watermark: watermark.clone(),
        };

        for (idx, item) in items.iter().enumerate() {
            let num = idx + 1;
            let audio_name = item.audio_name();
            let title = self.settings.title.clean(&item.title);

            if audio_name == watermark {
                info!(last = %watermark, num, %title, "resuming after last published");
            }
            if audio_name <= watermark {
                continue;
            }

            info!(num, %audio_name, %title, "new");
            info!(letters = item.description.chars().count(), "description");

            self.publish(item, &audio_name, &title)
                .await
                .with_context(|| format!("#{num} {audio_name}"))?;

            self.store
                .set(LAST_KEY, &audio_name)
                .await
                .with_context(|| format!("failed to persist {LAST_KEY}={audio_name}"))?;
            watermark = audio_name;
            report.published += 1;
            report.watermark = watermark.clone();
            info!(num, "uploaded");
        }

        Ok(report)
    }

    async fn playlist_ids(&self) -> Result<Vec<String>> {
        if !self.settings.playlist_ids.is_empty() {
            return Ok(self.settings.playlist_ids.clone());
        }
        let Some(channel) = &self.settings.channel else {
            return Ok(Vec::new());
        };
        let uploads = self
            .catalog
            .uploads_playlist(channel)
            .await?
            .ok_or(SyncError::NoUploadsPlaylist)?;
        debug!(%uploads, "resolved uploads playlist");
        Ok(vec![uploads])
    }

    async fn load_watermark(&self) -> Result<String> {
        let stored = self
            .store
            .get(LAST_KEY)
            .await
            .with_context(|| format!("failed to read {LAST_KEY}"))?;
        Ok(stored
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.settings.initial_watermark.clone()))
    }

    /// Every item of every playlist, ordered by AudioName.
    async fn collect_items(&self, playlists: &[String]) -> Result<Vec<PlaylistItem>> {
        let mut items = Vec::new();
        for playlist_id in playlists {
            let mut token = String::new();
            loop {
                let page = self
                    .catalog
                    .playlist_page(playlist_id, &token)
                    .await
                    .with_context(|| format!("playlist {playlist_id}"))?;
                items.extend(page.items);
                // A repeated token means the listing wrapped around.
                match page.next_page_token {
                    Some(next) if !next.is_empty() && next != token => token = next,
                    _ => break,
                }
            }
        }
        // Same order the watermark comparison uses, so items sharing a
        // publish time are not skipped.
        items.sort_by_cached_key(PlaylistItem::audio_name);
        Ok(items)
    }

    #[instrument(skip(self, item, title), fields(video_id = %item.video_id))]
    async fn publish(&self, item: &PlaylistItem, audio_name: &str, title: &str) -> Result<()> {
        let cover_url = item.thumbnails.cover_url().ok_or(SyncError::NoCover)?;
        let thumb_url = item.thumbnails.thumb_url().ok_or(SyncError::NoThumbnail)?;

        let cover = self
            .catalog
            .fetch_image(cover_url)
            .await
            .context("download cover")?;
        info!(kb = cover.len() / 1000, "cover");
        let thumb = self
            .catalog
            .fetch_image(thumb_url)
            .await
            .context("download thumb")?;
        info!(kb = thumb.len() / 1000, "thumb");

        let media = self
            .media
            .probe(&item.video_id)
            .await
            .context("resolve encodings")?;
        let encoding = select_audio_encoding(&media.encodings)
            .ok_or_else(|| SyncError::NoAudioEncoding(item.video_id.clone()))?;
        let raw = self.download(&item.video_id, encoding).await?;
        info!(
            mb = raw.len() / 1000 / 1000,
            kbps = encoding.bitrate / 1024,
            duration_secs = media.duration.as_secs(),
            "downloaded audio"
        );
        if raw.len() < MIN_AUDIO_BYTES {
            return Err(SyncError::AudioTooSmall(raw.len()).into());
        }

        let audio = self.transcode(audio_name, &raw).await?;
        drop(raw);
        info!(
            mb = audio.len() / 1000 / 1000,
            bitrate = %self.settings.audio_bitrate,
            "final converted audio"
        );

        let cover_id = self.publisher.upload_photo(audio_name, cover).await?;
        let audio_id = self
            .publisher
            .upload_audio(AudioUpload {
                file_name: audio_name.to_string(),
                title: title.to_string(),
                audio,
                thumb,
                duration_secs: u32::try_from(media.duration.as_secs()).unwrap_or(u32::MAX),
            })
            .await?;

        self.publisher.send_audio(&audio_id).await?;
        self.publisher
            .send_photo(&cover_id, &cover_caption(title))
            .await?;
        self.publisher.send_text(&item.description).await?;
        Ok(())
    }

    async fn download(&self, video_id: &str, encoding: &Encoding) -> Result<Vec<u8>> {
        let mut stream = self
            .media
            .open_stream(video_id, encoding)
            .await
            .context("open audio stream")?;
        let mut audio = Vec::new();
        while let Some(chunk) = stream.try_next().await.context("read audio stream")? {
            audio.extend_from_slice(&chunk);
        }
        Ok(audio)
    }

    /// Round-trips the audio through the transcoder via two scratch files,
    /// both gone by the time this returns.
    async fn transcode(&self, audio_name: &str, raw: &[u8]) -> Result<Vec<u8>> {
        let work_dir = &self.settings.work_dir;
        let bitrate = &self.settings.audio_bitrate;

        let src = ScratchFile::new(work_dir.join(format!("{audio_name}.m4a")));
        tokio::fs::write(src.path(), raw)
            .await
            .with_context(|| format!("WriteFile {}", src.path().display()))?;

        let out = ScratchFile::new(work_dir.join(format!("{audio_name}.{bitrate}.m4a")));
        self.transcoder
            .transcode(src.path(), out.path(), bitrate)
            .await
            .context("transcode")?;
        src.remove().await;

        let audio = tokio::fs::read(out.path())
            .await
            .with_context(|| format!("ReadFile {}", out.path().display()))?;
        out.remove().await;
        Ok(audio)
    }
}

/// Local file deleted on `remove`, or on drop when an earlier step failed.
struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(mut self) {
        self.removed = true;
        if let Err(err) = tokio::fs::remove_file(&self.path).await {
            warn!(?err, path = %self.path.display(), "remove scratch file");
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.removed || !self.path.exists() {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(?err, path = %self.path.display(), "remove scratch file");
        }
    }
}
