use anyhow::anyhow;
use futures::stream::{self, StreamExt};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tg_ytchan::media::{ByteStream, MediaSource};
use tg_ytchan::model::{Encoding, MediaInfo};

#[derive(Clone)]
pub struct MockMedia {
    pub encodings: Vec<Encoding>,
    pub duration: Duration,
    /// Total bytes served by every stream.
    pub audio_size: usize,
    pub probe_calls: Arc<Mutex<Vec<String>>>,
    pub stream_calls: Arc<Mutex<Vec<(String, Encoding)>>>,
    pub fail_probe: bool,
    pub fail_stream: bool,
}

impl Default for MockMedia {
    fn default() -> Self {
        Self {
            encodings: vec![
                Encoding::new("audio/mp4; codecs=\"mp4a.40.2\"", 129_000),
                Encoding::new("audio/mp4; codecs=\"mp4a.40.5\"", 48_000),
                Encoding::new("audio/webm; codecs=\"opus\"", 30_000),
                Encoding::new("video/mp4; codecs=\"avc1.4d401e\"", 20_000),
            ],
            duration: Duration::from_secs(3605),
            audio_size: 2_000_000,
            probe_calls: Arc::new(Mutex::new(Vec::new())),
            stream_calls: Arc::new(Mutex::new(Vec::new())),
            fail_probe: false,
            fail_stream: false,
        }
    }
}

impl MockMedia {
    pub fn with_audio_size(audio_size: usize) -> Self {
        Self {
            audio_size,
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl MediaSource for MockMedia {
    async fn probe(&self, video_id: &str) -> anyhow::Result<MediaInfo> {
        self.probe_calls.lock().unwrap().push(video_id.to_string());
        if self.fail_probe {
            return Err(anyhow!("yt-dlp failed for {video_id}: Video unavailable"));
        }
        Ok(MediaInfo {
            duration: self.duration,
            encodings: self.encodings.clone(),
        })
    }

    async fn open_stream(
        &self,
        video_id: &str,
        encoding: &Encoding,
    ) -> anyhow::Result<ByteStream> {
        self.stream_calls
            .lock()
            .unwrap()
            .push((video_id.to_string(), encoding.clone()));
        if self.fail_stream {
            return Err(anyhow!("audio stream request failed: 403 Forbidden"));
        }
        let half = self.audio_size / 2;
        let chunks: Vec<anyhow::Result<Vec<u8>>> =
            vec![Ok(vec![7u8; half]), Ok(vec![7u8; self.audio_size - half])];
        Ok(stream::iter(chunks).boxed())
    }
}
