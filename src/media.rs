//! Audio source: encoding discovery through `yt-dlp` and HTTP streaming of
//! the chosen encoding.
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::model::{Encoding, MediaInfo};

pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const AUDIO_MP4: &str = "audio/mp4";

#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Duration and available encodings of a video.
    async fn probe(&self, video_id: &str) -> Result<MediaInfo>;

    async fn open_stream(&self, video_id: &str, encoding: &Encoding) -> Result<ByteStream>;
}

/// Lowest-bitrate audio-only MPEG-4 encoding.
///
/// The first candidate with a nonzero bitrate is taken, then replaced by any
/// later candidate with a strictly lower bitrate.
pub fn select_audio_encoding(encodings: &[Encoding]) -> Option<&Encoding> {
    let mut best: Option<&Encoding> = None;
    for enc in encodings.iter().filter(|e| e.mime_type.starts_with(AUDIO_MP4)) {
        match best {
            Some(b) if b.bitrate != 0 && enc.bitrate >= b.bitrate => {}
            _ => best = Some(enc),
        }
    }
    best
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    path: PathBuf,
    http: Client,
}

impl YtDlp {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            path: path.into(),
            http,
        })
    }

    async fn dump_json(&self, video_id: &str) -> Result<Vec<u8>> {
        let url = format!("{WATCH_URL}?v={video_id}");
        let output = Command::new(&self.path)
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg(&url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to spawn {} for {url}", self.path.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("yt-dlp failed for {} ({}): {}", url, output.status, stderr.trim());
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaSource for YtDlp {
    async fn probe(&self, video_id: &str) -> Result<MediaInfo> {
        let json = self.dump_json(video_id).await?;
        let info: VideoInfo =
            serde_json::from_slice(&json).context("parsing yt-dlp metadata response")?;
        Ok(info.into())
    }

    async fn open_stream(&self, _video_id: &str, encoding: &Encoding) -> Result<ByteStream> {
        if encoding.url.is_empty() {
            return Err(anyhow!("encoding has no url"));
        }
        let mut req = self.http.get(&encoding.url);
        for (name, value) in &encoding.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        let res = req.send().await.context("failed to open audio stream")?;
        if !res.status().is_success() {
            bail!("audio stream request failed: {}", res.status());
        }
        debug!(content_length = ?res.content_length(), "audio stream opened");
        Ok(res
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(anyhow::Error::from))
            .boxed())
    }
}

#[derive(Deserialize, Debug)]
struct VideoInfo {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<Format>,
}

#[derive(Deserialize, Debug)]
struct Format {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    /// kbit/s
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    http_headers: BTreeMap<String, String>,
}

fn is_none_codec(codec: Option<&str>) -> bool {
    matches!(codec, None | Some("none"))
}

impl Format {
    /// MIME type in the `type/container; codecs="..."` form players report.
    fn mime_type(&self) -> String {
        let acodec = self.acodec.as_deref();
        let vcodec = self.vcodec.as_deref();
        let kind = if is_none_codec(vcodec) && !is_none_codec(acodec) {
            "audio"
        } else {
            "video"
        };
        let container = match self.ext.as_deref().unwrap_or_default() {
            "m4a" | "mp4" => "mp4",
            other => other,
        };
        let codecs: Vec<&str> = [vcodec, acodec]
            .into_iter()
            .filter(|c| !is_none_codec(*c))
            .flatten()
            .collect();
        if codecs.is_empty() {
            format!("{kind}/{container}")
        } else {
            format!("{kind}/{container}; codecs=\"{}\"", codecs.join(", "))
        }
    }

    fn bitrate(&self) -> u64 {
        let kbps = self.abr.or(self.tbr).unwrap_or_default();
        (kbps * 1000.0).round().max(0.0) as u64
    }
}

impl From<VideoInfo> for MediaInfo {
    fn from(info: VideoInfo) -> Self {
        let duration = Duration::from_secs_f64(info.duration.unwrap_or_default().max(0.0));
        let encodings = info
            .formats
            .into_iter()
            .map(|f| Encoding {
                mime_type: f.mime_type(),
                bitrate: f.bitrate(),
                url: f.url.clone().unwrap_or_default(),
                headers: f.http_headers,
            })
            .collect();
        MediaInfo {
            duration,
            encodings,
        }
    }
}
