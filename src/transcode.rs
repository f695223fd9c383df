use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Re-encode `input` into `output` at `bitrate` (ffmpeg syntax, e.g. `64k`).
    async fn transcode(&self, input: &Path, output: &Path, bitrate: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    path: PathBuf,
}

impl Ffmpeg {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the configured `ffmpeg` binary runs by invoking `ffmpeg -version`.
    pub async fn ensure_available(&self) -> Result<()> {
        let status = Command::new(&self.path)
            .arg("-version")
            .kill_on_drop(true)
            .output()
            .await;
        match status {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(anyhow!("ffmpeg not available (exit status {})", out.status)),
            Err(e) => Err(anyhow!("ffmpeg not available at {}: {}", self.path.display(), e)),
        }
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn transcode(&self, input: &Path, output: &Path, bitrate: &str) -> Result<()> {
        let status = Command::new(&self.path)
            .arg("-v")
            .arg("panic")
            .arg("-i")
            .arg(input.as_os_str())
            .arg("-b:a")
            .arg(bitrate)
            .arg(output.as_os_str())
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to spawn ffmpeg for {}", input.display()))?;

        if !status.success() {
            return Err(anyhow!(
                "ffmpeg exited with status {} for {}",
                status,
                input.display()
            ));
        }
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(anyhow!("ffmpeg produced no output at {}", output.display()));
        }
        Ok(())
    }
}
