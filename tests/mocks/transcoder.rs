use anyhow::anyhow;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tg_ytchan::transcode::Transcoder;

/// Copies its input to the output, or fails without producing anything.
#[derive(Clone, Default)]
pub struct MockTranscoder {
    pub calls: Arc<Mutex<Vec<(PathBuf, PathBuf, String)>>>,
    pub fail: bool,
}

impl MockTranscoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl Transcoder for MockTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, bitrate: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((
            input.to_path_buf(),
            output.to_path_buf(),
            bitrate.to_string(),
        ));
        if self.fail {
            return Err(anyhow!("ffmpeg: exit status: 1"));
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}
