use anyhow::anyhow;
use std::sync::{Arc, Mutex};
use tg_ytchan::model::AudioUpload;
use tg_ytchan::telegram::Publisher;

/// Records every call as `method:arg[:arg...]`.
#[derive(Clone, Default)]
pub struct MockPublisher {
    pub events: Arc<Mutex<Vec<String>>>,
    pub fail_on: Option<&'static str>,
}

impl MockPublisher {
    pub fn failing_on(method: &'static str) -> Self {
        Self {
            fail_on: Some(method),
            ..Default::default()
        }
    }

    fn record(&self, method: &'static str, event: String) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event);
        if self.fail_on == Some(method) {
            return Err(anyhow!("{method}: Bad Request"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Publisher for MockPublisher {
    async fn upload_photo(&self, file_name: &str, photo: Vec<u8>) -> anyhow::Result<String> {
        self.record(
            "upload_photo",
            format!("upload_photo:{file_name}:{}", String::from_utf8_lossy(&photo)),
        )?;
        Ok(format!("photo-{file_name}"))
    }

    async fn upload_audio(&self, upload: AudioUpload) -> anyhow::Result<String> {
        self.record(
            "upload_audio",
            format!(
                "upload_audio:{}:{}:{}:{}",
                upload.file_name,
                upload.title,
                upload.duration_secs,
                upload.audio.len()
            ),
        )?;
        Ok(format!("audio-{}", upload.file_name))
    }

    async fn send_audio(&self, file_id: &str) -> anyhow::Result<()> {
        self.record("send_audio", format!("send_audio:{file_id}"))
    }

    async fn send_photo(&self, file_id: &str, caption_html: &str) -> anyhow::Result<()> {
        self.record("send_photo", format!("send_photo:{file_id}:{caption_html}"))
    }

    async fn send_text(&self, text: &str) -> anyhow::Result<()> {
        self.record("send_text", format!("send_text:{text}"))
    }
}
