use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use teloxide::payloads::setters::*;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, Recipient};
use teloxide::utils::html;
use tracing::{debug, instrument};

use crate::error::SyncError;
use crate::model::AudioUpload;

/// Write side: the channel the audio is republished to.
///
/// Uploads return a reusable file id so the final messages can be sent
/// without transferring the bytes again.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn upload_photo(&self, file_name: &str, photo: Vec<u8>) -> Result<String>;

    async fn upload_audio(&self, upload: AudioUpload) -> Result<String>;

    async fn send_audio(&self, file_id: &str) -> Result<()>;

    async fn send_photo(&self, file_id: &str, caption_html: &str) -> Result<()>;

    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Numeric ids address chats directly, anything else is a channel username.
pub fn parse_recipient(chat_id: &str) -> Recipient {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if chat_id.starts_with('@') => Recipient::ChannelUsername(chat_id.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{chat_id}")),
    }
}

/// Cover caption: the title, bold and underlined.
pub fn cover_caption(title: &str) -> String {
    format!("<u><b>{}</b></u>", html::escape(title))
}

/// File id of the strictly widest variant; the first one wins a tie.
pub fn widest<'a, I>(variants: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (u32, &'a str)>,
{
    let mut best: Option<(u32, &str)> = None;
    for (width, id) in variants {
        if width > best.map_or(0, |(w, _)| w) {
            best = Some((width, id));
        }
    }
    best.map(|(_, id)| id)
}

#[derive(Clone)]
pub struct TelegramPublisher {
    bot: Bot,
    chat: Recipient,
    performer: String,
}

impl TelegramPublisher {
    pub fn new(bot: Bot, chat_id: &str, performer: impl Into<String>) -> Self {
        Self {
            bot,
            chat: parse_recipient(chat_id),
            performer: performer.into(),
        }
    }

    /// Remove a message that only existed to get a file uploaded.
    async fn discard(&self, msg: &Message) -> Result<()> {
        self.bot
            .delete_message(self.chat.clone(), msg.id)
            .await
            .with_context(|| format!("deleteMessage({:?})", msg.id))?;
        Ok(())
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    #[instrument(skip(self, photo), fields(bytes = photo.len()))]
    async fn upload_photo(&self, file_name: &str, photo: Vec<u8>) -> Result<String> {
        let file = InputFile::memory(photo).file_name(format!("{file_name}.cover"));
        let msg = self
            .bot
            .send_photo(self.chat.clone(), file)
            .await
            .context("sendPhoto upload")?;

        let sizes = msg
            .photo()
            .filter(|sizes| !sizes.is_empty())
            .ok_or_else(|| anyhow!("sendPhoto: photo empty"))?;
        let file_id = widest(sizes.iter().map(|p| (p.width, p.file.id.as_str())))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(SyncError::EmptyFileId("sendPhoto"))?;

        self.discard(&msg).await?;
        debug!(%file_id, "cover uploaded");
        Ok(file_id)
    }

    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, bytes = upload.audio.len()))]
    async fn upload_audio(&self, upload: AudioUpload) -> Result<String> {
        let audio = InputFile::memory(upload.audio).file_name(upload.file_name.clone());
        let thumb =
            InputFile::memory(upload.thumb).file_name(format!("{}.thumb", upload.file_name));
        let msg = self
            .bot
            .send_audio(self.chat.clone(), audio)
            .performer(self.performer.clone())
            .title(upload.title)
            .thumb(thumb)
            .duration(upload.duration_secs)
            .await
            .context("sendAudio upload")?;

        let file_id = msg
            .audio()
            .map(|a| a.file.id.clone())
            .filter(|id| !id.is_empty())
            .ok_or(SyncError::EmptyFileId("sendAudio"))?;

        self.discard(&msg).await?;
        debug!(%file_id, "audio uploaded");
        Ok(file_id)
    }

    async fn send_audio(&self, file_id: &str) -> Result<()> {
        self.bot
            .send_audio(self.chat.clone(), InputFile::file_id(file_id))
            .await
            .context("sendAudio")?;
        Ok(())
    }

    async fn send_photo(&self, file_id: &str, caption_html: &str) -> Result<()> {
        self.bot
            .send_photo(self.chat.clone(), InputFile::file_id(file_id))
            .caption(caption_html)
            .parse_mode(ParseMode::Html)
            .await
            .context("sendPhoto")?;
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.chat.clone(), text)
            .disable_web_page_preview(true)
            .await
            .context("sendMessage")?;
        Ok(())
    }
}
