//! Configuration loader and validator for the playlist-to-channel sync.
//!
//! Settings come from the process environment after the env file has been
//! overlaid on it. Keys keep the names the deployment already uses
//! (`TgToken`, `YtKey`, ...).
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::ChannelRef;
use crate::pipeline::PipelineSettings;
use crate::title::TitleCleaner;

pub const DEFAULT_ENV_FILE: &str = "yttgchan.env";
/// Key under which the watermark is persisted.
pub const LAST_KEY: &str = "YtLast";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} empty")]
    Missing(&'static str),
    #[error("TgTitleCleanRe: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub telegram: Telegram,
    pub youtube: Youtube,
    pub tools: Tools,
    pub heroku: Option<Heroku>,
}

/// Telegram bot and message settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
    pub chat_id: String,
    pub performer: String,
    pub audio_bitrate: String,
    pub title_clean_re: Option<String>,
    pub title_unquote: bool,
}

/// YouTube source settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Youtube {
    pub api_key: String,
    pub username: Option<String>,
    pub channel_id: Option<String>,
    pub playlist_ids: Vec<String>,
    pub last: Option<String>,
}

/// External executables and scratch space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub ffmpeg_path: PathBuf,
    pub yt_dlp_path: PathBuf,
    pub work_dir: PathBuf,
}

/// Remote config-vars endpoint used to persist the watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heroku {
    pub token: String,
    pub vars_url: String,
}

impl Config {
    /// Build from the current process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build from arbitrary key/value pairs. Empty values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        let get = |key: &str| vars.get(key).cloned();
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let heroku = match (get("HerokuToken"), get("HerokuVarsUrl")) {
            (Some(token), Some(vars_url)) => Some(Heroku { token, vars_url }),
            _ => None,
        };

        let cfg = Config {
            telegram: Telegram {
                bot_token: required("TgToken")?,
                chat_id: required("TgChatId")?,
                performer: get("TgPerformer").unwrap_or_default(),
                audio_bitrate: get("TgAudioBitrate").unwrap_or_else(|| "64k".into()),
                title_clean_re: get("TgTitleCleanRe"),
                title_unquote: get("TgTitleUnquote").is_some(),
            },
            youtube: Youtube {
                api_key: required("YtKey")?,
                username: get("YtUsername"),
                channel_id: get("YtChannelId"),
                playlist_ids: get("YtPlaylistId")
                    .map(|ids| {
                        ids.split(' ')
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                last: get(LAST_KEY),
            },
            tools: Tools {
                ffmpeg_path: get("FfmpegPath").unwrap_or_else(|| "./ffmpeg".into()).into(),
                yt_dlp_path: get("YtDlpPath").unwrap_or_else(|| "yt-dlp".into()).into(),
                work_dir: get("WorkDir").unwrap_or_else(|| ".".into()).into(),
            },
            heroku,
        };
        validate(&cfg)?;
        Ok(cfg)
    }

    /// Ensure the scratch directory exists.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.tools.work_dir)
    }

    /// Channel to resolve when no playlist id is configured. A username that
    /// starts with `@` is a handle; the username wins over the channel id.
    pub fn channel(&self) -> Option<ChannelRef> {
        match (&self.youtube.username, &self.youtube.channel_id) {
            (Some(name), _) if name.starts_with('@') => Some(ChannelRef::Handle(name.clone())),
            (Some(name), _) => Some(ChannelRef::Username(name.clone())),
            (None, Some(id)) => Some(ChannelRef::Id(id.clone())),
            (None, None) => None,
        }
    }

    pub fn title_cleaner(&self) -> Result<TitleCleaner, ConfigError> {
        Ok(TitleCleaner::new(
            self.telegram.title_clean_re.as_deref(),
            self.telegram.title_unquote,
        )?)
    }

    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        Ok(PipelineSettings {
            playlist_ids: self.youtube.playlist_ids.clone(),
            channel: self.channel(),
            audio_bitrate: self.telegram.audio_bitrate.clone(),
            title: self.title_cleaner()?,
            work_dir: self.tools.work_dir.clone(),
            initial_watermark: self.youtube.last.clone().unwrap_or_default(),
        })
    }
}

/// Overlay the env file on the process environment, overriding existing
/// variables. A missing file is reported to the caller, not fatal.
pub fn load_env_file(path: &Path) -> Result<(), dotenvy::Error> {
    dotenvy::from_path_override(path)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Missing("TgToken"));
    }
    if cfg.telegram.chat_id.trim().is_empty() {
        return Err(ConfigError::Missing("TgChatId"));
    }
    if cfg.youtube.api_key.trim().is_empty() {
        return Err(ConfigError::Missing("YtKey"));
    }
    if cfg.telegram.audio_bitrate.trim().is_empty() {
        return Err(ConfigError::Invalid("TgAudioBitrate must be non-empty"));
    }
    cfg.title_cleaner()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("TgToken", "123:abc"),
            ("TgChatId", "@channel"),
            ("YtKey", "key"),
        ]
    }

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut vars = base();
        vars.extend_from_slice(extra);
        vars
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::from_vars(base()).unwrap();
        assert_eq!(cfg.telegram.audio_bitrate, "64k");
        assert_eq!(cfg.tools.ffmpeg_path, PathBuf::from("./ffmpeg"));
        assert_eq!(cfg.tools.yt_dlp_path, PathBuf::from("yt-dlp"));
        assert!(!cfg.telegram.title_unquote);
        assert!(cfg.youtube.playlist_ids.is_empty());
        assert!(cfg.heroku.is_none());
        assert_eq!(cfg.channel(), None);
    }

    #[test]
    fn missing_mandatory_keys() {
        for key in ["TgToken", "TgChatId", "YtKey"] {
            let vars: Vec<_> = base().into_iter().filter(|(k, _)| *k != key).collect();
            match Config::from_vars(vars) {
                Err(ConfigError::Missing(k)) => assert_eq!(k, key),
                other => panic!("expected missing {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let vars = vec![("TgToken", ""), ("TgChatId", "1"), ("YtKey", "key")];
        assert!(matches!(
            Config::from_vars(vars),
            Err(ConfigError::Missing("TgToken"))
        ));
    }

    #[test]
    fn playlist_ids_are_space_separated() {
        let cfg = Config::from_vars(with(&[("YtPlaylistId", "PL1  PL2 ")])).unwrap();
        assert_eq!(cfg.youtube.playlist_ids, vec!["PL1", "PL2"]);
    }

    #[test]
    fn channel_resolution_order() {
        let cfg =
            Config::from_vars(with(&[("YtUsername", "@handle"), ("YtChannelId", "UC1")])).unwrap();
        assert_eq!(cfg.channel(), Some(ChannelRef::Handle("@handle".into())));

        let cfg = Config::from_vars(with(&[("YtUsername", "legacy")])).unwrap();
        assert_eq!(cfg.channel(), Some(ChannelRef::Username("legacy".into())));

        let cfg = Config::from_vars(with(&[("YtChannelId", "UC1")])).unwrap();
        assert_eq!(cfg.channel(), Some(ChannelRef::Id("UC1".into())));
    }

    #[test]
    fn heroku_needs_both_values() {
        let cfg = Config::from_vars(with(&[("HerokuToken", "t")])).unwrap();
        assert!(cfg.heroku.is_none());

        let cfg = Config::from_vars(with(&[
            ("HerokuToken", "t"),
            ("HerokuVarsUrl", "https://api.heroku.com/apps/x/config-vars"),
        ]))
        .unwrap();
        assert_eq!(cfg.heroku.unwrap().token, "t");
    }

    #[test]
    fn invalid_title_pattern() {
        let err = Config::from_vars(with(&[("TgTitleCleanRe", "(")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern(_)));
    }

    #[test]
    fn pipeline_settings_carry_watermark() {
        let cfg = Config::from_vars(with(&[
            ("YtLast", "20230101.000000.abc"),
            ("TgTitleUnquote", "1"),
        ]))
        .unwrap();
        let settings = cfg.pipeline_settings().unwrap();
        assert_eq!(settings.initial_watermark, "20230101.000000.abc");
        assert_eq!(settings.title.clean(r#""x""#), "x");
    }

    #[test]
    fn ensure_dirs_creates_work_dir() {
        let td = tempdir().unwrap();
        let work = td.path().join("work");
        let mut cfg = Config::from_vars(base()).unwrap();
        cfg.tools.work_dir = work.clone();
        cfg.ensure_dirs().unwrap();
        assert!(work.exists());
    }

    #[test]
    fn env_file_overrides_environment() {
        let td = tempdir().unwrap();
        let p = td.path().join(DEFAULT_ENV_FILE);
        fs::write(&p, "TgTestOverlayKey=from-file\n").unwrap();
        std::env::set_var("TgTestOverlayKey", "from-env");
        load_env_file(&p).unwrap();
        assert_eq!(std::env::var("TgTestOverlayKey").unwrap(), "from-file");
    }
}
