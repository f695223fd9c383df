use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tg_ytchan::config::{self, Config};
use tg_ytchan::media::YtDlp;
use tg_ytchan::telegram::TelegramPublisher;
use tg_ytchan::transcode::Ffmpeg;
use tg_ytchan::watermark;
use tg_ytchan::youtube::YoutubeClient;
use tg_ytchan::SyncPipeline;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Republish new playlist videos as audio posts to a Telegram channel"
)]
struct Args {
    /// Env file overlaid on the environment; also keeps the watermark
    #[arg(long, default_value = config::DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Directory for temporary audio files (overrides WorkDir)
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Err(err) = config::load_env_file(&args.env_file) {
        warn!(%err, path = %args.env_file.display(), "loading dotenv file");
    }

    let mut cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(%err, "invalid configuration");
            std::process::exit(1);
        }
    };
    if let Some(dir) = args.work_dir {
        cfg.tools.work_dir = dir;
    }
    let settings = match cfg.pipeline_settings() {
        Ok(settings) => settings,
        Err(err) => {
            error!(%err, "invalid configuration");
            std::process::exit(1);
        }
    };
    cfg.ensure_dirs()?;

    let ffmpeg = Ffmpeg::new(&cfg.tools.ffmpeg_path);
    if let Err(err) = ffmpeg.ensure_available().await {
        warn!(%err, "transcoding will fail until ffmpeg is available");
    }

    let pipeline = SyncPipeline::new(
        settings,
        Box::new(YoutubeClient::new(cfg.youtube.api_key.clone())?),
        Box::new(YtDlp::new(&cfg.tools.yt_dlp_path)?),
        Box::new(ffmpeg),
        Box::new(TelegramPublisher::new(
            Bot::new(cfg.telegram.bot_token.clone()),
            &cfg.telegram.chat_id,
            cfg.telegram.performer.clone(),
        )),
        watermark::from_config(&cfg, &args.env_file)?,
    );

    match pipeline.run().await {
        Ok(report) => info!(
            discovered = report.discovered,
            published = report.published,
            last = %report.watermark,
            "run complete"
        ),
        Err(err) => error!("run stopped: {err:#}"),
    }
    Ok(())
}
