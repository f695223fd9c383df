pub mod config;
pub mod error;
pub mod media;
pub mod model;
pub mod pipeline;
pub mod telegram;
pub mod title;
pub mod transcode;
pub mod watermark;
pub mod youtube;

pub use pipeline::{PipelineSettings, RunReport, SyncPipeline};
