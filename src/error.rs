use thiserror::Error;

/// Data-integrity failures detected while publishing one item. Any of these
/// stops the run, exactly like a failed remote call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("no cover url")]
    NoCover,
    #[error("no thumb url")]
    NoThumbnail,
    #[error("no audio/mp4 encoding available for {0}")]
    NoAudioEncoding(String),
    #[error("downloaded audio is {0} bytes, less than one megabyte")]
    AudioTooSmall(usize),
    #[error("{0}: file_id empty")]
    EmptyFileId(&'static str),
    #[error("channel has no uploads playlist")]
    NoUploadsPlaylist,
}
