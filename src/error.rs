use std::io;
use thiserror::Error;

/// Errors produced by the playback pipeline.
///
/// Producer-side failures never cross thread boundaries directly; they are
/// mapped onto the player state machine (a single `StateChanged(Error)`
/// notification) and the failing detail is logged.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no {stream} stream found in source")]
    SourceNotFound { stream: &'static str },

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("decoder exited abnormally (status {status:?})")]
    DecodeFailed { status: Option<i32> },

    #[error("failed to spawn decode process: {0}")]
    Spawn(#[from] io::Error),

    #[error("append on a sealed stream buffer")]
    SealedBufferAppend,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("audio/video sink error: {0}")]
    Sink(String),

    #[error("player control thread is not running")]
    ControlThreadGone,
}
