//! Clock-synchronized media playback over external decode pipes.
//!
//! A source file is probed for its video and audio streams, each stream is
//! decoded by a spawned ffmpeg process into an append-only in-memory buffer,
//! and a single control thread presents video frames and feeds PCM audio
//! from one shared pause-aware clock. See [`playback::Player`] for the
//! public entry point.

pub mod core;
pub mod error;
pub mod media;
pub mod playback;

pub use crate::core::PlayerConfig;
pub use crate::error::PlayerError;
pub use crate::media::{FfmpegBackend, ProbeResult};
pub use crate::playback::{Player, PlayerEvent, PlayerState};
