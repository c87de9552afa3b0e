//! Decode backends.
//!
//! The decode tool is an external collaborator: it is spawned as a child
//! process and its stdout is consumed as a raw byte stream. The trait seam
//! here lets tests drive the pipeline with in-memory sources instead of a
//! real ffmpeg binary.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};

use crate::core::PlayerConfig;
use crate::error::PlayerError;
use crate::media::descriptor::{AudioDescriptor, VideoDescriptor};
use crate::media::probe::{self, ProbeResult};

/// How a byte source ended once it stopped producing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Clean end of stream.
    Completed,
    /// The decode process exited abnormally; holds its exit code if known.
    Failed(Option<i32>),
}

/// A blocking raw byte stream from the decode collaborator.
///
/// Reads return exactly the requested bytes until near end-of-stream, where
/// they may return fewer or zero (EOF). `finish` reaps the source and reports
/// how it ended; `terminator` hands out a handle that can request early
/// shutdown from another thread while a read is in flight.
pub trait ByteSource: Send {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn finish(&mut self) -> SourceStatus;
    fn terminator(&self) -> Box<dyn FnMut() + Send>;
}

/// Probes sources and opens per-stream decode pipes.
pub trait DecodeBackend: Send {
    fn probe(&self, file: &Path) -> Result<ProbeResult, PlayerError>;
    fn open_video(
        &self,
        file: &Path,
        descriptor: &VideoDescriptor,
    ) -> Result<Box<dyn ByteSource>, PlayerError>;
    fn open_audio(
        &self,
        file: &Path,
        descriptor: &AudioDescriptor,
    ) -> Result<Box<dyn ByteSource>, PlayerError>;
}

/// Backend that spawns the ffmpeg/ffprobe binaries named in the player
/// configuration. Tool locations are injected here rather than resolved from
/// process-global state.
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    video_bit_depth: u32,
}

impl FfmpegBackend {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            video_bit_depth: config.video_bit_depth,
        }
    }
}

impl DecodeBackend for FfmpegBackend {
    fn probe(&self, file: &Path) -> Result<ProbeResult, PlayerError> {
        probe::probe_file(&self.ffprobe, file, self.video_bit_depth)
    }

    fn open_video(
        &self,
        file: &Path,
        descriptor: &VideoDescriptor,
    ) -> Result<Box<dyn ByteSource>, PlayerError> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-i")
            .arg(file)
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg(descriptor.pixel_format.ffmpeg_pix_fmt())
            .arg("-v")
            .arg("quiet")
            .arg("-");
        log::info!(
            "spawning video decode pipe: {:?} ({} bytes/frame)",
            file,
            descriptor.frame_size()
        );
        ChildByteSource::spawn(cmd)
    }

    fn open_audio(
        &self,
        file: &Path,
        descriptor: &AudioDescriptor,
    ) -> Result<Box<dyn ByteSource>, PlayerError> {
        let format = descriptor.sample_format;
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-i")
            .arg(file)
            .arg("-f")
            .arg(format.ffmpeg_format())
            .arg("-acodec")
            .arg(format.ffmpeg_codec())
            .arg("-ac")
            .arg(descriptor.channels.to_string())
            .arg("-v")
            .arg("quiet")
            .arg("-");
        log::info!(
            "spawning audio decode pipe: {:?} ({} bytes/chunk)",
            file,
            descriptor.chunk_size()
        );
        ChildByteSource::spawn(cmd)
    }
}

/// Byte source over a spawned child process' stdout. The child handle is
/// shared so a terminator can kill it while the reader is blocked.
struct ChildByteSource {
    stdout: ChildStdout,
    child: Arc<Mutex<Child>>,
}

impl ChildByteSource {
    fn spawn(mut cmd: Command) -> Result<Box<dyn ByteSource>, PlayerError> {
        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(PlayerError::Spawn)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PlayerError::Probe("decode process has no stdout".into()))?;
        log::debug!("decode process started (pid {})", child.id());
        Ok(Box::new(Self {
            stdout,
            child: Arc::new(Mutex::new(child)),
        }))
    }
}

impl ByteSource for ChildByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }

    fn finish(&mut self) -> SourceStatus {
        let mut child = match self.child.lock() {
            Ok(child) => child,
            Err(_) => return SourceStatus::Failed(None),
        };
        match child.wait() {
            Ok(status) if status.success() => SourceStatus::Completed,
            Ok(status) => {
                log::warn!("decode process exited with {}", status);
                SourceStatus::Failed(status.code())
            }
            Err(e) => {
                log::warn!("failed to reap decode process: {}", e);
                SourceStatus::Failed(None)
            }
        }
    }

    fn terminator(&self) -> Box<dyn FnMut() + Send> {
        let child = self.child.clone();
        Box::new(move || {
            if let Ok(mut child) = child.lock() {
                log::debug!("terminating decode process (pid {})", child.id());
                let _ = child.kill();
            }
        })
    }
}
