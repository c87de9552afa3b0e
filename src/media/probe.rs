//! Source metadata probing.
//!
//! Runs `ffprobe -print_format json` and extracts the per-stream fields the
//! pipeline needs. The JSON digging lives in pure functions over
//! `serde_json::Value` so tests can feed canned probe output.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

use crate::error::PlayerError;
use crate::media::descriptor::{AudioDescriptor, VideoDescriptor};
use crate::media::format::{PixelFormat, SampleFormat};

/// Per-stream descriptors for one source file. A stream that is absent from
/// the container probes as `None`.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub video: Option<VideoDescriptor>,
    pub audio: Option<AudioDescriptor>,
}

/// Probes `file` with the configured ffprobe binary.
pub fn probe_file(
    ffprobe: &Path,
    file: &Path,
    video_bit_depth: u32,
) -> Result<ProbeResult, PlayerError> {
    let output = Command::new(ffprobe)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(file)
        .output()
        .map_err(PlayerError::Spawn)?;

    if !output.status.success() {
        return Err(PlayerError::Probe(format!(
            "ffprobe exited with {}",
            output.status
        )));
    }

    let info: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| PlayerError::Probe(format!("bad ffprobe output: {}", e)))?;

    parse_probe(&info, video_bit_depth)
}

/// Extracts descriptors from a parsed ffprobe JSON document.
pub fn parse_probe(info: &Value, video_bit_depth: u32) -> Result<ProbeResult, PlayerError> {
    let empty = vec![];
    let streams = info["streams"].as_array().unwrap_or(&empty);

    let video = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .map(|s| parse_video_stream(s, video_bit_depth))
        .transpose()?;

    let audio = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("audio"))
        .map(parse_audio_stream)
        .transpose()?;

    if let Some(ref v) = video {
        log::info!(
            "probed video: {}x{} {} frames over {:.3}s ({:.2} fps)",
            v.width,
            v.height,
            v.frame_count,
            v.duration_seconds,
            v.fps
        );
    }
    if let Some(ref a) = audio {
        log::info!(
            "probed audio: {} ch {} Hz {}-bit, {:.3}s",
            a.channels,
            a.sample_rate,
            a.bit_depth(),
            a.duration_seconds
        );
    }

    Ok(ProbeResult { video, audio })
}

fn parse_video_stream(stream: &Value, bit_depth: u32) -> Result<VideoDescriptor, PlayerError> {
    let width = stream["width"]
        .as_u64()
        .ok_or_else(|| PlayerError::Probe("video stream has no width".into()))? as u32;
    let height = stream["height"]
        .as_u64()
        .ok_or_else(|| PlayerError::Probe("video stream has no height".into()))? as u32;

    // Sources that report no frame count (still images, some containers) are
    // treated as a single frame over one second.
    let frame_count = stream["nb_frames"]
        .as_str()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let duration_seconds = parse_duration(stream);
    let fps = frame_count as f64 / duration_seconds;

    Ok(VideoDescriptor {
        width,
        height,
        pixel_format: PixelFormat::from_bit_depth(bit_depth)?,
        duration_seconds,
        frame_count,
        fps,
    })
}

fn parse_audio_stream(stream: &Value) -> Result<AudioDescriptor, PlayerError> {
    let channels = stream["channels"]
        .as_u64()
        .ok_or_else(|| PlayerError::Probe("audio stream has no channel count".into()))?
        as u32;
    let sample_rate = stream["sample_rate"]
        .as_str()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| PlayerError::Probe("audio stream has no sample rate".into()))?;
    let duration_seconds = parse_duration(stream);

    // Lossy codecs decode planar float; ffmpeg converts those to 16-bit PCM
    // on the pipe. Everything else keeps its container bit depth.
    let codec = stream["codec_name"].as_str().unwrap_or("");
    let sample_fmt = stream["sample_fmt"].as_str().unwrap_or("");
    let reported_bits = stream["bits_per_sample"].as_u64().unwrap_or(0) as u32;
    let bit_depth = if sample_fmt == "fltp"
        && matches!(codec, "mp3" | "mp4" | "aac" | "webm" | "ogg" | "opus" | "vorbis")
    {
        16
    } else if reported_bits > 0 {
        reported_bits
    } else {
        16
    };

    // duration_ts counts samples per channel; total across channels aligns
    // with the interleaved byte stream the pipe produces.
    let duration_ts = stream["duration_ts"].as_u64().unwrap_or(0);
    let total_samples = duration_ts * channels as u64;

    Ok(AudioDescriptor {
        channels,
        sample_rate,
        sample_format: SampleFormat::from_bit_depth(bit_depth)?,
        duration_seconds,
        total_samples,
    })
}

fn parse_duration(stream: &Value) -> f64 {
    let duration = stream["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(1.0);
    if duration > 0.0 {
        duration
    } else {
        1.0
    }
}
