//! Presentation sinks.
//!
//! Sinks are external collaborators: a display surface for video frames and
//! a bounded-capacity PCM device for audio. They are created on the control
//! thread through factories, and only the control thread ever touches their
//! configuration.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::PlayerError;
use crate::media::descriptor::{AudioDescriptor, VideoDescriptor};
use crate::media::format::PixelFormat;

/// Accepts decoded frames for display. Assumed synchronous and cheap enough
/// not to starve the control tick.
pub trait VideoSink {
    fn present(&mut self, frame: &[u8], width: u32, height: u32, format: PixelFormat);
}

/// Bounded-capacity PCM device. The feeder never writes more bytes than
/// `free_capacity` reported at the start of its tick.
pub trait AudioSink {
    /// Bytes the sink can accept right now without overflowing.
    fn free_capacity(&self) -> usize;
    /// Writes up to `buf.len()` bytes and returns how many were accepted.
    /// Callers must not offer more than `free_capacity()`.
    fn write(&mut self, buf: &[u8]) -> usize;
    /// Normalized volume, 0.0 to 1.0.
    fn set_volume(&mut self, volume: f64);
}

/// Creates a video sink once the stream dimensions are known. Runs on the
/// control thread, so the sink itself does not need to be Send.
pub trait VideoSinkFactory: Send {
    fn create(&mut self, descriptor: &VideoDescriptor) -> Result<Box<dyn VideoSink>, PlayerError>;
}

pub trait AudioSinkFactory: Send {
    fn create(&mut self, descriptor: &AudioDescriptor) -> Result<Box<dyn AudioSink>, PlayerError>;
}

// ============================================================================
// Logging video sink (headless demo)
// ============================================================================

/// Stands in for a display in the headless demo binary: counts frames and
/// logs occasionally.
pub struct LogVideoSink {
    presented: u64,
}

impl LogVideoSink {
    pub fn new() -> Self {
        Self { presented: 0 }
    }
}

impl VideoSink for LogVideoSink {
    fn present(&mut self, frame: &[u8], width: u32, height: u32, _format: PixelFormat) {
        if self.presented % 60 == 0 {
            log::debug!(
                "presented frame #{} ({}x{}, {} bytes)",
                self.presented,
                width,
                height,
                frame.len()
            );
        }
        self.presented += 1;
    }
}

pub struct LogVideoSinkFactory;

impl VideoSinkFactory for LogVideoSinkFactory {
    fn create(&mut self, _descriptor: &VideoDescriptor) -> Result<Box<dyn VideoSink>, PlayerError> {
        Ok(Box::new(LogVideoSink::new()))
    }
}

// ============================================================================
// cpal audio sink
// ============================================================================

struct SinkShared {
    queue: VecDeque<u8>,
    volume: f64,
}

/// PCM output through the default cpal device.
///
/// Holds one second of interleaved PCM; the device callback drains it in
/// real time, decoding samples to f32 and applying the volume. An empty
/// queue plays silence rather than blocking the device.
pub struct CpalAudioSink {
    shared: Arc<Mutex<SinkShared>>,
    capacity: usize,
    _stream: cpal::Stream,
}

impl CpalAudioSink {
    pub fn new(descriptor: &AudioDescriptor) -> Result<Self, PlayerError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlayerError::Sink("no default audio output device".into()))?;
        log::debug!(
            "audio output device: {}",
            device.name().unwrap_or_else(|_| "<unknown>".into())
        );

        let config = cpal::StreamConfig {
            channels: descriptor.channels as u16,
            sample_rate: cpal::SampleRate(descriptor.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // One second of interleaved PCM, the same bound the feeder sees.
        let capacity = descriptor.chunk_size();
        let shared = Arc::new(Mutex::new(SinkShared {
            queue: VecDeque::with_capacity(capacity),
            volume: 1.0,
        }));

        let cb_shared = shared.clone();
        let format = descriptor.sample_format;
        let bytes_per_sample = format.bytes_per_sample();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    let mut shared = match cb_shared.lock() {
                        Ok(guard) => guard,
                        Err(_) => return,
                    };
                    let volume = shared.volume as f32;
                    for out in data.iter_mut() {
                        *out = if shared.queue.len() >= bytes_per_sample {
                            let mut raw = [0u8; 4];
                            for byte in raw.iter_mut().take(bytes_per_sample) {
                                *byte = shared.queue.pop_front().unwrap_or(0);
                            }
                            format.sample_to_f32(&raw[..bytes_per_sample]) * volume
                        } else {
                            0.0
                        };
                    }
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| PlayerError::Sink(format!("failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| PlayerError::Sink(format!("failed to start output stream: {}", e)))?;

        Ok(Self {
            shared,
            capacity,
            _stream: stream,
        })
    }
}

impl AudioSink for CpalAudioSink {
    fn free_capacity(&self) -> usize {
        let shared = self.shared.lock().unwrap();
        self.capacity.saturating_sub(shared.queue.len())
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        let mut shared = self.shared.lock().unwrap();
        let free = self.capacity.saturating_sub(shared.queue.len());
        debug_assert!(
            buf.len() <= free,
            "audio write of {} bytes exceeds reported free capacity {}",
            buf.len(),
            free
        );
        let n = buf.len().min(free);
        shared.queue.extend(&buf[..n]);
        n
    }

    fn set_volume(&mut self, volume: f64) {
        let mut shared = self.shared.lock().unwrap();
        shared.volume = volume.clamp(0.0, 1.0);
        log::debug!("audio volume set to {:.2}", shared.volume);
    }
}

pub struct CpalSinkFactory;

impl AudioSinkFactory for CpalSinkFactory {
    fn create(&mut self, descriptor: &AudioDescriptor) -> Result<Box<dyn AudioSink>, PlayerError> {
        Ok(Box::new(CpalAudioSink::new(descriptor)?))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording sinks shared with the scheduler/feeder/player tests.

    use super::*;

    /// Records every presented frame index-equivalent (first byte) and size.
    #[derive(Default)]
    pub struct RecordingVideoSink {
        pub presents: Vec<(Vec<u8>, u32, u32)>,
    }

    impl VideoSink for RecordingVideoSink {
        fn present(&mut self, frame: &[u8], width: u32, height: u32, _format: PixelFormat) {
            self.presents.push((frame.to_vec(), width, height));
        }
    }

    /// Bounded in-memory audio sink that records writes and volume changes.
    pub struct RecordingAudioSink {
        pub capacity: usize,
        pub buffered: usize,
        pub written: Vec<u8>,
        pub writes: Vec<usize>,
        pub volumes: Vec<f64>,
    }

    impl RecordingAudioSink {
        pub fn new(capacity: usize) -> Self {
            Self {
                capacity,
                buffered: 0,
                written: Vec::new(),
                writes: Vec::new(),
                volumes: Vec::new(),
            }
        }

        /// Simulates the device draining `n` bytes in real time.
        pub fn drain(&mut self, n: usize) {
            self.buffered = self.buffered.saturating_sub(n);
        }
    }

    impl AudioSink for RecordingAudioSink {
        fn free_capacity(&self) -> usize {
            self.capacity - self.buffered
        }

        fn write(&mut self, buf: &[u8]) -> usize {
            let free = self.capacity - self.buffered;
            assert!(
                buf.len() <= free,
                "write of {} bytes exceeds free capacity {}",
                buf.len(),
                free
            );
            self.buffered += buf.len();
            self.written.extend_from_slice(buf);
            self.writes.push(buf.len());
            buf.len()
        }

        fn set_volume(&mut self, volume: f64) {
            self.volumes.push(volume);
        }
    }
}
