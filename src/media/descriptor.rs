use crate::media::format::{PixelFormat, SampleFormat};

/// Immutable per-stream metadata, produced once when a source is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDescriptor {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub duration_seconds: f64,
    /// Always >= 1; sources that report no frame count are treated as a
    /// single still frame.
    pub frame_count: usize,
    pub fps: f64,
}

impl VideoDescriptor {
    /// Size in bytes of one decoded frame coming off the raw pipe.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.bytes_per_pixel()
    }

    pub fn bit_depth(&self) -> u32 {
        self.pixel_format.bit_depth()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioDescriptor {
    pub channels: u32,
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    pub duration_seconds: f64,
    /// Total interleaved sample count across all channels.
    pub total_samples: u64,
}

impl AudioDescriptor {
    /// Size in bytes of one decoded unit: one second of interleaved PCM.
    pub fn chunk_size(&self) -> usize {
        self.sample_rate as usize * self.channels as usize * self.sample_format.bytes_per_sample()
    }

    pub fn bit_depth(&self) -> u32 {
        self.sample_format.bit_depth()
    }
}
