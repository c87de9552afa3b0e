//! Raw frame and sample formats the decode pipe can produce.
//!
//! The format is resolved once when a stream is opened and fixed for the
//! lifetime of the session, so per-unit reads never branch on bit depth.

use crate::error::PlayerError;

/// Pixel layout of raw video frames coming out of the decode pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit grayscale, one byte per pixel.
    Gray8,
    /// Packed RGB, three bytes per pixel.
    Rgb24,
    /// Packed RGBA, four bytes per pixel.
    Rgba32,
}

impl PixelFormat {
    pub fn from_bit_depth(bits: u32) -> Result<Self, PlayerError> {
        match bits {
            8 => Ok(PixelFormat::Gray8),
            24 => Ok(PixelFormat::Rgb24),
            32 => Ok(PixelFormat::Rgba32),
            other => Err(PlayerError::UnsupportedFormat(format!(
                "{} bits per pixel",
                other
            ))),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
        }
    }

    /// The `-pix_fmt` value handed to the decode tool.
    pub fn ffmpeg_pix_fmt(&self) -> &'static str {
        match self {
            PixelFormat::Gray8 => "gray",
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Rgba32 => "rgba",
        }
    }

    pub fn bit_depth(&self) -> u32 {
        self.bytes_per_pixel() as u32 * 8
    }
}

/// PCM sample layout of raw audio coming out of the decode pipe.
/// Little-endian signed integers apart from `U8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    S16le,
    S32le,
}

impl SampleFormat {
    pub fn from_bit_depth(bits: u32) -> Result<Self, PlayerError> {
        match bits {
            8 => Ok(SampleFormat::U8),
            16 => Ok(SampleFormat::S16le),
            32 => Ok(SampleFormat::S32le),
            other => Err(PlayerError::UnsupportedFormat(format!(
                "{} bits per sample",
                other
            ))),
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16le => 2,
            SampleFormat::S32le => 4,
        }
    }

    /// The `-f` container format for the raw PCM pipe.
    pub fn ffmpeg_format(&self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16le => "s16le",
            SampleFormat::S32le => "s32le",
        }
    }

    /// The matching `-acodec` value (`pcm_u8`, `pcm_s16le`, ...).
    pub fn ffmpeg_codec(&self) -> String {
        format!("pcm_{}", self.ffmpeg_format())
    }

    pub fn bit_depth(&self) -> u32 {
        self.bytes_per_sample() as u32 * 8
    }

    /// Decodes one raw sample into a normalized f32 in [-1.0, 1.0].
    /// `raw` must hold exactly `bytes_per_sample()` bytes.
    pub fn sample_to_f32(&self, raw: &[u8]) -> f32 {
        match self {
            SampleFormat::U8 => (raw[0] as f32 - 128.0) / 128.0,
            SampleFormat::S16le => {
                i16::from_le_bytes([raw[0], raw[1]]) as f32 / i16::MAX as f32
            }
            SampleFormat::S32le => {
                i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f32 / i32::MAX as f32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_from_bit_depth() {
        assert_eq!(PixelFormat::from_bit_depth(8).unwrap(), PixelFormat::Gray8);
        assert_eq!(PixelFormat::from_bit_depth(24).unwrap(), PixelFormat::Rgb24);
        assert_eq!(PixelFormat::from_bit_depth(32).unwrap(), PixelFormat::Rgba32);
        assert!(PixelFormat::from_bit_depth(16).is_err());
    }

    #[test]
    fn sample_format_from_bit_depth() {
        assert_eq!(SampleFormat::from_bit_depth(8).unwrap(), SampleFormat::U8);
        assert_eq!(SampleFormat::from_bit_depth(16).unwrap(), SampleFormat::S16le);
        assert_eq!(SampleFormat::from_bit_depth(32).unwrap(), SampleFormat::S32le);
        assert!(SampleFormat::from_bit_depth(24).is_err());
    }

    #[test]
    fn sample_decoding_extremes() {
        assert_eq!(SampleFormat::U8.sample_to_f32(&[128]), 0.0);
        assert!((SampleFormat::U8.sample_to_f32(&[255]) - 0.9921875).abs() < 1e-6);

        let max = i16::MAX.to_le_bytes();
        assert_eq!(SampleFormat::S16le.sample_to_f32(&max), 1.0);
        let zero = 0i16.to_le_bytes();
        assert_eq!(SampleFormat::S16le.sample_to_f32(&zero), 0.0);

        let max = i32::MAX.to_le_bytes();
        assert_eq!(SampleFormat::S32le.sample_to_f32(&max), 1.0);
    }

    #[test]
    fn ffmpeg_names() {
        assert_eq!(PixelFormat::Rgb24.ffmpeg_pix_fmt(), "rgb24");
        assert_eq!(SampleFormat::S16le.ffmpeg_codec(), "pcm_s16le");
    }
}
