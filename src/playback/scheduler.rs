//! Clock-driven video frame selection.
//!
//! On every control tick the scheduler maps the clock position to a target
//! frame index and presents it if it differs from the last one shown. Frames
//! the clock has moved past are skipped without being presented, so a slow
//! consumer never accumulates a backlog.

use std::sync::Arc;

use crate::media::descriptor::VideoDescriptor;
use crate::playback::buffer::{ReadOutcome, StreamBuffer};
use crate::playback::sink::VideoSink;

/// What a scheduler tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickResult {
    /// The frame index presented this tick, if any.
    pub presented: Option<usize>,
    /// The clock position has reached or passed the stream duration.
    pub reached_end: bool,
}

pub struct VideoScheduler {
    descriptor: VideoDescriptor,
    buffer: Arc<StreamBuffer>,
    last_presented: Option<usize>,
}

impl VideoScheduler {
    pub fn new(descriptor: VideoDescriptor, buffer: Arc<StreamBuffer>) -> Self {
        Self {
            descriptor,
            buffer,
            last_presented: None,
        }
    }

    /// Frame index for a clock position: `floor(elapsed / duration * count)`,
    /// clamped to the valid range. A position at or past the duration maps
    /// to the final frame.
    pub fn target_frame(&self, elapsed_seconds: f64) -> usize {
        let d = &self.descriptor;
        if d.frame_count == 0 || d.duration_seconds <= 0.0 {
            return 0;
        }
        let raw = (elapsed_seconds / d.duration_seconds * d.frame_count as f64) as usize;
        raw.min(d.frame_count - 1)
    }

    /// Presents the frame for the current clock position if it changed.
    /// An underrun (target not buffered yet) leaves the previous frame up
    /// and retries on a later tick.
    pub fn tick(&mut self, elapsed_seconds: f64, sink: &mut dyn VideoSink) -> TickResult {
        let target = self.target_frame(elapsed_seconds);
        let reached_end = elapsed_seconds >= self.descriptor.duration_seconds;

        if self.last_presented == Some(target) {
            return TickResult {
                presented: None,
                reached_end,
            };
        }

        match self.buffer.read(target) {
            ReadOutcome::Unit(frame) => {
                sink.present(
                    &frame,
                    self.descriptor.width,
                    self.descriptor.height,
                    self.descriptor.pixel_format,
                );
                self.last_presented = Some(target);
                TickResult {
                    presented: Some(target),
                    reached_end,
                }
            }
            ReadOutcome::NotYetAvailable => {
                log::debug!("video underrun: frame {} not buffered yet", target);
                TickResult {
                    presented: None,
                    reached_end,
                }
            }
            ReadOutcome::OutOfRange => {
                // Truncated stream: the clock points past the last decoded
                // frame. Keep the previous frame up.
                TickResult {
                    presented: None,
                    reached_end,
                }
            }
        }
    }

    /// Forces the next tick to re-present even if the target index is
    /// unchanged. Called after seeks.
    pub fn invalidate(&mut self) {
        self.last_presented = None;
    }

    pub fn last_presented(&self) -> Option<usize> {
        self.last_presented
    }
}
