//! Seek target resolution.
//!
//! A seek request arrives as a video frame index. The controller clamps it
//! into range and maps it onto the clock timeline; the control loop then
//! repositions the clock, invalidates the scheduler, and moves the audio
//! cursor in one step.

use std::time::Duration;

/// A clamped, resolved seek request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekTarget {
    /// Clamped frame index.
    pub frame: usize,
    /// Clock position corresponding to that frame.
    pub elapsed: Duration,
}

pub struct SeekController {
    frame_count: usize,
    duration_seconds: f64,
}

impl SeekController {
    pub fn new(frame_count: usize, duration_seconds: f64) -> Self {
        Self {
            frame_count: frame_count.max(1),
            duration_seconds,
        }
    }

    /// Clamps `frame` into `0..frame_count` and computes the clock position
    /// that makes the scheduler select exactly that frame. The position is
    /// the midpoint of the frame's interval: a position on the boundary
    /// itself can round back to the previous index under f64 division and
    /// the nanosecond granularity of `Duration`. Out-of-range requests are
    /// clamped to the nearest valid frame rather than rejected.
    pub fn resolve(&self, frame: usize) -> SeekTarget {
        let frame = frame.min(self.frame_count - 1);
        let seconds = (frame as f64 + 0.5) / self.frame_count as f64 * self.duration_seconds;
        SeekTarget {
            frame,
            elapsed: Duration::from_secs_f64(seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_within_the_frame_interval() {
        let seek = SeekController::new(300, 10.0);
        let target = seek.resolve(150);
        assert_eq!(target.frame, 150);
        // Frame 150 of 300 over 10s covers [5.0, 5.0333..); the resolved
        // position sits strictly inside it.
        let seconds = target.elapsed.as_secs_f64();
        assert!(seconds > 5.0);
        assert!(seconds < 5.0 + 10.0 / 300.0);
    }

    #[test]
    fn clamps_past_the_end() {
        let seek = SeekController::new(300, 10.0);
        let target = seek.resolve(10_000);
        assert_eq!(target.frame, 299);
    }

    #[test]
    fn frame_zero_resolves_inside_the_first_frame() {
        let seek = SeekController::new(300, 10.0);
        let seconds = seek.resolve(0).elapsed.as_secs_f64();
        assert!(seconds >= 0.0);
        assert!(seconds < 10.0 / 300.0);
    }

    #[test]
    fn resolving_a_resolved_frame_is_idempotent() {
        let seek = SeekController::new(300, 10.0);
        for frame in [0, 150, 299, 5000] {
            let first = seek.resolve(frame);
            assert_eq!(seek.resolve(first.frame), first);
        }
    }

    #[test]
    fn resolved_elapsed_round_trips_through_the_frame_formula() {
        // The scheduler computes floor(elapsed / duration * count); the
        // resolved position must map back to the requested frame.
        let count = 300;
        let duration = 10.0;
        let seek = SeekController::new(count, duration);
        for frame in 0..count {
            let target = seek.resolve(frame);
            let back = (target.elapsed.as_secs_f64() / duration * count as f64) as usize;
            assert_eq!(back.min(count - 1), frame);
        }
    }
}
