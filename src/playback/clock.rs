//! Pause-aware playback clock.
//!
//! Both the video scheduler and the audio feeder derive their position from
//! this one clock, so the streams cannot drift apart: synchronization is
//! clock-referenced, not data-referenced.

use std::time::{Duration, Instant};

/// Single authoritative mapping from wall time to playback position.
///
/// The position is an accumulated offset plus the span since the last
/// start, composed by addition only: subtracting a large position from
/// `Instant::now()` could underflow the platform's instant epoch. Pausing
/// folds the running span into the offset, so elapsed time is continuous
/// across pause/resume.
#[derive(Debug)]
pub struct PlaybackClock {
    started_at: Option<Instant>,
    offset: Duration,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            started_at: None,
            offset: Duration::ZERO,
        }
    }

    /// Starts the clock, or resumes it from the paused position.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Freezes the current elapsed value; `elapsed()` stays constant until
    /// the next `start`.
    pub fn pause(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.offset += started.elapsed();
        }
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.offset = Duration::ZERO;
    }

    /// Repositions the playhead without changing the run state. Used by
    /// seeks; a running clock keeps running from the new position.
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
        self.offset = elapsed;
    }

    pub fn elapsed(&self) -> Duration {
        self.offset
            + self
                .started_at
                .map_or(Duration::ZERO, |started| started.elapsed())
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn starts_at_zero() {
        let clock = PlaybackClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert!(!clock.is_running());
    }

    #[test]
    fn pause_freezes_elapsed() {
        let mut clock = PlaybackClock::new();
        clock.start();
        sleep(Duration::from_millis(50));
        clock.pause();

        let frozen = clock.elapsed();
        sleep(Duration::from_millis(50));
        assert_eq!(clock.elapsed(), frozen);
        assert!(frozen >= Duration::from_millis(45));
    }

    #[test]
    fn resume_is_continuous() {
        let mut clock = PlaybackClock::new();
        clock.start();
        sleep(Duration::from_millis(40));
        clock.pause();
        let at_pause = clock.elapsed();

        // Wall time spent paused must not leak into the playback position.
        sleep(Duration::from_millis(80));
        clock.start();
        let just_after_resume = clock.elapsed();

        assert!(just_after_resume >= at_pause);
        assert!(just_after_resume < at_pause + Duration::from_millis(20));
    }

    #[test]
    fn elapsed_is_monotonic_while_running() {
        let mut clock = PlaybackClock::new();
        clock.start();
        let mut last = clock.elapsed();
        for _ in 0..100 {
            let now = clock.elapsed();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn set_elapsed_while_paused() {
        let mut clock = PlaybackClock::new();
        clock.set_elapsed(Duration::from_secs(3));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
        assert!(!clock.is_running());
    }

    #[test]
    fn set_elapsed_while_running_keeps_advancing() {
        let mut clock = PlaybackClock::new();
        clock.start();
        clock.set_elapsed(Duration::from_secs(5));
        assert!(clock.is_running());
        let elapsed = clock.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(5) + Duration::from_millis(50));
    }

    #[test]
    fn distant_positions_survive_start_and_pause() {
        // Far beyond any plausible machine uptime; positioning here must
        // not produce an Instant before the platform epoch.
        let far = Duration::from_secs(1 << 40);
        let mut clock = PlaybackClock::new();
        clock.set_elapsed(far);
        clock.start();
        assert!(clock.elapsed() >= far);
        clock.pause();
        assert!(clock.elapsed() >= far);

        clock.start();
        clock.set_elapsed(far * 2);
        assert!(clock.is_running());
        assert!(clock.elapsed() >= far * 2);
    }

    #[test]
    fn reset_clears_position() {
        let mut clock = PlaybackClock::new();
        clock.start();
        sleep(Duration::from_millis(10));
        clock.pause();
        clock.reset();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}
