//! Player state machine and outward notifications.

/// Lifecycle state shared by every component of the pipeline.
///
/// Transitions:
/// - `Idle --set_source--> Buffering` (producers launched)
/// - `Buffering --play--> Playing` (once first units are available)
/// - `Playing <--> Paused`
/// - `Playing | Paused --stop--> Stopped`
/// - `Playing --clock reaches duration--> Ended`
/// - `Ended | Stopped --seek--> Paused` (buffers are retained)
/// - any state `--decode failure--> Error` (recover via `set_source`)
/// - `Stopped --set_source--> Buffering`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No source loaded.
    Idle,
    /// Producers are running; playback has not been requested yet.
    Buffering,
    Playing,
    Paused,
    /// Playback stopped by the user; buffers retained, producers released.
    Stopped,
    /// The clock reached the source duration.
    Ended,
    /// A decode failure occurred; terminal until a new source is set.
    Error,
}

impl PlayerState {
    pub fn can_play(&self) -> bool {
        matches!(self, PlayerState::Buffering | PlayerState::Paused)
    }

    pub fn can_pause(&self) -> bool {
        matches!(self, PlayerState::Playing)
    }

    pub fn can_stop(&self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }

    /// Seeking is allowed any time after a source has been loaded.
    /// Scrubbing a finished or stopped source redraws from the retained
    /// buffers and lands in Paused.
    pub fn can_seek(&self) -> bool {
        matches!(
            self,
            PlayerState::Buffering
                | PlayerState::Playing
                | PlayerState::Paused
                | PlayerState::Stopped
                | PlayerState::Ended
        )
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            PlayerState::Idle => "Idle",
            PlayerState::Buffering => "Buffering",
            PlayerState::Playing => "Playing",
            PlayerState::Paused => "Paused",
            PlayerState::Stopped => "Stopped",
            PlayerState::Ended => "Ended",
            PlayerState::Error => "Error",
        }
    }
}

/// Notifications pushed to the layer above (a GUI, the demo binary, tests).
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlayerState),
    /// A new video frame index was presented.
    FrameChanged(usize),
    /// Playback position in seconds.
    PositionChanged(f64),
    /// Duration of the newly opened source in seconds.
    DurationChanged(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating_predicates() {
        assert!(!PlayerState::Idle.can_play());
        assert!(PlayerState::Buffering.can_play());
        assert!(PlayerState::Paused.can_play());
        assert!(!PlayerState::Playing.can_play());

        assert!(PlayerState::Playing.can_pause());
        assert!(!PlayerState::Paused.can_pause());

        assert!(PlayerState::Playing.can_stop());
        assert!(PlayerState::Paused.can_stop());
        assert!(!PlayerState::Ended.can_stop());

        assert!(PlayerState::Buffering.can_seek());
        assert!(PlayerState::Playing.can_seek());
        assert!(PlayerState::Paused.can_seek());
        assert!(PlayerState::Stopped.can_seek());
        assert!(PlayerState::Ended.can_seek());
        assert!(!PlayerState::Idle.can_seek());
        assert!(!PlayerState::Error.can_seek());
    }

    #[test]
    fn error_is_not_playable_without_new_source() {
        assert!(!PlayerState::Error.can_play());
        assert!(!PlayerState::Error.can_seek());
        assert!(!PlayerState::Stopped.can_play());
    }
}
