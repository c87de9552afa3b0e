//! Thread-safe player handle and its control loop.
//!
//! [`Player`] is the only public surface: it forwards commands over a
//! channel to a dedicated control thread and surfaces notifications through
//! an event channel. The control thread is the sole owner of the clock, the
//! scheduler, the feeder and the sinks, so none of them need internal
//! locking.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::PlayerError;
use crate::media::backend::DecodeBackend;
use crate::media::descriptor::{AudioDescriptor, VideoDescriptor};
use crate::playback::buffer::StreamBuffer;
use crate::playback::clock::PlaybackClock;
use crate::playback::feeder::AudioFeeder;
use crate::playback::producer::{FrameProducer, ProducerOutcome};
use crate::playback::scheduler::VideoScheduler;
use crate::playback::seek::SeekController;
use crate::playback::sink::{AudioSink, AudioSinkFactory, VideoSink, VideoSinkFactory};
use crate::playback::state::{PlayerEvent, PlayerState};

enum PlayerCommand {
    SetSource(PathBuf, Sender<Result<(), PlayerError>>),
    Play,
    Pause,
    Stop,
    Seek(usize),
    SetVolume(f64),
    ToggleMute,
    Shutdown,
}

/// Handle to the playback control thread.
///
/// All methods are safe to call from any thread. Commands are applied in
/// order on the control thread; `set_source` alone waits for its result so
/// a bad path fails at the call site.
pub struct Player {
    commands: Sender<PlayerCommand>,
    events: Receiver<PlayerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new(
        backend: Box<dyn DecodeBackend>,
        video_factory: Box<dyn VideoSinkFactory>,
        audio_factory: Box<dyn AudioSinkFactory>,
        tick_interval: Duration,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            ControlLoop::new(backend, video_factory, audio_factory, event_tx, tick_interval).run(
                command_rx,
            );
        });
        Self {
            commands: command_tx,
            events: event_rx,
            handle: Some(handle),
        }
    }

    /// Probes `file`, launches decode producers for both streams and enters
    /// Buffering. Replaces any previously loaded source. Fails without
    /// changing the loaded source if the file cannot be probed or lacks a
    /// video or audio stream.
    pub fn set_source(&self, file: &Path) -> Result<(), PlayerError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands
            .send(PlayerCommand::SetSource(file.to_path_buf(), reply_tx))
            .map_err(|_| PlayerError::ControlThreadGone)?;
        reply_rx.recv().map_err(|_| PlayerError::ControlThreadGone)?
    }

    pub fn play(&self) {
        self.send(PlayerCommand::Play);
    }

    pub fn pause(&self) {
        self.send(PlayerCommand::Pause);
    }

    pub fn stop(&self) {
        self.send(PlayerCommand::Stop);
    }

    /// Jumps playback to `frame`. Out-of-range indices are clamped.
    pub fn seek(&self, frame: usize) {
        self.send(PlayerCommand::Seek(frame));
    }

    /// Sets the audio volume, clamped to 0.0..=1.0.
    pub fn set_volume(&self, volume: f64) {
        self.send(PlayerCommand::SetVolume(volume));
    }

    /// Mutes, or restores the volume that was set before muting.
    pub fn toggle_mute(&self) {
        self.send(PlayerCommand::ToggleMute);
    }

    pub fn try_next_event(&self) -> Option<PlayerEvent> {
        self.events.try_recv().ok()
    }

    pub fn next_event_timeout(&self, timeout: Duration) -> Option<PlayerEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    fn send(&self, command: PlayerCommand) {
        if self.commands.send(command).is_err() {
            log::warn!("player command dropped: control thread is gone");
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let _ = self.commands.send(PlayerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            for _ in 0..100 {
                if handle.is_finished() {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
            if handle.join().is_err() {
                log::error!("player control thread panicked");
            }
        }
    }
}

/// Everything tied to the currently loaded source.
struct Session {
    file: PathBuf,
    video: VideoDescriptor,
    audio: AudioDescriptor,
    video_buffer: Arc<StreamBuffer>,
    audio_buffer: Arc<StreamBuffer>,
    video_producer: FrameProducer,
    audio_producer: FrameProducer,
    scheduler: VideoScheduler,
    feeder: AudioFeeder,
    seek: SeekController,
    video_sink: Box<dyn VideoSink>,
    audio_sink: Box<dyn AudioSink>,
    /// Play was requested before the first video frame was buffered.
    pending_play: bool,
}

struct ControlLoop {
    backend: Box<dyn DecodeBackend>,
    video_factory: Box<dyn VideoSinkFactory>,
    audio_factory: Box<dyn AudioSinkFactory>,
    events: Sender<PlayerEvent>,
    tick_interval: Duration,
    state: PlayerState,
    clock: PlaybackClock,
    volume: f64,
    premute_volume: Option<f64>,
    session: Option<Session>,
}

impl ControlLoop {
    fn new(
        backend: Box<dyn DecodeBackend>,
        video_factory: Box<dyn VideoSinkFactory>,
        audio_factory: Box<dyn AudioSinkFactory>,
        events: Sender<PlayerEvent>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            backend,
            video_factory,
            audio_factory,
            events,
            tick_interval,
            state: PlayerState::Idle,
            clock: PlaybackClock::new(),
            volume: 1.0,
            premute_volume: None,
            session: None,
        }
    }

    fn run(mut self, commands: Receiver<PlayerCommand>) {
        log::debug!("player control thread started");
        loop {
            match commands.recv_timeout(self.tick_interval) {
                Ok(PlayerCommand::Shutdown) => break,
                Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.handle_command(command),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.tick();
        }
        self.teardown_session();
        log::debug!("player control thread stopped");
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::SetSource(file, reply) => {
                let result = self.set_source(&file);
                if let Err(e) = &result {
                    log::error!("set_source({:?}) failed: {}", file, e);
                }
                let _ = reply.send(result);
            }
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::Seek(frame) => self.seek(frame),
            PlayerCommand::SetVolume(volume) => self.set_volume(volume),
            PlayerCommand::ToggleMute => self.toggle_mute(),
            PlayerCommand::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    fn set_source(&mut self, file: &Path) -> Result<(), PlayerError> {
        let probed = self.backend.probe(file)?;
        let video = probed
            .video
            .ok_or(PlayerError::SourceNotFound { stream: "video" })?;
        let audio = probed
            .audio
            .ok_or(PlayerError::SourceNotFound { stream: "audio" })?;

        // The new source replaces the old one only after probing succeeds.
        self.teardown_session();
        self.clock.reset();

        let video_buffer = StreamBuffer::new();
        let audio_buffer = StreamBuffer::new();
        let video_producer = FrameProducer::spawn(
            "video",
            self.backend.open_video(file, &video)?,
            video.frame_size(),
            video_buffer.clone(),
        );
        let audio_producer = FrameProducer::spawn(
            "audio",
            self.backend.open_audio(file, &audio)?,
            audio.chunk_size(),
            audio_buffer.clone(),
        );

        let video_sink = self.video_factory.create(&video)?;
        let mut audio_sink = self.audio_factory.create(&audio)?;
        audio_sink.set_volume(self.volume);

        let scheduler = VideoScheduler::new(video.clone(), video_buffer.clone());
        let feeder = AudioFeeder::new(audio.clone(), audio_buffer.clone(), video.frame_count);
        let seek = SeekController::new(video.frame_count, video.duration_seconds);

        log::info!(
            "source loaded: {:?} ({}x{}, {} frames, {:.2}s)",
            file,
            video.width,
            video.height,
            video.frame_count,
            video.duration_seconds
        );
        self.emit(PlayerEvent::DurationChanged(video.duration_seconds));

        self.session = Some(Session {
            file: file.to_path_buf(),
            video,
            audio,
            video_buffer,
            audio_buffer,
            video_producer,
            audio_producer,
            scheduler,
            feeder,
            seek,
            video_sink,
            audio_sink,
            pending_play: false,
        });
        self.transition(PlayerState::Buffering);
        Ok(())
    }

    fn play(&mut self) {
        if !self.state.can_play() {
            log::debug!("play ignored in state {}", self.state.display_text());
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.state == PlayerState::Buffering && session.video_buffer.is_empty() {
            // Nothing decoded yet; start as soon as the first frame lands.
            session.pending_play = true;
            log::debug!("play deferred until the first frame is buffered");
            return;
        }
        session.pending_play = false;
        self.clock.start();
        self.transition(PlayerState::Playing);
    }

    fn pause(&mut self) {
        if !self.state.can_pause() {
            log::debug!("pause ignored in state {}", self.state.display_text());
            return;
        }
        self.clock.pause();
        self.transition(PlayerState::Paused);
    }

    fn stop(&mut self) {
        if !self.state.can_stop() {
            log::debug!("stop ignored in state {}", self.state.display_text());
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.pending_play = false;
            session.video_producer.stop();
            session.audio_producer.stop();
            session.video_producer.join();
            session.audio_producer.join();
            session.scheduler.invalidate();
        }
        self.clock.reset();
        self.emit(PlayerEvent::PositionChanged(0.0));
        self.transition(PlayerState::Stopped);
    }

    fn seek(&mut self, frame: usize) {
        if !self.state.can_seek() {
            log::debug!("seek ignored in state {}", self.state.display_text());
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let target = session.seek.resolve(frame);
        if target.frame != frame {
            log::debug!("seek request {} clamped to {}", frame, target.frame);
        }
        // The clock keeps its run state: seeking while playing stays
        // playing, seeking while paused stays paused.
        self.clock.set_elapsed(target.elapsed);
        session.scheduler.invalidate();
        session
            .feeder
            .seek_to_frame(target.frame, session.audio_sink.as_mut());
        self.emit(PlayerEvent::PositionChanged(target.elapsed.as_secs_f64()));
        // Scrubbing a finished or stopped source reopens it at the target
        // position without resuming.
        if matches!(self.state, PlayerState::Ended | PlayerState::Stopped) {
            self.transition(PlayerState::Paused);
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
        self.premute_volume = None;
        if let Some(session) = self.session.as_mut() {
            session.audio_sink.set_volume(self.volume);
        }
    }

    fn toggle_mute(&mut self) {
        if let Some(previous) = self.premute_volume.take() {
            self.volume = previous;
        } else {
            self.premute_volume = Some(self.volume);
            self.volume = 0.0;
        }
        log::debug!("volume toggled to {:.2}", self.volume);
        if let Some(session) = self.session.as_mut() {
            session.audio_sink.set_volume(self.volume);
        }
    }

    fn tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.video_buffer.has_failed() || session.audio_buffer.has_failed() {
            session.video_producer.stop();
            session.audio_producer.stop();
            let outcomes = [
                ("video", session.video_producer.join()),
                ("audio", session.audio_producer.join()),
            ];
            for (name, outcome) in outcomes {
                if let Some(ProducerOutcome::Failed(status)) = outcome {
                    log::error!(
                        "{} stream of {:?}: {}",
                        name,
                        session.file,
                        PlayerError::DecodeFailed { status }
                    );
                }
            }
            // Buffered units stay readable; only new playback is blocked.
            self.transition(PlayerState::Error);
            return;
        }

        if session.pending_play
            && self.state == PlayerState::Buffering
            && !session.video_buffer.is_empty()
        {
            session.pending_play = false;
            self.clock.start();
            self.transition(PlayerState::Playing);
            // Fall through so the first frame is presented this same tick.
        }

        if !matches!(
            self.state,
            PlayerState::Buffering | PlayerState::Playing | PlayerState::Paused
        ) {
            return;
        }

        let elapsed = self.clock.elapsed_seconds();
        let session = self.session.as_mut().expect("session checked above");
        let result = session
            .scheduler
            .tick(elapsed, session.video_sink.as_mut());
        if let Some(frame) = result.presented {
            // Sent through the field directly; the session borrow is still
            // live for the feeder below.
            let _ = self.events.send(PlayerEvent::FrameChanged(frame));
            let _ = self.events.send(PlayerEvent::PositionChanged(elapsed));
        }

        if self.state == PlayerState::Playing {
            session.feeder.tick(session.audio_sink.as_mut());

            // Both streams must be done: the video clock past its duration,
            // and every buffered audio byte handed to the sink (or the
            // clock past the audio duration for a still-decoding stream).
            if result.reached_end {
                let audio_done = session.feeder.is_exhausted()
                    || elapsed >= session.audio.duration_seconds;
                if audio_done {
                    let duration = session.video.duration_seconds;
                    self.clock.pause();
                    self.emit(PlayerEvent::PositionChanged(duration));
                    self.transition(PlayerState::Ended);
                }
            }
        }
    }

    fn transition(&mut self, next: PlayerState) {
        if self.state == next {
            return;
        }
        log::info!(
            "state: {} -> {}",
            self.state.display_text(),
            next.display_text()
        );
        self.state = next;
        self.emit(PlayerEvent::StateChanged(next));
    }

    fn emit(&self, event: PlayerEvent) {
        // The receiving side may have been dropped; playback continues.
        let _ = self.events.send(event);
    }

    fn teardown_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            log::debug!("tearing down session for {:?}", session.file);
            session.video_producer.stop();
            session.audio_producer.stop();
            session.video_producer.join();
            session.audio_producer.join();
        }
    }
}
