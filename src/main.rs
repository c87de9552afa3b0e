//! Headless playback demo: decodes the file given on the command line,
//! plays its audio through the default output device and logs video frame
//! presentation until the stream ends.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};

use avplayer::playback::{CpalSinkFactory, LogVideoSinkFactory, Player};
use avplayer::{FfmpegBackend, PlayerConfig, PlayerEvent, PlayerState};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let file: PathBuf = match std::env::args_os().nth(1) {
        Some(arg) => arg.into(),
        None => bail!("usage: avplayer <media file>"),
    };

    let config = PlayerConfig::load().context("failed to load configuration")?;
    let backend = FfmpegBackend::new(&config);
    let player = Player::new(
        Box::new(backend),
        Box::new(LogVideoSinkFactory),
        Box::new(CpalSinkFactory),
        Duration::from_millis(config.tick_interval_ms),
    );

    player
        .set_source(&file)
        .with_context(|| format!("failed to open {:?}", file))?;
    player.play();

    loop {
        let Some(event) = player.next_event_timeout(Duration::from_secs(60)) else {
            bail!("no playback progress within 60 seconds");
        };
        match event {
            PlayerEvent::StateChanged(PlayerState::Ended) => {
                log::info!("playback finished");
                return Ok(());
            }
            PlayerEvent::StateChanged(PlayerState::Error) => {
                bail!("playback failed, see the log for the decode error");
            }
            PlayerEvent::StateChanged(state) => log::info!("state: {}", state.display_text()),
            PlayerEvent::DurationChanged(seconds) => log::info!("duration: {:.2}s", seconds),
            PlayerEvent::PositionChanged(_) | PlayerEvent::FrameChanged(_) => {}
        }
    }
}
