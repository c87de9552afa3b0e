use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Player configuration persisted as JSON under the user config directory.
///
/// Decode tool locations are explicit values injected at construction; the
/// player never consults or mutates process-wide environment state to find
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Bits per decoded pixel: 8 (gray), 24 (rgb) or 32 (rgba).
    pub video_bit_depth: u32,
    /// Control thread tick interval.
    pub tick_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            video_bit_depth: 24,
            tick_interval_ms: 1,
        }
    }
}

impl PlayerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to read config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config)
                }
                Err(e) => {
                    log::warn!(
                        "Config file exists but has issues ({}), creating new one with defaults",
                        e
                    );
                    let new_config = Self::default();
                    new_config.save()?;
                    log::info!("Created new config file at {}", config_path.display());
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save()?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("avplayer")
            .join("config.json")
    }
}
