use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/ytq/config.toml` or `~/.config/ytq/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `YTQ__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub resolver: ResolverSettings,
    pub playback: PlaybackSettings,
    pub audio: AudioSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory holding downloaded audio. Created on startup if missing.
    pub dir: PathBuf,
    /// Which track field names the cached file.
    pub key: CacheKeying,
    /// Extensions probed when checking whether a track is already cached.
    pub extensions: Vec<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("ytq_cache"),
            key: CacheKeying::Id,
            extensions: ["mp3", "m4a", "webm", "opus", "mp4", "mkv"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKeying {
    /// Stable video id; never collides between different tracks.
    #[serde(alias = "video-id", alias = "video_id")]
    Id,
    /// Human-readable title; two tracks with the same title share one file.
    #[serde(alias = "name")]
    Title,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// `yt-dlp` executable (name on `$PATH` or absolute path).
    pub program: String,
    /// Arguments placed before ours, e.g. `["-m", "yt_dlp"]` with `program = "python3"`.
    pub program_args: Vec<String>,
    /// Number of candidates offered by `play <query>`.
    pub search_results: usize,
    /// yt-dlp format selector.
    pub format: String,
    /// Codec the downloaded audio is converted to.
    pub audio_format: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            program_args: Vec::new(),
            search_results: 5,
            format: "bestaudio/best".to_string(),
            audio_format: "mp3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// How long the worker blocks on an empty queue before re-checking (milliseconds).
    pub idle_wait_ms: u64,
    /// How often the worker re-checks while something is playing (milliseconds).
    pub busy_poll_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            idle_wait_ms: 500,
            busy_poll_ms: 200,
        }
    }
}

impl PlaybackSettings {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn busy_poll(&self) -> Duration {
        Duration::from_millis(self.busy_poll_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioSettings {
    /// How often the audio thread checks for end of track (milliseconds).
    pub poll_ms: u64,
    /// Output volume, 0.0 ..= 1.0.
    pub volume: f32,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            poll_ms: 200,
            volume: 1.0,
            quit_fade_out_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
