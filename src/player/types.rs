//! Engine state, audio-thread commands and lifecycle events.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::track::Track;

/// Where the engine is in the `Idle → Loading → Playing ⇄ Paused → Ended|Errored → Idle` cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Idle,
    /// A load has been issued; the output has not confirmed it yet.
    Loading,
    Playing,
    Paused,
    /// The current track ran to completion (transient, settles to `Idle`).
    Ended,
    /// The output reported an error (transient, settles to `Idle`).
    Errored,
    /// `stop()` was acknowledged by the output; the worker still has to
    /// clear "now playing" before the engine is `Idle` again.
    Stopped,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Errored => "errored",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Commands sent to the audio thread.
#[derive(Debug)]
pub enum AudioCmd {
    /// Stop whatever is loaded, then load and start `path`.
    Load { generation: u64, path: PathBuf },
    Pause,
    Resume,
    /// Stop playback immediately.
    Stop,
    /// Quit the audio thread, fading out over `fade_out` first.
    Quit { fade_out: Duration },
}

/// Lifecycle notifications from the audio thread.
///
/// Each carries the generation of the load it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Started(u64),
    Ended(u64),
    Errored { generation: u64, message: String },
    Stopped(u64),
}

impl PlayerEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Started(g) | Self::Ended(g) | Self::Stopped(g) => *g,
            Self::Errored { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Played to the end. `removed` says whether a cached asset was deleted.
    Finished { removed: bool },
    /// The output failed; the cached asset was left in place.
    Failed(String),
}

/// A track leaving the engine, forwarded to the worker.
#[derive(Debug, Clone)]
pub struct TrackEnd {
    pub track: Track,
    pub reason: EndReason,
}
