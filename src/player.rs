//! Playback engine, its audio thread and the output seam.

mod engine;
mod output;
mod thread;
mod types;

pub use engine::PlaybackEngine;
pub use output::{AudioOutput, OutputFactory, RodioOutput};
pub use types::{EndReason, PlayerState, TrackEnd};
