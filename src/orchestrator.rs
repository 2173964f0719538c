//! The worker loop: sole consumer of the queue, sole caller of `play`.
//!
//! Each pass either waits on the queue (nothing playing) or naps briefly
//! (something playing); there is no event for "still playing", so that part
//! stays a bounded poll.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::player::{EndReason, PlaybackEngine, TrackEnd};
use crate::queue::TrackQueue;
use crate::resolver::{Resolver, probe_duration};
use crate::track::Track;

/// What the session reports to its front end, one line each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    NowPlaying(Track),
    Finished { track: Track, removed: bool },
    Skipped(Track),
    FetchFailed { track: Track, error: String },
    PlaybackFailed { track: Track, error: String },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NowPlaying(t) => write!(f, "▶ Playing: {t}"),
            Self::Finished { track, removed } => {
                write!(f, "✓ Finished: {track}")?;
                if *removed {
                    f.write_str(" (deleted from cache)")?;
                }
                Ok(())
            }
            Self::Skipped(t) => write!(f, "» Skipped: {t}"),
            Self::FetchFailed { track, error } => write!(f, "! {}: {error}", track.title),
            Self::PlaybackFailed { track, error } => {
                write!(f, "! Playback error for {}: {error}", track.title)
            }
        }
    }
}

pub struct Worker {
    pub queue: Arc<TrackQueue>,
    pub engine: Arc<PlaybackEngine>,
    pub resolver: Arc<dyn Resolver>,
    pub completions: Receiver<TrackEnd>,
    pub events: Sender<SessionEvent>,
    pub shutdown: Arc<AtomicBool>,
    pub idle_wait: Duration,
    pub busy_poll: Duration,
}

impl Worker {
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ytq-worker".to_string())
            .spawn(move || self.run())
    }

    fn run(self) {
        tracing::debug!("worker started");
        while !self.stopping() {
            self.tick();
        }
        self.engine.stop();
        self.drain_completions();
        tracing::debug!(pending = self.queue.len(), "worker stopped");
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn emit(&self, ev: SessionEvent) {
        let _ = self.events.send(ev);
    }

    fn tick(&self) {
        let skipped = self.engine.acknowledge_stop();
        let idle = self.engine.now_playing().is_none();
        // Completions are sent before "now playing" clears, so draining after
        // the check reports a finished track before its successor starts.
        self.drain_completions();
        if let Some(track) = skipped {
            tracing::info!(title = %track.title, "skipped");
            self.emit(SessionEvent::Skipped(track));
        }

        if !idle {
            thread::sleep(self.busy_poll);
            return;
        }

        let Some(track) = self.queue.dequeue_or_wait(self.idle_wait) else {
            return;
        };
        if self.stopping() {
            tracing::debug!(title = %track.title, "shutting down, not starting");
            return;
        }
        self.start(track);
    }

    fn start(&self, mut track: Track) {
        tracing::debug!(title = %track.title, from_playlist = track.from_playlist, "fetching");
        let path = match self.resolver.materialize(&track) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(title = %track.title, "fetch failed: {e}");
                self.emit(SessionEvent::FetchFailed {
                    track,
                    error: e.to_string(),
                });
                return;
            }
        };
        if track.duration.is_none() {
            track.duration = probe_duration(&path);
        }
        track.filepath = Some(path);

        match self.engine.play(track.clone()) {
            Ok(()) => self.emit(SessionEvent::NowPlaying(track)),
            Err(e) => {
                tracing::warn!(title = %track.title, "play failed: {e}");
                self.emit(SessionEvent::PlaybackFailed {
                    track,
                    error: e.to_string(),
                });
            }
        }
    }

    fn drain_completions(&self) {
        while let Ok(end) = self.completions.try_recv() {
            let ev = match end.reason {
                EndReason::Finished { removed } => SessionEvent::Finished {
                    track: end.track,
                    removed,
                },
                EndReason::Failed(error) => SessionEvent::PlaybackFailed {
                    track: end.track,
                    error,
                },
            };
            self.emit(ev);
        }
    }
}
