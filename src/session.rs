//! The public face of a playback session.
//!
//! A [`Session`] owns the queue, the engine and the worker thread. Every
//! method is safe to call from any thread while the worker runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use anyhow::Context;

use crate::config::Settings;
use crate::error::ResolveError;
use crate::orchestrator::Worker;
use crate::player::{OutputFactory, PlaybackEngine, PlayerState};
use crate::queue::TrackQueue;
use crate::resolver::Resolver;
use crate::track::Track;

pub use crate::orchestrator::SessionEvent;

pub struct Session {
    queue: Arc<TrackQueue>,
    engine: Arc<PlaybackEngine>,
    resolver: Arc<dyn Resolver>,
    search_results: usize,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Open the audio output and start the worker.
    ///
    /// Session events arrive on the returned receiver, one per reportable
    /// change. Fails when the output cannot be opened.
    pub fn start(
        resolver: Arc<dyn Resolver>,
        output: OutputFactory,
        settings: &Settings,
    ) -> anyhow::Result<(Self, Receiver<SessionEvent>)> {
        let (done_tx, done_rx) = mpsc::channel();
        let engine = Arc::new(
            PlaybackEngine::new(output, resolver.clone(), &settings.audio, done_tx)
                .context("failed to start playback engine")?,
        );
        let queue = Arc::new(TrackQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::channel();

        let worker = Worker {
            queue: queue.clone(),
            engine: engine.clone(),
            resolver: resolver.clone(),
            completions: done_rx,
            events: events_tx,
            shutdown: shutdown.clone(),
            idle_wait: settings.playback.idle_wait(),
            busy_poll: settings.playback.busy_poll(),
        }
        .spawn()
        .context("failed to spawn worker thread")?;

        tracing::info!("session started");
        let session = Self {
            queue,
            engine,
            resolver,
            search_results: settings.resolver.search_results.max(1),
            shutdown,
            worker: Mutex::new(Some(worker)),
        };
        Ok((session, events_rx))
    }

    /// Ranked candidates for `query`, metadata only.
    pub fn search(&self, query: &str) -> Result<Vec<Track>, ResolveError> {
        self.resolver.search(query, self.search_results)
    }

    /// Search, let `choose` pick a candidate by zero-based index and enqueue
    /// it. A missing or out-of-range choice falls back to the first result.
    pub fn enqueue_by_query<F>(&self, query: &str, choose: F) -> Result<Track, ResolveError>
    where
        F: FnOnce(&[Track]) -> Option<usize>,
    {
        let mut candidates = self.search(query)?;
        if candidates.is_empty() {
            return Err(ResolveError::NoResults(query.to_string()));
        }
        let idx = choose(&candidates)
            .filter(|&i| i < candidates.len())
            .unwrap_or(0);
        let track = candidates.swap_remove(idx);
        self.enqueue_track(track.clone());
        Ok(track)
    }

    pub fn enqueue_track(&self, track: Track) {
        tracing::info!(title = %track.title, "enqueued");
        self.queue.enqueue(track);
    }

    /// Resolve a playlist, mix or single URL and enqueue everything in it as
    /// one uninterrupted run.
    pub fn enqueue_playlist(&self, url: &str) -> Result<usize, ResolveError> {
        let tracks = self.resolver.resolve_collection(url)?;
        if tracks.is_empty() {
            return Err(ResolveError::NoResults(url.to_string()));
        }
        let added = self.queue.enqueue_all(tracks);
        tracing::info!(added, url, "enqueued collection");
        Ok(added)
    }

    /// Stop the current track; the worker moves on to the next one.
    pub fn skip(&self) {
        self.engine.stop();
    }

    pub fn pause(&self) {
        self.engine.pause();
    }

    pub fn resume(&self) {
        self.engine.resume();
    }

    pub fn queue(&self) -> Vec<Track> {
        self.queue.snapshot()
    }

    pub fn now_playing(&self) -> Option<Track> {
        self.engine.now_playing()
    }

    pub fn state(&self) -> PlayerState {
        self.engine.state()
    }

    /// Stop playback, let the worker exit and release the audio output.
    /// Anything still queued is discarded. Idempotent.
    pub fn shutdown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return;
        };

        self.shutdown.store(true, Ordering::Release);
        self.queue.notify();
        self.engine.stop();
        if worker.join().is_err() {
            tracing::error!("worker thread panicked");
        }
        self.engine.shutdown();
        let discarded = self.queue.clear();
        if discarded > 0 {
            tracing::info!(discarded, "dropped pending tracks");
        }
        tracing::info!("session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
