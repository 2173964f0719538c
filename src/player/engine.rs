//! The playback engine: one audio output, at most one track.
//!
//! Threads involved:
//! - callers (`play`, `pause`, `stop`, ...) mutate [`EngineState`] and send
//!   [`AudioCmd`]s,
//! - the audio thread owns the device and reports [`PlayerEvent`]s,
//! - the dispatcher thread applies those events to the same state, deletes
//!   finished assets, and forwards [`TrackEnd`]s to the worker.
//!
//! Every load gets a new generation; events from an older generation are
//! dropped so a late "ended" can never clear the next track.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, anyhow};

use crate::config::AudioSettings;
use crate::error::PlaybackError;
use crate::resolver::{Resolver, remove_asset};
use crate::track::Track;

use super::output::OutputFactory;
use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, EndReason, PlayerEvent, PlayerState, TrackEnd};

#[derive(Debug, Default)]
struct EngineState {
    state: PlayerState,
    current: Option<Track>,
    generation: u64,
}

struct Shared {
    state: Mutex<EngineState>,
    completions: Sender<TrackEnd>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, ev: PlayerEvent) {
        let mut st = self.lock();
        if ev.generation() != st.generation {
            tracing::trace!(?ev, current = st.generation, "stale audio event");
            return;
        }

        match ev {
            PlayerEvent::Started(_) => {
                if st.state == PlayerState::Loading {
                    st.state = PlayerState::Playing;
                }
                tracing::debug!(state = %st.state, "output started");
            }
            PlayerEvent::Ended(_) => {
                st.state = PlayerState::Ended;
                let finished = st.current.take();
                let mut removed = false;
                if let Some(path) = finished.as_ref().and_then(|t| t.filepath.as_deref()) {
                    match remove_asset(path) {
                        Ok(gone) => {
                            removed = gone;
                            tracing::debug!(path = %path.display(), removed, "cleaned up cached asset");
                        }
                        Err(e) => {
                            tracing::warn!(path = %path.display(), "could not remove cached asset: {e}")
                        }
                    }
                }
                st.state = PlayerState::Idle;
                // Sent under the lock: once "now playing" reads as none, the
                // completion is already queued for the worker.
                if let Some(track) = finished {
                    tracing::info!(title = %track.title, "playback ended");
                    let _ = self.completions.send(TrackEnd {
                        track,
                        reason: EndReason::Finished { removed },
                    });
                }
            }
            PlayerEvent::Errored { message, .. } => {
                st.state = PlayerState::Errored;
                let failed = st.current.take();
                st.state = PlayerState::Idle;
                if let Some(track) = failed {
                    tracing::warn!(title = %track.title, "playback error: {message}");
                    let _ = self.completions.send(TrackEnd {
                        track,
                        reason: EndReason::Failed(message),
                    });
                }
            }
            PlayerEvent::Stopped(_) => {
                if st.current.is_some() {
                    st.state = PlayerState::Stopped;
                }
                tracing::debug!("output stopped");
            }
        }
    }
}

pub struct PlaybackEngine {
    tx: Sender<AudioCmd>,
    shared: Arc<Shared>,
    resolver: Arc<dyn Resolver>,
    fade_out: Duration,
    threads: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl PlaybackEngine {
    /// Open the audio output and start the engine threads.
    ///
    /// Fails if the output cannot be opened; there is no engine without one.
    pub fn new(
        output: OutputFactory,
        resolver: Arc<dyn Resolver>,
        settings: &AudioSettings,
        completions: Sender<TrackEnd>,
    ) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (event_tx, event_rx) = mpsc::channel::<PlayerEvent>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        let audio = spawn_audio_thread(
            output,
            rx,
            event_tx,
            ready_tx,
            Duration::from_millis(settings.poll_ms.max(1)),
        )
        .context("failed to spawn audio thread")?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(msg)) => {
                let _ = audio.join();
                return Err(anyhow!("failed to open audio output: {msg}"));
            }
            Err(_) => {
                let _ = audio.join();
                return Err(anyhow!("audio thread exited during startup"));
            }
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState::default()),
            completions,
        });
        let dispatcher = spawn_dispatcher(shared.clone(), event_rx);
        let dispatcher = match dispatcher {
            Ok(h) => h,
            Err(e) => {
                drop(tx);
                let _ = audio.join();
                return Err(e).context("failed to spawn event dispatcher");
            }
        };

        Ok(Self {
            tx,
            shared,
            resolver,
            fade_out: Duration::from_millis(settings.quit_fade_out_ms),
            threads: Mutex::new(Some((audio, dispatcher))),
        })
    }

    /// Load `track` and start playing it, replacing anything loaded.
    ///
    /// An unmaterialized track is fetched first; if that fails nothing about
    /// the engine changes.
    pub fn play(&self, mut track: Track) -> Result<(), PlaybackError> {
        if !track.is_materialized() {
            let path = self.resolver.materialize(&track)?;
            track.filepath = Some(path);
        }
        let path = match track.filepath.clone() {
            Some(p) if p.is_file() => p,
            Some(p) => return Err(PlaybackError::MissingFile(p)),
            None => {
                return Err(PlaybackError::NotMaterialized { title: track.title });
            }
        };

        let mut st = self.shared.lock();
        st.generation += 1;
        let generation = st.generation;
        tracing::info!(title = %track.title, generation, "loading");
        st.current = Some(track);
        st.state = PlayerState::Loading;

        if self.tx.send(AudioCmd::Load { generation, path }).is_err() {
            st.current = None;
            st.state = PlayerState::Idle;
            return Err(PlaybackError::Disconnected);
        }
        Ok(())
    }

    /// Pause if playing; otherwise do nothing.
    pub fn pause(&self) {
        let mut st = self.shared.lock();
        if st.state == PlayerState::Playing && self.tx.send(AudioCmd::Pause).is_ok() {
            st.state = PlayerState::Paused;
        }
    }

    /// Resume if paused; otherwise do nothing.
    pub fn resume(&self) {
        let mut st = self.shared.lock();
        if st.state == PlayerState::Paused && self.tx.send(AudioCmd::Resume).is_ok() {
            st.state = PlayerState::Playing;
        }
    }

    /// Ask the output to halt. Safe to call at any time, any number of times.
    pub fn stop(&self) {
        let _ = self.tx.send(AudioCmd::Stop);
    }

    pub fn now_playing(&self) -> Option<Track> {
        self.shared.lock().current.clone()
    }

    pub fn state(&self) -> PlayerState {
        self.shared.lock().state
    }

    /// Settle an acknowledged stop back to `Idle`, handing back the track
    /// that was stopped.
    pub fn acknowledge_stop(&self) -> Option<Track> {
        let mut st = self.shared.lock();
        if st.state != PlayerState::Stopped {
            return None;
        }
        st.state = PlayerState::Idle;
        st.current.take()
    }

    /// Stop playback and release the output. Idempotent.
    pub fn shutdown(&self) {
        let threads = self
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some((audio, dispatcher)) = threads else {
            return;
        };

        let _ = self.tx.send(AudioCmd::Quit {
            fade_out: self.fade_out,
        });
        let _ = audio.join();
        // The dispatcher drains once the audio thread drops its event sender.
        let _ = dispatcher.join();

        let mut st = self.shared.lock();
        st.current = None;
        st.state = PlayerState::Idle;
        tracing::debug!("playback engine shut down");
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_dispatcher(
    shared: Arc<Shared>,
    events: Receiver<PlayerEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ytq-events".to_string())
        .spawn(move || {
            for ev in events {
                shared.apply(ev);
            }
        })
}
