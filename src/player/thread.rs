use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::output::{AudioOutput, OutputFactory};
use super::types::{AudioCmd, PlayerEvent};

/// Start the thread that owns the audio output.
///
/// The output is built on the new thread; `ready` receives `Ok(())` once it
/// exists or the error message if it could not be opened (the thread then
/// exits). Lifecycle events go out on `events`; the thread exits when `rx`
/// disconnects or on `AudioCmd::Quit`.
pub(super) fn spawn_audio_thread(
    factory: OutputFactory,
    rx: Receiver<AudioCmd>,
    events: Sender<PlayerEvent>,
    ready: SyncSender<Result<(), String>>,
    poll: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ytq-audio".to_string())
        .spawn(move || {
            let output = match factory() {
                Ok(o) => {
                    let _ = ready.send(Ok(()));
                    o
                }
                Err(e) => {
                    let _ = ready.send(Err(format!("{e:#}")));
                    return;
                }
            };
            drop(ready);
            run(output, rx, events, poll);
        })
}

fn run(
    mut output: Box<dyn AudioOutput>,
    rx: Receiver<AudioCmd>,
    events: Sender<PlayerEvent>,
    poll: Duration,
) {
    // Generation of whatever the output currently holds.
    let mut loaded: Option<u64> = None;
    let mut paused = false;

    let emit = |ev: PlayerEvent| {
        tracing::trace!(?ev, "audio event");
        let _ = events.send(ev);
    };

    loop {
        match rx.recv_timeout(poll) {
            Ok(cmd) => match cmd {
                AudioCmd::Load { generation, path } => {
                    if let Some(prev) = loaded.take() {
                        output.stop();
                        emit(PlayerEvent::Stopped(prev));
                    }
                    paused = false;
                    match output.load(&path) {
                        Ok(()) => {
                            loaded = Some(generation);
                            emit(PlayerEvent::Started(generation));
                        }
                        Err(e) => emit(PlayerEvent::Errored {
                            generation,
                            message: e.to_string(),
                        }),
                    }
                }

                AudioCmd::Pause => {
                    if loaded.is_some() && !paused {
                        output.pause();
                        paused = true;
                    }
                }

                AudioCmd::Resume => {
                    if loaded.is_some() && paused {
                        output.resume();
                        paused = false;
                    }
                }

                AudioCmd::Stop => {
                    if let Some(g) = loaded.take() {
                        output.stop();
                        paused = false;
                        emit(PlayerEvent::Stopped(g));
                    }
                }

                AudioCmd::Quit { fade_out } => {
                    if loaded.take().is_some() {
                        output.fade_out(fade_out);
                    }
                    output.stop();
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                // periodic end-of-track check
                if let Some(g) = loaded {
                    if !paused && output.is_finished() {
                        loaded = None;
                        emit(PlayerEvent::Ended(g));
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                output.stop();
                break;
            }
        }
    }
}
