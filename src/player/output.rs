//! The audio device seam.
//!
//! [`AudioOutput`] is what the audio thread drives. [`RodioOutput`] is the
//! real device; tests plug in a scripted output instead.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

use crate::error::PlaybackError;

pub trait AudioOutput {
    /// Replace whatever is loaded with `path` and start playing it.
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    /// Whether the loaded source has been played to the end.
    fn is_finished(&self) -> bool;
    /// Lower the volume to zero over `duration`, then stop.
    fn fade_out(&mut self, duration: Duration) {
        let _ = duration;
        self.stop();
    }
}

/// Builds the output on the audio thread.
///
/// The device handle has to live on the thread that opened it, so the engine
/// only ships this constructor across.
pub type OutputFactory = Box<dyn FnOnce() -> anyhow::Result<Box<dyn AudioOutput>> + Send>;

pub struct RodioOutput {
    stream: OutputStream,
    sink: Option<Sink>,
    volume: f32,
}

impl RodioOutput {
    pub fn open(volume: f32) -> anyhow::Result<Self> {
        let mut stream =
            OutputStreamBuilder::open_default_stream().context("no audio output device")?;
        // rodio logs to stderr when the stream is dropped; that would land in the prompt.
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            sink: None,
            volume,
        })
    }

    pub fn factory(volume: f32) -> OutputFactory {
        Box::new(move || {
            let output: Box<dyn AudioOutput> = Box::new(Self::open(volume)?);
            Ok(output)
        })
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        self.stop();

        let file = File::open(path).map_err(|source| PlaybackError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        sink.append(source);
        sink.play();
        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(s) = self.sink.as_ref() {
            s.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(s) = self.sink.as_ref() {
            s.play();
        }
    }

    fn stop(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
    }

    fn is_finished(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.empty())
    }

    fn fade_out(&mut self, duration: Duration) {
        if let Some(s) = self.sink.as_ref() {
            let fade_ms = duration.as_millis() as u64;
            if fade_ms > 0 && !s.is_paused() {
                let steps: u64 = 20;
                let step_ms = (fade_ms / steps).max(1);
                for step in 1..=steps {
                    let t = step as f32 / steps as f32;
                    s.set_volume(self.volume * (1.0 - t));
                    thread::sleep(Duration::from_millis(step_ms));
                }
            }
            s.set_volume(0.0);
        }
        self.stop();
    }
}
