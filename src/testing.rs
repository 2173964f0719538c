//! Scripted stand-ins for the resolver and the audio device.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;

use crate::config::Settings;
use crate::error::{FetchError, PlaybackError, ResolveError};
use crate::player::{AudioOutput, OutputFactory};
use crate::resolver::Resolver;
use crate::track::Track;

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Track {id}"), format!("https://example.test/watch?v={id}"))
}

/// Defaults with every interval shrunk so tests run in milliseconds.
pub fn fast_settings(cache_dir: &Path) -> Settings {
    let mut s = Settings::default();
    s.cache.dir = cache_dir.to_path_buf();
    s.resolver.search_results = 3;
    s.playback.idle_wait_ms = 20;
    s.playback.busy_poll_ms = 5;
    s.audio.poll_ms = 5;
    s.audio.quit_fade_out_ms = 0;
    s
}

/// Poll `cond` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// In-memory resolver that "downloads" by writing a small file into `dir`.
pub struct ScriptedResolver {
    dir: PathBuf,
    searches: Mutex<HashMap<String, Vec<Track>>>,
    collections: Mutex<HashMap<String, Vec<Track>>>,
    failing: Mutex<HashSet<String>>,
    attempts: Mutex<Vec<String>>,
    fetches: Mutex<Vec<String>>,
    fetch_delay: Duration,
}

impl ScriptedResolver {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            searches: Mutex::default(),
            collections: Mutex::default(),
            failing: Mutex::default(),
            attempts: Mutex::default(),
            fetches: Mutex::default(),
            fetch_delay: Duration::ZERO,
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn on_search(&self, query: &str, results: Vec<Track>) {
        self.searches.lock().unwrap().insert(query.to_string(), results);
    }

    pub fn on_collection(&self, url: &str, tracks: Vec<Track>) {
        self.collections.lock().unwrap().insert(url.to_string(), tracks);
    }

    pub fn fail_fetch(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    /// Ids `materialize` was called for, in call order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Ids that actually produced a new file.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.mp3"))
    }
}

impl Resolver for ScriptedResolver {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Track>, ResolveError> {
        let mut results = self
            .searches
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or_else(|| ResolveError::Failed {
                status: "exit code 1".to_string(),
                stderr: format!("no scripted search for {query:?}"),
            })?;
        results.truncate(max_results);
        Ok(results)
    }

    fn resolve_collection(&self, url: &str) -> Result<Vec<Track>, ResolveError> {
        self.collections
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ResolveError::Failed {
                status: "exit code 1".to_string(),
                stderr: format!("no scripted collection for {url:?}"),
            })
    }

    fn materialize(&self, track: &Track) -> Result<PathBuf, FetchError> {
        self.attempts.lock().unwrap().push(track.id.clone());
        if self.failing.lock().unwrap().contains(&track.id) {
            return Err(FetchError::Other(format!("scripted failure for {}", track.id)));
        }
        let path = self.path_for(&track.id);
        if path.is_file() {
            return Ok(path);
        }
        thread::sleep(self.fetch_delay);
        fs::write(&path, b"fake audio").map_err(|e| FetchError::Other(e.to_string()))?;
        self.fetches.lock().unwrap().push(track.id.clone());
        Ok(path)
    }
}

#[derive(Debug, Default)]
pub struct ProbeState {
    /// File stems in load order.
    pub loads: Vec<String>,
    pub stops: usize,
    pub pauses: usize,
    pub resumes: usize,
    /// Tracks finish as soon as they are loaded.
    pub auto_finish: bool,
    /// The currently loaded track has reached its end.
    pub finished: bool,
    pub loaded: bool,
    pub fail_stems: HashSet<String>,
    /// The output has been dropped by the audio thread.
    pub released: bool,
}

/// Shared view into a [`ScriptedOutput`] living on the audio thread.
#[derive(Clone, Default)]
pub struct Probe(pub Arc<Mutex<ProbeState>>);

impl Probe {
    pub fn auto_finishing() -> Self {
        let p = Self::default();
        p.0.lock().unwrap().auto_finish = true;
        p
    }

    pub fn finish(&self) {
        self.0.lock().unwrap().finished = true;
    }

    pub fn fail_on(&self, stem: &str) {
        self.0.lock().unwrap().fail_stems.insert(stem.to_string());
    }

    pub fn loads(&self) -> Vec<String> {
        self.0.lock().unwrap().loads.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.0.lock().unwrap().loaded
    }

    pub fn stops(&self) -> usize {
        self.0.lock().unwrap().stops
    }

    pub fn released(&self) -> bool {
        self.0.lock().unwrap().released
    }

    pub fn factory(&self) -> OutputFactory {
        let probe = self.clone();
        Box::new(move || {
            let output: Box<dyn AudioOutput> = Box::new(ScriptedOutput { probe });
            Ok(output)
        })
    }
}

pub fn broken_output() -> OutputFactory {
    Box::new(|| Err(anyhow!("no audio output device")))
}

struct ScriptedOutput {
    probe: Probe,
}

impl AudioOutput for ScriptedOutput {
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        let mut s = self.probe.0.lock().unwrap();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        s.loads.push(stem.clone());
        if s.fail_stems.contains(&stem) {
            s.loaded = false;
            return Err(PlaybackError::Decode {
                path: path.to_path_buf(),
                message: "scripted decode failure".to_string(),
            });
        }
        s.loaded = true;
        s.finished = s.auto_finish;
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.0.lock().unwrap().pauses += 1;
    }

    fn resume(&mut self) {
        self.probe.0.lock().unwrap().resumes += 1;
    }

    fn stop(&mut self) {
        let mut s = self.probe.0.lock().unwrap();
        if s.loaded {
            s.stops += 1;
        }
        s.loaded = false;
        s.finished = false;
    }

    fn is_finished(&self) -> bool {
        let s = self.probe.0.lock().unwrap();
        s.loaded && s.finished
    }
}

impl Drop for ScriptedOutput {
    fn drop(&mut self) {
        if let Ok(mut s) = self.probe.0.lock() {
            s.released = true;
        }
    }
}
