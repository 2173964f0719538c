//! [`Resolver`] backed by the `yt-dlp` executable.
//!
//! Metadata comes from `--dump-single-json` in flat-playlist mode, so
//! searching and expanding playlists never downloads anything. Downloads go
//! straight into the [`AssetCache`] directory.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde::Deserialize;

use super::{AssetCache, Resolver};
use crate::config::ResolverSettings;
use crate::error::{FetchError, ResolveError};
use crate::track::Track;

const UNKNOWN_TITLE: &str = "Unknown title";

pub struct YtDlp {
    program: String,
    program_args: Vec<String>,
    format: String,
    audio_format: String,
    cache: AssetCache,
}

/// The subset of yt-dlp's info dict we read.
#[derive(Debug, Default, Deserialize)]
struct InfoDict {
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    // Flat entries sometimes report fractional seconds.
    duration: Option<f64>,
    entries: Option<Vec<Option<InfoDict>>>,
}

impl InfoDict {
    fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist") && self.entries.is_some()
    }

    fn into_track(self, from_playlist: bool) -> Track {
        let id = self.id.unwrap_or_default();
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let url = self
            .webpage_url
            .or(self.url)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| {
                if id.is_empty() {
                    String::new()
                } else {
                    format!("https://www.youtube.com/watch?v={id}")
                }
            });
        let duration = self
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as u64);

        let mut track = Track::new(id, title, url).with_duration(duration);
        track.from_playlist = from_playlist;
        track
    }

    fn into_entries(self, from_playlist: bool) -> Vec<Track> {
        self.entries
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|e| e.into_track(from_playlist))
            .collect()
    }
}

/// Parse a search result (always a playlist of candidates).
fn parse_search(json: &[u8]) -> Result<Vec<Track>, ResolveError> {
    let info: InfoDict = serde_json::from_slice(json)?;
    Ok(info.into_entries(false))
}

/// Parse a playlist/mix, or a single video.
fn parse_collection(json: &[u8]) -> Result<Vec<Track>, ResolveError> {
    let info: InfoDict = serde_json::from_slice(json)?;
    if info.is_playlist() {
        Ok(info.into_entries(true))
    } else {
        Ok(vec![info.into_track(false)])
    }
}

fn status_text(output: &Output) -> String {
    match output.status.code() {
        Some(code) => format!("exit code {code}"),
        None => "signal".to_string(),
    }
}

fn stderr_text(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr);
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

impl YtDlp {
    pub fn new(settings: &ResolverSettings, cache: AssetCache) -> Self {
        Self {
            program: settings.program.clone(),
            program_args: settings.program_args.clone(),
            format: settings.format.clone(),
            audio_format: settings.audio_format.clone(),
            cache,
        }
    }

    fn run<I, S>(&self, args: I) -> std::io::Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.program_args).args(args);
        tracing::debug!(command = ?cmd, "running yt-dlp");
        cmd.output()
    }

    fn dump_json(&self, target: &str) -> Result<Vec<u8>, ResolveError> {
        let output = self
            .run([
                "--flat-playlist",
                "--dump-single-json",
                "--no-warnings",
                "--ignore-errors",
                "--",
                target,
            ])
            .map_err(|source| ResolveError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // --ignore-errors can exit non-zero while still printing usable JSON.
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(ResolveError::Failed {
                status: status_text(&output),
                stderr: stderr_text(&output),
            });
        }
        Ok(output.stdout)
    }
}

impl Resolver for YtDlp {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Track>, ResolveError> {
        let target = format!("ytsearch{}:{}", max_results.max(1), query.trim());
        let tracks = parse_search(&self.dump_json(&target)?)?;
        tracing::debug!(query, results = tracks.len(), "search finished");
        Ok(tracks)
    }

    fn resolve_collection(&self, url: &str) -> Result<Vec<Track>, ResolveError> {
        let tracks = parse_collection(&self.dump_json(url.trim())?)?;
        tracing::debug!(url, tracks = tracks.len(), "collection resolved");
        Ok(tracks)
    }

    fn materialize(&self, track: &Track) -> Result<PathBuf, FetchError> {
        if let Some(hit) = self.cache.lookup(track) {
            tracing::debug!(title = %track.title, path = %hit.display(), "cache hit");
            return Ok(hit);
        }
        if track.url.is_empty() {
            return Err(FetchError::Other(format!("{} has no source url", track.title)));
        }

        let template = self.cache.output_template(track);
        let output = self
            .run([
                OsStr::new("-f"),
                OsStr::new(&self.format),
                OsStr::new("-x"),
                OsStr::new("--audio-format"),
                OsStr::new(&self.audio_format),
                OsStr::new("--restrict-filenames"),
                OsStr::new("--no-playlist"),
                OsStr::new("--no-progress"),
                OsStr::new("--no-warnings"),
                OsStr::new("-q"),
                OsStr::new("--no-simulate"),
                OsStr::new("--print"),
                OsStr::new("after_move:filepath"),
                OsStr::new("-o"),
                template.as_os_str(),
                OsStr::new("--"),
                OsStr::new(&track.url),
            ])
            .map_err(|source| FetchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::Failed {
                status: status_text(&output),
                stderr: stderr_text(&output),
            });
        }

        let printed = String::from_utf8_lossy(&output.stdout)
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from);

        match printed {
            Some(p) if p.is_file() => Ok(p),
            // Post-processing can rename the file after the path was printed.
            _ => self
                .cache
                .lookup(track)
                .ok_or_else(|| FetchError::MissingOutput(template)),
        }
    }
}
