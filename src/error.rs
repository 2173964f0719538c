//! Error taxonomy for the playback pipeline.
//!
//! Every variant here is recoverable: it is reported as one line and the
//! session keeps running. Only a failed audio output at startup aborts, and
//! that surfaces through `anyhow` from `Session::start`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A query or URL could not be turned into track metadata.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no results for {0:?}")]
    NoResults(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("resolver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("unexpected resolver output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A track's audio asset could not be materialized locally.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("download failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },
    #[error("file not found after download: {0}")]
    MissingOutput(PathBuf),
    #[error("{0}")]
    Other(String),
}

/// The backend could not play a track.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("cannot play {title:?}: no local file")]
    NotMaterialized { title: String },
    #[error("cannot play: file missing at {0}")]
    MissingFile(PathBuf),
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("audio thread is gone")]
    Disconnected,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Unrecognized or malformed front-end input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command. Type 'help' for usage.")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}
