//! Turning queries and URLs into tracks, and tracks into local audio files.
//!
//! The pipeline only talks to the [`Resolver`] trait; [`YtDlp`] is the
//! production implementation and [`AssetCache`] owns the on-disk layout.

use std::path::PathBuf;

use crate::error::{FetchError, ResolveError};
use crate::track::Track;

mod cache;
mod ytdlp;

pub use cache::{AssetCache, probe_duration, remove_asset};
pub use ytdlp::YtDlp;

pub trait Resolver: Send + Sync {
    /// Ranked candidates for a free-text query, metadata only.
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Track>, ResolveError>;

    /// Expand a playlist or mix URL into its tracks, in order.
    ///
    /// A single-video URL yields a one-element list.
    fn resolve_collection(&self, url: &str) -> Result<Vec<Track>, ResolveError>;

    /// Produce a local audio file for `track`.
    ///
    /// Must be idempotent: if the asset already exists locally its path is
    /// returned without fetching again.
    fn materialize(&self, track: &Track) -> Result<PathBuf, FetchError>;
}
