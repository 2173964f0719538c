use std::fmt;
use std::path::PathBuf;

/// A unit of enqueued audio.
///
/// `filepath` stays `None` until the resolver has materialized the asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Length in whole seconds, when the source reports one.
    pub duration: Option<u64>,
    pub filepath: Option<PathBuf>,
    pub from_playlist: bool,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            duration: None,
            filepath: None,
            from_playlist: false,
        }
    }

    pub fn with_duration(mut self, secs: Option<u64>) -> Self {
        self.duration = secs;
        self
    }

    pub fn is_materialized(&self) -> bool {
        self.filepath
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty())
    }
}

/// `m:ss`, the way durations show up next to titles.
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration {
            Some(d) if d > 0 => write!(f, "{} [{}]", self.title, format_duration(d)),
            _ => f.write_str(&self.title),
        }
    }
}
