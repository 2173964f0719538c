//! On-disk layout of materialized audio.
//!
//! Every cached asset is `<dir>/<key>.<ext>` where `key` is a filesystem-safe
//! form of the track id (or title, if configured).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lofty::prelude::*;
use walkdir::WalkDir;

use crate::config::{CacheKeying, CacheSettings};
use crate::track::Track;

const MAX_KEY_LEN: usize = 120;

#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
    keying: CacheKeying,
    extensions: Vec<String>,
}

impl AssetCache {
    pub fn new(settings: &CacheSettings) -> Self {
        let extensions = settings
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            dir: settings.dir.clone(),
            keying: settings.key,
            extensions,
        }
    }

    /// Like [`AssetCache::new`], creating the directory if needed.
    pub fn open(settings: &CacheSettings) -> io::Result<Self> {
        fs::create_dir_all(&settings.dir)?;
        Ok(Self::new(settings))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_for(&self, track: &Track) -> String {
        let raw = match self.keying {
            CacheKeying::Id if !track.id.trim().is_empty() => track.id.as_str(),
            _ => track.title.as_str(),
        };
        sanitize_key(raw)
    }

    /// Output template handed to the downloader: `<dir>/<key>.%(ext)s`.
    pub fn output_template(&self, track: &Track) -> PathBuf {
        self.dir.join(format!("{}.%(ext)s", self.key_for(track)))
    }

    /// The cached asset for `track`, if one exists.
    pub fn lookup(&self, track: &Track) -> Option<PathBuf> {
        let key = self.key_for(track);
        self.files().into_iter().find(|p| {
            p.file_stem().and_then(|s| s.to_str()) == Some(key.as_str())
                && self.has_known_extension(p)
        })
    }

    fn has_known_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| e == &ext)
            })
            .unwrap_or(false)
    }

    /// Audio files currently in the cache directory (not recursive).
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.has_known_extension(p))
            .collect();
        files.sort();
        files
    }
}

/// Reduce `raw` to `[A-Za-z0-9._-]`, never empty and never hidden.
pub fn sanitize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => out.push(c),
            c if c.is_whitespace() => out.push('_'),
            _ => {}
        }
        if out.len() >= MAX_KEY_LEN {
            break;
        }
    }
    let trimmed = out.trim_start_matches('.').trim_end_matches('.');
    if trimmed.is_empty() {
        "track".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Delete a materialized asset. A missing file is not an error.
///
/// Returns whether a file was actually removed.
pub fn remove_asset(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Length of an audio file in whole seconds, read from its container.
pub fn probe_duration(path: &Path) -> Option<u64> {
    let tagged = lofty::read_from_path(path).ok()?;
    let secs = tagged.properties().duration().as_secs();
    (secs > 0).then_some(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cache_in(dir: &Path, keying: CacheKeying) -> AssetCache {
        AssetCache::new(&CacheSettings {
            dir: dir.to_path_buf(),
            key: keying,
            ..CacheSettings::default()
        })
    }

    #[test]
    fn sanitize_key_keeps_safe_characters_only() {
        assert_eq!(sanitize_key("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(sanitize_key("AC/DC: Back in Black"), "ACDC_Back_in_Black");
        assert_eq!(sanitize_key("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_key("..."), "track");
        assert_eq!(sanitize_key("   "), "track");
        assert_eq!(sanitize_key("Ünïcödé"), "ncd");
        assert!(sanitize_key(&"x".repeat(500)).len() <= MAX_KEY_LEN);
    }

    #[test]
    fn key_uses_id_or_title_per_setting() {
        let dir = tempdir().unwrap();
        let t = Track::new("abc123", "Some Song", "u");

        assert_eq!(cache_in(dir.path(), CacheKeying::Id).key_for(&t), "abc123");
        assert_eq!(cache_in(dir.path(), CacheKeying::Title).key_for(&t), "Some_Song");

        let no_id = Track::new("", "Some Song", "u");
        assert_eq!(cache_in(dir.path(), CacheKeying::Id).key_for(&no_id), "Some_Song");
    }

    #[test]
    fn lookup_finds_any_known_extension() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path(), CacheKeying::Id);
        let t = Track::new("abc", "Song", "u");

        assert!(cache.lookup(&t).is_none());

        fs::write(dir.path().join("abc.part"), b"partial").unwrap();
        fs::write(dir.path().join("abcd.mp3"), b"other").unwrap();
        assert!(cache.lookup(&t).is_none());

        fs::write(dir.path().join("abc.OPUS"), b"audio").unwrap();
        assert_eq!(cache.lookup(&t), Some(dir.path().join("abc.OPUS")));
    }

    #[test]
    fn files_lists_only_audio_in_the_top_level() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path(), CacheKeying::Id);
        fs::write(dir.path().join("b.mp3"), b"x").unwrap();
        fs::write(dir.path().join("a.m4a"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.mp3"), b"x").unwrap();

        assert_eq!(
            cache.files(),
            vec![dir.path().join("a.m4a"), dir.path().join("b.mp3")]
        );
    }

    #[test]
    fn remove_asset_is_idempotent() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("gone.mp3");
        fs::write(&p, b"x").unwrap();

        assert!(remove_asset(&p).unwrap());
        assert!(!p.exists());
        assert!(!remove_asset(&p).unwrap());
    }

    #[test]
    fn output_template_lives_in_cache_dir() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path(), CacheKeying::Id);
        let t = Track::new("abc", "Song", "u");
        assert_eq!(cache.output_template(&t), dir.path().join("abc.%(ext)s"));
    }

    #[test]
    fn probe_duration_is_none_for_garbage() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("fake.mp3");
        fs::write(&p, b"not really audio").unwrap();
        assert_eq!(probe_duration(&p), None);
    }
}
