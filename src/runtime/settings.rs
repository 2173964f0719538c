use std::path::{Path, PathBuf};

use crate::config::Settings;

/// Load settings, falling back to defaults when the file is broken.
///
/// Logging is not up yet when this runs (its level comes from here), so the
/// reason for a fallback is handed back for the caller to log.
pub fn load_settings(
    config_path: Option<&Path>,
    cache_dir: Option<PathBuf>,
) -> (Settings, Option<String>) {
    let loaded = match config_path {
        Some(p) => Settings::load_from(Some(p.to_path_buf())),
        None => Settings::load(),
    };

    let (mut settings, problem) = match loaded {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(msg) => (
                Settings::default(),
                Some(format!("invalid config, using defaults: {msg}")),
            ),
        },
        // Config is optional; failures should not prevent the app from starting.
        Err(e) => (
            Settings::default(),
            Some(format!("failed to load config, using defaults: {e}")),
        ),
    };

    if let Some(dir) = cache_dir {
        settings.cache.dir = dir;
    }
    (settings, problem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn cache_dir_flag_overrides_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\ndir = \"/var/cache/ytq\"\n").unwrap();

        let (s, problem) = load_settings(Some(&path), Some(dir.path().join("here")));
        assert!(problem.is_none());
        assert_eq!(s.cache.dir, dir.path().join("here"));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[audio]\nvolume = 5.0\n").unwrap();

        let (s, problem) = load_settings(Some(&path), None);
        assert!(problem.unwrap().contains("audio.volume"));
        assert_eq!(s.audio.volume, 1.0);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[audio\nvolume = ").unwrap();

        let (s, problem) = load_settings(Some(&path), None);
        assert!(problem.unwrap().starts_with("failed to load config"));
        assert_eq!(s.playback.idle_wait_ms, 500);
    }
}
