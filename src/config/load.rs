use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then lets environment
/// variables (prefix `YTQ__`) override it, and falls back to struct defaults.
impl Settings {
    /// Load settings from the resolved config path and the environment.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::load_from(resolve_config_path())
    }

    /// Load settings from an explicit (optional) config file and the environment.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("YTQ")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.resolver.search_results == 0 {
            return Err("resolver.search_results must be >= 1".to_string());
        }
        if self.resolver.program.trim().is_empty() {
            return Err("resolver.program must not be empty".to_string());
        }
        if self.cache.extensions.is_empty() {
            return Err("cache.extensions must list at least one extension".to_string());
        }
        if self.playback.idle_wait_ms == 0 || self.playback.busy_poll_ms == 0 {
            return Err("playback intervals must be >= 1ms".to_string());
        }
        if self.audio.poll_ms == 0 {
            return Err("audio.poll_ms must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err("audio.volume must be within 0.0..=1.0".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `YTQ_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("YTQ_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/ytq/config.toml`
/// or `~/.config/ytq/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("ytq").join("config.toml"))
}
