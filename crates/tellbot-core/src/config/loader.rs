//! Config loader — reads `~/.tellbot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.tellbot/config.json`
//! 3. Environment variables `TELLBOT_<SECTION>__<FIELD>` (override JSON)
//!
//! A missing or unparseable file is never fatal: the loader logs and
//! falls back to defaults so the process can still come up.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `TELLBOT_<SECTION>__<FIELD>` (double underscore as
/// delimiter).
///
/// Supported overrides:
/// - `TELLBOT_BOT__NICK` → `bot.nick`
/// - `TELLBOT_BOT__GREET` → `bot.greet`
/// - `TELLBOT_BOT__TICK_MS` → `bot.tick_ms`
/// - `TELLBOT_BOT__STATE_FILE` → `bot.state_file`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(nick) = std::env::var("TELLBOT_BOT__NICK") {
        if !nick.is_empty() {
            config.bot.nick = nick;
        }
    }
    if let Ok(greet) = std::env::var("TELLBOT_BOT__GREET") {
        if let Ok(v) = greet.parse::<bool>() {
            config.bot.greet = v;
        }
    }
    if let Ok(tick) = std::env::var("TELLBOT_BOT__TICK_MS") {
        if let Ok(v) = tick.parse::<u64>() {
            config.bot.tick_ms = v;
        }
    }
    if let Ok(state) = std::env::var("TELLBOT_BOT__STATE_FILE") {
        if !state.is_empty() {
            config.bot.state_file = Some(state);
        }
    }
    config
}
