//! Configuration schema.
//!
//! Hierarchy: `Config` → `BotConfig`, `[NetworkConfig]`, `[UserConfig]`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! Every section carries `#[serde(default)]` so a partial file loads.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.tellbot/config.json` + env vars.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub bot: BotConfig,
    /// Networks to connect to, in order. The position of a network in this
    /// list is its stable connection index.
    pub networks: Vec<NetworkConfig>,
    /// Known login accounts.
    pub users: Vec<UserConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            networks: Vec::new(),
            users: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Bot behavior
// ─────────────────────────────────────────────

/// Process-wide bot settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotConfig {
    /// Desired nickname on every network (overridable per network).
    pub nick: String,
    /// Whether to greet channels on join.
    pub greet: bool,
    /// Scheduler idle time between ticks, in milliseconds.
    pub tick_ms: u64,
    /// Minimum gap between bot-initiated chatter, in milliseconds.
    pub chatter_window_ms: i64,
    /// Gap between announcement checks, in milliseconds.
    pub announce_window_ms: i64,
    /// Path of the state file. `None` uses `~/.tellbot/state.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nick: "tellbot".to_string(),
            greet: true,
            tick_ms: 500,
            chatter_window_ms: 1000,
            announce_window_ms: 1000,
            state_file: None,
        }
    }
}

// ─────────────────────────────────────────────
// Networks
// ─────────────────────────────────────────────

/// One messaging network to maintain a connection to.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Nick override for this network; falls back to `bot.nick`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Channels to join, in join order.
    pub channels: Vec<ChannelConfig>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            nick: None,
            channels: Vec::new(),
        }
    }
}

fn default_port() -> u16 {
    6667
}

/// A channel to join on a network.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelConfig {
    pub name: String,
    /// Greeting said when the bot enters the channel.
    /// Empty or `"-"` suppresses the greeting.
    #[serde(default)]
    pub greeting: String,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            greeting: String::new(),
        }
    }

    /// The greeting to say on join, if any.
    pub fn effective_greeting(&self) -> Option<&str> {
        if self.greeting.is_empty() || self.greeting == "-" {
            None
        } else {
            Some(&self.greeting)
        }
    }
}

// ─────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────

/// A login account. Identities are seeded from these at startup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserConfig {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
