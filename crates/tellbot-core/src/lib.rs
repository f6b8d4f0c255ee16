//! Tellbot Core — shared types, configuration, errors, and state persistence.
//!
//! This crate provides:
//! - **config**: typed configuration schema + loader (JSON file + env overrides)
//! - **types**: `Identity` and `Reminder`, the two persisted domain types
//! - **error**: the `BotError` taxonomy shared across all crates
//! - **store**: the on-disk state store (identities + pending reminders)
//! - **utils**: path helpers, human-readable duration formatting

pub mod config;
pub mod error;
pub mod store;
pub mod types;
pub mod utils;

pub use error::BotError;
pub use types::{AccessTier, ChannelKey, Identity, Reminder};
