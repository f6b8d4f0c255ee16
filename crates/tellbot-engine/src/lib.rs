//! Tellbot Engine — everything between the network layer and the user.
//!
//! This crate provides:
//! - **directory**: the identity/presence directory (login, hosts, away)
//! - **reminders**: the reminder store and its delivery bookkeeping
//! - **parse**: the `DurationParser` trait + a regex reference impl
//! - **handler**: the `UtteranceHandler` seam and the types flowing
//!   through it
//! - **commands**: the built-in command surface as a prioritized rule table
//! - **scheduler**: the tick loop that owns all of the above

pub mod commands;
pub mod directory;
pub mod handler;
pub mod parse;
pub mod reminders;
pub mod scheduler;

pub use commands::BuiltinCommands;
pub use directory::IdentityDirectory;
pub use handler::{BotApi, ChatLine, Outgoing, UtteranceHandler};
pub use parse::{DurationParser, ParsedTime, RegexDurationParser};
pub use reminders::ReminderStore;
pub use scheduler::{Announcer, ChatterGate, Scheduler};
