//! The `BotError` taxonomy shared by every crate.
//!
//! Two of the failure modes described in the design are deliberately *not*
//! variants here: an unresolvable reminder target is silently deferred to
//! the next sweep (modeled as an absent destination, never an error), and
//! a missing time expression in free text is a normal parser outcome
//! (modeled as `None`). Nothing in this taxonomy is allowed to terminate
//! the process; every failure is isolated per connection or per reminder.

use thiserror::Error;

/// Errors produced by the core components.
#[derive(Debug, Error)]
pub enum BotError {
    /// Retryable transport-level failure. The connection layer retries up
    /// to its attempt bound, then parks the connection Disconnected.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Address resolution failed. Fatal for the current attempt cycle:
    /// retrying the same unresolvable host is pointless.
    #[error("host unresolvable: {0}")]
    FatalAddress(String),

    /// Login or host-binding conflict. Surfaced to the user as a refusal;
    /// no state changes.
    #[error("{0}")]
    AuthorizationDenied(String),

    /// A numeric reference into a reminder listing that does not resolve
    /// even after wrapping. Surfaced to the user; no state changes.
    #[error("{0}")]
    MalformedReference(String),

    /// State store I/O failure.
    #[error("state store: {0}")]
    Store(#[from] std::io::Error),

    /// State store (de)serialization failure.
    #[error("state format: {0}")]
    Format(#[from] serde_json::Error),
}
