//! Tellbot Net — the network-facing layer.
//!
//! This crate provides:
//! - **transport**: the `Transport` trait every network backend implements,
//!   plus the protocol-neutral event types it emits
//! - **roster**: per-connection channel membership, activity, and history
//! - **connection**: the connection lifecycle state machine (bounded connect
//!   retries, nick reconciliation, single-shot in-place reconnect)
//!
//! Nothing here parses wire protocols. A backend turns its protocol into
//! [`transport::TransportEvent`]s; everything above that line is shared.

pub mod connection;
pub mod roster;
pub mod transport;

pub use connection::{ConnState, Connection};
pub use roster::{ChanAccess, Channel, ChannelUser, Roster};
pub use transport::{ConnectError, SendKind, Transport, TransportEvent};
