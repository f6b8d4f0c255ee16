//! Transport trait — the abstract interface every network backend implements.
//!
//! A backend owns the socket and the wire protocol. It surfaces what happens
//! on the network as [`TransportEvent`]s and accepts outbound sends. The
//! [`crate::connection::Connection`] state machine drives it and never sees
//! a raw byte.

use async_trait::async_trait;
use thiserror::Error;

/// How a connect attempt failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The host cannot be resolved. Retrying is pointless; the attempt
    /// cycle aborts immediately.
    #[error("host unresolvable: {0}")]
    Fatal(String),

    /// Any other I/O failure. The caller may retry.
    #[error("connect failed: {0}")]
    Retryable(String),
}

/// Flavor of an outbound line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendKind {
    /// A normal message.
    Message,
    /// An emote ("* botnick does something").
    Action,
    /// An out-of-band notice (used for shutdown goodbyes).
    Notice,
}

/// A protocol-neutral event observed on a connection.
///
/// `channel: None` on [`TransportEvent::Message`] and
/// [`TransportEvent::Action`] means the line was addressed directly to the
/// bot rather than said in a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Message {
        nick: String,
        host: String,
        channel: Option<String>,
        text: String,
    },
    Action {
        nick: String,
        host: String,
        channel: Option<String>,
        text: String,
    },
    Join {
        nick: String,
        host: String,
        channel: String,
    },
    Part {
        nick: String,
        channel: String,
    },
    Quit {
        nick: String,
    },
    NickChange {
        old: String,
        new: String,
    },
    /// Bulk membership snapshot for a channel. Names may carry access
    /// prefixes (`@`, `%`, `+`); hosts arrive later via [`Self::WhoEntry`].
    NameList {
        channel: String,
        names: Vec<String>,
    },
    /// Host information for one channel member.
    WhoEntry {
        channel: String,
        nick: String,
        host: String,
    },
}

/// Every network backend implements this trait.
///
/// The [`crate::connection::Connection`] holds a `Box<dyn Transport>` and
/// owns all retry and reconnect policy; a backend only reports what
/// happened.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection, log in as `nick`, and join `channels`.
    ///
    /// Called both for the initial connect and for in-place reconnects, so
    /// it must be safe to call on a transport whose previous socket died.
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        nick: &str,
        channels: &[String],
    ) -> Result<(), ConnectError>;

    /// Drain the events that are currently available without blocking.
    ///
    /// Returns an empty vec when the network is quiet. An `Err` means the
    /// underlying connection failed mid-session.
    async fn poll(&mut self) -> anyhow::Result<Vec<TransportEvent>>;

    /// Send a line to a channel or nick.
    async fn send(&mut self, target: &str, text: &str, kind: SendKind) -> anyhow::Result<()>;

    /// Request a nickname change. The live nick updates once the network
    /// confirms it.
    async fn change_nick(&mut self, nick: &str) -> anyhow::Result<()>;

    /// Close the connection, saying goodbye with `reason` where the
    /// protocol supports it.
    async fn disconnect(&mut self, reason: &str) -> anyhow::Result<()>;

    /// The nickname the network currently knows us by.
    fn live_nick(&self) -> &str;
}
