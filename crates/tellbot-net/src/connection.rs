//! Connection lifecycle state machine.
//!
//! One `Connection` per configured network. It owns the transport and the
//! roster, and enforces the lifecycle policy:
//!
//! - connect: up to [`CONNECT_ATTEMPTS`] tries; an unresolvable host aborts
//!   the cycle immediately, any other failure retries; exhausted attempts
//!   park the connection `Disconnected` until something outside asks again
//! - nick reconciliation: when the network knows us by the wrong nick, ask
//!   for the right one at most once per [`NICK_RETRY_MS`]
//! - mid-session failure: exactly one in-place reconnect (re-open, re-login,
//!   re-join) keeping the roster; if that also fails, `Disconnected`
//!
//! Connection failures never propagate out of this module as errors that
//! could stop the scheduler; they are logged and reflected in [`ConnState`].

use tellbot_core::utils::ieq;
use tracing::{debug, info, warn};

use crate::roster::Roster;
use crate::transport::{ConnectError, SendKind, Transport, TransportEvent};

/// Connect attempts per cycle before giving up.
pub const CONNECT_ATTEMPTS: u32 = 3;

/// Minimum gap between nick reconciliation attempts.
pub const NICK_RETRY_MS: i64 = 60_000;

/// Lifecycle state of a connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// A maintained connection to one network.
pub struct Connection {
    /// Stable index, tied to configuration order. Survives reconnects, so
    /// persisted channel references stay valid.
    pub index: usize,
    pub host: String,
    pub port: u16,
    /// The nick we want. The transport reports the nick we have.
    pub desired_nick: String,
    pub state: ConnState,
    pub roster: Roster,
    transport: Box<dyn Transport>,
    channel_names: Vec<String>,
    next_nick_check_ms: i64,
}

impl Connection {
    pub fn new(
        index: usize,
        host: impl Into<String>,
        port: u16,
        desired_nick: impl Into<String>,
        channel_names: Vec<String>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            index,
            host: host.into(),
            port,
            desired_nick: desired_nick.into(),
            state: ConnState::Disconnected,
            roster: Roster::new(&channel_names),
            transport,
            channel_names,
            next_nick_check_ms: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnState::Connected
    }

    /// The nick the network currently knows us by.
    pub fn live_nick(&self) -> &str {
        self.transport.live_nick()
    }

    /// Run one connect cycle: up to [`CONNECT_ATTEMPTS`] tries.
    ///
    /// Returns whether the connection came up. Failure reasons are logged
    /// here; the caller only needs the outcome.
    pub async fn connect(&mut self) -> bool {
        self.state = ConnState::Connecting;
        for attempt in 1..=CONNECT_ATTEMPTS {
            debug!(
                network = %self.host,
                attempt,
                "Connecting to {}:{}", self.host, self.port
            );
            match self
                .transport
                .connect(&self.host, self.port, &self.desired_nick, &self.channel_names)
                .await
            {
                Ok(()) => {
                    info!(network = %self.host, "Connected as {}", self.live_nick());
                    self.state = ConnState::Connected;
                    return true;
                }
                Err(ConnectError::Fatal(msg)) => {
                    warn!(network = %self.host, "Cannot resolve host, giving up: {}", msg);
                    self.state = ConnState::Disconnected;
                    return false;
                }
                Err(ConnectError::Retryable(msg)) => {
                    warn!(network = %self.host, attempt, "Connect failed: {}", msg);
                }
            }
        }
        warn!(
            network = %self.host,
            "Giving up after {} attempts", CONNECT_ATTEMPTS
        );
        self.state = ConnState::Disconnected;
        false
    }

    /// One scheduler tick's worth of work on this connection: nick
    /// reconciliation, then an event drain.
    ///
    /// Every drained event is folded into the roster before being returned,
    /// so callers always observe membership that already reflects the
    /// events they are handling.
    ///
    /// A poll failure triggers exactly one in-place reconnect. The roster
    /// is kept: membership refreshes itself from the name lists the re-join
    /// produces, and persisted channel references must survive the blip.
    pub async fn tick_poll(&mut self, now_ms: i64) -> Vec<TransportEvent> {
        if self.state != ConnState::Connected {
            return Vec::new();
        }

        self.reconcile_nick(now_ms).await;

        match self.transport.poll().await {
            Ok(events) => {
                for event in &events {
                    self.roster.apply(event, now_ms);
                }
                events
            }
            Err(e) => {
                warn!(network = %self.host, "Lost connection: {:#}", e);
                self.reconnect_in_place().await;
                Vec::new()
            }
        }
    }

    async fn reconcile_nick(&mut self, now_ms: i64) {
        if ieq(self.transport.live_nick(), &self.desired_nick) {
            return;
        }
        if now_ms < self.next_nick_check_ms {
            return;
        }
        self.next_nick_check_ms = now_ms + NICK_RETRY_MS;
        info!(
            network = %self.host,
            "Nick is {}, asking for {}", self.transport.live_nick(), self.desired_nick
        );
        if let Err(e) = self.transport.change_nick(&self.desired_nick).await {
            warn!(network = %self.host, "Nick change failed: {:#}", e);
        }
    }

    async fn reconnect_in_place(&mut self) {
        info!(network = %self.host, "Reconnecting in place");
        match self
            .transport
            .connect(&self.host, self.port, &self.desired_nick, &self.channel_names)
            .await
        {
            Ok(()) => {
                info!(network = %self.host, "Reconnected");
            }
            Err(e) => {
                warn!(network = %self.host, "Reconnect failed, going offline: {}", e);
                self.state = ConnState::Disconnected;
            }
        }
    }

    /// Send a line out on this connection. A send failure is logged, not
    /// escalated; the next poll notices a dead connection.
    pub async fn send(&mut self, target: &str, text: &str, kind: SendKind) {
        if self.state != ConnState::Connected {
            debug!(network = %self.host, "Dropping send to {} while offline", target);
            return;
        }
        if let Err(e) = self.transport.send(target, text, kind).await {
            warn!(network = %self.host, "Send to {} failed: {:#}", target, e);
        }
    }

    /// Graceful disconnect with a goodbye.
    pub async fn disconnect(&mut self, reason: &str) {
        if self.state == ConnState::Connected {
            if let Err(e) = self.transport.disconnect(reason).await {
                debug!(network = %self.host, "Disconnect error ignored: {:#}", e);
            }
        }
        self.state = ConnState::Disconnected;
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
