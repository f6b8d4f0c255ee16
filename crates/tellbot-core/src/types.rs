//! Domain types — identities and reminders, the two things Tellbot persists.
//!
//! An `Identity` is a logical account, distinct from any single network nick:
//! a person may be connected from several networks at once, under several
//! nicks, and all of them map back to one identity via bound hosts.
//!
//! A `Reminder` is a deferred message awaiting a resolvable destination for
//! its target. Delivery is at-most-once: a reminder leaves the pending set
//! the moment it is delivered or cancelled.
//!
//! All types serialize with **camelCase** keys and `#[serde(default)]` so
//! partially written state files still load.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Maximum number of hosts that may be bound to one identity at a time.
pub const MAX_HOSTS: usize = 10;

/// Current Unix timestamp in milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// ─────────────────────────────────────────────
// AccessTier
// ─────────────────────────────────────────────

/// Access tier of an identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    #[default]
    Member,
    Admin,
}

// ─────────────────────────────────────────────
// ChannelKey
// ─────────────────────────────────────────────

/// Stable reference to a channel on a specific connection.
///
/// Identities never hold live channel handles — connections are torn down
/// and recreated, so a back-reference is a (connection index, channel name)
/// pair that is re-resolved against the live rosters at lookup time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelKey {
    /// Connection index, stable across reconnects (tied to configuration order).
    pub connection: usize,
    /// Channel name on that connection.
    pub channel: String,
}

impl ChannelKey {
    pub fn new(connection: usize, channel: impl Into<String>) -> Self {
        Self {
            connection,
            channel: channel.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────

/// A logical user account.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    /// Unique account name, compared case-insensitively.
    pub user_name: String,
    /// Login password. Comes from configuration, never written to the
    /// state file.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Hosts currently bound to this identity (at most [`MAX_HOSTS`]).
    /// A host is bound to at most one identity process-wide.
    pub hosts: Vec<String>,
    /// Preferred delivery channel name, if the user has set one.
    /// Self-healing: cleared when it no longer matches any live channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    /// Channel the user was last observed speaking in. A weak reference:
    /// it may point at a channel that no longer exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_channel: Option<ChannelKey>,
    /// Away message, `None` when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away: Option<String>,
    /// When the away message was set (Unix epoch ms).
    pub leave_time_ms: i64,
    /// Last time this identity was observed talking (Unix epoch ms).
    pub last_talked_ms: i64,
    /// Access tier.
    pub tier: AccessTier,
    /// Free-form description, shown in response to "who is" queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            password: String::new(),
            hosts: Vec::new(),
            home: None,
            last_channel: None,
            away: None,
            leave_time_ms: 0,
            last_talked_ms: 0,
            tier: AccessTier::Member,
            description: None,
        }
    }
}

impl Identity {
    /// Create a new identity with the given name.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            ..Default::default()
        }
    }

    /// Whether `host` is bound to this identity.
    pub fn has_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h == host)
    }

    /// Whether this identity has a free host slot.
    pub fn has_free_slot(&self) -> bool {
        self.hosts.len() < MAX_HOSTS
    }

    pub fn is_admin(&self) -> bool {
        self.tier == AccessTier::Admin
    }
}

// ─────────────────────────────────────────────
// Reminder
// ─────────────────────────────────────────────

/// A deferred message for a participant who may not currently be reachable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reminder {
    /// Who left the message: an identity name when the sender was logged
    /// in, otherwise the raw nick.
    pub sender: String,
    /// Who it is for: identity name or raw nick.
    pub target: String,
    /// The message text.
    pub body: String,
    /// When the message was left (Unix epoch ms).
    pub time_sent_ms: i64,
    /// Earliest eligible delivery time (Unix epoch ms).
    /// `0` means "deliver on first sight of the target".
    pub time_to_arrive_ms: i64,
    /// Whether the message has been delivered.
    pub notified: bool,
    /// When the message was delivered (Unix epoch ms, `0` if never).
    pub time_notified_ms: i64,
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            sender: String::new(),
            target: String::new(),
            body: String::new(),
            time_sent_ms: 0,
            time_to_arrive_ms: 0,
            notified: false,
            time_notified_ms: 0,
        }
    }
}

impl Reminder {
    /// Create a reminder. `time_to_arrive_ms` of `0` means deliver on first
    /// sight of the target.
    pub fn new(
        target: impl Into<String>,
        body: impl Into<String>,
        sender: impl Into<String>,
        time_sent_ms: i64,
        time_to_arrive_ms: i64,
    ) -> Self {
        Self {
            sender: sender.into(),
            target: target.into(),
            body: body.into(),
            time_sent_ms,
            time_to_arrive_ms,
            notified: false,
            time_notified_ms: 0,
        }
    }

    /// Whether this reminder is eligible for delivery at `now_ms`.
    ///
    /// Eligible means undelivered and either due immediately (no arrival
    /// time) or past its arrival time. Eligibility says nothing about
    /// whether the target is reachable — that is the sweep's job.
    pub fn is_due(&self, now_ms: i64) -> bool {
        !self.notified && (self.time_to_arrive_ms == 0 || now_ms >= self.time_to_arrive_ms)
    }

    /// Whether `sender == target` (the "message from yourself" case),
    /// compared case-insensitively.
    pub fn is_self_addressed(&self) -> bool {
        self.sender.eq_ignore_ascii_case(&self.target)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_defaults() {
        let id = Identity::new("Alice");
        assert_eq!(id.user_name, "Alice");
        assert!(id.hosts.is_empty());
        assert!(id.home.is_none());
        assert!(id.away.is_none());
        assert_eq!(id.tier, AccessTier::Member);
        assert!(!id.is_admin());
    }

    #[test]
    fn test_identity_host_slots() {
        let mut id = Identity::new("Alice");
        assert!(id.has_free_slot());
        for i in 0..MAX_HOSTS {
            id.hosts.push(format!("host{i}"));
        }
        assert!(!id.has_free_slot());
        assert!(id.has_host("host3"));
        assert!(!id.has_host("other"));
    }

    #[test]
    fn test_identity_password_not_serialized() {
        let mut id = Identity::new("Alice");
        id.password = "hunter2".into();
        let json = serde_json::to_value(&id).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["userName"], "Alice");
    }

    #[test]
    fn test_identity_serde_round_trip() {
        let mut id = Identity::new("Alice");
        id.hosts.push("alice@example.net".into());
        id.home = Some("#lounge".into());
        id.away = Some("lunch".into());
        id.leave_time_ms = 42;
        id.last_channel = Some(ChannelKey::new(1, "#dev"));

        let json = serde_json::to_string(&id).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_name, "Alice");
        assert_eq!(back.hosts, vec!["alice@example.net"]);
        assert_eq!(back.home.as_deref(), Some("#lounge"));
        assert_eq!(back.away.as_deref(), Some("lunch"));
        assert_eq!(back.leave_time_ms, 42);
        assert_eq!(back.last_channel, Some(ChannelKey::new(1, "#dev")));
    }

    #[test]
    fn test_reminder_due_immediately() {
        let r = Reminder::new("Bob", "the build is done", "Alice", 1000, 0);
        assert!(r.is_due(1000));
        assert!(r.is_due(0));
    }

    #[test]
    fn test_reminder_due_after_arrival_time() {
        let r = Reminder::new("Bob", "stand up", "Alice", 1000, 5000);
        assert!(!r.is_due(4999));
        assert!(r.is_due(5000));
        assert!(r.is_due(9000));
    }

    #[test]
    fn test_delivered_reminder_never_due() {
        let mut r = Reminder::new("Bob", "hi", "Alice", 1000, 0);
        r.notified = true;
        assert!(!r.is_due(i64::MAX));
    }

    #[test]
    fn test_self_addressed() {
        let r = Reminder::new("alice", "note to self", "Alice", 0, 0);
        assert!(r.is_self_addressed());
        let r = Reminder::new("Bob", "hi", "Alice", 0, 0);
        assert!(!r.is_self_addressed());
    }

    #[test]
    fn test_reminder_serde_camel_case() {
        let r = Reminder::new("Bob", "hi", "Alice", 123, 456);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["timeSentMs"], 123);
        assert_eq!(json["timeToArriveMs"], 456);
        assert!(json.get("time_to_arrive_ms").is_none());
    }

    #[test]
    fn test_reminder_serde_round_trip() {
        let mut r = Reminder::new("Bob", "the build is done", "Alice", 123, 456);
        r.notified = true;
        r.time_notified_ms = 789;

        let json = serde_json::to_string(&r).unwrap();
        let back: Reminder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sender, "Alice");
        assert_eq!(back.target, "Bob");
        assert_eq!(back.body, "the build is done");
        assert_eq!(back.time_sent_ms, 123);
        assert_eq!(back.time_to_arrive_ms, 456);
        assert!(back.notified);
        assert_eq!(back.time_notified_ms, 789);
    }
}
