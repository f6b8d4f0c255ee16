//! Roster — live channel membership, activity, and recent history.
//!
//! One `Roster` per connection. It is a pure projection of the
//! [`TransportEvent`] stream: the connection feeds every event through
//! [`Roster::apply`] before anything else sees it, so lookups elsewhere
//! always run against current membership.

use std::collections::VecDeque;

use tellbot_core::utils::ieq;

use crate::transport::TransportEvent;

/// How many lines of channel history are kept, most recent first.
pub const HISTORY_LEN: usize = 8;

// ─────────────────────────────────────────────
// Members
// ─────────────────────────────────────────────

/// Channel access level, highest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChanAccess {
    Op,
    HalfOp,
    Voice,
    #[default]
    None,
}

impl ChanAccess {
    /// Split a name-list entry into its access prefix and bare nick.
    fn strip_prefix(name: &str) -> (Self, &str) {
        match name.chars().next() {
            Some('@') => (Self::Op, &name[1..]),
            Some('%') => (Self::HalfOp, &name[1..]),
            Some('+') => (Self::Voice, &name[1..]),
            _ => (Self::None, name),
        }
    }
}

/// One member of a channel. `host` is empty until a who-listing fills it in.
#[derive(Clone, Debug)]
pub struct ChannelUser {
    pub nick: String,
    pub host: String,
    pub access: ChanAccess,
}

// ─────────────────────────────────────────────
// Channel
// ─────────────────────────────────────────────

/// One line of remembered channel conversation.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub nick: String,
    pub text: String,
    pub when_ms: i64,
}

/// A channel the bot is sitting in. Members are kept in join order.
#[derive(Debug, Default)]
pub struct Channel {
    pub name: String,
    pub last_activity_ms: i64,
    users: Vec<ChannelUser>,
    history: VecDeque<HistoryEntry>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Members in join order.
    pub fn users(&self) -> &[ChannelUser] {
        &self.users
    }

    /// Find a member by nick, case-insensitively.
    pub fn find_user(&self, nick: &str) -> Option<&ChannelUser> {
        self.users.iter().find(|u| ieq(&u.nick, nick))
    }

    /// Recent lines, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    fn add_user(&mut self, nick: &str, host: &str, access: ChanAccess) {
        if let Some(u) = self.users.iter_mut().find(|u| ieq(&u.nick, nick)) {
            if !host.is_empty() {
                u.host = host.to_string();
            }
            u.access = access;
            return;
        }
        self.users.push(ChannelUser {
            nick: nick.to_string(),
            host: host.to_string(),
            access,
        });
    }

    fn remove_user(&mut self, nick: &str) {
        self.users.retain(|u| !ieq(&u.nick, nick));
    }

    fn record_line(&mut self, nick: &str, text: &str, now_ms: i64) {
        self.last_activity_ms = now_ms;
        self.history.push_front(HistoryEntry {
            nick: nick.to_string(),
            text: text.to_string(),
            when_ms: now_ms,
        });
        self.history.truncate(HISTORY_LEN);
    }
}

// ─────────────────────────────────────────────
// Roster
// ─────────────────────────────────────────────

/// All channels on one connection, in configured join order.
#[derive(Debug, Default)]
pub struct Roster {
    channels: Vec<Channel>,
}

impl Roster {
    /// Pre-create the channels the connection will join, preserving order.
    pub fn new(channel_names: &[String]) -> Self {
        Self {
            channels: channel_names.iter().map(Channel::new).collect(),
        }
    }

    /// Channels in join order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Look up a channel by name, case-insensitively.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| ieq(&c.name, name))
    }

    fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| ieq(&c.name, name))
    }

    /// The host of `nick` wherever it is currently seen, if anywhere.
    pub fn host_of(&self, nick: &str) -> Option<&str> {
        self.channels
            .iter()
            .filter_map(|c| c.find_user(nick))
            .map(|u| u.host.as_str())
            .find(|h| !h.is_empty())
    }

    /// Fold one observed event into the membership/history state.
    pub fn apply(&mut self, event: &TransportEvent, now_ms: i64) {
        match event {
            TransportEvent::Message { nick, host, channel, text }
            | TransportEvent::Action { nick, host, channel, text } => {
                if let Some(name) = channel {
                    if let Some(ch) = self.channel_mut(name) {
                        ch.record_line(nick, text, now_ms);
                        // Speaking proves presence and reveals the host,
                        // even when the join or who-listing was missed.
                        match ch.users.iter_mut().find(|u| ieq(&u.nick, nick)) {
                            Some(u) if u.host.is_empty() && !host.is_empty() => {
                                u.host = host.clone();
                            }
                            Some(_) => {}
                            None => ch.add_user(nick, host, ChanAccess::None),
                        }
                    }
                }
            }
            TransportEvent::Join { nick, host, channel } => {
                if let Some(ch) = self.channel_mut(channel) {
                    ch.add_user(nick, host, ChanAccess::None);
                    ch.last_activity_ms = now_ms;
                }
            }
            TransportEvent::Part { nick, channel } => {
                if let Some(ch) = self.channel_mut(channel) {
                    ch.remove_user(nick);
                }
            }
            TransportEvent::Quit { nick } => {
                for ch in &mut self.channels {
                    ch.remove_user(nick);
                }
            }
            TransportEvent::NickChange { old, new } => {
                for ch in &mut self.channels {
                    if let Some(u) = ch.users.iter_mut().find(|u| ieq(&u.nick, old)) {
                        u.nick = new.clone();
                    }
                }
            }
            TransportEvent::NameList { channel, names } => {
                if let Some(ch) = self.channel_mut(channel) {
                    ch.users.clear();
                    for name in names {
                        let (access, nick) = ChanAccess::strip_prefix(name);
                        ch.add_user(nick, "", access);
                    }
                }
            }
            TransportEvent::WhoEntry { channel, nick, host } => {
                if let Some(ch) = self.channel_mut(channel) {
                    if let Some(u) = ch.users.iter_mut().find(|u| ieq(&u.nick, nick)) {
                        u.host = host.clone();
                    } else {
                        ch.add_user(nick, host, ChanAccess::None);
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new(&["#lounge".to_string(), "#dev".to_string()])
    }

    fn join(nick: &str, host: &str, channel: &str) -> TransportEvent {
        TransportEvent::Join {
            nick: nick.into(),
            host: host.into(),
            channel: channel.into(),
        }
    }

    #[test]
    fn test_channels_keep_configured_order() {
        let r = roster();
        let names: Vec<_> = r.channels().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["#lounge", "#dev"]);
    }

    #[test]
    fn test_join_and_part() {
        let mut r = roster();
        r.apply(&join("Alice", "alice@host", "#lounge"), 100);
        assert!(r.channel("#lounge").unwrap().find_user("alice").is_some());

        r.apply(
            &TransportEvent::Part {
                nick: "Alice".into(),
                channel: "#lounge".into(),
            },
            200,
        );
        assert!(r.channel("#lounge").unwrap().find_user("Alice").is_none());
    }

    #[test]
    fn test_quit_removes_from_all_channels() {
        let mut r = roster();
        r.apply(&join("Alice", "alice@host", "#lounge"), 100);
        r.apply(&join("Alice", "alice@host", "#dev"), 100);

        r.apply(&TransportEvent::Quit { nick: "alice".into() }, 200);
        assert!(r.channel("#lounge").unwrap().find_user("Alice").is_none());
        assert!(r.channel("#dev").unwrap().find_user("Alice").is_none());
    }

    #[test]
    fn test_nick_change_renames_everywhere() {
        let mut r = roster();
        r.apply(&join("Alice", "alice@host", "#lounge"), 100);
        r.apply(
            &TransportEvent::NickChange {
                old: "Alice".into(),
                new: "Alice2".into(),
            },
            200,
        );
        assert!(r.channel("#lounge").unwrap().find_user("Alice2").is_some());
        assert!(r.channel("#lounge").unwrap().find_user("Alice").is_none());
    }

    #[test]
    fn test_name_list_parses_access_prefixes() {
        let mut r = roster();
        r.apply(
            &TransportEvent::NameList {
                channel: "#lounge".into(),
                names: vec!["@Alice".into(), "%Bob".into(), "+Carol".into(), "Dave".into()],
            },
            100,
        );

        let ch = r.channel("#lounge").unwrap();
        assert_eq!(ch.find_user("Alice").unwrap().access, ChanAccess::Op);
        assert_eq!(ch.find_user("Bob").unwrap().access, ChanAccess::HalfOp);
        assert_eq!(ch.find_user("Carol").unwrap().access, ChanAccess::Voice);
        assert_eq!(ch.find_user("Dave").unwrap().access, ChanAccess::None);
    }

    #[test]
    fn test_who_entry_fills_hosts() {
        let mut r = roster();
        r.apply(
            &TransportEvent::NameList {
                channel: "#lounge".into(),
                names: vec!["Alice".into()],
            },
            100,
        );
        assert_eq!(r.host_of("Alice"), None);

        r.apply(
            &TransportEvent::WhoEntry {
                channel: "#lounge".into(),
                nick: "Alice".into(),
                host: "alice@host".into(),
            },
            100,
        );
        assert_eq!(r.host_of("Alice"), Some("alice@host"));
    }

    #[test]
    fn test_message_updates_activity_and_history() {
        let mut r = roster();
        r.apply(&join("Alice", "alice@host", "#lounge"), 100);
        r.apply(
            &TransportEvent::Message {
                nick: "Alice".into(),
                host: "alice@host".into(),
                channel: Some("#lounge".into()),
                text: "hello".into(),
            },
            500,
        );

        let ch = r.channel("#lounge").unwrap();
        assert_eq!(ch.last_activity_ms, 500);
        let first = ch.history().next().unwrap();
        assert_eq!(first.nick, "Alice");
        assert_eq!(first.text, "hello");
    }

    #[test]
    fn test_history_ring_keeps_most_recent() {
        let mut r = roster();
        for i in 0..12 {
            r.apply(
                &TransportEvent::Message {
                    nick: "Alice".into(),
                    host: "alice@host".into(),
                    channel: Some("#lounge".into()),
                    text: format!("line {i}"),
                },
                i,
            );
        }

        let ch = r.channel("#lounge").unwrap();
        let lines: Vec<_> = ch.history().map(|h| h.text.as_str()).collect();
        assert_eq!(lines.len(), HISTORY_LEN);
        assert_eq!(lines[0], "line 11");
        assert_eq!(lines[HISTORY_LEN - 1], "line 4");
    }

    #[test]
    fn test_message_from_unseen_speaker_adds_membership() {
        let mut r = roster();
        r.apply(
            &TransportEvent::Message {
                nick: "Alice".into(),
                host: "alice@host".into(),
                channel: Some("#lounge".into()),
                text: "hello".into(),
            },
            500,
        );
        let ch = r.channel("#lounge").unwrap();
        assert_eq!(ch.find_user("Alice").unwrap().host, "alice@host");
    }

    #[test]
    fn test_private_message_touches_no_channel() {
        let mut r = roster();
        r.apply(
            &TransportEvent::Message {
                nick: "Alice".into(),
                host: "alice@host".into(),
                channel: None,
                text: "psst".into(),
            },
            500,
        );
        assert_eq!(r.channel("#lounge").unwrap().last_activity_ms, 0);
    }
}
