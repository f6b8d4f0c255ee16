//! Identity directory — who is who, across every network at once.
//!
//! Identities are seeded from configuration, then merged with persisted
//! state (bound hosts, home channel, away status survive restarts). All
//! lookups are linear scans; the population is people who talk to one bot,
//! not a user database.
//!
//! The binding invariants live here and only here:
//! - a host is bound to at most one identity process-wide
//! - an identity holds at most [`MAX_HOSTS`] bound hosts

use tellbot_core::config::UserConfig;
use tellbot_core::types::{AccessTier, ChannelKey, Identity, MAX_HOSTS};
use tellbot_core::utils::ieq;
use tellbot_core::BotError;
use tellbot_net::Roster;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct IdentityDirectory {
    identities: Vec<Identity>,
}

impl IdentityDirectory {
    /// Seed the directory from configured accounts.
    pub fn from_config(users: &[UserConfig]) -> Self {
        let identities = users
            .iter()
            .map(|u| {
                let mut id = Identity::new(&u.name);
                id.password = u.password.clone();
                id.description = u.description.clone();
                id.tier = if u.admin {
                    AccessTier::Admin
                } else {
                    AccessTier::Member
                };
                id
            })
            .collect();
        Self { identities }
    }

    /// Merge persisted identities back in. Configuration is authoritative
    /// for existence, password, and tier; persistence contributes the
    /// runtime state (hosts, home, away, timestamps). Persisted identities
    /// no longer in the configuration are dropped.
    pub fn apply_persisted(&mut self, persisted: Vec<Identity>) {
        for saved in persisted {
            if let Some(id) = self.by_name_mut(&saved.user_name) {
                id.hosts = saved.hosts;
                id.hosts.truncate(MAX_HOSTS);
                id.home = saved.home;
                id.last_channel = saved.last_channel;
                id.away = saved.away;
                id.leave_time_ms = saved.leave_time_ms;
                id.last_talked_ms = saved.last_talked_ms;
            } else {
                debug!("Dropping persisted identity {} not in config", saved.user_name);
            }
        }
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn by_name(&self, name: &str) -> Option<&Identity> {
        self.identities.iter().find(|i| ieq(&i.user_name, name))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Identity> {
        self.identities.iter_mut().find(|i| ieq(&i.user_name, name))
    }

    pub fn by_host(&self, host: &str) -> Option<&Identity> {
        if host.is_empty() {
            return None;
        }
        self.identities.iter().find(|i| i.has_host(host))
    }

    fn by_host_mut(&mut self, host: &str) -> Option<&mut Identity> {
        if host.is_empty() {
            return None;
        }
        self.identities.iter_mut().find(|i| i.has_host(host))
    }

    /// Resolve a live nick to an identity by cross-referencing the rosters:
    /// nick → host → identity.
    pub fn by_nick(&self, nick: &str, rosters: &[&Roster]) -> Option<&Identity> {
        rosters
            .iter()
            .find_map(|r| r.host_of(nick))
            .and_then(|host| self.by_host(host))
    }

    // ─────────────────────────────────────────────
    // Login / logout
    // ─────────────────────────────────────────────

    /// Bind `host` to the identity named `name` after validating the
    /// password.
    ///
    /// Refused (with no state change) when the credentials don't check
    /// out, when the host is already bound anywhere, or when the identity
    /// has no free host slot.
    pub fn login(&mut self, name: &str, password: &str, host: &str) -> Result<String, BotError> {
        if let Some(owner) = self.by_host(host) {
            let msg = if ieq(&owner.user_name, name) {
                format!("You're already logged in as {}.", owner.user_name)
            } else {
                format!("This host is already logged in as {}.", owner.user_name)
            };
            return Err(BotError::AuthorizationDenied(msg));
        }

        let Some(id) = self
            .identities
            .iter_mut()
            .find(|i| ieq(&i.user_name, name))
        else {
            return Err(BotError::AuthorizationDenied(
                "I don't know anyone by that name.".to_string(),
            ));
        };
        if id.password != password {
            return Err(BotError::AuthorizationDenied(
                "Your password doesn't match.".to_string(),
            ));
        }
        if !id.has_free_slot() {
            return Err(BotError::AuthorizationDenied(format!(
                "{} already has {} hosts logged in.",
                id.user_name, MAX_HOSTS
            )));
        }

        id.hosts.push(host.to_string());
        info!(user = %id.user_name, "Logged in from {}", host);
        Ok(id.user_name.clone())
    }

    /// Release the binding of `host`, whichever identity holds it.
    /// Returns the identity name the host was logged in as.
    pub fn logout_host(&mut self, host: &str) -> Result<String, BotError> {
        let Some(id) = self.by_host_mut(host) else {
            return Err(BotError::AuthorizationDenied(
                "You aren't logged in.".to_string(),
            ));
        };
        id.hosts.retain(|h| h != host);
        info!(user = %id.user_name, "Logged out host {}", host);
        Ok(id.user_name.clone())
    }

    /// Release one of the caller's bound host slots by 1-based number, as
    /// shown by a host listing.
    pub fn logout_slot(&mut self, host: &str, slot: usize) -> Result<String, BotError> {
        let Some(id) = self.by_host_mut(host) else {
            return Err(BotError::AuthorizationDenied(
                "You aren't logged in.".to_string(),
            ));
        };
        if slot == 0 || slot > id.hosts.len() {
            return Err(BotError::MalformedReference(
                "You don't have that many hosts logged in.".to_string(),
            ));
        }
        let removed = id.hosts.remove(slot - 1);
        info!(user = %id.user_name, "Logged out host {}", removed);
        Ok(removed)
    }

    // ─────────────────────────────────────────────
    // Presence
    // ─────────────────────────────────────────────

    /// Record that the person bound to `host` just talked in a channel.
    pub fn touch(&mut self, host: &str, channel: Option<ChannelKey>, now_ms: i64) {
        if let Some(id) = self.by_host_mut(host) {
            id.last_talked_ms = now_ms;
            if channel.is_some() {
                id.last_channel = channel;
            }
        }
    }

    /// Mark the person bound to `host` as away. Returns the identity name.
    pub fn set_away(&mut self, host: &str, message: &str, now_ms: i64) -> Option<String> {
        let id = self.by_host_mut(host)?;
        id.away = Some(message.to_string());
        id.leave_time_ms = now_ms;
        Some(id.user_name.clone())
    }

    /// Clear the away state of the person bound to `host`. Returns the
    /// identity name and how long they were away.
    pub fn set_back(&mut self, host: &str, now_ms: i64) -> Option<(String, i64)> {
        let id = self.by_host_mut(host)?;
        if id.away.take().is_none() {
            return None;
        }
        let away_for = now_ms - id.leave_time_ms;
        Some((id.user_name.clone(), away_for))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
