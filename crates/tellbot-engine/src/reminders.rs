//! Reminder store — pending deferred messages and their bookkeeping.
//!
//! The store knows nothing about channels or networks; it owns the pending
//! set, the FIFO ordering, the per-sender numbering, and the delivery text.
//! Deciding *where* a reminder can be said is the scheduler's sweep.
//!
//! Delivery is at-most-once by construction: a reminder leaves the pending
//! set in the same call that marks it delivered.

use tellbot_core::types::Reminder;
use tellbot_core::utils::{format_age_ms, ieq};
use tellbot_core::BotError;
use tracing::debug;

use crate::parse::DurationParser;

/// Reminders listed per page.
pub const LIST_PAGE_SIZE: usize = 5;

#[derive(Debug, Default)]
pub struct ReminderStore {
    /// Pending reminders in creation order.
    reminders: Vec<Reminder>,
    /// Earliest effective due time across the pending set, or `None` when
    /// empty. Purely an optimization for the per-tick due check; always
    /// recomputed on mutation, so it can never be stale in the direction
    /// that would delay a delivery.
    next_due_ms: Option<i64>,
}

impl ReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted state, dropping anything already delivered.
    pub fn from_persisted(reminders: Vec<Reminder>) -> Self {
        let mut store = Self {
            reminders: reminders.into_iter().filter(|r| !r.notified).collect(),
            next_due_ms: None,
        };
        store.recompute_hint();
        store
    }

    /// Add a reminder. The body is scanned for a time expression; when one
    /// is found, delivery waits for it, the expression is stripped from the
    /// stored body, and the matched expression is returned for echoing back
    /// to the sender.
    pub fn add(
        &mut self,
        target: &str,
        body: &str,
        sender: &str,
        now_ms: i64,
        parser: &dyn DurationParser,
    ) -> Option<String> {
        let (due_ms, expression, stored) = match parser.parse(body, now_ms) {
            Some(p) => {
                let stripped: String = body
                    .replacen(&p.expression, "", 1)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                // "remind me in 5 minutes" with nothing else keeps the
                // original text rather than delivering an empty body.
                let stored = if stripped.is_empty() {
                    body.to_string()
                } else {
                    stripped
                };
                (p.due_ms, Some(p.expression), stored)
            }
            None => (0, None, body.to_string()),
        };
        debug!(target, sender, due_ms, "Reminder added");
        self.reminders
            .push(Reminder::new(target, stored, sender, now_ms, due_ms));
        self.recompute_hint();
        expression
    }

    /// Pending reminders in creation order.
    pub fn pending(&self) -> &[Reminder] {
        &self.reminders
    }

    /// Pending reminders left by `sender`, paired with their positions in
    /// the pending set. This is the list users see; its 1-based numbering
    /// is recomputed on every call and never stored.
    pub fn by_sender(&self, sender: &str) -> Vec<(usize, &Reminder)> {
        self.reminders
            .iter()
            .enumerate()
            .filter(|(_, r)| ieq(&r.sender, sender))
            .collect()
    }

    /// Resolve a user-supplied 1-based reference into `sender`'s list down
    /// to a position in the pending set.
    ///
    /// An index of 0 wraps around to the last entry. Anything else outside
    /// the list is a [`BotError::MalformedReference`].
    pub fn resolve_index(&self, sender: &str, index: i64) -> Result<usize, BotError> {
        let mine = self.by_sender(sender);
        if mine.is_empty() {
            return Err(BotError::MalformedReference(
                "You don't have any messages waiting.".to_string(),
            ));
        }
        let slot = if index == 0 {
            mine.len()
        } else if index < 0 || index as usize > mine.len() {
            return Err(BotError::MalformedReference(
                "You don't have that many messages.".to_string(),
            ));
        } else {
            index as usize
        };
        Ok(mine[slot - 1].0)
    }

    /// Cancel the reminder at `position` in the pending set.
    pub fn remove(&mut self, position: usize) -> Reminder {
        let removed = self.reminders.remove(position);
        self.recompute_hint();
        removed
    }

    /// Mark the reminder at `position` delivered, remove it from the
    /// pending set, and return it for formatting.
    pub fn take_delivered(&mut self, position: usize, now_ms: i64) -> Reminder {
        let mut r = self.reminders.remove(position);
        r.notified = true;
        r.time_notified_ms = now_ms;
        self.recompute_hint();
        r
    }

    /// Cheap per-tick check: could anything be due right now? `false`
    /// means the sweep can skip the pending set entirely this tick.
    pub fn maybe_due(&self, now_ms: i64) -> bool {
        self.next_due_ms.is_some_and(|t| now_ms >= t)
    }

    /// The delivery line for a reminder, spoken in the target's channel.
    pub fn format_delivery(reminder: &Reminder, now_ms: i64) -> String {
        let sender = if reminder.is_self_addressed() {
            "yourself"
        } else {
            reminder.sender.as_str()
        };
        format!(
            "{}, message from {} [{} ago]: {}",
            reminder.target,
            sender,
            format_age_ms(reminder.time_sent_ms, now_ms),
            reminder.body
        )
    }

    fn recompute_hint(&mut self) {
        self.next_due_ms = self.reminders.iter().map(|r| r.time_to_arrive_ms).min();
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
