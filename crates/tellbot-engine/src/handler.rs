//! The utterance-handling seam.
//!
//! The scheduler turns every observed line into a [`ChatLine`], hands it to
//! the configured [`UtteranceHandler`] together with a [`BotApi`] over the
//! mutable engine state, and sends whatever [`Outgoing`] lines the handler
//! queued. The built-in command surface lives in [`crate::commands`];
//! anything else that implements the trait can replace it.

use async_trait::async_trait;
use tellbot_net::{Roster, SendKind};

use crate::directory::IdentityDirectory;
use crate::parse::DurationParser;
use crate::reminders::ReminderStore;
use crate::scheduler::ChatterGate;

/// One observed line, as seen by the handler.
#[derive(Clone, Debug)]
pub struct ChatLine {
    /// Index of the connection the line arrived on.
    pub connection: usize,
    /// Channel it was said in; `None` for a line sent directly to the bot.
    pub channel: Option<String>,
    pub nick: String,
    pub host: String,
    pub text: String,
    /// Whether the line was an emote rather than a message.
    pub action: bool,
    /// The bot's live nick on that connection, for addressing checks.
    pub bot_nick: String,
}

impl ChatLine {
    pub fn is_private(&self) -> bool {
        self.channel.is_none()
    }

    /// Where replies to this line go: the channel, or back to the sender.
    pub fn reply_target(&self) -> &str {
        self.channel.as_deref().unwrap_or(&self.nick)
    }
}

/// An outbound line queued during handling, sent by the scheduler
/// afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outgoing {
    pub connection: usize,
    pub target: String,
    pub text: String,
    pub kind: SendKind,
}

/// Mutable view over the engine state, scoped to one line.
pub struct BotApi<'a> {
    pub directory: &'a mut IdentityDirectory,
    pub reminders: &'a mut ReminderStore,
    pub parser: &'a dyn DurationParser,
    /// Read-only rosters of every connection, indexed by connection.
    pub rosters: &'a [&'a Roster],
    /// The spontaneous-chatter gate. Direct replies bypass it; anything
    /// the bot says unprompted must claim it first.
    pub chatter: &'a mut ChatterGate,
    pub now_ms: i64,
    replies: Vec<Outgoing>,
}

impl<'a> BotApi<'a> {
    pub fn new(
        directory: &'a mut IdentityDirectory,
        reminders: &'a mut ReminderStore,
        parser: &'a dyn DurationParser,
        rosters: &'a [&'a Roster],
        chatter: &'a mut ChatterGate,
        now_ms: i64,
    ) -> Self {
        Self {
            directory,
            reminders,
            parser,
            rosters,
            chatter,
            now_ms,
            replies: Vec::new(),
        }
    }

    /// Queue a reply to the line being handled.
    pub fn reply(&mut self, line: &ChatLine, text: impl Into<String>) {
        self.replies.push(Outgoing {
            connection: line.connection,
            target: line.reply_target().to_string(),
            text: text.into(),
            kind: SendKind::Message,
        });
    }

    /// Queue an emote reply to the line being handled.
    pub fn reply_action(&mut self, line: &ChatLine, text: impl Into<String>) {
        self.replies.push(Outgoing {
            connection: line.connection,
            target: line.reply_target().to_string(),
            text: text.into(),
            kind: SendKind::Action,
        });
    }

    /// The queued replies, consumed by the scheduler.
    pub fn take_replies(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.replies)
    }
}

/// Pluggable free-text command/response layer.
#[async_trait]
pub trait UtteranceHandler: Send + Sync {
    /// Handle one observed line. Replies are queued on `api`; errors are
    /// logged by the scheduler and never stop the tick loop.
    async fn on_line(&self, line: &ChatLine, api: &mut BotApi<'_>) -> anyhow::Result<()>;
}
