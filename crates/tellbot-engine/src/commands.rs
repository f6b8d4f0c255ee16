//! Built-in command surface.
//!
//! Dispatch is a prioritized table of (pattern, guard, action) rules
//! evaluated in fixed order; the first rule whose pattern matches *and*
//! whose guard passes wins. Two tables exist: `rules` for lines addressed
//! to the bot (or sent privately), `observations` for things the bot
//! notices in ordinary conversation ("i'm back").

use regex::{Captures, Regex};
use tellbot_core::utils::{format_age_ms, format_duration_ms, ieq, trim_trailing};

use crate::handler::{BotApi, ChatLine, UtteranceHandler};
use crate::reminders::LIST_PAGE_SIZE;

use async_trait::async_trait;

type Guard = fn(&ChatLine) -> bool;
type Action = fn(&Captures<'_>, &ChatLine, &mut BotApi<'_>);

struct Rule {
    pattern: Regex,
    guard: Guard,
    action: Action,
}

impl Rule {
    fn new(pattern: &str, guard: Guard, action: Action) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("hardcoded rule pattern"),
            guard,
            action,
        }
    }
}

fn always(_: &ChatLine) -> bool {
    true
}

fn private_only(line: &ChatLine) -> bool {
    line.is_private()
}

pub struct BuiltinCommands {
    rules: Vec<Rule>,
    observations: Vec<Rule>,
}

impl BuiltinCommands {
    pub fn new(bot_nick: &str) -> Self {
        let rules = vec![
            Rule::new(
                r"(?i)^(?:tell|remind|ask)\s+(\S+)\s+(.+)$",
                always,
                cmd_tell,
            ),
            Rule::new(r"(?i)^(?:messages|reminders)(?:\s+(\d+))?$", always, cmd_messages),
            Rule::new(
                r"(?i)^kill\s+(?:reminder|message)\s+(-?\d+)$",
                always,
                cmd_kill,
            ),
            // Login wants privacy; the fallback rule below catches the
            // same phrase said in a channel.
            Rule::new(r"(?i)^login\s+(\S+)\s+(\S+)$", private_only, cmd_login),
            Rule::new(r"(?i)^login\b", always, cmd_login_in_public),
            Rule::new(r"(?i)^logout(?:\s+(\d+))?$", always, cmd_logout),
            Rule::new(r"(?i)^listhosts(?:\s+(\S+))?$", always, cmd_listhosts),
            Rule::new(r"(?i)^(?:seen|last)\s+(\S+?)[?!.]*$", always, cmd_seen),
            Rule::new(r"(?i)^who\s*(?:is|'s)\s+(\S+?)[?!.]*$", always, cmd_whois),
            Rule::new(r"(?i)^ping$", always, cmd_ping),
        ];

        let nick = regex::escape(bot_nick);
        let observations = vec![
            Rule::new(r"(?i)^i'?m\s+back\b", always, obs_back),
            Rule::new(r"(?i)^i'?m\s+(.{1,60})$", always, obs_away),
            Rule::new(
                &format!(r"(?i)^(?:hello|hi|hey|yo)[,!. ]+{nick}\b"),
                always,
                obs_hello,
            ),
        ];

        Self { rules, observations }
    }

    /// The command text of a line: everything when private, or the rest of
    /// the line when it opens with "botnick:" or "botnick,".
    fn addressed_text<'t>(line: &'t ChatLine) -> Option<&'t str> {
        let text = line.text.trim();
        if line.is_private() {
            return Some(text);
        }
        let nick_len = line.bot_nick.len();
        let head = text.get(..nick_len)?;
        if !ieq(head, &line.bot_nick) {
            return None;
        }
        let rest = &text[nick_len..];
        rest.strip_prefix([':', ',']).map(str::trim)
    }

    fn run_table(rules: &[Rule], text: &str, line: &ChatLine, api: &mut BotApi<'_>) -> bool {
        for rule in rules {
            if let Some(caps) = rule.pattern.captures(text) {
                if (rule.guard)(line) {
                    (rule.action)(&caps, line, api);
                    return true;
                }
            }
        }
        false
    }
}

#[async_trait]
impl UtteranceHandler for BuiltinCommands {
    async fn on_line(&self, line: &ChatLine, api: &mut BotApi<'_>) -> anyhow::Result<()> {
        if line.action {
            return Ok(());
        }
        if let Some(cmd) = Self::addressed_text(line) {
            if Self::run_table(&self.rules, cmd, line, api) {
                return Ok(());
            }
            // "tellbot: i'm back" should work too.
            if Self::run_table(&self.observations, cmd, line, api) {
                return Ok(());
            }
            api.reply(line, "Sorry, I don't follow.");
        } else {
            Self::run_table(&self.observations, line.text.trim(), line, api);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────

/// The name a line's speaker goes by: their identity if logged in,
/// otherwise the raw nick.
fn speaker_name(line: &ChatLine, api: &BotApi<'_>) -> String {
    api.directory
        .by_host(&line.host)
        .map(|id| id.user_name.clone())
        .unwrap_or_else(|| line.nick.clone())
}

fn cmd_tell(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let sender = speaker_name(line, api);
    let mut target = trim_trailing(&caps[1], ",.:;!?");
    if ieq(&target, "me") {
        target = sender.clone();
    }

    let mut body = caps[2].trim();
    for lead in ["that ", "to ", "about "] {
        let stripped = body
            .get(..lead.len())
            .filter(|head| head.eq_ignore_ascii_case(lead))
            .map(|_| body[lead.len()..].trim_start());
        if let Some(rest) = stripped.filter(|r| !r.is_empty()) {
            body = rest;
            break;
        }
    }

    let expression = api.reminders.add(&target, body, &sender, api.now_ms, api.parser);
    let shown = if ieq(&target, &sender) { "you" } else { target.as_str() };
    let ack = match expression {
        Some(expr) => format!("OK, I'll remind {shown} {expr}."),
        None => format!("OK, I'll tell {shown} next time I see them."),
    };
    api.reply(line, ack);
}

fn cmd_messages(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let sender = speaker_name(line, api);
    let page: usize = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
        .max(1);

    let mut out: Vec<String> = Vec::new();
    {
        let mine = api.reminders.by_sender(&sender);
        if mine.is_empty() {
            out.push("You don't have any messages waiting.".to_string());
        } else {
            let start = (page - 1) * LIST_PAGE_SIZE;
            if start >= mine.len() {
                out.push("You don't have that many pages of messages.".to_string());
            } else {
                out.push(format!("You have {} message(s) waiting:", mine.len()));
                for (n, (_, r)) in mine.iter().enumerate().skip(start).take(LIST_PAGE_SIZE) {
                    out.push(format!(
                        "{}. {} [{} ago]: {}",
                        n + 1,
                        r.target,
                        format_age_ms(r.time_sent_ms, api.now_ms),
                        r.body
                    ));
                }
                let shown_to = (start + LIST_PAGE_SIZE).min(mine.len());
                if shown_to < mine.len() {
                    out.push(format!("Say 'messages {}' for more.", page + 1));
                }
            }
        }
    }
    for text in out {
        api.reply(line, text);
    }
}

fn cmd_kill(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let sender = speaker_name(line, api);
    let index: i64 = caps[1].parse().unwrap_or(-1);
    match api.reminders.resolve_index(&sender, index) {
        Ok(position) => {
            let removed = api.reminders.remove(position);
            api.reply(
                line,
                format!("OK, I won't tell {}: {}", removed.target, removed.body),
            );
        }
        Err(e) => api.reply(line, e.to_string()),
    }
}

fn cmd_login(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let result = api.directory.login(&caps[1], &caps[2], &line.host);
    match result {
        Ok(name) => api.reply(line, format!("You're logged in as {name}.")),
        Err(e) => api.reply(line, e.to_string()),
    }
}

fn cmd_login_in_public(_: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    api.reply(line, "Let's do that in private.");
}

fn cmd_logout(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let result = match caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) {
        Some(slot) => api
            .directory
            .logout_slot(&line.host, slot)
            .map(|host| format!("Logged out {host}.")),
        None => api
            .directory
            .logout_host(&line.host)
            .map(|name| format!("You're logged out, {name}.")),
    };
    match result {
        Ok(msg) => api.reply(line, msg),
        Err(e) => api.reply(line, e.to_string()),
    }
}

fn cmd_listhosts(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let name = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| speaker_name(line, api));

    let text = match api.directory.by_name(&name) {
        Some(id) if id.hosts.is_empty() => format!("{} has no hosts logged in.", id.user_name),
        Some(id) => {
            let slots: Vec<String> = id
                .hosts
                .iter()
                .enumerate()
                .map(|(i, h)| format!("{}. {}", i + 1, h))
                .collect();
            format!("{}'s hosts: {}", id.user_name, slots.join("  "))
        }
        None => "I don't know anyone by that name.".to_string(),
    };
    api.reply(line, text);
}

fn cmd_seen(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let name = &caps[1];
    let known = api
        .directory
        .by_name(name)
        .or_else(|| api.directory.by_nick(name, api.rosters))
        .map(|id| (id.user_name.clone(), id.away.clone(), id.leave_time_ms, id.last_talked_ms));

    let text = match known {
        Some((user, Some(away), leave_ms, _)) => format!(
            "{} is away: {} [{} ago]",
            user,
            away,
            format_age_ms(leave_ms, api.now_ms)
        ),
        Some((user, None, _, talked_ms)) if talked_ms > 0 => format!(
            "{} last talked {} ago.",
            user,
            format_age_ms(talked_ms, api.now_ms)
        ),
        Some((user, None, _, _)) => format!("I haven't seen {user} talk yet."),
        None => {
            if api.rosters.iter().any(|r| r.host_of(name).is_some()) {
                format!("{name} is around, but I don't know them.")
            } else {
                format!("I haven't seen {name}.")
            }
        }
    };
    api.reply(line, text);
}

fn cmd_whois(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let name = &caps[1];
    let text = match api.directory.by_name(name) {
        Some(id) => match &id.description {
            Some(desc) => format!("{} is {}", id.user_name, desc),
            None => format!("{} is around here somewhere.", id.user_name),
        },
        None => "No idea.".to_string(),
    };
    api.reply(line, text);
}

fn cmd_ping(_: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    api.reply(line, "pong");
}

// ─────────────────────────────────────────────
// Observations
// ─────────────────────────────────────────────

fn obs_back(_: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    if let Some((name, away_for)) = api.directory.set_back(&line.host, api.now_ms) {
        api.reply(
            line,
            format!(
                "Welcome back, {}. You were gone {}.",
                name,
                format_duration_ms(away_for)
            ),
        );
    }
}

fn obs_away(caps: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    let message = trim_trailing(caps[1].trim(), ".!");
    if let Some(name) = api.directory.set_away(&line.host, &message, api.now_ms) {
        api.reply(line, format!("OK {name}, I'll say you're {message}."));
    }
}

fn obs_hello(_: &Captures<'_>, line: &ChatLine, api: &mut BotApi<'_>) {
    // Unprompted pleasantries count as chatter, so they respect the gate.
    if api.chatter.try_claim(api.now_ms) {
        api.reply(line, format!("Hello, {}!", line.nick));
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
