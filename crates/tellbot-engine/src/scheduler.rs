//! The tick loop.
//!
//! The `Scheduler` owns every piece of mutable state — connections,
//! directory, reminder store — on one logical thread; awaits are the only
//! suspension points, so no tick ever observes another tick half-done.
//!
//! Each tick: poll every connection (nick check included), route the
//! observed lines through the utterance handler, sweep the reminder store,
//! run the announcement check at its coarser cadence, then idle.
//! The loop ends when no connection is left Connected.

use std::time::Duration;

use tellbot_core::config::{Config, NetworkConfig};
use tellbot_core::store::{BotState, StateStore};
use tellbot_core::types::{now_ms, ChannelKey};
use tellbot_core::utils::ieq;
use tellbot_core::BotError;
use tellbot_net::{Connection, Roster, SendKind, Transport, TransportEvent};
use tracing::{debug, info, warn};

use crate::directory::IdentityDirectory;
use crate::handler::{BotApi, ChatLine, Outgoing, UtteranceHandler};
use crate::parse::DurationParser;
use crate::reminders::ReminderStore;

// ─────────────────────────────────────────────
// Chatter gate
// ─────────────────────────────────────────────

/// Token bucket of size one for spontaneous chatter.
///
/// Greetings, hellos, and announcements claim it; reminder deliveries and
/// direct replies are exempt and never touch it.
#[derive(Debug)]
pub struct ChatterGate {
    window_ms: i64,
    next_allowed_ms: i64,
}

impl ChatterGate {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            next_allowed_ms: 0,
        }
    }

    /// Take the token if it is available. Refills `window_ms` after a
    /// successful claim.
    pub fn try_claim(&mut self, now_ms: i64) -> bool {
        if now_ms < self.next_allowed_ms {
            return false;
        }
        self.next_allowed_ms = now_ms + self.window_ms;
        true
    }
}

/// Source of periodic spontaneous output, consulted at the announcement
/// cadence. Everything it produces still goes through the chatter gate.
pub trait Announcer: Send + Sync {
    fn poll(&mut self, now_ms: i64) -> Vec<Outgoing>;
}

// ─────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────

pub struct Scheduler {
    connections: Vec<Connection>,
    networks: Vec<NetworkConfig>,
    directory: IdentityDirectory,
    reminders: ReminderStore,
    store: StateStore,
    parser: Box<dyn DurationParser>,
    handler: Box<dyn UtteranceHandler>,
    announcer: Option<Box<dyn Announcer>>,
    chatter: ChatterGate,
    greet: bool,
    tick_ms: u64,
    announce_window_ms: i64,
    next_announce_ms: i64,
}

impl Scheduler {
    /// Build a scheduler from configuration, one transport per configured
    /// network (paired in order). Loads persisted state from `store`.
    pub fn new(
        config: &Config,
        store: StateStore,
        transports: Vec<Box<dyn Transport>>,
        parser: Box<dyn DurationParser>,
        handler: Box<dyn UtteranceHandler>,
    ) -> Result<Self, BotError> {
        let state = store.load()?;
        let mut directory = IdentityDirectory::from_config(&config.users);
        directory.apply_persisted(state.identities);
        let reminders = ReminderStore::from_persisted(state.reminders);

        let connections = config
            .networks
            .iter()
            .zip(transports)
            .enumerate()
            .map(|(index, (net, transport))| {
                let nick = net.nick.clone().unwrap_or_else(|| config.bot.nick.clone());
                let channels = net.channels.iter().map(|c| c.name.clone()).collect();
                Connection::new(index, net.host.clone(), net.port, nick, channels, transport)
            })
            .collect();

        Ok(Self {
            connections,
            networks: config.networks.clone(),
            directory,
            reminders,
            store,
            parser,
            handler,
            announcer: None,
            chatter: ChatterGate::new(config.bot.chatter_window_ms),
            greet: config.bot.greet,
            tick_ms: config.bot.tick_ms,
            announce_window_ms: config.bot.announce_window_ms,
            next_announce_ms: 0,
        })
    }

    pub fn set_announcer(&mut self, announcer: Box<dyn Announcer>) {
        self.announcer = Some(announcer);
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn directory(&self) -> &IdentityDirectory {
        &self.directory
    }

    pub fn reminders(&self) -> &ReminderStore {
        &self.reminders
    }

    pub fn any_connected(&self) -> bool {
        self.connections.iter().any(Connection::is_connected)
    }

    /// Bring every configured connection up. Per-connection failures are
    /// already logged; a bot with zero live connections simply won't loop.
    pub async fn connect_all(&mut self) {
        for conn in &mut self.connections {
            conn.connect().await;
        }
    }

    /// Connect everything and tick until no connection is left alive.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.connect_all().await;
        info!(
            connected = self.connections.iter().filter(|c| c.is_connected()).count(),
            "Scheduler running"
        );
        while self.any_connected() {
            self.tick(now_ms()).await;
            tokio::time::sleep(Duration::from_millis(self.tick_ms)).await;
        }
        info!("No connections left, scheduler stopping");
        Ok(())
    }

    /// One full tick at the given instant. Public so tests can drive the
    /// scheduler without a clock.
    pub async fn tick(&mut self, now_ms: i64) {
        let mut batches: Vec<(usize, Vec<TransportEvent>)> = Vec::new();
        for conn in &mut self.connections {
            let index = conn.index;
            let events = conn.tick_poll(now_ms).await;
            if !events.is_empty() {
                batches.push((index, events));
            }
        }

        let mut outgoing: Vec<Outgoing> = Vec::new();
        for (index, events) in batches {
            for event in events {
                self.handle_event(index, &event, now_ms, &mut outgoing).await;
            }
        }
        for out in outgoing {
            self.dispatch(out).await;
        }

        self.sweep(now_ms).await;
        self.check_announcements(now_ms).await;
    }

    // ─────────────────────────────────────────────
    // Event handling
    // ─────────────────────────────────────────────

    async fn handle_event(
        &mut self,
        index: usize,
        event: &TransportEvent,
        now_ms: i64,
        out: &mut Vec<Outgoing>,
    ) {
        match event {
            TransportEvent::Join { nick, channel, .. }
                if ieq(nick, self.connections[index].live_nick()) =>
            {
                if let Some(greeting) = self.greeting_for(index, channel) {
                    if self.greet && self.chatter.try_claim(now_ms) {
                        out.push(Outgoing {
                            connection: index,
                            target: channel.clone(),
                            text: greeting,
                            kind: SendKind::Message,
                        });
                    }
                }
            }
            TransportEvent::Message { nick, host, channel, text }
            | TransportEvent::Action { nick, host, channel, text } => {
                if ieq(nick, self.connections[index].live_nick()) {
                    return;
                }
                let key = channel.as_ref().map(|c| ChannelKey::new(index, c.clone()));
                self.directory.touch(host, key, now_ms);

                let line = ChatLine {
                    connection: index,
                    channel: channel.clone(),
                    nick: nick.clone(),
                    host: host.clone(),
                    text: text.clone(),
                    action: matches!(event, TransportEvent::Action { .. }),
                    bot_nick: self.connections[index].live_nick().to_string(),
                };

                let rosters: Vec<&Roster> =
                    self.connections.iter().map(|c| &c.roster).collect();
                let mut api = BotApi::new(
                    &mut self.directory,
                    &mut self.reminders,
                    &*self.parser,
                    &rosters,
                    &mut self.chatter,
                    now_ms,
                );
                if let Err(e) = self.handler.on_line(&line, &mut api).await {
                    warn!(nick = %line.nick, "Handler error: {:#}", e);
                }
                out.extend(api.take_replies());
            }
            _ => {}
        }
    }

    fn greeting_for(&self, index: usize, channel: &str) -> Option<String> {
        self.networks
            .get(index)?
            .channels
            .iter()
            .find(|c| ieq(&c.name, channel))
            .and_then(|c| c.effective_greeting())
            .map(String::from)
    }

    async fn dispatch(&mut self, out: Outgoing) {
        if let Some(conn) = self.connections.get_mut(out.connection) {
            conn.send(&out.target, &out.text, out.kind).await;
        }
    }

    // ─────────────────────────────────────────────
    // Reminder sweep
    // ─────────────────────────────────────────────

    /// Deliver every reminder that is both due and routable. Unroutable
    /// reminders stay pending without a word; the next sweep tries again.
    async fn sweep(&mut self, now_ms: i64) {
        if !self.reminders.maybe_due(now_ms) {
            return;
        }
        let mut delivered_any = false;
        let mut pos = 0;
        while pos < self.reminders.pending().len() {
            if !self.reminders.pending()[pos].is_due(now_ms) {
                pos += 1;
                continue;
            }
            let target = self.reminders.pending()[pos].target.clone();
            let (stale_home_of, destination) = self.resolve_destination(&target);

            if let Some(owner) = stale_home_of {
                debug!(user = %owner, "Clearing stale home channel");
                if let Some(id) = self.directory.by_name_mut(&owner) {
                    id.home = None;
                }
            }

            match destination {
                Some((conn_index, channel)) => {
                    let reminder = self.reminders.take_delivered(pos, now_ms);
                    let text = ReminderStore::format_delivery(&reminder, now_ms);
                    info!(target = %reminder.target, channel = %channel, "Delivering reminder");
                    self.connections[conn_index]
                        .send(&channel, &text, SendKind::Message)
                        .await;
                    delivered_any = true;
                    // The pending set shifted down; re-examine this slot.
                }
                None => {
                    pos += 1;
                }
            }
        }
        if delivered_any {
            self.save_state();
        }
    }

    /// Where a reminder for `target` should be said, if anywhere right now.
    ///
    /// Resolution order: the target identity's home channel (searched
    /// across every connection), then its last-channel weak reference if
    /// still live, then a scan of all channels in connection/join order
    /// for a present member matching the identity or the raw target name.
    ///
    /// Also reports an identity whose home channel turned out stale, so
    /// the caller can clear it before falling through.
    fn resolve_destination(&self, target: &str) -> (Option<String>, Option<(usize, String)>) {
        let identity = self.directory.by_name(target);
        let mut stale_home_of = None;

        if let Some(id) = identity {
            if let Some(home) = &id.home {
                let live = self
                    .connections
                    .iter()
                    .position(|c| c.is_connected() && c.roster.channel(home).is_some());
                match live {
                    Some(conn_index) => return (None, Some((conn_index, home.clone()))),
                    None => stale_home_of = Some(id.user_name.clone()),
                }
            }
            if let Some(key) = &id.last_channel {
                let live = self
                    .connections
                    .get(key.connection)
                    .is_some_and(|c| c.is_connected() && c.roster.channel(&key.channel).is_some());
                if live {
                    return (stale_home_of, Some((key.connection, key.channel.clone())));
                }
            }
        }

        for (conn_index, conn) in self.connections.iter().enumerate() {
            if !conn.is_connected() {
                continue;
            }
            for channel in conn.roster.channels() {
                let present = channel.users().iter().any(|u| {
                    if ieq(&u.nick, target) {
                        return true;
                    }
                    match (identity, self.directory.by_host(&u.host)) {
                        (Some(id), Some(other)) => ieq(&id.user_name, &other.user_name),
                        _ => false,
                    }
                });
                if present {
                    return (stale_home_of, Some((conn_index, channel.name.clone())));
                }
            }
        }
        (stale_home_of, None)
    }

    // ─────────────────────────────────────────────
    // Announcements, broadcast, shutdown
    // ─────────────────────────────────────────────

    async fn check_announcements(&mut self, now_ms: i64) {
        if now_ms < self.next_announce_ms {
            return;
        }
        self.next_announce_ms = now_ms + self.announce_window_ms;
        let Some(announcer) = self.announcer.as_mut() else {
            return;
        };
        let outs = announcer.poll(now_ms);
        for out in outs {
            if self.chatter.try_claim(now_ms) {
                self.dispatch(out).await;
            }
        }
    }

    /// Say something in every channel on every live connection.
    pub async fn broadcast(&mut self, text: &str, kind: SendKind) {
        for index in 0..self.connections.len() {
            if !self.connections[index].is_connected() {
                continue;
            }
            let channels: Vec<String> = self.connections[index]
                .roster
                .channels()
                .iter()
                .map(|c| c.name.clone())
                .collect();
            for channel in channels {
                self.connections[index].send(&channel, text, kind).await;
            }
        }
    }

    /// Graceful shutdown: a goodbye everywhere, disconnect everything,
    /// persist. Called between ticks, never during one.
    pub async fn shutdown(&mut self, reason: &str) {
        info!("Shutting down: {}", reason);
        self.broadcast(reason, SendKind::Notice).await;
        for conn in &mut self.connections {
            conn.disconnect(reason).await;
        }
        self.save_state();
    }

    fn save_state(&self) {
        let state = BotState {
            identities: self.directory.identities().to_vec(),
            reminders: self.reminders.pending().to_vec(),
            ..Default::default()
        };
        if let Err(e) = self.store.save(&state) {
            warn!("Failed to persist state: {:#}", e);
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::BuiltinCommands;
    use crate::parse::RegexDurationParser;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tellbot_core::config::{BotConfig, ChannelConfig, UserConfig};
    use tellbot_net::ConnectError;
    use tempfile::TempDir;

    /// Shared handles into a [`TestTransport`], for injecting events and
    /// inspecting sends across ticks.
    #[derive(Clone, Default)]
    struct NetHandle {
        inbox: Arc<Mutex<VecDeque<Vec<TransportEvent>>>>,
        sent: Arc<Mutex<Vec<(String, String)>>>,
        refuse_connects: Arc<Mutex<bool>>,
    }

    impl NetHandle {
        fn push(&self, events: Vec<TransportEvent>) {
            self.inbox.lock().unwrap().push_back(events);
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn sent_texts(&self) -> Vec<String> {
            self.sent().into_iter().map(|(_, t)| t).collect()
        }

        fn clear_sent(&self) {
            self.sent.lock().unwrap().clear();
        }
    }

    struct TestTransport {
        handle: NetHandle,
        nick: String,
    }

    #[async_trait]
    impl Transport for TestTransport {
        async fn connect(
            &mut self,
            host: &str,
            _port: u16,
            nick: &str,
            _channels: &[String],
        ) -> Result<(), ConnectError> {
            if *self.handle.refuse_connects.lock().unwrap() {
                return Err(ConnectError::Retryable(format!("{host} refused")));
            }
            self.nick = nick.to_string();
            Ok(())
        }

        async fn poll(&mut self) -> anyhow::Result<Vec<TransportEvent>> {
            Ok(self.handle.inbox.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn send(&mut self, target: &str, text: &str, _kind: SendKind) -> anyhow::Result<()> {
            self.handle
                .sent
                .lock()
                .unwrap()
                .push((target.to_string(), text.to_string()));
            Ok(())
        }

        async fn change_nick(&mut self, nick: &str) -> anyhow::Result<()> {
            self.nick = nick.to_string();
            Ok(())
        }

        async fn disconnect(&mut self, _reason: &str) -> anyhow::Result<()> {
            Ok(())
        }

        fn live_nick(&self) -> &str {
            &self.nick
        }
    }

    fn test_config() -> Config {
        Config {
            bot: BotConfig::default(),
            networks: vec![NetworkConfig {
                host: "chat.example.net".into(),
                port: 6667,
                nick: None,
                channels: vec![
                    ChannelConfig {
                        name: "#lounge".into(),
                        greeting: "hello everyone".into(),
                    },
                    ChannelConfig::new("#dev"),
                ],
            }],
            users: vec![
                UserConfig {
                    name: "Alice".into(),
                    password: "secret".into(),
                    admin: false,
                    description: None,
                },
                UserConfig {
                    name: "Bob".into(),
                    password: "hunter2".into(),
                    admin: false,
                    description: None,
                },
            ],
        }
    }

    struct TestBot {
        scheduler: Scheduler,
        net: NetHandle,
        _dir: TempDir,
        store_path: std::path::PathBuf,
    }

    async fn bot() -> TestBot {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("state.json");
        let net = NetHandle::default();
        let transport = TestTransport {
            handle: net.clone(),
            nick: String::new(),
        };
        let mut scheduler = Scheduler::new(
            &test_config(),
            StateStore::new(&store_path),
            vec![Box::new(transport)],
            Box::new(RegexDurationParser::new()),
            Box::new(BuiltinCommands::new("tellbot")),
        )
        .unwrap();
        scheduler.connect_all().await;
        TestBot {
            scheduler,
            net,
            _dir: dir,
            store_path,
        }
    }

    fn msg(nick: &str, host: &str, channel: &str, text: &str) -> TransportEvent {
        TransportEvent::Message {
            nick: nick.into(),
            host: host.into(),
            channel: Some(channel.into()),
            text: text.into(),
        }
    }

    fn join(nick: &str, host: &str, channel: &str) -> TransportEvent {
        TransportEvent::Join {
            nick: nick.into(),
            host: host.into(),
            channel: channel.into(),
        }
    }

    #[tokio::test]
    async fn test_tell_bob_end_to_end() {
        let mut b = bot().await;
        let t0 = 1_000_000;

        b.net.push(vec![
            join("Alice", "alice@host", "#lounge"),
            msg("Alice", "alice@host", "#lounge", "tellbot: tell Bob the build is done"),
        ]);
        b.scheduler.tick(t0).await;
        assert_eq!(
            b.net.sent(),
            vec![(
                "#lounge".to_string(),
                "OK, I'll tell Bob next time I see them.".to_string()
            )]
        );
        assert_eq!(b.scheduler.reminders().pending().len(), 1);
        b.net.clear_sent();

        // Bob is nowhere yet: sweeps stay silent.
        b.scheduler.tick(t0 + 1_000).await;
        assert!(b.net.sent().is_empty());
        assert_eq!(b.scheduler.reminders().pending().len(), 1);

        // Ten minutes later Bob shows up; the next sweep delivers.
        b.net.push(vec![join("Bob", "bob@host", "#dev")]);
        b.scheduler.tick(t0 + 600_000).await;
        assert_eq!(
            b.net.sent(),
            vec![(
                "#dev".to_string(),
                "Bob, message from Alice [10 minutes ago]: the build is done".to_string()
            )]
        );
        assert!(b.scheduler.reminders().pending().is_empty());
        b.net.clear_sent();

        // Never delivered twice.
        b.scheduler.tick(t0 + 601_000).await;
        assert!(b.net.sent().is_empty());
    }

    #[tokio::test]
    async fn test_timed_reminder_waits_for_due_time() {
        let mut b = bot().await;
        let t0 = 1_000_000;

        b.net.push(vec![
            join("Alice", "alice@host", "#lounge"),
            msg("Alice", "alice@host", "#lounge", "tellbot: remind me to stretch in 10 minutes"),
        ]);
        b.scheduler.tick(t0).await;
        b.net.clear_sent();

        // Alice is right there, but the reminder isn't due yet.
        b.scheduler.tick(t0 + 599_000).await;
        assert!(b.net.sent().is_empty());

        b.scheduler.tick(t0 + 600_000).await;
        let texts = b.net.sent_texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("message from yourself"));
        assert!(texts[0].ends_with(": stretch"));
        assert!(b.scheduler.reminders().pending().is_empty());
    }

    #[tokio::test]
    async fn test_due_reminder_waits_for_presence() {
        let mut b = bot().await;
        let t0 = 1_000_000;

        b.net.push(vec![msg(
            "Alice",
            "alice@host",
            "#lounge",
            "tellbot: remind Bob in 10 minutes that the build is done",
        )]);
        b.scheduler.tick(t0).await;
        b.net.clear_sent();

        // Due time passes with Bob still absent: nothing happens.
        b.scheduler.tick(t0 + 600_000).await;
        assert!(b.net.sent().is_empty());
        assert_eq!(b.scheduler.reminders().pending().len(), 1);

        // The moment Bob speaks somewhere, the same tick's sweep delivers
        // there, with the time expression stripped from the body.
        b.net.push(vec![msg("Bob", "bob@host", "#dev", "morning all")]);
        b.scheduler.tick(t0 + 600_000).await;
        assert_eq!(
            b.net.sent(),
            vec![(
                "#dev".to_string(),
                "Bob, message from Alice [10 minutes ago]: that the build is done".to_string()
            )]
        );
        assert!(b.scheduler.reminders().pending().is_empty());
    }

    #[tokio::test]
    async fn test_stale_home_self_heals_and_falls_back() {
        let mut b = bot().await;
        let t0 = 1_000_000;

        b.net.push(vec![msg("Alice", "alice@host", "#lounge", "tellbot: tell Bob checkpoint")]);
        b.scheduler.tick(t0).await;
        // Seed the stale home directly; there's no live path to a dead
        // channel name.
        b.scheduler.directory.by_name_mut("Bob").unwrap().home = Some("#gone".into());
        b.net.clear_sent();

        b.net.push(vec![join("Bob", "bob@host", "#lounge")]);
        b.scheduler.tick(t0 + 1_000).await;

        // Delivered by member scan, and the stale home is gone for good.
        let sent = b.net.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "#lounge");
        assert!(sent[0].1.starts_with("Bob, message from Alice"));
        assert!(b.scheduler.directory().by_name("Bob").unwrap().home.is_none());
        assert!(b.scheduler.reminders().pending().is_empty());
    }

    #[tokio::test]
    async fn test_home_channel_is_preferred_destination() {
        let mut b = bot().await;
        let t0 = 1_000_000;

        b.net.push(vec![msg("Alice", "alice@host", "#lounge", "tellbot: tell Bob ship it")]);
        b.scheduler.tick(t0).await;
        b.scheduler.directory.by_name_mut("Bob").unwrap().home = Some("#dev".into());
        b.net.clear_sent();

        // Bob is visible in #lounge, but home wins.
        b.net.push(vec![join("Bob", "bob@host", "#lounge")]);
        b.scheduler.tick(t0 + 1_000).await;
        let sent = b.net.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "#dev");
    }

    #[tokio::test]
    async fn test_last_channel_routes_when_no_home() {
        let mut b = bot().await;
        let t0 = 1_000_000;

        // Alice is logged in, talks in #dev, then leaves entirely.
        b.scheduler
            .directory
            .by_name_mut("Alice")
            .unwrap()
            .hosts
            .push("alice@host".into());
        b.net.push(vec![
            msg("Alice", "alice@host", "#dev", "back later"),
            TransportEvent::Part {
                nick: "Alice".into(),
                channel: "#dev".into(),
            },
        ]);
        b.scheduler.tick(t0).await;

        b.net.push(vec![msg("Bob", "bob@host", "#lounge", "tellbot: tell Alice lunch?")]);
        b.scheduler.tick(t0 + 2_000).await;

        // Alice sits in no channel, but her last channel is live, so the
        // same tick's sweep already delivers there.
        let sent = b.net.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "#lounge");
        assert_eq!(sent[1].0, "#dev");
        assert!(sent[1].1.starts_with("Alice, message from Bob"));
    }

    #[tokio::test]
    async fn test_greeting_on_own_join_is_gated() {
        let mut b = bot().await;

        b.net.push(vec![join("tellbot", "bot@host", "#lounge")]);
        b.scheduler.tick(1_000_000).await;
        assert_eq!(
            b.net.sent(),
            vec![("#lounge".to_string(), "hello everyone".to_string())]
        );
        b.net.clear_sent();

        // Re-join inside the chatter window: the gate holds the greeting.
        b.net.push(vec![join("tellbot", "bot@host", "#lounge")]);
        b.scheduler.tick(1_000_500).await;
        assert!(b.net.sent().is_empty());
    }

    #[tokio::test]
    async fn test_no_greeting_for_unconfigured_channel() {
        let mut b = bot().await;

        // #dev has no greeting configured.
        b.net.push(vec![join("tellbot", "bot@host", "#dev")]);
        b.scheduler.tick(1_000_000).await;
        assert!(b.net.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_persists_state() {
        let mut b = bot().await;
        let t0 = 1_000_000;

        b.net.push(vec![
            msg("Alice", "alice@host", "#lounge", "tellbot: tell Bob done"),
            join("Bob", "bob@host", "#lounge"),
        ]);
        b.scheduler.tick(t0).await;

        let saved = StateStore::new(&b.store_path).load().unwrap();
        assert!(saved.reminders.is_empty());
        assert!(saved.identities.iter().any(|i| i.user_name == "Alice"));
    }

    #[tokio::test]
    async fn test_shutdown_says_goodbye_and_persists() {
        let mut b = bot().await;
        b.net.push(vec![msg("Alice", "alice@host", "#lounge", "tellbot: tell Bob bye")]);
        b.scheduler.tick(1_000_000).await;
        b.net.clear_sent();

        b.scheduler.shutdown("time for bed").await;
        let sent = b.net.sent();
        // Goodbye notice in every channel.
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, t)| t == "time for bed"));
        assert!(!b.scheduler.any_connected());

        let saved = StateStore::new(&b.store_path).load().unwrap();
        assert_eq!(saved.reminders.len(), 1);
        assert_eq!(saved.reminders[0].target, "Bob");
    }

    #[tokio::test]
    async fn test_run_exits_when_nothing_connects() {
        let dir = TempDir::new().unwrap();
        let net = NetHandle::default();
        *net.refuse_connects.lock().unwrap() = true;
        let transport = TestTransport {
            handle: net.clone(),
            nick: String::new(),
        };
        let mut scheduler = Scheduler::new(
            &test_config(),
            StateStore::new(dir.path().join("state.json")),
            vec![Box::new(transport)],
            Box::new(RegexDurationParser::new()),
            Box::new(BuiltinCommands::new("tellbot")),
        )
        .unwrap();

        scheduler.run().await.unwrap();
        assert!(!scheduler.any_connected());
    }

    struct OneLiner {
        said: bool,
    }

    impl Announcer for OneLiner {
        fn poll(&mut self, _now_ms: i64) -> Vec<Outgoing> {
            if self.said {
                return Vec::new();
            }
            self.said = true;
            vec![Outgoing {
                connection: 0,
                target: "#lounge".into(),
                text: "the sun rises".into(),
                kind: SendKind::Message,
            }]
        }
    }

    #[tokio::test]
    async fn test_announcements_run_on_their_own_cadence() {
        let mut b = bot().await;
        b.scheduler.set_announcer(Box::new(OneLiner { said: false }));

        b.scheduler.tick(1_000_000).await;
        assert_eq!(b.net.sent_texts(), vec!["the sun rises"]);
        b.net.clear_sent();

        b.scheduler.tick(1_000_500).await;
        assert!(b.net.sent().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_channel() {
        let mut b = bot().await;
        b.scheduler.broadcast("attention", SendKind::Message).await;
        let mut targets: Vec<String> = b.net.sent().into_iter().map(|(t, _)| t).collect();
        targets.sort();
        assert_eq!(targets, vec!["#dev", "#lounge"]);
    }
}
