//! `tellbot run` — bring up the scheduler against the configured networks.

use anyhow::Result;
use tracing::{info, warn};

use tellbot_core::config::{load_config, Config};
use tellbot_core::store::StateStore;
use tellbot_core::utils::expand_home;
use tellbot_engine::{BuiltinCommands, RegexDurationParser, Scheduler};
use tellbot_net::Transport;

/// Run the bot until every connection is gone or the process is asked to
/// stop.
pub async fn run() -> Result<()> {
    let config = load_config(None);
    if config.networks.is_empty() {
        warn!("No networks configured; nothing to connect to");
        return Ok(());
    }

    let transports = build_transports(&config);
    if transports.is_empty() {
        warn!("No transport backend available for the configured networks");
        return Ok(());
    }

    let store = match &config.bot.state_file {
        Some(path) => StateStore::new(expand_home(path)),
        None => StateStore::new(StateStore::default_path()),
    };

    let mut scheduler = Scheduler::new(
        &config,
        store,
        transports,
        Box::new(RegexDurationParser::new()),
        Box::new(BuiltinCommands::new(&config.bot.nick)),
    )?;

    tokio::select! {
        result = scheduler.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
        }
    }
    scheduler.shutdown("I have to go now.").await;
    Ok(())
}

/// One transport per configured network, paired in order.
///
/// Wire-protocol backends plug in behind [`Transport`]; none ship in this
/// build, so this reports what would be needed and produces nothing.
fn build_transports(config: &Config) -> Vec<Box<dyn Transport>> {
    for net in &config.networks {
        warn!(
            network = %net.host,
            "No transport backend compiled in for {}:{}", net.host, net.port
        );
    }
    Vec::new()
}
