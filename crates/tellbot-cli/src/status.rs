//! `tellbot status` — show configuration and state at a glance.

use anyhow::Result;
use colored::Colorize;

use tellbot_core::config::{get_config_path, load_config};
use tellbot_core::store::StateStore;
use tellbot_core::utils::expand_home;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "Tellbot Status".cyan().bold());
    println!();

    let config_exists = config_path.exists();
    println!(
        "  {:<14} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_exists {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    let state_path = match &config.bot.state_file {
        Some(path) => expand_home(path),
        None => StateStore::default_path(),
    };
    println!(
        "  {:<14} {} {}",
        "State:".bold(),
        state_path.display(),
        if state_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    println!("  {:<14} {}", "Nick:".bold(), config.bot.nick);
    println!(
        "  {:<14} {}",
        "Users:".bold(),
        format!("{} configured", config.users.len()).dimmed()
    );

    println!();
    println!("  {}", "Networks:".bold());
    if config.networks.is_empty() {
        println!("    {}", "· none configured".dimmed());
    }
    for net in &config.networks {
        let channels: Vec<&str> = net.channels.iter().map(|c| c.name.as_str()).collect();
        println!(
            "    {:<24} {}",
            format!("{}:{}", net.host, net.port),
            channels.join(" ").dimmed()
        );
    }

    println!();
    Ok(())
}
