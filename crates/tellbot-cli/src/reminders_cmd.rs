//! `tellbot reminders` — list pending reminders from the state file.

use anyhow::{Context, Result};
use colored::Colorize;

use tellbot_core::config::load_config;
use tellbot_core::store::StateStore;
use tellbot_core::types::now_ms;
use tellbot_core::utils::{expand_home, format_age_ms, format_duration_ms};

/// Run the reminders command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let store = match &config.bot.state_file {
        Some(path) => StateStore::new(expand_home(path)),
        None => StateStore::new(StateStore::default_path()),
    };
    let state = store.load().context("failed to read state file")?;
    let now = now_ms();

    println!();
    if state.reminders.is_empty() {
        println!("  {}", "No reminders pending.".dimmed());
        println!();
        return Ok(());
    }

    println!("{}", format!("  {} reminder(s) pending", state.reminders.len()).bold());
    println!();
    for (i, r) in state.reminders.iter().enumerate() {
        let when = if r.time_to_arrive_ms == 0 {
            "on sight".dimmed().to_string()
        } else if r.time_to_arrive_ms <= now {
            "overdue".yellow().to_string()
        } else {
            format!("in {}", format_duration_ms(r.time_to_arrive_ms - now))
                .dimmed()
                .to_string()
        };
        println!(
            "  {}. {} → {} [{} ago, {}]",
            i + 1,
            r.sender.bold(),
            r.target.bold(),
            format_age_ms(r.time_sent_ms, now),
            when
        );
        println!("     {}", r.body);
    }
    println!();
    Ok(())
}
