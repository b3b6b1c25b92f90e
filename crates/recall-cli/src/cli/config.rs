//! `recall config`: print the effective configuration.

use anyhow::Result;
use console::style;

use recall_types::config::MemoryConfig;

pub fn show_config(config: &MemoryConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} database: {}",
        style("i").blue().bold(),
        style(config.database_path().display()).cyan()
    );
    println!();
    for line in toml::to_string_pretty(config)?.lines() {
        println!("  {line}");
    }
    println!();
    Ok(())
}
