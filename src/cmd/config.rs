//! Show the resolved configuration — `buildwatch check-config`.

use anyhow::Result;

use buildwatch::config::WatchConfig;

pub fn cmd_check_config(config: &WatchConfig) -> Result<()> {
    println!("Buildwatch Configuration");
    println!("========================");
    for (key, value) in config.redacted() {
        println!("  {:<16} {}", key, value);
    }
    println!();
    println!("Configuration is valid.");
    Ok(())
}
