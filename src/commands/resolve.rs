use anyhow::Result;
use evsync_core::config::SyncConfig;
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn run(config: &SyncConfig, key: &str) -> Result<()> {
    let store = config.store()?;

    match store.mark_resolved(key)? {
        Some(event) => {
            println!("{}", event.render());
            println!("{} {}", "Resolved".green(), key);
        }
        None => println!("{}", format!("{key} was already resolved").dimmed()),
    }

    Ok(())
}
