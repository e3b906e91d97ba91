use anyhow::Result;
use evsync_core::config::SyncConfig;

use crate::render;

pub fn run(config: &SyncConfig, pending_only: bool) -> Result<()> {
    let store = config.store()?;

    let output = if pending_only {
        let pending = store.pending()?;
        render::render_json(
            pending.iter().map(|(key, event)| (key, Some(event))),
            store.codec(),
        )
    } else {
        render::render_store(&store.load()?, store.codec())
    };

    println!("{output}");
    Ok(())
}
