use anyhow::Result;
use evsync_core::SyncError;
use evsync_core::config::SyncConfig;
use evsync_core::forward::forward;
use owo_colors::OwoColorize;

use super::sync::finish;
use crate::render::Render;
use crate::utils::tui;

pub async fn run(config: &SyncConfig, submit: bool, verbose: bool) -> Result<()> {
    let store = config.store()?;

    let (key, event) = match store.recall() {
        Ok(recalled) => recalled,
        Err(SyncError::EmptyStore) => {
            println!("{}", "Every stored event has been forwarded".dimmed());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if !submit {
        println!("{}", event.render());
        return Ok(());
    }

    let calendar = config.calendar_client()?;
    let report = forward(&store, &calendar, &[(key, event)], tui::confirm_submit).await;
    finish(report, verbose)
}
