use anyhow::Result;
use evsync_core::config::SyncConfig;
use evsync_core::forward::{ForwardReport, forward, submit_all};
use evsync_core::remote::{SourceApi, SourceFilter};
use evsync_core::shape::{KEY_FIELD, shape_event, start_of};
use evsync_core::{Record, RecordStore, SyncError, SyncResult};
use owo_colors::OwoColorize;
use tracing::warn;

use crate::Mode;
use crate::render::{self, Render};
use crate::utils::tui;

pub async fn run(
    config: &SyncConfig,
    filter: Option<&str>,
    mode: Mode,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let store = config.store()?;
    let options = config.shape_options()?;
    let source = config.source_client()?;
    let filter = filter.map(SourceFilter::parse_lenient);

    let spinner = tui::create_spinner("Fetching events".to_string());
    let fetched = source.fetch(filter.as_ref()).await;
    spinner.finish_and_clear();
    let fetched = fetched?;

    let mut events = Vec::with_capacity(fetched.len());
    for raw in &fetched {
        match shape_event(raw, &options) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!(error = %e, "skipping event");
                println!("   {}", render::render_error(&e, verbose));
            }
        }
    }

    let (added, batch) = stage(&store, &events)?;

    println!(
        "Fetched {} {}, {} new, {} to forward",
        fetched.len(),
        render::pluralize("event", fetched.len()),
        added,
        batch.len()
    );

    if batch.is_empty() {
        println!("{}", "Nothing to forward".dimmed());
        return Ok(());
    }

    if dry_run {
        for (_, event) in &batch {
            println!("{}", event.render());
        }
        println!(
            "{}",
            "Dry run: nothing was sent".dimmed()
        );
        return Ok(());
    }

    let calendar = config.calendar_client()?;
    let report = match mode {
        Mode::Auto => forward(&store, &calendar, &batch, submit_all).await,
        Mode::Manual => forward(&store, &calendar, &batch, tui::confirm_submit).await,
    };

    finish(report, verbose)
}

/// Intern `events` and return how many were new, along with every record
/// still pending (new or left over from earlier runs) in start order.
fn stage(store: &RecordStore, events: &[Record]) -> SyncResult<(usize, Vec<(String, Record)>)> {
    let added = store.intern_new(events, KEY_FIELD)?.added.len();

    let mut batch = store.pending()?;
    batch.sort_by_key(|(_, event)| start_of(event));

    Ok((added, batch))
}

/// Print the outcome of a forwarding run; a halted run is an error.
pub fn finish(report: ForwardReport, verbose: bool) -> Result<()> {
    for key in &report.forwarded {
        println!("{} {}", "+".green(), key);
    }
    for key in &report.skipped {
        println!("{} {}", "-".dimmed(), key.dimmed());
    }

    let forwarded = report.forwarded.len();

    match report.halted {
        None => {
            println!(
                "\nForwarded {} {}",
                forwarded,
                render::pluralize("event", forwarded)
            );
            Ok(())
        }
        Some((key, error)) => {
            println!("{} {}", "!".red(), key);
            println!("   {}", render::render_error(&error, verbose));
            if let SyncError::Aborted(_) = error {
                println!("{}", "Stopped by user".dimmed());
            }
            anyhow::bail!(
                "Exiting due to failure. Successfully added {} {} before failure occurred.",
                forwarded,
                render::pluralize("event", forwarded)
            )
        }
    }
}
