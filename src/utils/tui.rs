use dialoguer::Confirm;
use evsync_core::forward::Decision;
use evsync_core::{Record, SyncError, SyncResult};
use indicatif::{ProgressBar, ProgressStyle};

use crate::render::Render;

pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["-", "\\", "|", "/"])
            .template("{msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Answer used when the prompt is confirmed with Enter alone.
const SUBMIT_BY_DEFAULT: bool = false;

/// Show an event and ask whether to send it.
pub fn confirm_submit(key: &str, event: &Record) -> SyncResult<Decision> {
    println!();
    println!("{}", event.render());

    let answer = Confirm::new()
        .with_prompt(format!("Send {key} to the calendar?"))
        .default(SUBMIT_BY_DEFAULT)
        .interact()
        .map_err(|e| SyncError::Aborted(e.to_string()))?;

    Ok(decision(answer))
}

fn decision(answer: bool) -> Decision {
    if answer {
        Decision::Submit
    } else {
        Decision::Skip
    }
}
