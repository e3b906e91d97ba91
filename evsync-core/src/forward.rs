//! Forwarding stored records to the calendar.
//!
//! Records are submitted one at a time. A record is marked resolved only
//! after the calendar accepted it, so a crash in between leaves it pending
//! (and visible to `recall`) rather than lost. The first failure stops the
//! batch; whatever was forwarded before it stays resolved.

use tracing::{info, warn};

use crate::error::{SyncError, SyncResult};
use crate::remote::CalendarApi;
use crate::store::RecordStore;
use crate::value::Record;

/// What to do with one record in manual mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Submit,
    Skip,
}

#[derive(Debug, Default)]
pub struct ForwardReport {
    /// Keys accepted by the calendar and marked resolved.
    pub forwarded: Vec<String>,
    /// Keys the confirmation step declined; still pending.
    pub skipped: Vec<String>,
    /// Key that stopped the batch, with the reason.
    pub halted: Option<(String, SyncError)>,
}

impl ForwardReport {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Submit `records` in order, asking `confirm` before each one.
pub async fn forward<C, F>(
    store: &RecordStore,
    calendar: &C,
    records: &[(String, Record)],
    mut confirm: F,
) -> ForwardReport
where
    C: CalendarApi,
    F: FnMut(&str, &Record) -> SyncResult<Decision>,
{
    let mut report = ForwardReport::default();

    for (key, record) in records {
        if let Err(e) = forward_one(store, calendar, key, record, &mut confirm, &mut report).await {
            warn!(key = %key, error = %e, "halting batch");
            report.halted = Some((key.clone(), e));
            break;
        }
    }

    info!(
        forwarded = report.forwarded.len(),
        skipped = report.skipped.len(),
        halted = report.halted.is_some(),
        "forwarding finished"
    );

    report
}

async fn forward_one<C, F>(
    store: &RecordStore,
    calendar: &C,
    key: &str,
    record: &Record,
    confirm: &mut F,
    report: &mut ForwardReport,
) -> SyncResult<()>
where
    C: CalendarApi,
    F: FnMut(&str, &Record) -> SyncResult<Decision>,
{
    if confirm(key, record)? == Decision::Skip {
        report.skipped.push(key.to_string());
        return Ok(());
    }

    calendar.submit(record).await?;
    store.mark_resolved(key)?;
    report.forwarded.push(key.to_string());
    Ok(())
}

/// Confirmation for unattended runs.
pub fn submit_all(_key: &str, _record: &Record) -> SyncResult<Decision> {
    Ok(Decision::Submit)
}
