//! Staleness checks for expensive build actions.
//!
//! A stamp ties an action to the exact content of its inputs: the input paths
//! and strings are fingerprinted, compared against the digest recorded by the
//! last run, and the action only runs when they differ.
mod fingerprint;
mod record;

pub use fingerprint::{compute_fingerprint, Fingerprint, Fingerprinter};
pub use record::{has_stamp_suffix, Record, STAMP_SUFFIX};

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Why a check decided to run (or skip) its action.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    Forced,
    NoRecord,
    Changed,
    UpToDate,
}

impl StaleReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forced => "forced",
            Self::NoRecord => "no_record",
            Self::Changed => "changed",
            Self::UpToDate => "up_to_date",
        }
    }
}

/// Outcome of a single `run_if_stale` call.
#[derive(Serialize, Debug, Clone)]
pub struct StampOutcome {
    pub ran: bool,
    pub reason: StaleReason,
    pub fingerprint: Fingerprint,
}

/// Comparison of freshly computed inputs against a stamp record.
///
/// Holding both digests lets callers inspect the decision before acting on it.
pub struct StampCheck {
    record: Record,
    old: Option<Fingerprint>,
    new: Fingerprint,
}

impl StampCheck {
    pub fn new(record: Record, input_paths: &[PathBuf], input_strings: &[String]) -> Result<Self> {
        let new = compute_fingerprint(input_paths, input_strings)?;
        let old = record.read()?;
        Ok(Self { record, old, new })
    }

    pub fn reason(&self, force: bool) -> StaleReason {
        if force {
            return StaleReason::Forced;
        }
        match &self.old {
            None => StaleReason::NoRecord,
            Some(old) if *old != self.new => StaleReason::Changed,
            Some(_) => StaleReason::UpToDate,
        }
    }

    pub fn is_stale(&self, force: bool) -> bool {
        self.reason(force) != StaleReason::UpToDate
    }

    pub fn old_fingerprint(&self) -> Option<&Fingerprint> {
        self.old.as_ref()
    }

    pub fn new_fingerprint(&self) -> &Fingerprint {
        &self.new
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Persist the new fingerprint, overwriting any previous record.
    pub fn write(&self) -> Result<()> {
        self.record.write(&self.new)
    }
}

/// Run `action` when the inputs changed since the last recorded run.
///
/// Paths are fingerprinted in sorted order and strings in the given order.
/// The record is only written after `action` succeeds, so a failed action is
/// retried on the next call. Panics if `record_path` lacks [`STAMP_SUFFIX`].
pub fn run_if_stale<F>(
    action: F,
    record_path: &Path,
    input_paths: &[PathBuf],
    input_strings: &[String],
    force: bool,
) -> Result<StampOutcome>
where
    F: FnOnce() -> Result<()>,
{
    let check = StampCheck::new(Record::new(record_path), input_paths, input_strings)?;
    let reason = check.reason(force);
    if reason == StaleReason::UpToDate {
        tracing::debug!(record = %record_path.display(), "stamp up to date");
        return Ok(StampOutcome {
            ran: false,
            reason,
            fingerprint: check.new_fingerprint().clone(),
        });
    }

    tracing::info!(
        record = %record_path.display(),
        reason = ?reason,
        "stamp stale, running action"
    );
    action()?;
    check.write()?;
    Ok(StampOutcome {
        ran: true,
        reason,
        fingerprint: check.new_fingerprint().clone(),
    })
}
