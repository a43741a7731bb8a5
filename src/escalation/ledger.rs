//! Local record of escalation attempts.
//!
//! Entries are appended to a JSONL file, one per report, whatever the
//! delivery outcome. A "not reported" escalation still leaves a trace here.
use super::{EscalationOutcome, EscalationReport};
use crate::util::now_epoch_ms;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub const LEDGER_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub schema_version: u32,
    /// Unix timestamp in milliseconds when the entry was written.
    pub ts: u64,
    pub report: EscalationReport,
    pub outcome: EscalationOutcome,
}

impl LedgerEntry {
    pub fn new(report: &EscalationReport, outcome: &EscalationOutcome) -> Self {
        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            report: report.clone(),
            outcome: outcome.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EscalationLedger {
    path: PathBuf,
}

impl EscalationLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create ledger directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open ledger for append: {}", self.path.display()))?;
        let line = serde_json::to_string(entry).context("serialize ledger entry")?;
        writeln!(file, "{line}").context("write ledger entry")?;
        Ok(())
    }
}
