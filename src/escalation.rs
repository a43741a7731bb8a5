//! Human-in-the-loop escalation.
//!
//! Every failure the workflow cannot recover from becomes exactly one
//! `EscalationReport`. Sending it can itself fail (no credential, network,
//! rejection); those cases come back as an `EscalationOutcome` and are never
//! raised, so escalation cannot take down the run it reports on.
use crate::config::{Settings, REVIEW_TOKEN_ENV};
use crate::station::StationContext;
use crate::util::truncate_string;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

mod ledger;

use ledger::{EscalationLedger, LedgerEntry};

pub const REPORT_KIND: &str = "C1-R0";
pub const REPORT_STATUS: &str = "error";

const REASON_PREVIEW_BYTES: usize = 500;

/// A failure worth a human's attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub loan_number: String,
    pub borrower_name: String,
    pub message: String,
    pub screenshot_reference: Option<String>,
}

impl Failure {
    pub fn new(
        borrower_name: impl Into<String>,
        loan_number: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            loan_number: loan_number.into(),
            borrower_name: borrower_name.into(),
            message: message.into(),
            screenshot_reference: None,
        }
    }

    pub fn with_screenshot(mut self, reference: Option<String>) -> Self {
        self.screenshot_reference = reference.filter(|r| !r.trim().is_empty());
        self
    }
}

/// Body sent to the review endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationReport {
    pub loan_number: String,
    pub borrower_name: String,
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_reference: Option<String>,
    pub report_kind: String,
    pub correlation_id: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

impl EscalationReport {
    pub fn build(failure: &Failure, correlation_id: &str) -> Self {
        Self {
            loan_number: failure.loan_number.clone(),
            borrower_name: failure.borrower_name.clone(),
            status: REPORT_STATUS.to_string(),
            message: failure.message.clone(),
            screenshot_reference: failure.screenshot_reference.clone(),
            report_kind: REPORT_KIND.to_string(),
            correlation_id: correlation_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// What happened to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EscalationOutcome {
    Reported { status_code: u16 },
    /// Deliberately not sent, e.g. no credential configured.
    NotReported { reason: String },
    /// Sending was attempted and failed.
    Failed { reason: String },
}

impl EscalationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationOutcome::Reported { .. } => "reported",
            EscalationOutcome::NotReported { .. } => "not_reported",
            EscalationOutcome::Failed { .. } => "failed",
        }
    }

    /// One-line, user-facing description.
    pub fn describe(&self) -> String {
        match self {
            EscalationOutcome::Reported { status_code } => {
                format!("escalation reported to human review (HTTP {status_code})")
            }
            EscalationOutcome::NotReported { reason } => {
                format!("escalation not reported: {reason}")
            }
            EscalationOutcome::Failed { reason } => format!("escalation failed: {reason}"),
        }
    }
}

impl fmt::Display for EscalationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A report together with what became of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Escalation {
    pub report: EscalationReport,
    pub outcome: EscalationOutcome,
}

/// Delivers a report to the review endpoint and returns the HTTP status.
pub trait ReviewTransport {
    fn send(&self, endpoint: &str, token: &str, report: &EscalationReport) -> Result<u16>;
}

pub struct HttpReviewTransport {
    agent: ureq::Agent,
}

impl HttpReviewTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl ReviewTransport for HttpReviewTransport {
    fn send(&self, endpoint: &str, token: &str, report: &EscalationReport) -> Result<u16> {
        let response = self
            .agent
            .post(endpoint)
            .header("Authorization", format!("Bearer {token}"))
            .send_json(report)
            .with_context(|| format!("POST {endpoint}"))?;
        Ok(response.status().as_u16())
    }
}

/// Builds and sends escalation reports for one run.
pub struct EscalationReporter<'a> {
    endpoint: Option<&'a str>,
    token: Option<&'a str>,
    correlation_id: String,
    transport: &'a dyn ReviewTransport,
    ledger: Option<EscalationLedger>,
}

impl<'a> EscalationReporter<'a> {
    /// The correlation id is the run identity when the caller supplied one,
    /// otherwise a fresh UUID shared by every report of this run.
    pub fn new(
        settings: &'a Settings,
        station: &StationContext,
        transport: &'a dyn ReviewTransport,
    ) -> Self {
        let correlation_id = station
            .run_identity()
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            endpoint: settings.config.review.endpoint.as_deref(),
            token: settings.review_token.as_deref(),
            correlation_id,
            transport,
            ledger: settings.config.ledger_path.clone().map(EscalationLedger::new),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Build one report for `failure` and try to deliver it.
    pub fn report(&self, failure: &Failure) -> Escalation {
        let report = EscalationReport::build(failure, &self.correlation_id);
        let outcome = self.deliver(&report);
        match &outcome {
            EscalationOutcome::Reported { status_code } => tracing::info!(
                loan_number = %report.loan_number,
                status_code,
                "escalation reported"
            ),
            other => tracing::warn!(
                loan_number = %report.loan_number,
                outcome = other.as_str(),
                detail = %other,
                "escalation not delivered"
            ),
        }
        if let Some(ledger) = &self.ledger {
            if let Err(err) = ledger.append(&LedgerEntry::new(&report, &outcome)) {
                tracing::warn!(error = %format!("{err:#}"), "failed to append escalation ledger");
            }
        }
        Escalation { report, outcome }
    }

    fn deliver(&self, report: &EscalationReport) -> EscalationOutcome {
        let Some(endpoint) = self.endpoint else {
            return EscalationOutcome::NotReported {
                reason: "no review endpoint configured".to_string(),
            };
        };
        let Some(token) = self.token else {
            return EscalationOutcome::NotReported {
                reason: format!("no review credential configured (set {REVIEW_TOKEN_ENV})"),
            };
        };
        match self.transport.send(endpoint, token, report) {
            Ok(status_code) => EscalationOutcome::Reported { status_code },
            Err(err) => EscalationOutcome::Failed {
                reason: truncate_string(&format!("{err:#}"), REASON_PREVIEW_BYTES),
            },
        }
    }
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
