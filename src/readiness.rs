//! Intent to Proceed readiness gate.
//!
//! A borrower is ready when the document date is filled and the header
//! resolves to exactly two disclosure columns that are both filled for the
//! row. Values are compared against a fixed sentinel set; no date parsing is
//! done.
use crate::table::{
    parse_row, BorrowerFields, BorrowerRecord, ColumnIndex, RawTable, RowParse,
    BORROWER_NAME_COLUMN, DISCLOSURE_DATE_COLUMN, DOCUMENT_DATE_COLUMN, LOAN_NUMBER_COLUMN,
};
use serde::Serialize;

/// Placeholder values the extractor writes into empty cells.
pub const SENTINEL_VALUES: [&str; 3] = ["", "=", ","];

/// Disclosure columns the gate requires, all of which must be filled.
pub const REQUIRED_DISCLOSURE_COLUMNS: usize = 2;

pub const NONE_READY_MESSAGE: &str = "No borrowers are currently ready for ITP processing.

Borrowers need ALL THREE dates filled:
1. A date in the \"Document Date R\" column
2. A date in the FIRST \"eDisclosure D\" column
3. A date in the SECOND \"eDisclosure D\" column

Please check the borrower table for status updates.";

/// Classification of one borrower row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessResult {
    pub ready: bool,
    pub record: BorrowerRecord,
}

/// A data row that never became a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line number within the table, header included.
    pub line: usize,
    pub reason: String,
}

/// Full outcome of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub header_columns: usize,
    pub disclosure_columns: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
    pub results: Vec<ReadinessResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRow>,
}

impl Evaluation {
    /// Ready borrowers in row order.
    pub fn ready(&self) -> impl Iterator<Item = &ReadinessResult> {
        self.results.iter().filter(|result| result.ready)
    }

    pub fn ready_count(&self) -> usize {
        self.ready().count()
    }

    /// Consume the pass, keeping only ready results.
    pub fn into_ready(self) -> Vec<ReadinessResult> {
        self.results.into_iter().filter(|r| r.ready).collect()
    }
}

/// True when `value` holds data rather than a sentinel placeholder.
pub fn is_present(value: Option<&str>) -> bool {
    match value {
        Some(raw) => !SENTINEL_VALUES.contains(&raw.trim()),
        None => false,
    }
}

/// Apply the gate to one record.
pub fn is_ready(record: &BorrowerRecord) -> bool {
    is_present(record.document_date.as_deref())
        && record.disclosure_dates.len() == REQUIRED_DISCLOSURE_COLUMNS
        && record
            .disclosure_dates
            .iter()
            .all(|date| is_present(date.as_deref()))
}

/// Classify every data row of `table`, preserving row order.
pub fn evaluate(table: &RawTable) -> Evaluation {
    let index = ColumnIndex::from_header(table.header());
    let fields = BorrowerFields::resolve(&index);
    let min_fields = fields.max_required_position().map_or(0, |max| max + 1);
    let missing_columns = [
        BORROWER_NAME_COLUMN,
        LOAN_NUMBER_COLUMN,
        DOCUMENT_DATE_COLUMN,
        DISCLOSURE_DATE_COLUMN,
    ]
    .into_iter()
    .filter(|name| !index.contains(name))
    .map(str::to_string)
    .collect::<Vec<_>>();

    tracing::debug!(
        name = ?fields.name,
        loan_number = ?fields.loan_number,
        document_date = ?fields.document_date,
        disclosure = ?fields.disclosure_dates,
        "resolved borrower columns"
    );
    if fields.disclosure_dates.len() != REQUIRED_DISCLOSURE_COLUMNS {
        tracing::warn!(
            found = fields.disclosure_dates.len(),
            expected = REQUIRED_DISCLOSURE_COLUMNS,
            "disclosure column count mismatch; no borrower can be ready"
        );
    }

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for (offset, line) in table.rows().iter().enumerate() {
        let line_number = offset + 2;
        match parse_row(line, min_fields) {
            RowParse::Blank => {}
            RowParse::Malformed(reason) => {
                tracing::warn!(line = line_number, %reason, "skipping malformed row");
                skipped.push(SkippedRow {
                    line: line_number,
                    reason,
                });
            }
            RowParse::Fields(values) => {
                let record = fields.record(&values);
                let ready = is_ready(&record);
                if ready {
                    tracing::info!(
                        borrower = %record.name,
                        loan_number = %record.loan_number,
                        "borrower ready for ITP"
                    );
                }
                results.push(ReadinessResult { ready, record });
            }
        }
    }

    Evaluation {
        header_columns: index.width(),
        disclosure_columns: fields.disclosure_dates.len(),
        missing_columns,
        results,
        skipped,
    }
}

/// Human-facing summary of the ready set, or the fixed gating explanation.
pub fn render_ready_list(ready: &[ReadinessResult]) -> String {
    if ready.is_empty() {
        return NONE_READY_MESSAGE.to_string();
    }
    let mut out = format!(
        "Found {} borrower(s) ready for Intent to Proceed (ITP) processing:\n\n",
        ready.len()
    );
    for (idx, result) in ready.iter().enumerate() {
        let record = &result.record;
        let disclosures = record
            .disclosure_dates
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{}. {}\n", idx + 1, record.name));
        out.push_str(&format!("   - Loan Number: {}\n", record.loan_number));
        out.push_str(&format!(
            "   - Document Date: {}\n",
            record.document_date.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!("   - eDisclosure Date(s): {disclosures}\n\n"));
    }
    out.push_str(
        "These borrowers have completed the necessary documentation steps and are ready for ITP document processing.",
    );
    out
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
