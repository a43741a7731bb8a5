//! Borrower table ingestion.
//!
//! The extraction step hands back delimited text whose header may repeat a
//! column name (the two `eDisclosure D` columns). This module resolves the
//! header into positions and turns each data line into a `BorrowerRecord`
//! without ever aborting the pass on a bad line.
use anyhow::{anyhow, Result};
use serde::Serialize;

mod columns;
mod row;

pub use columns::ColumnIndex;
pub use row::{parse_row, RowParse};

pub const BORROWER_NAME_COLUMN: &str = "Borrower Name";
pub const LOAN_NUMBER_COLUMN: &str = "Loan Number";
pub const DOCUMENT_DATE_COLUMN: &str = "Document Date R";
pub const DISCLOSURE_DATE_COLUMN: &str = "eDisclosure D";

pub const FIELD_DELIMITER: u8 = b',';
pub const FIELD_QUOTE: u8 = b'"';

/// Header line plus data lines, exactly as extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    header: String,
    rows: Vec<String>,
}

impl RawTable {
    /// Split table text into a header and data lines.
    ///
    /// Text with no header line is rejected; a header with no rows is a
    /// valid, empty table.
    pub fn from_text(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("borrower table has no header line"));
        }
        let mut lines = trimmed
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line));
        let header = lines
            .next()
            .map(|line| line.trim_start_matches('\u{feff}').to_string())
            .ok_or_else(|| anyhow!("borrower table has no header line"))?;
        Ok(Self {
            header,
            rows: lines.map(str::to_string).collect(),
        })
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }
}

/// One borrower as read from a data row. Values are trimmed but not judged;
/// sentinel handling belongs to the readiness evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowerRecord {
    pub name: String,
    pub loan_number: String,
    pub document_date: Option<String>,
    pub disclosure_dates: Vec<Option<String>>,
}

/// Resolved positions for the fields the readiness gate reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowerFields {
    pub name: Option<usize>,
    pub loan_number: Option<usize>,
    pub document_date: Option<usize>,
    pub disclosure_dates: Vec<usize>,
}

impl BorrowerFields {
    pub fn resolve(index: &ColumnIndex) -> Self {
        Self {
            name: index.first(BORROWER_NAME_COLUMN),
            loan_number: index.first(LOAN_NUMBER_COLUMN),
            document_date: index.first(DOCUMENT_DATE_COLUMN),
            disclosure_dates: index.positions(DISCLOSURE_DATE_COLUMN).to_vec(),
        }
    }

    /// Largest single-valued position a row must reach to be usable.
    pub fn max_required_position(&self) -> Option<usize> {
        [self.name, self.loan_number, self.document_date]
            .into_iter()
            .flatten()
            .max()
    }

    /// Build a record from parsed fields. The caller has already checked the
    /// row against `max_required_position`.
    pub fn record(&self, fields: &[String]) -> BorrowerRecord {
        let value = |position: Option<usize>| {
            position
                .and_then(|idx| fields.get(idx))
                .map(|raw| raw.trim().to_string())
        };
        let name = value(self.name)
            .map(|raw| raw.trim_matches('"').to_string())
            .unwrap_or_default();
        BorrowerRecord {
            name,
            loan_number: value(self.loan_number).unwrap_or_default(),
            document_date: value(self.document_date),
            disclosure_dates: self
                .disclosure_dates
                .iter()
                .map(|idx| value(Some(*idx)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only_table_has_no_rows() {
        let table = RawTable::from_text("Borrower Name,Loan Number\n").expect("parse table");
        assert_eq!(table.header(), "Borrower Name,Loan Number");
        assert!(table.rows().is_empty());
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(RawTable::from_text("  \n \n").is_err());
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let table =
            RawTable::from_text("\u{feff}A,B\r\n1,2\r\n").expect("parse table with CRLF");
        assert_eq!(table.header(), "A,B");
        assert_eq!(table.rows(), ["1,2".to_string()]);
    }

    #[test]
    fn record_strips_quotes_from_name_and_reads_missing_disclosures_as_absent() {
        let index = ColumnIndex::from_header(
            "Borrower Name,Loan Number,Document Date R,eDisclosure D,eDisclosure D",
        );
        let fields = BorrowerFields::resolve(&index);
        let row = vec![
            " \"Doe\" ".to_string(),
            " 000123 ".to_string(),
            "2024-01-01".to_string(),
            "2024-01-02".to_string(),
        ];
        let record = fields.record(&row);
        assert_eq!(record.name, "Doe");
        assert_eq!(record.loan_number, "000123");
        assert_eq!(record.document_date.as_deref(), Some("2024-01-01"));
        assert_eq!(
            record.disclosure_dates,
            vec![Some("2024-01-02".to_string()), None]
        );
    }

    #[test]
    fn absent_identity_columns_default_to_empty_text() {
        let index = ColumnIndex::from_header("Document Date R,eDisclosure D,eDisclosure D");
        let fields = BorrowerFields::resolve(&index);
        assert_eq!(fields.max_required_position(), Some(0));
        let record = fields.record(&["2024-01-01".to_string()]);
        assert_eq!(record.name, "");
        assert_eq!(record.loan_number, "");
    }
}
