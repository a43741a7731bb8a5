use super::source::TableSource;
use crate::station::StationContext;
use crate::table::RawTable;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// Key of the borrower table in an extraction run's file state.
pub const TABLE_FILE_KEY: &str = "/borrower_table.csv";
const TABLE_TEXT_KEY: &str = "table_csv";

/// What the orchestrator knows once extraction succeeded.
pub(crate) struct RunContext {
    station: StationContext,
    table: RawTable,
}

impl RunContext {
    /// Pull the table from `source` and check it has a header.
    pub(crate) fn extract(station: &StationContext, source: &dyn TableSource) -> Result<Self> {
        let text = source
            .extract(station)?
            .ok_or_else(|| anyhow!("{} returned no borrower table", source.describe()))?;
        let table = RawTable::from_text(&text)
            .with_context(|| format!("read borrower table from {}", source.describe()))?;
        Ok(Self {
            station: station.clone(),
            table,
        })
    }

    pub(crate) fn station(&self) -> &StationContext {
        &self.station
    }

    pub(crate) fn table(&self) -> &RawTable {
        &self.table
    }
}

/// Find the borrower table in an extraction payload.
///
/// The file-state form (`files["/borrower_table.csv"].content` as a list of
/// lines) is preferred; a bare `table_csv` string is the fallback.
pub fn table_text_from_payload(payload: &Value) -> Option<String> {
    let file_lines = payload
        .get("files")
        .and_then(|files| files.get(TABLE_FILE_KEY))
        .and_then(|file| file.get("content"))
        .and_then(Value::as_array);
    if let Some(lines) = file_lines {
        let text = lines
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if !text.trim().is_empty() {
            return Some(text);
        }
    }
    payload
        .get(TABLE_TEXT_KEY)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_state_is_preferred_over_table_csv() {
        let payload = json!({
            "files": {
                "/borrower_table.csv": {
                    "content": ["Borrower Name,Loan Number", "Roe,1"],
                    "created_at": "2024-01-01T00:00:00Z",
                    "modified_at": "2024-01-01T00:00:00Z"
                }
            },
            "table_csv": "ignored"
        });
        assert_eq!(
            table_text_from_payload(&payload).as_deref(),
            Some("Borrower Name,Loan Number\nRoe,1")
        );
    }

    #[test]
    fn falls_back_to_table_csv() {
        let payload = json!({"files": {}, "table_csv": "A,B\n1,2"});
        assert_eq!(table_text_from_payload(&payload).as_deref(), Some("A,B\n1,2"));
    }

    #[test]
    fn empty_payload_has_no_table() {
        assert_eq!(table_text_from_payload(&json!({"table_csv": "  "})), None);
        assert_eq!(table_text_from_payload(&json!([1, 2])), None);
    }
}
