use super::{FIELD_DELIMITER, FIELD_QUOTE};

/// Result of parsing one data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowParse {
    /// Empty or whitespace-only line; skipped without a diagnostic.
    Blank,
    Fields(Vec<String>),
    Malformed(String),
}

/// Parse one data line, honouring double-quoted fields.
///
/// `min_fields` is the field count the current field set needs; shorter rows
/// come back as `Malformed` rather than an error.
pub fn parse_row(line: &str, min_fields: usize) -> RowParse {
    if line.trim().is_empty() {
        return RowParse::Blank;
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(FIELD_DELIMITER)
        .quote(FIELD_QUOTE)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => {}
        Ok(false) => return RowParse::Blank,
        Err(err) => return RowParse::Malformed(format!("unparsable row: {err}")),
    }
    if record.len() < min_fields {
        return RowParse::Malformed(format!(
            "row has {} field(s), expected at least {min_fields}",
            record.len()
        ));
    }
    RowParse::Fields(record.iter().map(str::to_string).collect())
}
