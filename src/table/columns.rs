use std::collections::BTreeMap;

/// Header name to ordered positions. Duplicate names keep every position,
/// left to right; matching is exact-string after trimming whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: BTreeMap<String, Vec<usize>>,
    width: usize,
}

impl ColumnIndex {
    pub fn from_header(header: &str) -> Self {
        let delimiter = char::from(super::FIELD_DELIMITER);
        let mut positions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut width = 0;
        for (idx, name) in header.split(delimiter).enumerate() {
            positions.entry(name.trim().to_string()).or_default().push(idx);
            width = idx + 1;
        }
        Self { positions, width }
    }

    /// Every position carrying `name`. Empty when the column is absent.
    pub fn positions(&self, name: &str) -> &[usize] {
        self.positions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<usize> {
        self.positions(name).first().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.positions(name).is_empty()
    }

    /// Number of header columns.
    pub fn width(&self) -> usize {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_resolve_in_header_order() {
        let index = ColumnIndex::from_header("A,B,A");
        assert_eq!(index.positions("A"), &[0, 2]);
        assert_eq!(index.positions("B"), &[1]);
        assert_eq!(index.width(), 3);
    }

    #[test]
    fn absent_name_is_empty_not_an_error() {
        let index = ColumnIndex::from_header("A,B");
        assert!(index.positions("C").is_empty());
        assert_eq!(index.first("C"), None);
        assert!(!index.contains("C"));
    }

    #[test]
    fn whitespace_is_trimmed_but_case_is_kept() {
        let index = ColumnIndex::from_header(" Loan Number , loan number");
        assert_eq!(index.positions("Loan Number"), &[0]);
        assert_eq!(index.positions("loan number"), &[1]);
        assert!(index.positions("LOAN NUMBER").is_empty());
    }
}
