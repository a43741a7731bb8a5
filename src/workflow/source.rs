//! Where the borrower table comes from.
use super::context::table_text_from_payload;
use crate::station::StationContext;
use crate::subagent::{dispatch, DispatchOutcome, SubagentSpec, SubagentTransport};
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Extraction collaborator. `Ok(None)` means it ran but produced no table.
pub trait TableSource {
    fn describe(&self) -> String;
    fn extract(&self, station: &StationContext) -> Result<Option<String>>;
}

/// A borrower table already on disk.
pub struct FileTableSource {
    path: PathBuf,
}

impl FileTableSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TableSource for FileTableSource {
    fn describe(&self) -> String {
        format!("table file {}", self.path.display())
    }

    fn extract(&self, _station: &StationContext) -> Result<Option<String>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("read table {}", self.path.display()))?;
        Ok(Some(text).filter(|text| !text.trim().is_empty()))
    }
}

/// The remote extraction capability.
pub struct RemoteTableSource<'a> {
    spec: &'a SubagentSpec,
    transport: &'a dyn SubagentTransport,
}

impl<'a> RemoteTableSource<'a> {
    pub fn new(spec: &'a SubagentSpec, transport: &'a dyn SubagentTransport) -> Self {
        Self { spec, transport }
    }
}

impl TableSource for RemoteTableSource<'_> {
    fn describe(&self) -> String {
        format!("capability {}", self.spec.name)
    }

    fn extract(&self, station: &StationContext) -> Result<Option<String>> {
        match dispatch(self.transport, self.spec, station, BTreeMap::new())? {
            DispatchOutcome::Succeeded { payload } => Ok(table_text_from_payload(&payload)),
            other => Err(anyhow!("{} {other}", self.spec.name)),
        }
    }
}
