//! Remote capability descriptors.
//!
//! A `SubagentDecl` is what the config file says; a `SubagentSpec` is the
//! validated descriptor bound to the run's station. Specs never hold a live
//! connection; dispatching goes through a `SubagentTransport`.
use crate::station::StationContext;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

mod catalog;
mod dispatch;

pub use catalog::{render_description, Catalog, DEFAULT_STARTING_MESSAGE};
pub use dispatch::{
    dispatch, DispatchOutcome, DispatchRequest, HttpSubagentTransport, SubagentTransport,
};

const CAPABILITY_NAME_PATTERN: &str = r"^[a-z0-9][a-z0-9_-]*$";
const GRAPH_ID_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_.-]*$";

/// Remote server slot a capability runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerBinding {
    pub server_id: String,
    #[serde(default)]
    pub checkpoint_id: Option<String>,
    #[serde(default)]
    pub server_index: u32,
}

impl Default for ServerBinding {
    fn default() -> Self {
        Self {
            server_id: "gui-automation".to_string(),
            checkpoint_id: None,
            server_index: 0,
        }
    }
}

/// Capability declaration as written in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubagentDecl {
    pub name: String,
    pub remote_endpoint: String,
    pub remote_graph_id: String,
    pub description: String,
    #[serde(default)]
    pub required_inputs: Vec<String>,
    #[serde(default)]
    pub server: ServerBinding,
}

/// Station data attached unchanged to every dispatch in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationBinding {
    pub shared_variable_names: Vec<String>,
    pub station_id: String,
}

impl StationBinding {
    pub fn from_station(station: &StationContext) -> Self {
        Self {
            shared_variable_names: station.shared_variable_names().iter().cloned().collect(),
            station_id: station.station_id().to_string(),
        }
    }
}

/// Validated, station-bound capability descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubagentSpec {
    pub name: String,
    pub remote_endpoint: String,
    pub remote_graph_id: String,
    pub description: String,
    pub required_inputs: Vec<String>,
    pub station: StationBinding,
    pub server: ServerBinding,
}

impl SubagentSpec {
    pub fn declare(decl: &SubagentDecl, station: &StationContext) -> Result<Self> {
        validate_decl(decl).with_context(|| format!("declare capability {:?}", decl.name))?;
        Ok(Self {
            name: decl.name.clone(),
            remote_endpoint: decl.remote_endpoint.trim_end_matches('/').to_string(),
            remote_graph_id: decl.remote_graph_id.clone(),
            description: decl.description.trim().to_string(),
            required_inputs: decl.required_inputs.clone(),
            station: StationBinding::from_station(station),
            server: decl.server.clone(),
        })
    }
}

/// Check a declaration before it becomes a spec.
pub fn validate_decl(decl: &SubagentDecl) -> Result<()> {
    let name_pattern = Regex::new(CAPABILITY_NAME_PATTERN).context("compile name pattern")?;
    if !name_pattern.is_match(&decl.name) {
        return Err(anyhow!(
            "capability name must match {CAPABILITY_NAME_PATTERN} (got {:?})",
            decl.name
        ));
    }
    let graph_pattern = Regex::new(GRAPH_ID_PATTERN).context("compile graph id pattern")?;
    if !graph_pattern.is_match(&decl.remote_graph_id) {
        return Err(anyhow!(
            "remote_graph_id must match {GRAPH_ID_PATTERN} (got {:?})",
            decl.remote_graph_id
        ));
    }
    let endpoint = decl.remote_endpoint.trim();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(anyhow!(
            "remote_endpoint must be an http(s) URL (got {:?})",
            decl.remote_endpoint
        ));
    }
    if decl.description.trim().is_empty() {
        return Err(anyhow!("description must be non-empty"));
    }
    let mut seen = BTreeSet::new();
    for input in &decl.required_inputs {
        if input.trim().is_empty() {
            return Err(anyhow!("required_inputs entries must be non-empty"));
        }
        if !seen.insert(input.as_str()) {
            return Err(anyhow!("duplicate required input {input:?}"));
        }
    }
    if decl.server.server_id.trim().is_empty() {
        return Err(anyhow!("server.server_id must be non-empty"));
    }
    Ok(())
}
