use super::SubagentSpec;
use crate::config::RunConfig;
use crate::station::StationContext;
use anyhow::{Context, Result};
use serde::Serialize;

pub const DEFAULT_STARTING_MESSAGE: &str =
    "Let's review and approve Intent to Proceed for Princeton mortgage";

const WORKFLOW_STEPS: [&str; 4] = [
    "Extract borrower data with the extraction capability",
    "Filter borrowers through the ITP readiness gate",
    "Dispatch each ready borrower to the completion capability",
    "When no borrower is ready, report the gating rule and stop",
];

/// The capabilities one run may dispatch, all bound to the same station.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub extraction: SubagentSpec,
    pub completion: SubagentSpec,
}

impl Catalog {
    pub fn declare(config: &RunConfig, station: &StationContext) -> Result<Self> {
        Ok(Self {
            extraction: SubagentSpec::declare(&config.extraction, station)
                .context("declare extraction capability")?,
            completion: SubagentSpec::declare(&config.completion, station)
                .context("declare completion capability")?,
        })
    }

    pub fn specs(&self) -> [&SubagentSpec; 2] {
        [&self.extraction, &self.completion]
    }
}

/// Text for `itp describe`.
pub fn render_description(catalog: &Catalog) -> String {
    let mut out = String::from("ITP-Princeton: Intent to Proceed processing workflow\n\n");
    out.push_str("Workflow:\n");
    for (idx, step) in WORKFLOW_STEPS.iter().enumerate() {
        out.push_str(&format!("  {}. {step}\n", idx + 1));
    }
    out.push_str("\nCapabilities:\n");
    for spec in catalog.specs() {
        let inputs = if spec.required_inputs.is_empty() {
            "none".to_string()
        } else {
            spec.required_inputs.join(", ")
        };
        out.push_str(&format!("  {}: {}\n", spec.name, spec.description));
        out.push_str(&format!(
            "    endpoint: {} (graph {})\n",
            spec.remote_endpoint, spec.remote_graph_id
        ));
        out.push_str(&format!("    required inputs: {inputs}\n"));
        out.push_str(&format!(
            "    server: {} #{}\n",
            spec.server.server_id, spec.server.server_index
        ));
    }
    if let Some(spec) = catalog.specs().first() {
        out.push_str(&format!("\nStation: {}\n", spec.station.station_id));
    }
    out.push_str(&format!("\nDefault starting message:\n  {DEFAULT_STARTING_MESSAGE}\n"));
    out
}
