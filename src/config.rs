//! Run configuration.
//!
//! The config file and the few environment inputs are read exactly once, at
//! startup, into a `Settings` value that is handed to the workflow. Nothing
//! downstream reads the environment.
use crate::subagent::{validate_decl, ServerBinding, SubagentDecl};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

pub const CONFIG_ENV: &str = "ITP_CONFIG";
pub const THREAD_ID_ENV: &str = "ITP_THREAD_ID";
pub const REVIEW_TOKEN_ENV: &str = "ITP_REVIEW_TOKEN";

pub const DEFAULT_STATION_ID: &str = "itp-princeton";
pub const EXTRACTION_CAPABILITY: &str = "cute-linear";
pub const COMPLETION_CAPABILITY: &str = "cute-finish-itp";

const CONFIG_DIR_NAME: &str = "itp-agent";
const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_REMOTE_ENDPOINT: &str = "http://127.0.0.1:2024";

/// Pack of settings persisted in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub schema_version: u32,
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default = "default_extraction")]
    pub extraction: SubagentDecl,
    #[serde(default = "default_completion")]
    pub completion: SubagentDecl,
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
    #[serde(default = "default_review_timeout_secs")]
    pub review_timeout_secs: u64,
    /// Append-only escalation ledger (JSONL). Disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    pub default_station_id: String,
    #[serde(default)]
    pub shared_variables: Vec<String>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            default_station_id: DEFAULT_STATION_ID.to_string(),
            shared_variables: vec!["borrower_name".to_string(), "loan_number".to_string()],
        }
    }
}

/// Human review endpoint. The token may live here or in the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_dispatch_timeout_secs() -> u64 {
    900
}

fn default_review_timeout_secs() -> u64 {
    30
}

fn default_extraction() -> SubagentDecl {
    SubagentDecl {
        name: EXTRACTION_CAPABILITY.to_string(),
        remote_endpoint: DEFAULT_REMOTE_ENDPOINT.to_string(),
        remote_graph_id: "cute_linear".to_string(),
        description: "Extract borrower data from the loan pipeline GUI with screenshots"
            .to_string(),
        required_inputs: Vec::new(),
        server: ServerBinding::default(),
    }
}

fn default_completion() -> SubagentDecl {
    SubagentDecl {
        name: COMPLETION_CAPABILITY.to_string(),
        remote_endpoint: DEFAULT_REMOTE_ENDPOINT.to_string(),
        remote_graph_id: "cute_finish_itp".to_string(),
        description: "Complete the Intent to Proceed workflow for one ready borrower".to_string(),
        required_inputs: vec!["borrower_name".to_string(), "loan_number".to_string()],
        server: ServerBinding::default(),
    }
}

/// Build the config used when nothing is on disk.
pub fn default_config() -> RunConfig {
    RunConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        station: StationConfig::default(),
        review: ReviewConfig::default(),
        extraction: default_extraction(),
        completion: default_completion(),
        dispatch_timeout_secs: default_dispatch_timeout_secs(),
        review_timeout_secs: default_review_timeout_secs(),
        ledger_path: None,
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: RunConfig = serde_json::from_slice(&bytes).context("parse config JSON")?;
    validate_config(&config).with_context(|| format!("validate config {}", path.display()))?;
    Ok(config)
}

/// Persist a config in a stable JSON format.
pub fn write_config(path: &Path, config: &RunConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(config).context("serialize config")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_config(config: &RunConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.station.default_station_id.trim().is_empty() {
        return Err(anyhow!("station.default_station_id must be non-empty"));
    }
    if config.dispatch_timeout_secs == 0 {
        return Err(anyhow!("dispatch_timeout_secs must be greater than zero"));
    }
    if config.review_timeout_secs == 0 {
        return Err(anyhow!("review_timeout_secs must be greater than zero"));
    }
    if let Some(endpoint) = config.review.endpoint.as_deref() {
        if endpoint.trim().is_empty() {
            return Err(anyhow!("review.endpoint must be non-empty when set"));
        }
    }
    validate_decl(&config.extraction).context("extraction capability")?;
    validate_decl(&config.completion).context("completion capability")?;
    if config.extraction.name == config.completion.name {
        return Err(anyhow!(
            "extraction and completion capabilities share the name {:?}",
            config.extraction.name
        ));
    }
    Ok(())
}

/// Pick the config file: explicit flag, then `ITP_CONFIG`, then the user
/// config dir when a file exists there.
pub fn resolve_config_path(explicit: Option<&Path>, env_value: Option<String>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Some(PathBuf::from(value));
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Everything a run needs from the outside world, resolved once.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: RunConfig,
    pub config_path: Option<PathBuf>,
    /// Externally supplied run/session/thread identity.
    pub run_id: Option<String>,
    /// Bearer credential for the review endpoint.
    pub review_token: Option<String>,
}

impl Settings {
    /// Read the config file and environment. Called once from `main`.
    pub fn resolve(config_flag: Option<&Path>, thread_id_flag: Option<&str>) -> Result<Self> {
        let config_path = resolve_config_path(config_flag, env::var(CONFIG_ENV).ok());
        let config = match config_path.as_deref() {
            Some(path) => load_config(path)?,
            None => default_config(),
        };
        let run_id = thread_id_flag
            .map(str::to_string)
            .or_else(|| env::var(THREAD_ID_ENV).ok());
        let env_token = env::var(REVIEW_TOKEN_ENV).ok();
        let mut settings = Self::from_parts(config, run_id, env_token);
        settings.config_path = config_path;
        Ok(settings)
    }

    /// Combine already-read inputs. The config token wins over the
    /// environment; blank values count as absent.
    pub fn from_parts(
        config: RunConfig,
        run_id: Option<String>,
        env_token: Option<String>,
    ) -> Self {
        let present = |value: &String| !value.trim().is_empty();
        let review_token = config
            .review
            .token
            .clone()
            .filter(present)
            .or_else(|| env_token.filter(present));
        let run_id = run_id.filter(present);
        Self {
            config,
            config_path: None,
            run_id,
            review_token,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
