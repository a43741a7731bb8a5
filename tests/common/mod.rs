//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const HEADER: &str = "Borrower Name,Loan Number,Document Date R,eDisclosure D,eDisclosure D";

/// Endpoint nothing listens on, so remote calls fail fast.
pub const DEAD_ENDPOINT: &str = "http://127.0.0.1:9";

/// A scratch directory that doubles as HOME, so no user config leaks in.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    /// Borrower table with the standard header and the given rows.
    pub fn table(&self, rows: &[&str]) -> PathBuf {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        self.write("borrowers.csv", &text)
    }

    /// Config whose remote capabilities point at `DEAD_ENDPOINT`.
    pub fn offline_config(&self) -> PathBuf {
        let ledger = self.dir.path().join("escalations.jsonl");
        let config = serde_json::json!({
            "schema_version": 1,
            "extraction": {
                "name": "cute-linear",
                "remote_endpoint": DEAD_ENDPOINT,
                "remote_graph_id": "cute_linear",
                "description": "Extract borrower data",
            },
            "completion": {
                "name": "cute-finish-itp",
                "remote_endpoint": DEAD_ENDPOINT,
                "remote_graph_id": "cute_finish_itp",
                "description": "Complete ITP for one borrower",
                "required_inputs": ["borrower_name", "loan_number"],
            },
            "dispatch_timeout_secs": 5,
            "review_timeout_secs": 5,
            "ledger_path": ledger,
        });
        self.write(
            "config.json",
            &serde_json::to_string_pretty(&config).expect("serialize config"),
        )
    }

    pub fn ledger_lines(&self) -> Vec<Value> {
        let path = self.dir.path().join("escalations.jsonl");
        let Ok(text) = fs::read_to_string(path) else {
            return Vec::new();
        };
        text.lines()
            .map(|line| serde_json::from_str(line).expect("ledger line is JSON"))
            .collect()
    }

    /// Run `itp` with a scrubbed environment.
    pub fn itp(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_itp"))
            .args(args)
            .env_remove("ITP_CONFIG")
            .env_remove("ITP_THREAD_ID")
            .env_remove("ITP_REVIEW_TOKEN")
            .env_remove("RUST_LOG")
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .output()
            .expect("run itp")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "itp failed: {}\nstderr:\n{}",
        output.status,
        stderr(output)
    );
}

pub fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}
