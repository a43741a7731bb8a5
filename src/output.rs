//! Atomic JSON output.
//!
//! Bytes are staged in a temp file next to the destination and renamed into
//! place, so readers never observe a half-written summary.
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).context("serialize JSON output")?;
    bytes.push(b'\n');
    write_bytes_atomic(path, &bytes)
}

fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
            parent
        }
        None => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("stage output in {}", parent.display()))?;
    staged
        .write_all(bytes)
        .with_context(|| format!("write staged output for {}", path.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("sync staged output for {}", path.display()))?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("persist {}", path.display()))?;
    Ok(())
}
