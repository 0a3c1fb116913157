//! JSON result files

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::markdown::render_impact_summary;
use crate::types::CallGraphResult;

/// Write `<dir>/<language>-calls.json`, pretty-printed with a trailing newline
pub fn write_json(result: &CallGraphResult, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let path = dir.join(format!("{}-calls.json", result.language));
    let mut json =
        serde_json::to_string_pretty(result).context("failed to serialize call graph result")?;
    json.push('\n');
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write `<dir>/impact-summary.md`
pub fn write_impact_summary(result: &CallGraphResult, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let path = dir.join("impact-summary.md");
    fs::write(&path, render_impact_summary(result))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write both files
pub fn write_all(result: &CallGraphResult, dir: &Path) -> Result<()> {
    write_json(result, dir)?;
    write_impact_summary(result, dir)?;
    Ok(())
}
