//! Write the aggregate report as JSON.

use anyhow::{Context, Result};
use std::path::Path;

use crate::aggregate::Aggregate;

/// Serialize the aggregate to pretty-printed JSON.
///
/// A path of `-` writes to stdout for piping; otherwise parent
/// directories are created as needed.
pub fn write_report(aggregate: &Aggregate, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(aggregate)?;

    if path == Path::new("-") {
        println!("{}", json);
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    std::fs::write(path, &json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;

    Ok(())
}
