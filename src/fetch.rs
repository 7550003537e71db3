//! Fetch the target repository when it is not already on disk.
//!
//! A thin wrapper over the `git` CLI: shallow clone into the
//! configured source root, skipped entirely when the root exists.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::config::SourceConfig;

/// Clone `source.repo_url` into `source.root` unless the root already
/// exists. Returns `true` when a clone was performed.
pub fn fetch_source(config: &SourceConfig) -> Result<bool> {
    let Some(url) = config.repo_url.as_deref() else {
        bail!("source.repo_url is not configured");
    };

    if config.root.exists() {
        info!(root = %config.root.display(), "source root already present, skipping clone");
        return Ok(false);
    }

    if let Some(parent) = config.root.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    git_clone(url, &config.root)?;
    Ok(true)
}

fn git_clone(url: &str, dest: &Path) -> Result<()> {
    info!(url, dest = %dest.display(), "cloning source repository (shallow)");

    let output = Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg("--no-single-branch")
        .arg(url)
        .arg(dest)
        .output()
        .context("failed to run git clone")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(())
}
