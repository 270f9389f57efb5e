pub mod check;
pub mod compress;
pub mod info;
pub mod render;

use std::path::{Path, PathBuf};

/// Move an exported file to the user's chosen location.
pub(crate) fn deliver(exported: PathBuf, output: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let Some(target) = output else {
        return Ok(exported);
    };
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(&exported, &target).is_err() {
        // Different filesystem.
        std::fs::copy(&exported, &target)?;
        remove_quietly(&exported);
    }
    Ok(target)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(error = %e, path = %path.display(), "Failed to remove exported file");
    }
}
