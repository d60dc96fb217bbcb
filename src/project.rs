//! Whether a workspace looks like a Hytale mod or data project.
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories never entered while searching for markers.
const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git"];

/// A `.hytale` marker anywhere, or a `manifest.json` plus a `Common` or
/// `Server` directory anywhere. No workspace means no project.
///
/// One pass over the tree, pruned at the excluded directories, ending as
/// soon as the answer is known.
pub fn is_hytale_project(workspace: Option<&Path>) -> bool {
    let Some(root) = workspace else {
        return false;
    };
    if !root.is_dir() {
        debug!(root = %root.display(), "workspace is not a directory");
        return false;
    }

    let mut has_manifest = false;
    let mut has_layout = false;
    let entries = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry));
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%error, "skipping unreadable workspace entry");
                continue;
            }
        };
        let name = entry.file_name();
        if name == ".hytale" {
            debug!(marker = %entry.path().display(), "found .hytale marker");
            return true;
        }
        let file_type = entry.file_type();
        has_manifest |= file_type.is_file() && name == "manifest.json";
        has_layout |= file_type.is_dir() && (name == "Common" || name == "Server");
        if has_manifest && has_layout {
            debug!(root = %root.display(), "found manifest and content directory");
            return true;
        }
    }
    debug!(root = %root.display(), has_manifest, has_layout, "project detection");
    false
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && EXCLUDED_DIRS.iter().any(|dir| entry.file_name() == *dir)
}
