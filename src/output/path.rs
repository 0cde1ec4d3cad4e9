//! Output path generation
//!
//! Item files are named `{prefix}_{YYYYmmdd_HHMMSS}.{ext}` inside an output
//! directory; the run summary sits next to them as `{stem}_summary.json`.

use super::FileFormat;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Timestamped item file path, e.g. `data/posts_20240501_101500.csv`
pub fn timestamped_path(
    dir: &Path,
    prefix: &str,
    format: FileFormat,
    at: DateTime<Utc>,
) -> PathBuf {
    dir.join(format!(
        "{}_{}.{}",
        prefix,
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

/// Summary path for an item file, e.g. `data/posts_summary.json` for `data/posts.csv`
pub fn summary_path_for(items_path: &Path) -> PathBuf {
    let stem = items_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("collection");
    items_path.with_file_name(format!("{stem}_summary.json"))
}
