//! File discovery: which workbooks in a directory take part in a run.

use std::path::Path;

use walkdir::WalkDir;

use crate::error::{CombineError, CombineResult};
use crate::types::CandidateFile;

/// Extensions (compared case-insensitively) accepted as input workbooks.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

/// Prefix of the lock files office suites create next to an open workbook.
pub const LOCK_FILE_PREFIX: &str = "~$";

/// Result of a directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Qualifying files, sorted by full path, without duplicates.
    pub files: Vec<CandidateFile>,
    /// Entries below the root that could not be visited (permission denied, symlink loop).
    pub warnings: Vec<String>,
}

/// Returns `true` if `path` names an accepted workbook that is not a lock file.
///
/// Only the name is inspected; the caller decides whether the entry is a regular file.
pub fn is_candidate_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with(LOCK_FILE_PREFIX) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ACCEPTED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Scan `root` for candidate workbooks.
///
/// Non-recursive mode lists only direct children; recursive mode walks every subdirectory.
/// An empty result is not an error. Failing to read `root` itself is.
pub fn locate_candidates(root: impl AsRef<Path>, recursive: bool) -> CombineResult<Discovery> {
    let root = root.as_ref();
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut discovery = Discovery::default();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => return Err(CombineError::Walk(e)),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                discovery.warnings.push(e.to_string());
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_candidate_name(entry.path()) {
            continue;
        }
        discovery.files.push(CandidateFile::new(entry.into_path()));
    }

    // Whole-path string order: `sub-x.xlsx` sorts before `sub/a.xlsx`.
    discovery.files.sort_by(|a, b| a.path.as_os_str().cmp(b.path.as_os_str()));
    discovery.files.dedup_by(|a, b| a.path == b.path);

    tracing::debug!(
        root = %root.display(),
        recursive,
        found = discovery.files.len(),
        "candidate scan finished"
    );
    Ok(discovery)
}
