use agentflow_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `AGENTFLOW_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of `cwd` containing `.agentflow/`
/// 3. Nearest ancestor of `cwd` containing `.git/`
/// 4. `cwd` itself
///
/// The result is always absolute, so document paths built from it agree
/// with git running inside the root.
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf());
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root(&cwd)
}

fn find_root(start: &Path) -> PathBuf {
    [paths::FLOW_DIR, ".git"]
        .iter()
        .find_map(|marker| nearest_with(start, marker))
        .unwrap_or_else(|| start.to_path_buf())
}

fn nearest_with(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}
