//! Version-control adapter.
//!
//! Staging is best-effort per path: each failure is recorded in a
//! [`StageReport`] instead of aborting the batch. Commit failures are
//! surfaced as errors, and the orchestrator treats them as non-fatal.

use crate::error::{FlowError, Result};
use serde::Serialize;
#[cfg(test)]
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub staged: Vec<PathBuf>,
    pub failed: Vec<StageFailure>,
}

impl StageReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub trait VersionControl {
    fn stage(&self, paths: &[PathBuf]) -> StageReport;
    fn commit(&self, message: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

/// Shells out to `git` in a working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// `git add` resolves pathspecs against `workdir`, so paths under it
    /// are passed relative to it. A relative `workdir` would otherwise be
    /// applied twice.
    fn pathspec<'a>(&self, path: &'a Path) -> &'a Path {
        match path.strip_prefix(&self.workdir) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => path,
        }
    }

    fn run_checked(&self, args: &[&str]) -> Result<()> {
        debug!(?args, "git");
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| FlowError::Vcs(format!("failed to spawn git: {e}")))?;
        if out.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        Err(FlowError::Vcs(format!(
            "git {} failed ({}): {}",
            args.join(" "),
            out.status,
            stderr
        )))
    }
}

impl VersionControl for GitCli {
    fn stage(&self, paths: &[PathBuf]) -> StageReport {
        let mut report = StageReport::default();
        for path in paths {
            let arg = self.pathspec(path).to_string_lossy();
            match self.run_checked(&["add", "--", &arg]) {
                Ok(()) => report.staged.push(path.clone()),
                Err(e) => report.failed.push(StageFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        report
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.run_checked(&["commit", "-m", message])
    }
}

// ---------------------------------------------------------------------------
// RecordingVcs
// ---------------------------------------------------------------------------

/// Records calls in memory; optionally fails staging or committing.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingVcs {
    pub fail_stage: bool,
    pub fail_commit: bool,
    staged: RefCell<Vec<PathBuf>>,
    commits: RefCell<Vec<String>>,
}

#[cfg(test)]
impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_stage() -> Self {
        Self {
            fail_stage: true,
            ..Self::default()
        }
    }

    pub fn failing_commit() -> Self {
        Self {
            fail_commit: true,
            ..Self::default()
        }
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        self.staged.borrow().clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.borrow().clone()
    }
}

#[cfg(test)]
impl VersionControl for RecordingVcs {
    fn stage(&self, paths: &[PathBuf]) -> StageReport {
        let mut report = StageReport::default();
        for path in paths {
            if self.fail_stage {
                report.failed.push(StageFailure {
                    path: path.clone(),
                    reason: "stage refused".to_string(),
                });
            } else {
                self.staged.borrow_mut().push(path.clone());
                report.staged.push(path.clone());
            }
        }
        report
    }

    fn commit(&self, message: &str) -> Result<()> {
        if self.fail_commit {
            return Err(FlowError::Vcs("commit refused".to_string()));
        }
        self.commits.borrow_mut().push(message.to_string());
        Ok(())
    }
}

impl<V: VersionControl + ?Sized> VersionControl for &V {
    fn stage(&self, paths: &[PathBuf]) -> StageReport {
        (**self).stage(paths)
    }

    fn commit(&self, message: &str) -> Result<()> {
        (**self).commit(message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) -> String {
        let out = Command::new("git").args(args).current_dir(dir).output().unwrap();
        assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
        String::from_utf8_lossy(&out.stdout).into_owned()
    }

    fn init_repo(dir: &Path) {
        git(dir, &["init", "-q"]);
        git(dir, &["config", "user.name", "Agent"]);
        git(dir, &["config", "user.email", "agent@example.com"]);
        git(dir, &["config", "commit.gpgsign", "false"]);
    }

    #[test]
    fn git_stages_and_commits_in_repo() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        let report_file = dir.path().join(".agentflow/reports/Implementer/doc.md");
        std::fs::create_dir_all(report_file.parent().unwrap()).unwrap();
        std::fs::write(&report_file, "done").unwrap();

        let git_cli = GitCli::new(dir.path());
        let report = git_cli.stage(&[report_file.clone()]);
        assert!(report.is_clean(), "{:?}", report.failed);
        assert_eq!(report.staged, vec![report_file]);

        git_cli.commit("docs(auth): design phase").unwrap();
        assert_eq!(git(dir.path(), &["log", "--format=%s"]).trim(), "docs(auth): design phase");
        let tracked = git(dir.path(), &["ls-files"]);
        assert_eq!(tracked.trim(), ".agentflow/reports/Implementer/doc.md");
    }

    #[test]
    fn pathspec_is_relative_to_workdir() {
        let git_cli = GitCli::new("proj");
        let joined = Path::new("proj").join(".agentflow/reports/Verifier/doc.md");
        assert_eq!(
            git_cli.pathspec(&joined),
            Path::new(".agentflow/reports/Verifier/doc.md")
        );
        // Paths outside the working directory go through untouched.
        assert_eq!(git_cli.pathspec(Path::new("/elsewhere/x.md")), Path::new("/elsewhere/x.md"));
    }

    #[test]
    fn git_stage_outside_repo_records_failures() {
        // Not a git repository, so every path fails (or git is absent).
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.md");
        std::fs::write(&file, "x").unwrap();
        let git = GitCli::new(dir.path());
        let report = git.stage(&[file.clone()]);
        assert!(report.staged.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, file);
        assert!(git.commit("msg").is_err());
    }

    #[test]
    fn recording_vcs_tracks_calls() {
        let vcs = RecordingVcs::new();
        let report = vcs.stage(&[PathBuf::from("a.md"), PathBuf::from("b.md")]);
        assert!(report.is_clean());
        vcs.commit("docs: design").unwrap();
        assert_eq!(vcs.staged().len(), 2);
        assert_eq!(vcs.commits(), vec!["docs: design"]);
    }

    #[test]
    fn recording_vcs_failures() {
        let vcs = RecordingVcs::failing_stage();
        let report = vcs.stage(&[PathBuf::from("a.md")]);
        assert!(!report.is_clean());
        assert!(RecordingVcs::failing_commit().commit("x").is_err());
    }
}
