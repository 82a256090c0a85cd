//! Per-run data model for the orchestrator.
//!
//! A `WorkflowContext` goes in, the caller's work returns a `PhaseOutcome`,
//! and the orchestrator hands back a `PhaseRun` describing what it persisted.

use crate::error::{FlowError, Result};
use crate::phase::DeliverableRecord;
use crate::types::{PhaseName, Role, WorkflowVariant};
use crate::vcs::StageReport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// WorkflowContext
// ---------------------------------------------------------------------------

/// Immutable input to one phase execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowContext {
    pub project_root: PathBuf,
    pub current_phase: PhaseName,
    pub feature_name: String,
    pub role: Role,
}

impl WorkflowContext {
    pub fn new(
        project_root: impl Into<PathBuf>,
        current_phase: PhaseName,
        feature_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            current_phase,
            feature_name: feature_name.into(),
            role,
        }
    }

    /// The feature name becomes a directory name, so it must be a single
    /// non-empty path component.
    pub fn validate(&self) -> Result<()> {
        let name = self.feature_name.as_str();
        if name.trim().is_empty() {
            return Err(FlowError::required("feature name"));
        }
        if name.trim() != name {
            return Err(FlowError::Validation {
                field: "feature name".to_string(),
                reason: format!("'{name}' has leading or trailing whitespace"),
            });
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(FlowError::Validation {
                field: "feature name".to_string(),
                reason: format!("'{name}' is not a single path component"),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Retrospective
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retrospective {
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
    #[serde(default)]
    pub solutions: Vec<String>,
}

impl Retrospective {
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty() && self.challenges.is_empty() && self.solutions.is_empty()
    }

    pub fn render(&self, feature: &str, phase: PhaseName, timestamp: &str) -> String {
        let mut out = format!("# Retrospective: {feature} / {phase}\n\n");
        out.push_str(&format!("- **Timestamp**: {timestamp}\n"));
        for (heading, items) in [
            ("Insights", &self.insights),
            ("Challenges", &self.challenges),
            ("Solutions", &self.solutions),
        ] {
            out.push_str(&format!("\n## {heading}\n\n"));
            if items.is_empty() {
                out.push_str(crate::message::PLACEHOLDER);
                out.push('\n');
            }
            for item in items {
                out.push_str(&format!("- {item}\n"));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// PhaseOutcome
// ---------------------------------------------------------------------------

/// What the caller's unit of work produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    #[serde(default)]
    pub summary: Option<String>,
    /// Falls back to the phase's declared deliverables when empty.
    #[serde(default)]
    pub completed_items: Vec<String>,
    #[serde(default)]
    pub blocked_items: Vec<String>,
    #[serde(default)]
    pub next_actions: Vec<String>,
    #[serde(default)]
    pub retrospective: Option<Retrospective>,
    /// Extra files to stage alongside the coordination documents.
    #[serde(default)]
    pub affected_paths: Vec<PathBuf>,
}

impl PhaseOutcome {
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_retrospective(mut self, retrospective: Retrospective) -> Self {
        self.retrospective = Some(retrospective);
        self
    }

    pub fn with_affected_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.affected_paths.push(path.into());
        self
    }
}

// ---------------------------------------------------------------------------
// PhaseRun
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    /// False when commits are turned off for this orchestrator.
    pub enabled: bool,
    pub stage: StageReport,
    pub committed: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRun {
    pub feature: String,
    pub phase: PhaseName,
    pub role: Role,
    pub instruction: Option<PathBuf>,
    pub report: PathBuf,
    pub retrospective: Option<PathBuf>,
    pub commit: CommitReport,
    pub next_phase: Option<PhaseName>,
}

/// Result of a full-workflow run. `deliverables` covers the whole variant
/// template, so disabled optional phases appear as `skipped` records even
/// though they have no entry in `runs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowRun {
    pub feature: String,
    pub variant: WorkflowVariant,
    pub plan: PathBuf,
    pub deliverables: Vec<DeliverableRecord>,
    pub runs: Vec<PhaseRun>,
}

impl WorkflowRun {
    pub fn skipped(&self) -> impl Iterator<Item = &DeliverableRecord> {
        self.deliverables.iter().filter(|d| d.skipped)
    }
}
