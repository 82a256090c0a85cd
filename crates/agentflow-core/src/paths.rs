use crate::message::MessageId;
use crate::types::{PhaseName, Role};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const FLOW_DIR: &str = ".agentflow";
pub const INSTRUCTIONS_DIR: &str = ".agentflow/instructions";
pub const REPORTS_DIR: &str = ".agentflow/reports";
pub const RETROSPECTIVES_DIR: &str = ".agentflow/retrospectives";
pub const FEATURES_DIR: &str = ".agentflow/features";

pub const CONFIG_FILE: &str = ".agentflow/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn flow_dir(root: &Path) -> PathBuf {
    root.join(FLOW_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Instructions are filed under the receiving role.
pub fn instruction_dir(root: &Path, to: Role) -> PathBuf {
    root.join(INSTRUCTIONS_DIR).join(to.dir_name())
}

pub fn instruction_path(root: &Path, id: &MessageId) -> PathBuf {
    instruction_dir(root, id.to).join(id.file_name())
}

/// Reports are filed under the sending role.
pub fn report_dir(root: &Path, from: Role) -> PathBuf {
    root.join(REPORTS_DIR).join(from.dir_name())
}

pub fn report_path(root: &Path, id: &MessageId) -> PathBuf {
    report_dir(root, id.from).join(id.file_name())
}

pub fn retrospective_dir(root: &Path, feature: &str) -> PathBuf {
    root.join(RETROSPECTIVES_DIR).join(feature)
}

pub fn retrospective_path(
    root: &Path,
    feature: &str,
    timestamp: &str,
    phase: PhaseName,
) -> PathBuf {
    retrospective_dir(root, feature).join(format!("{timestamp}_{phase}.md"))
}

pub fn feature_dir(root: &Path, feature: &str) -> PathBuf {
    root.join(FEATURES_DIR).join(feature)
}

pub fn phase_brief_path(root: &Path, feature: &str, phase: PhaseName) -> PathBuf {
    feature_dir(root, feature).join(format!("{phase}.md"))
}

/// Deliverable plan written at the start of a full-workflow run.
pub fn workflow_plan_path(root: &Path, feature: &str) -> PathBuf {
    feature_dir(root, feature).join("workflow.md")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
