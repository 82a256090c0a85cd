use crate::error::{FlowError, Result};
use crate::paths;
use crate::phase::WorkflowConfig;
use crate::todo::{RuleOptions, RuleOverrides};
use crate::types::WorkflowVariant;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// WorkflowSection
// ---------------------------------------------------------------------------

/// Workflow settings as written by a user; every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<WorkflowVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_user_testing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_fdd: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

impl WorkflowSection {
    /// Field-by-field overlay: values set in `other` win.
    pub fn overlay(&self, other: &WorkflowSection) -> WorkflowSection {
        WorkflowSection {
            variant: other.variant.or(self.variant),
            enable_user_testing: other.enable_user_testing.or(self.enable_user_testing),
            enable_fdd: other.enable_fdd.or(self.enable_fdd),
            framework: other.framework.clone().or_else(|| self.framework.clone()),
        }
    }

    pub fn resolve(&self) -> WorkflowConfig {
        let defaults = WorkflowConfig::default();
        WorkflowConfig {
            variant: self.variant.unwrap_or(defaults.variant),
            enable_user_testing: self
                .enable_user_testing
                .unwrap_or(defaults.enable_user_testing),
            enable_fdd: self.enable_fdd.unwrap_or(defaults.enable_fdd),
            framework: self
                .framework
                .clone()
                .filter(|f| !f.trim().is_empty())
                .or(defaults.framework),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub workflow: WorkflowSection,
    #[serde(default)]
    pub rules: RuleOverrides,
    /// Commit persisted documents after each successful phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<bool>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            workflow: WorkflowSection::default(),
            rules: RuleOverrides::default(),
            commit: None,
        }
    }
}

impl Config {
    /// Load `.agentflow/config.yaml`; a missing file means all defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)
            .map_err(|e| FlowError::InvalidConfig(format!("{}: {e}", path.display())))?;
        if cfg.version != 1 {
            return Err(FlowError::InvalidConfig(format!(
                "unsupported config version {}",
                cfg.version
            )));
        }
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn workflow_config(&self, overrides: &WorkflowSection) -> WorkflowConfig {
        self.workflow.overlay(overrides).resolve()
    }

    pub fn rule_options(&self) -> RuleOptions {
        RuleOptions::resolve(&self.rules)
    }

    pub fn commit_enabled(&self) -> bool {
        self.commit.unwrap_or(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
