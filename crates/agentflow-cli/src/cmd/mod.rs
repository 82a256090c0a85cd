pub mod chain;
pub mod init;
pub mod phase;
pub mod todo;

use agentflow_core::config::{Config, WorkflowSection};
use agentflow_core::phase::WorkflowConfig;
use agentflow_core::types::WorkflowVariant;
use anyhow::Context;
use clap::Args;
use std::path::Path;

/// Flags that shape the phase chain. Unset flags fall back to
/// `.agentflow/config.yaml`, then to the built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct WorkflowArgs {
    /// Workflow variant: standard or prototype
    #[arg(long)]
    pub variant: Option<String>,

    /// Add the user-test phase to the prototype workflow
    #[arg(long)]
    pub user_testing: bool,

    /// Add ui-design and component-design to the standard workflow
    #[arg(long)]
    pub fdd: bool,

    /// UI framework named in UI-facing deliverables (e.g. react, vue)
    #[arg(long)]
    pub framework: Option<String>,
}

impl WorkflowArgs {
    fn overrides(&self) -> anyhow::Result<WorkflowSection> {
        let variant = self
            .variant
            .as_deref()
            .map(str::parse::<WorkflowVariant>)
            .transpose()
            .context("invalid --variant")?;
        Ok(WorkflowSection {
            variant,
            enable_user_testing: self.user_testing.then_some(true),
            enable_fdd: self.fdd.then_some(true),
            framework: self.framework.clone(),
        })
    }
}

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

/// Config file plus flag overrides, resolved into a workflow configuration.
pub fn resolve_workflow(
    root: &Path,
    args: &WorkflowArgs,
) -> anyhow::Result<(Config, WorkflowConfig)> {
    let config = load_config(root)?;
    let workflow = config.workflow_config(&args.overrides()?);
    Ok((config, workflow))
}
