use super::WorkflowArgs;
use crate::output::{print_fields, print_json, print_table};
use agentflow_core::io;
use agentflow_core::message::SystemClock;
use agentflow_core::orchestrator::{
    Orchestrator, PhaseOutcome, PhaseRun, Retrospective, WorkflowContext,
};
use agentflow_core::paths;
use agentflow_core::phase::PhaseChain;
use agentflow_core::store::FsStore;
use agentflow_core::types::{PhaseName, Role};
use agentflow_core::vcs::GitCli;
use agentflow_core::FlowError;
use anyhow::Context;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Feature name; becomes a directory under .agentflow/
    pub feature: String,

    /// Role driving the run: coordinator, implementer or verifier
    #[arg(long, default_value = "coordinator")]
    pub role: String,

    /// Write documents without staging or committing them
    #[arg(long)]
    pub no_commit: bool,

    #[command(flatten)]
    pub workflow: WorkflowArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PhaseArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// One-line summary for the completion report
    #[arg(long)]
    pub summary: Option<String>,

    /// Retrospective insight (repeatable)
    #[arg(long = "insight")]
    pub insights: Vec<String>,

    /// Retrospective challenge (repeatable)
    #[arg(long = "challenge")]
    pub challenges: Vec<String>,

    /// Retrospective solution (repeatable)
    #[arg(long = "solution")]
    pub solutions: Vec<String>,
}

type CliOrchestrator = Orchestrator<FsStore, GitCli, SystemClock>;

fn orchestrator(root: &Path, run: &RunArgs) -> anyhow::Result<(CliOrchestrator, Role)> {
    let (config, workflow) = super::resolve_workflow(root, &run.workflow)?;
    let role: Role = run.role.parse()?;
    let orch = Orchestrator::new(FsStore, GitCli::new(root), SystemClock, workflow)
        .context("failed to build phase chain")?
        .with_commits(config.commit_enabled() && !run.no_commit);
    Ok((orch, role))
}

/// Run one phase: instruction, phase brief, report, retrospective, commit.
pub fn run(root: &Path, phase: PhaseName, args: PhaseArgs, json: bool) -> anyhow::Result<()> {
    let (orch, role) = orchestrator(root, &args.run)?;
    let ctx = WorkflowContext::new(root, phase, args.run.feature.as_str(), role);

    let retrospective = Retrospective {
        insights: args.insights,
        challenges: args.challenges,
        solutions: args.solutions,
    };
    let summary = args.summary;

    let run = orch
        .run_phase(&ctx, |ctx| {
            let mut outcome = write_brief(orch.chain(), ctx)?.with_retrospective(retrospective);
            outcome.summary = summary;
            Ok::<_, FlowError>(outcome)
        })
        .with_context(|| format!("{phase} phase failed for '{}'", ctx.feature_name))?;

    if json {
        print_json(&run)
    } else {
        print_run(&run);
        Ok(())
    }
}

/// Run the whole chain for a feature, one phase after another.
pub fn full(root: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let (orch, role) = orchestrator(root, &args)?;
    let workflow = orch
        .run_workflow(root, &args.feature, role, |ctx| write_brief(orch.chain(), ctx))
        .with_context(|| {
            let variant = orch.chain().variant();
            format!("{variant} workflow failed for '{}'", args.feature)
        })?;

    if json {
        return print_json(&workflow);
    }
    let rows: Vec<Vec<String>> = workflow
        .runs
        .iter()
        .map(|r| {
            vec![
                r.phase.to_string(),
                r.report.display().to_string(),
                commit_summary(r),
            ]
        })
        .collect();
    print_table(&["PHASE", "REPORT", "COMMIT"], &rows);
    for record in workflow.skipped() {
        println!("skipped: {} ({})", record.phase, record.deliverable);
    }
    println!("Plan: {}", workflow.plan.display());
    Ok(())
}

/// Scaffold `.agentflow/features/<feature>/<phase>.md` listing the phase's
/// deliverables. An existing brief is left as the agents wrote it.
fn write_brief(chain: &PhaseChain, ctx: &WorkflowContext) -> Result<PhaseOutcome, FlowError> {
    let phase = chain.get(ctx.current_phase)?;
    let path = paths::phase_brief_path(&ctx.project_root, &ctx.feature_name, phase.name);

    let mut brief = format!(
        "# {}: {}\n\n{}\n\n## Deliverables\n\n",
        ctx.feature_name, phase.name, phase.description
    );
    for deliverable in &phase.deliverables {
        brief.push_str(&format!("- [ ] {deliverable}\n"));
    }
    if !io::write_if_missing(&path, brief.as_bytes())? {
        tracing::debug!(path = %path.display(), "phase brief exists, keeping it");
    }

    Ok(PhaseOutcome::default().with_affected_path(path))
}

fn commit_summary(run: &PhaseRun) -> String {
    let commit = &run.commit;
    if !commit.enabled {
        return "disabled".to_string();
    }
    match (&commit.message, &commit.error) {
        _ if commit.committed => "committed".to_string(),
        (_, Some(err)) => format!("failed: {err}"),
        _ => "skipped (nothing staged)".to_string(),
    }
}

fn print_run(run: &PhaseRun) {
    let opt = |p: &Option<std::path::PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let mut commit = commit_summary(run);
    if let Some(message) = run.commit.message.as_deref().filter(|_| run.commit.committed) {
        commit = format!("{commit} \"{message}\"");
    }
    print_fields(&[
        ("Feature", run.feature.clone()),
        ("Phase", run.phase.to_string()),
        ("Role", run.role.to_string()),
        ("Instruction", opt(&run.instruction)),
        ("Report", run.report.display().to_string()),
        ("Retrospective", opt(&run.retrospective)),
        ("Commit", commit),
        (
            "Next",
            run.next_phase
                .map(|p| p.to_string())
                .unwrap_or_else(|| "(terminal)".to_string()),
        ),
    ]);
    for failure in &run.commit.stage.failed {
        eprintln!(
            "warning: could not stage {}: {}",
            failure.path.display(),
            failure.reason
        );
    }
}
