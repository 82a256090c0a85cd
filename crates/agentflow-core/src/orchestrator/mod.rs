//! Phase orchestrator.
//!
//! `run_phase` wraps a caller-supplied unit of work with the coordination
//! protocol: an instruction before, a report (and optionally a
//! retrospective) after, then a best-effort commit. Failures leave a
//! blocked report behind and are handed back to the caller unchanged.

pub mod context;

pub use context::{
    CommitReport, PhaseOutcome, PhaseRun, Retrospective, WorkflowContext, WorkflowRun,
};

use crate::error::FlowError;
use crate::message::{Clock, MessageBuilder};
use crate::paths;
use crate::phase::{self, build_chain, DeliverableRecord, Phase, PhaseChain, WorkflowConfig};
use crate::store::DocumentStore;
use crate::types::{ReportStatus, Role};
use crate::vcs::VersionControl;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// PhaseError
// ---------------------------------------------------------------------------

/// Error from [`Orchestrator::run_phase`].
///
/// `Work` carries the caller's own error untouched; `Flow` is anything the
/// orchestrator itself hit (unknown phase, document persistence).
#[derive(Debug)]
pub enum PhaseError<E> {
    Work(E),
    Flow(FlowError),
}

impl<E> PhaseError<E> {
    pub fn is_work(&self) -> bool {
        matches!(self, PhaseError::Work(_))
    }

    pub fn into_work(self) -> Option<E> {
        match self {
            PhaseError::Work(e) => Some(e),
            PhaseError::Flow(_) => None,
        }
    }
}

impl<E> From<FlowError> for PhaseError<E> {
    fn from(e: FlowError) -> Self {
        PhaseError::Flow(e)
    }
}

impl<E: fmt::Display> fmt::Display for PhaseError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseError::Work(e) => fmt::Display::fmt(e, f),
            PhaseError::Flow(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for PhaseError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PhaseError::Work(e) => std::error::Error::source(e),
            PhaseError::Flow(e) => std::error::Error::source(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<S, V, C> {
    store: S,
    vcs: V,
    messages: MessageBuilder<C>,
    config: WorkflowConfig,
    chain: PhaseChain,
    commits: bool,
}

impl<S: DocumentStore, V: VersionControl, C: Clock> Orchestrator<S, V, C> {
    /// Builds the phase chain up front, so a bad configuration fails here
    /// rather than halfway through a run.
    pub fn new(store: S, vcs: V, clock: C, config: WorkflowConfig) -> crate::Result<Self> {
        let chain = build_chain(&config)?;
        Ok(Self {
            store,
            vcs,
            messages: MessageBuilder::new(clock),
            config,
            chain,
            commits: true,
        })
    }

    pub fn with_commits(mut self, enabled: bool) -> Self {
        self.commits = enabled;
        self
    }

    pub fn chain(&self) -> &PhaseChain {
        &self.chain
    }

    pub fn run_phase<F, E>(
        &self,
        ctx: &WorkflowContext,
        work: F,
    ) -> Result<PhaseRun, PhaseError<E>>
    where
        F: FnOnce(&WorkflowContext) -> Result<PhaseOutcome, E>,
        E: fmt::Display,
    {
        // Configuration problems are raised before anything is written.
        ctx.validate()?;
        let phase = self.chain.get(ctx.current_phase)?;
        info!(
            feature = %ctx.feature_name,
            phase = %phase.name,
            role = %ctx.role,
            "running phase"
        );

        let instruction = match self.write_instruction(ctx, phase) {
            Ok(path) => path,
            Err(e) => {
                self.record_blocked(ctx, phase, &e.to_string());
                return Err(PhaseError::Flow(e));
            }
        };

        let outcome = match work(ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record_blocked(ctx, phase, &e.to_string());
                return Err(PhaseError::Work(e));
            }
        };

        match self.complete(ctx, phase, instruction, outcome) {
            Ok(run) => Ok(run),
            Err(e) => {
                self.record_blocked(ctx, phase, &e.to_string());
                Err(PhaseError::Flow(e))
            }
        }
    }

    /// Run every phase of the chain in order, stopping at the first failure.
    ///
    /// The deliverable plan for the whole variant, skipped optional phases
    /// included, is written to `features/<feature>/workflow.md` first and
    /// committed along with the first phase.
    pub fn run_workflow<F, E>(
        &self,
        project_root: &Path,
        feature: &str,
        role: Role,
        mut work: F,
    ) -> Result<WorkflowRun, PhaseError<E>>
    where
        F: FnMut(&WorkflowContext) -> Result<PhaseOutcome, E>,
        E: fmt::Display,
    {
        let first = self.chain.first().name;
        WorkflowContext::new(project_root, first, feature, role).validate()?;

        let deliverables = phase::full_workflow(&self.config);
        let plan = paths::workflow_plan_path(project_root, feature);
        self.store.write(&plan, &self.render_plan(feature, &deliverables))?;
        for record in deliverables.iter().filter(|d| d.skipped) {
            info!(phase = %record.phase, "{}", record.deliverable);
        }

        let mut runs = Vec::with_capacity(self.chain.len());
        for name in self.chain.names() {
            let ctx = WorkflowContext::new(project_root, name, feature, role);
            let run = if runs.is_empty() {
                self.run_phase(&ctx, |c: &WorkflowContext| {
                    work(c).map(|outcome| outcome.with_affected_path(plan.clone()))
                })?
            } else {
                self.run_phase(&ctx, &mut work)?
            };
            runs.push(run);
        }

        Ok(WorkflowRun {
            feature: feature.to_string(),
            variant: self.chain.variant(),
            plan,
            deliverables,
            runs,
        })
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn write_instruction(
        &self,
        ctx: &WorkflowContext,
        phase: &Phase,
    ) -> crate::Result<Option<PathBuf>> {
        let Some(request) = phase::instruction_request(phase, &ctx.feature_name) else {
            debug!(phase = %phase.name, "no instruction route");
            return Ok(None);
        };
        let instruction = self.messages.build_instruction(request)?;
        let path = paths::instruction_path(&ctx.project_root, &instruction.id);
        self.store.write(&path, &instruction.render())?;
        debug!(path = %path.display(), "instruction written");
        Ok(Some(path))
    }

    fn complete(
        &self,
        ctx: &WorkflowContext,
        phase: &Phase,
        instruction: Option<PathBuf>,
        outcome: PhaseOutcome,
    ) -> crate::Result<PhaseRun> {
        let feature = ctx.feature_name.as_str();

        let mut request = phase::report_request(phase, feature, ReportStatus::Completed);
        request.summary = Some(
            outcome
                .summary
                .unwrap_or_else(|| format!("{} phase completed for {feature}", phase.name)),
        );
        request.completed_items = if outcome.completed_items.is_empty() {
            phase.deliverables.clone()
        } else {
            outcome.completed_items
        };
        request.blocked_items = outcome.blocked_items;
        request.next_actions = if outcome.next_actions.is_empty() {
            vec![match phase.next_phase {
                Some(next) => format!("Start the {next} phase"),
                None => format!("Close out the {feature} workflow"),
            }]
        } else {
            outcome.next_actions
        };

        let report = self.messages.build_report(request)?;
        let report_path = paths::report_path(&ctx.project_root, &report.id);
        self.store.write(&report_path, &report.render())?;
        debug!(path = %report_path.display(), "report written");

        let retrospective = match outcome.retrospective.filter(|r| !r.is_empty()) {
            Some(retro) => {
                let timestamp = self.messages.clock().now();
                let path =
                    paths::retrospective_path(&ctx.project_root, feature, &timestamp, phase.name);
                self.store
                    .write(&path, &retro.render(feature, phase.name, &timestamp))?;
                debug!(path = %path.display(), "retrospective written");
                Some(path)
            }
            None => None,
        };

        let mut to_stage: Vec<PathBuf> = instruction.iter().cloned().collect();
        to_stage.push(report_path.clone());
        to_stage.extend(retrospective.iter().cloned());
        to_stage.extend(outcome.affected_paths);
        let commit = self.commit(feature, phase, &to_stage);

        Ok(PhaseRun {
            feature: feature.to_string(),
            phase: phase.name,
            role: ctx.role,
            instruction,
            report: report_path,
            retrospective,
            commit,
            next_phase: phase.next_phase,
        })
    }

    /// Stage and commit. Never fails the phase; problems end up as warnings
    /// and in the returned report.
    fn commit(&self, feature: &str, phase: &Phase, to_stage: &[PathBuf]) -> CommitReport {
        if !self.commits {
            debug!("commits disabled");
            return CommitReport::default();
        }

        let stage = self.vcs.stage(to_stage);
        for failure in &stage.failed {
            warn!(path = %failure.path.display(), reason = %failure.reason, "failed to stage");
        }

        let message = format!("docs({feature}): {} phase", phase.name);
        let mut report = CommitReport {
            enabled: true,
            stage,
            committed: false,
            message: None,
            error: None,
        };
        if report.stage.staged.is_empty() {
            warn!(feature, phase = %phase.name, "nothing staged, skipping commit");
            return report;
        }

        match self.vcs.commit(&message) {
            Ok(()) => {
                info!(%message, "committed");
                report.committed = true;
            }
            Err(e) => {
                warn!(error = %e, "commit failed");
                report.error = Some(e.to_string());
            }
        }
        report.message = Some(message);
        report
    }

    fn render_plan(&self, feature: &str, deliverables: &[DeliverableRecord]) -> String {
        let mut doc = format!("# Workflow plan: {feature}\n\n");
        doc.push_str(&format!("- **Variant**: {}\n", self.chain.variant()));
        doc.push_str(&format!("- **Generated**: {}\n\n", self.messages.clock().now()));
        doc.push_str("## Deliverables\n\n");
        for record in deliverables {
            let mark = if record.skipped { "skipped" } else { " " };
            doc.push_str(&format!("- [{mark}] {}: {}\n", record.phase, record.deliverable));
        }
        doc
    }

    /// Best-effort audit trail for a failed phase. Any error here is logged
    /// and dropped so the original failure is the one the caller sees.
    fn record_blocked(&self, ctx: &WorkflowContext, phase: &Phase, reason: &str) {
        let mut request = phase::report_request(phase, &ctx.feature_name, ReportStatus::Blocked);
        request.summary = Some(format!("{} phase failed: {reason}", phase.name));
        request.blocked_items = vec![reason.to_string()];
        request.next_actions = vec![format!(
            "Resolve the blocker and re-run the {} phase",
            phase.name
        )];

        let written = self.messages.build_report(request).and_then(|report| {
            let path = paths::report_path(&ctx.project_root, &report.id);
            self.store.write(&path, &report.render()).map(|()| path)
        });
        match written {
            Ok(path) => warn!(phase = %phase.name, path = %path.display(), "phase blocked"),
            Err(e) => warn!(phase = %phase.name, error = %e, "failed to write blocked report"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FixedClock;
    use crate::store::MemoryStore;
    use crate::types::PhaseName;
    use crate::vcs::RecordingVcs;

    const ROOT: &str = "/proj";
    const TS: &str = "202601151030";

    fn ctx(phase: PhaseName) -> WorkflowContext {
        WorkflowContext::new(ROOT, phase, "auth", Role::Coordinator)
    }

    fn orchestrator<'a>(
        store: &'a MemoryStore,
        vcs: &'a RecordingVcs,
        config: WorkflowConfig,
    ) -> Orchestrator<&'a MemoryStore, &'a RecordingVcs, FixedClock> {
        Orchestrator::new(store, vcs, FixedClock::new(TS), config).unwrap()
    }

    fn ok(_: &WorkflowContext) -> Result<PhaseOutcome, String> {
        Ok(PhaseOutcome::default())
    }

    fn reports_under(store: &MemoryStore, role: &str) -> Vec<String> {
        store
            .list(&Path::new(ROOT).join(".agentflow/reports").join(role))
            .unwrap()
    }

    #[test]
    fn success_writes_instruction_report_and_commits() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let orch = orchestrator(&store, &vcs, WorkflowConfig::standard());

        let run = orch.run_phase(&ctx(PhaseName::Design), ok).unwrap();

        let instruction = run.instruction.clone().unwrap();
        assert_eq!(
            instruction,
            Path::new(ROOT)
                .join(".agentflow/instructions/Implementer")
                .join("202601151030_coordinator_to_implementer_auth-design-phase.md")
        );
        assert!(run.report.starts_with("/proj/.agentflow/reports/Implementer"));
        let report = store.read(&run.report).unwrap();
        assert!(report.contains("- **Status**: completed"));
        assert!(report.contains("- Architecture design"));
        assert!(report.contains("- Start the tasks phase"));

        assert_eq!(run.next_phase, Some(PhaseName::Tasks));
        assert!(run.commit.committed);
        assert_eq!(vcs.commits(), vec!["docs(auth): design phase"]);
        assert_eq!(vcs.staged(), vec![instruction, run.report.clone()]);
    }

    #[test]
    fn requirements_phase_has_no_instruction() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let run = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&ctx(PhaseName::Requirements), ok)
            .unwrap();
        assert!(run.instruction.is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(reports_under(&store, "Coordinator").len(), 1);
    }

    #[test]
    fn quality_instruction_is_self_addressed() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let run = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&ctx(PhaseName::Quality), ok)
            .unwrap();
        let path = run.instruction.unwrap();
        assert!(path.starts_with("/proj/.agentflow/instructions/Verifier"));
        assert!(store.read(&path).unwrap().contains("- **Priority**: high"));
        assert_eq!(run.next_phase, None);
    }

    #[test]
    fn unknown_phase_fails_before_writing() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let err = orchestrator(&store, &vcs, WorkflowConfig::prototype())
            .run_phase(&ctx(PhaseName::Quality), ok)
            .unwrap_err();
        match err {
            PhaseError::Flow(e) => assert!(e.is_config()),
            PhaseError::Work(_) => panic!("expected a flow error"),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn invalid_feature_name_fails_before_writing() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let bad = WorkflowContext::new(ROOT, PhaseName::Design, "../escape", Role::Coordinator);
        assert!(orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&bad, ok)
            .is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn work_error_is_returned_with_blocked_report() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let err = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&ctx(PhaseName::Implementation), |_| {
                Err::<PhaseOutcome, _>("compiler exploded".to_string())
            })
            .unwrap_err();

        assert_eq!(err.into_work().as_deref(), Some("compiler exploded"));
        let reports = reports_under(&store, "Implementer");
        assert_eq!(reports.len(), 1);
        let doc = store
            .read(&Path::new(ROOT).join(".agentflow/reports/Implementer").join(&reports[0]))
            .unwrap();
        assert!(doc.contains("- **Status**: blocked"));
        assert!(doc.contains("- compiler exploded"));
        assert!(vcs.commits().is_empty());
    }

    #[test]
    fn work_error_survives_failed_blocked_report() {
        let store = MemoryStore::new();
        store.fail_writes_under("/proj/.agentflow/reports");
        let vcs = RecordingVcs::new();
        let err = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&ctx(PhaseName::Testing), |_| {
                Err::<PhaseOutcome, _>("flaky suite".to_string())
            })
            .unwrap_err();
        assert!(err.is_work());
        assert_eq!(err.to_string(), "flaky suite");
        // Only the instruction made it to the store.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn instruction_write_failure_leaves_blocked_report() {
        let store = MemoryStore::new();
        store.fail_writes_under("/proj/.agentflow/instructions");
        let vcs = RecordingVcs::new();
        let mut called = false;
        let err = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&ctx(PhaseName::Design), |_| {
                called = true;
                Ok::<_, String>(PhaseOutcome::default())
            })
            .unwrap_err();
        assert!(matches!(err, PhaseError::Flow(FlowError::Io(_))));
        assert!(!called);
        assert_eq!(reports_under(&store, "Implementer").len(), 1);
    }

    #[test]
    fn commit_failure_is_not_fatal() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::failing_commit();
        let run = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&ctx(PhaseName::Tasks), ok)
            .unwrap();
        assert!(!run.commit.committed);
        assert_eq!(run.commit.error.as_deref(), Some("version control: commit refused"));
    }

    #[test]
    fn stage_failure_skips_commit() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::failing_stage();
        let run = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&ctx(PhaseName::Tasks), ok)
            .unwrap();
        assert_eq!(run.commit.stage.failed.len(), 2);
        assert!(!run.commit.committed);
        assert!(vcs.commits().is_empty());
    }

    #[test]
    fn commits_can_be_disabled() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let run = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .with_commits(false)
            .run_phase(&ctx(PhaseName::Design), ok)
            .unwrap();
        assert!(!run.commit.enabled);
        assert!(vcs.staged().is_empty());
    }

    #[test]
    fn retrospective_and_affected_paths_are_staged() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let orch = orchestrator(&store, &vcs, WorkflowConfig::standard());
        let run = orch
            .run_phase(&ctx(PhaseName::Implementation), |_| {
                Ok::<_, String>(
                    PhaseOutcome::default()
                        .with_summary("login flow done")
                        .with_retrospective(Retrospective {
                            challenges: vec!["token refresh race".to_string()],
                            ..Retrospective::default()
                        })
                        .with_affected_path("/proj/src/login.rs"),
                )
            })
            .unwrap();

        let retro = run.retrospective.clone().unwrap();
        assert_eq!(
            retro,
            PathBuf::from("/proj/.agentflow/retrospectives/auth/202601151030_implementation.md")
        );
        assert!(store.read(&retro).unwrap().contains("- token refresh race"));
        assert!(store.read(&run.report).unwrap().contains("login flow done"));
        let staged = vcs.staged();
        assert_eq!(staged.len(), 4);
        assert_eq!(staged[3], PathBuf::from("/proj/src/login.rs"));
    }

    #[test]
    fn empty_retrospective_is_not_written() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let run = orchestrator(&store, &vcs, WorkflowConfig::standard())
            .run_phase(&ctx(PhaseName::Design), |_| {
                Ok::<_, String>(
                    PhaseOutcome::default().with_retrospective(Retrospective::default()),
                )
            })
            .unwrap();
        assert!(run.retrospective.is_none());
    }

    #[test]
    fn run_workflow_walks_the_chain() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let config = WorkflowConfig::prototype().with_user_testing(true);
        let orch = orchestrator(&store, &vcs, config);
        let mut seen = Vec::new();
        let workflow = orch
            .run_workflow(Path::new(ROOT), "auth", Role::Coordinator, |c| {
                seen.push(c.current_phase);
                Ok::<_, String>(PhaseOutcome::default())
            })
            .unwrap();
        assert_eq!(seen, orch.chain().names());
        assert_eq!(workflow.runs.len(), 5);
        assert_eq!(workflow.runs.last().unwrap().next_phase, None);
        assert_eq!(workflow.skipped().count(), 0);
        assert_eq!(vcs.commits().len(), 5);
    }

    #[test]
    fn run_workflow_records_skipped_phases() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let orch = orchestrator(&store, &vcs, WorkflowConfig::prototype());
        let workflow = orch
            .run_workflow(Path::new(ROOT), "auth", Role::Coordinator, ok)
            .unwrap();

        let ran: Vec<PhaseName> = workflow.runs.iter().map(|r| r.phase).collect();
        assert!(!ran.contains(&PhaseName::UserTest));
        let skipped: Vec<&DeliverableRecord> = workflow.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].phase, PhaseName::UserTest);

        assert_eq!(workflow.plan, Path::new(ROOT).join(".agentflow/features/auth/workflow.md"));
        let plan = store.read(&workflow.plan).unwrap();
        assert!(plan.contains("- **Variant**: prototype"));
        assert!(plan.contains("- [skipped] user-test:"));
        // The plan rides along with the first phase's commit.
        assert!(vcs.staged().contains(&workflow.plan));
        assert!(workflow.runs[0].commit.stage.staged.contains(&workflow.plan));
    }

    #[test]
    fn run_workflow_rejects_bad_feature_before_writing() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let orch = orchestrator(&store, &vcs, WorkflowConfig::standard());
        let err = orch
            .run_workflow(Path::new(ROOT), " auth", Role::Coordinator, ok)
            .unwrap_err();
        assert!(matches!(err, PhaseError::Flow(FlowError::Validation { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn run_workflow_stops_at_first_failure() {
        let store = MemoryStore::new();
        let vcs = RecordingVcs::new();
        let orch = orchestrator(&store, &vcs, WorkflowConfig::prototype());
        let err = orch
            .run_workflow(Path::new(ROOT), "auth", Role::Coordinator, |c| {
                if c.current_phase == PhaseName::Prototype {
                    Err("prototype rejected".to_string())
                } else {
                    Ok(PhaseOutcome::default())
                }
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "prototype rejected");
        assert_eq!(vcs.commits(), vec!["docs(auth): ui-mockup phase"]);
    }
}
