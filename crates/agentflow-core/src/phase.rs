//! Phase state machine.
//!
//! Each [`WorkflowVariant`] has a fixed template of phase slots. Optional
//! slots are spliced in only when their toggle is on, and the resulting
//! [`PhaseChain`] is a forward-only, singly linked list: phase `i` points at
//! phase `i + 1` and the last phase has no successor.

use crate::error::{FlowError, Result};
use crate::message::{InstructionRequest, ReportRequest};
use crate::types::{PhaseName, Priority, ReportStatus, Role, WorkflowVariant};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// WorkflowConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub variant: WorkflowVariant,
    /// Splice `user-test` between `prototype` and `implementation`.
    pub enable_user_testing: bool,
    /// Splice `ui-design` and `component-design` between `design` and `tasks`.
    pub enable_fdd: bool,
    /// Sub-workflow framework identifier, e.g. `react`.
    pub framework: Option<String>,
}

impl WorkflowConfig {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn prototype() -> Self {
        Self {
            variant: WorkflowVariant::Prototype,
            ..Self::default()
        }
    }

    pub fn with_user_testing(mut self, enabled: bool) -> Self {
        self.enable_user_testing = enabled;
        self
    }

    pub fn with_fdd(mut self, enabled: bool) -> Self {
        self.enable_fdd = enabled;
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    fn is_enabled(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::UserTesting => self.enable_user_testing,
            Toggle::FeatureDriven => self.enable_fdd,
        }
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    UserTesting,
    FeatureDriven,
}

impl Toggle {
    fn flag(self) -> &'static str {
        match self {
            Toggle::UserTesting => "user testing",
            Toggle::FeatureDriven => "feature-driven design",
        }
    }
}

struct Slot {
    name: PhaseName,
    toggle: Option<Toggle>,
}

const fn base(name: PhaseName) -> Slot {
    Slot { name, toggle: None }
}

const fn optional(name: PhaseName, toggle: Toggle) -> Slot {
    Slot {
        name,
        toggle: Some(toggle),
    }
}

const STANDARD: &[Slot] = &[
    base(PhaseName::Requirements),
    base(PhaseName::Design),
    optional(PhaseName::UiDesign, Toggle::FeatureDriven),
    optional(PhaseName::ComponentDesign, Toggle::FeatureDriven),
    base(PhaseName::Tasks),
    base(PhaseName::Implementation),
    base(PhaseName::Testing),
    base(PhaseName::Quality),
];

const PROTOTYPE: &[Slot] = &[
    base(PhaseName::UiMockup),
    base(PhaseName::Prototype),
    optional(PhaseName::UserTest, Toggle::UserTesting),
    base(PhaseName::Implementation),
    base(PhaseName::Integration),
];

fn template(variant: WorkflowVariant) -> &'static [Slot] {
    match variant {
        WorkflowVariant::Standard => STANDARD,
        WorkflowVariant::Prototype => PROTOTYPE,
    }
}

fn with_framework(label: &str, framework: Option<&str>) -> String {
    match framework {
        Some(fw) if !fw.trim().is_empty() => format!("{label} ({})", fw.trim()),
        _ => label.to_string(),
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|i| i.to_string()).collect()
}

fn describe(name: PhaseName, framework: Option<&str>) -> (&'static str, Vec<String>) {
    match name {
        PhaseName::Requirements => (
            "Capture what the feature must do and how success is judged.",
            owned(&["Requirements document", "User stories", "Acceptance criteria"]),
        ),
        PhaseName::Design => (
            "Decide the architecture, interfaces and data model.",
            owned(&["Architecture design", "Interface definitions", "Data model"]),
        ),
        PhaseName::UiDesign => (
            "Design the user interface for the chosen framework.",
            vec![
                with_framework("UI design", framework),
                "Design tokens".to_string(),
            ],
        ),
        PhaseName::ComponentDesign => (
            "Break the UI into components with explicit contracts.",
            vec![
                with_framework("Component hierarchy", framework),
                "Component interface contracts".to_string(),
            ],
        ),
        PhaseName::Tasks => (
            "Split the design into ordered, reviewable tasks.",
            owned(&["Task breakdown", "Dependency order"]),
        ),
        PhaseName::UiMockup => (
            "Sketch the screens and the flow between them.",
            owned(&["UI mockups", "Screen flow"]),
        ),
        PhaseName::Prototype => (
            "Build a throwaway prototype of the mocked-up flow.",
            vec![
                with_framework("Working prototype", framework),
                "Prototype walkthrough notes".to_string(),
            ],
        ),
        PhaseName::UserTest => (
            "Put the prototype in front of users and record findings.",
            owned(&["User test plan", "User feedback summary"]),
        ),
        PhaseName::Implementation => (
            "Write the production code and its unit tests.",
            owned(&["Source code changes", "Unit tests"]),
        ),
        PhaseName::Integration => (
            "Wire the implementation into the product and verify it end to end.",
            owned(&["Integrated build", "Integration test results"]),
        ),
        PhaseName::Testing => (
            "Exercise the implementation against the acceptance criteria.",
            owned(&["Test plan", "Test results"]),
        ),
        PhaseName::Quality => (
            "Gate the release on review findings and test evidence.",
            owned(&["Quality review", "Release readiness decision"]),
        ),
    }
}

// ---------------------------------------------------------------------------
// Phase / PhaseChain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: PhaseName,
    pub description: String,
    pub deliverables: Vec<String>,
    pub next_phase: Option<PhaseName>,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        self.next_phase.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseChain {
    variant: WorkflowVariant,
    phases: Vec<Phase>,
}

impl PhaseChain {
    /// Validate an ordered phase list: non-empty, no repeated phase, each
    /// phase linked to the next and exactly one terminal at the end.
    pub fn from_phases(variant: WorkflowVariant, phases: Vec<Phase>) -> Result<Self> {
        if phases.is_empty() {
            return Err(FlowError::MalformedChain("chain is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for phase in &phases {
            if !seen.insert(phase.name) {
                return Err(FlowError::MalformedChain(format!(
                    "phase '{}' appears more than once",
                    phase.name
                )));
            }
        }

        let terminals = phases.iter().filter(|p| p.is_terminal()).count();
        if terminals != 1 {
            return Err(FlowError::MalformedChain(format!(
                "expected exactly one terminal phase, found {terminals}"
            )));
        }

        for pair in phases.windows(2) {
            if pair[0].next_phase != Some(pair[1].name) {
                return Err(FlowError::MalformedChain(format!(
                    "phase '{}' must link forward to '{}'",
                    pair[0].name, pair[1].name
                )));
            }
        }

        Ok(Self { variant, phases })
    }

    pub fn variant(&self) -> WorkflowVariant {
        self.variant
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn names(&self) -> Vec<PhaseName> {
        self.phases.iter().map(|p| p.name).collect()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn first(&self) -> &Phase {
        &self.phases[0]
    }

    pub fn terminal(&self) -> &Phase {
        &self.phases[self.phases.len() - 1]
    }

    pub fn contains(&self, name: PhaseName) -> bool {
        self.phases.iter().any(|p| p.name == name)
    }

    /// Look up a phase; a phase outside the chain is a configuration error.
    pub fn get(&self, name: PhaseName) -> Result<&Phase> {
        self.phases
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| FlowError::UnknownPhase {
                phase: name.to_string(),
                variant: self.variant.to_string(),
            })
    }

    pub fn next_after(&self, current: PhaseName) -> Result<Option<PhaseName>> {
        Ok(self.get(current)?.next_phase)
    }
}

/// Build the phase chain for a configuration. Deterministic.
pub fn build_chain(config: &WorkflowConfig) -> Result<PhaseChain> {
    let names: Vec<PhaseName> = template(config.variant)
        .iter()
        .filter(|slot| slot.toggle.map_or(true, |t| config.is_enabled(t)))
        .map(|slot| slot.name)
        .collect();

    let phases = names
        .iter()
        .enumerate()
        .map(|(i, &name)| {
            let (description, deliverables) = describe(name, config.framework.as_deref());
            Phase {
                name,
                description: description.to_string(),
                deliverables,
                next_phase: names.get(i + 1).copied(),
            }
        })
        .collect();

    PhaseChain::from_phases(config.variant, phases)
}

/// Successor of `current`, or `None` at the terminal phase.
pub fn next_phase(current: PhaseName, config: &WorkflowConfig) -> Result<Option<PhaseName>> {
    build_chain(config)?.next_after(current)
}

// ---------------------------------------------------------------------------
// Full workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverableRecord {
    pub phase: PhaseName,
    pub deliverable: String,
    pub skipped: bool,
}

/// Walk the variant's whole template in order. Enabled phases contribute
/// their deliverables; each disabled optional phase contributes one
/// `skipped` record so the omission stays visible.
pub fn full_workflow(config: &WorkflowConfig) -> Vec<DeliverableRecord> {
    let mut records = Vec::new();
    for slot in template(config.variant) {
        match slot.toggle {
            Some(toggle) if !config.is_enabled(toggle) => records.push(DeliverableRecord {
                phase: slot.name,
                deliverable: format!("Skipped: {} is disabled", toggle.flag()),
                skipped: true,
            }),
            _ => {
                let (_, deliverables) = describe(slot.name, config.framework.as_deref());
                records.extend(deliverables.into_iter().map(|deliverable| DeliverableRecord {
                    phase: slot.name,
                    deliverable,
                    skipped: false,
                }));
            }
        }
    }
    records
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Who instructs whom for a phase, and who reports back to whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseRoute {
    pub instruction: Option<(Role, Role)>,
    pub report: (Role, Role),
}

impl PhaseRoute {
    /// The role doing the phase's work.
    pub fn performer(&self) -> Role {
        self.report.0
    }
}

pub fn route(name: PhaseName) -> PhaseRoute {
    use Role::{Coordinator, Implementer, Verifier};
    match name {
        PhaseName::Requirements => PhaseRoute {
            instruction: None,
            report: (Coordinator, Coordinator),
        },
        PhaseName::Testing | PhaseName::UserTest => PhaseRoute {
            instruction: Some((Coordinator, Verifier)),
            report: (Verifier, Coordinator),
        },
        // Verifier drives the gate itself; the self-addressed instruction is kept.
        PhaseName::Quality => PhaseRoute {
            instruction: Some((Verifier, Verifier)),
            report: (Verifier, Coordinator),
        },
        PhaseName::Design
        | PhaseName::UiDesign
        | PhaseName::ComponentDesign
        | PhaseName::Tasks
        | PhaseName::UiMockup
        | PhaseName::Prototype
        | PhaseName::Implementation
        | PhaseName::Integration => PhaseRoute {
            instruction: Some((Coordinator, Implementer)),
            report: (Implementer, Coordinator),
        },
    }
}

fn phase_task(phase: &Phase, feature: &str) -> String {
    format!("{feature}: {} phase", phase.name)
}

/// Instruction template for a phase, or `None` when the phase has no
/// instruction route.
pub fn instruction_request(phase: &Phase, feature: &str) -> Option<InstructionRequest> {
    let (from, to) = route(phase.name).instruction?;
    let priority = match phase.name {
        PhaseName::Implementation | PhaseName::Quality => Priority::High,
        _ => Priority::Medium,
    };
    let mut acceptance = vec![format!("Every {} deliverable is written", phase.name)];
    match phase.next_phase {
        Some(next) => acceptance.push(format!("Work is ready to hand off to {next}")),
        None => acceptance.push("Workflow can be closed".to_string()),
    }
    Some(InstructionRequest {
        from,
        to,
        task: phase_task(phase, feature),
        priority,
        context: Some(phase.description.clone()),
        requirements: phase.deliverables.clone(),
        acceptance_criteria: acceptance,
    })
}

/// Report template for a phase; the caller fills in the outcome lists.
pub fn report_request(phase: &Phase, feature: &str, status: ReportStatus) -> ReportRequest {
    let (from, to) = route(phase.name).report;
    ReportRequest::new(from, to, phase_task(phase, feature), status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prototype_chain_without_user_testing() {
        let chain = build_chain(&WorkflowConfig::prototype().with_user_testing(false)).unwrap();
        assert_eq!(
            chain.names(),
            vec![
                PhaseName::UiMockup,
                PhaseName::Prototype,
                PhaseName::Implementation,
                PhaseName::Integration
            ]
        );
    }

    #[test]
    fn prototype_chain_with_user_testing() {
        let chain = build_chain(&WorkflowConfig::prototype().with_user_testing(true)).unwrap();
        assert_eq!(
            chain.names(),
            vec![
                PhaseName::UiMockup,
                PhaseName::Prototype,
                PhaseName::UserTest,
                PhaseName::Implementation,
                PhaseName::Integration
            ]
        );
    }

    #[test]
    fn standard_chain_splices_fdd_phases() {
        let plain = build_chain(&WorkflowConfig::standard()).unwrap();
        assert_eq!(plain.len(), 6);
        assert!(!plain.contains(PhaseName::UiDesign));

        let fdd = build_chain(&WorkflowConfig::standard().with_fdd(true)).unwrap();
        assert_eq!(
            &fdd.names()[1..5],
            &[
                PhaseName::Design,
                PhaseName::UiDesign,
                PhaseName::ComponentDesign,
                PhaseName::Tasks
            ]
        );
    }

    #[test]
    fn chain_links_forward_with_single_terminal() {
        for config in [
            WorkflowConfig::standard(),
            WorkflowConfig::standard().with_fdd(true),
            WorkflowConfig::prototype(),
            WorkflowConfig::prototype().with_user_testing(true),
        ] {
            let chain = build_chain(&config).unwrap();
            assert_eq!(chain.phases().iter().filter(|p| p.is_terminal()).count(), 1);
            assert!(chain.terminal().is_terminal());
            assert_eq!(chain.first().name, chain.names()[0]);
        }
    }

    #[test]
    fn next_phase_terminal_is_none() {
        for config in [
            WorkflowConfig::prototype(),
            WorkflowConfig::prototype().with_user_testing(true),
        ] {
            assert_eq!(next_phase(PhaseName::Integration, &config).unwrap(), None);
        }
        assert_eq!(
            next_phase(PhaseName::Quality, &WorkflowConfig::standard()).unwrap(),
            None
        );
    }

    #[test]
    fn next_phase_follows_chain() {
        let config = WorkflowConfig::prototype().with_user_testing(true);
        assert_eq!(
            next_phase(PhaseName::Prototype, &config).unwrap(),
            Some(PhaseName::UserTest)
        );
        let config = WorkflowConfig::prototype();
        assert_eq!(
            next_phase(PhaseName::Prototype, &config).unwrap(),
            Some(PhaseName::Implementation)
        );
    }

    #[test]
    fn next_phase_outside_chain_is_config_error() {
        let err = next_phase(PhaseName::Quality, &WorkflowConfig::prototype()).unwrap_err();
        assert!(matches!(err, FlowError::UnknownPhase { .. }));
        assert!(err.is_config());

        // user-test only exists when enabled
        assert!(next_phase(PhaseName::UserTest, &WorkflowConfig::prototype()).is_err());
    }

    #[test]
    fn from_phases_rejects_malformed_chains() {
        let chain = build_chain(&WorkflowConfig::prototype()).unwrap();
        let mut phases = chain.phases().to_vec();

        // cycle back to the start
        let mut cyclic = phases.clone();
        cyclic.last_mut().unwrap().next_phase = Some(PhaseName::UiMockup);
        assert!(PhaseChain::from_phases(WorkflowVariant::Prototype, cyclic).is_err());

        // duplicate phase
        let mut dup = phases.clone();
        dup.push(phases[0].clone());
        assert!(PhaseChain::from_phases(WorkflowVariant::Prototype, dup).is_err());

        // two terminals
        phases[1].next_phase = None;
        assert!(matches!(
            PhaseChain::from_phases(WorkflowVariant::Prototype, phases),
            Err(FlowError::MalformedChain(_))
        ));

        assert!(PhaseChain::from_phases(WorkflowVariant::Prototype, Vec::new()).is_err());
    }

    #[test]
    fn full_workflow_records_skipped_phases() {
        let records = full_workflow(&WorkflowConfig::prototype());
        let skipped: Vec<_> = records.iter().filter(|r| r.skipped).collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].phase, PhaseName::UserTest);

        let phases: Vec<PhaseName> = records.iter().map(|r| r.phase).collect();
        let first_impl = phases
            .iter()
            .position(|p| *p == PhaseName::Implementation)
            .unwrap();
        let user_test = phases.iter().position(|p| *p == PhaseName::UserTest).unwrap();
        assert!(user_test < first_impl);
    }

    #[test]
    fn full_workflow_enabled_has_no_skips() {
        let config = WorkflowConfig::prototype().with_user_testing(true);
        let records = full_workflow(&config);
        assert!(records.iter().all(|r| !r.skipped));
        let chain = build_chain(&config).unwrap();
        let expected: usize = chain.phases().iter().map(|p| p.deliverables.len()).sum();
        assert_eq!(records.len(), expected);
    }

    #[test]
    fn framework_shapes_deliverables() {
        let chain = build_chain(&WorkflowConfig::prototype().with_framework("vue")).unwrap();
        let proto = chain.get(PhaseName::Prototype).unwrap();
        assert_eq!(proto.deliverables[0], "Working prototype (vue)");
    }

    #[test]
    fn routing_table() {
        assert!(route(PhaseName::Requirements).instruction.is_none());
        assert_eq!(
            route(PhaseName::Quality).instruction,
            Some((Role::Verifier, Role::Verifier))
        );
        assert_eq!(route(PhaseName::Testing).performer(), Role::Verifier);
        assert_eq!(route(PhaseName::Implementation).performer(), Role::Implementer);
    }

    #[test]
    fn instruction_template_uses_deliverables() {
        let chain = build_chain(&WorkflowConfig::standard()).unwrap();
        let design = chain.get(PhaseName::Design).unwrap();
        let req = instruction_request(design, "auth").unwrap();
        assert_eq!(req.task, "auth: design phase");
        assert_eq!(req.requirements, design.deliverables);
        assert_eq!(req.to, Role::Implementer);

        let requirements = chain.get(PhaseName::Requirements).unwrap();
        assert!(instruction_request(requirements, "auth").is_none());
    }
}
