use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The closed set of agent roles shared by both message kinds and the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coordinator,
    Implementer,
    Verifier,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::Coordinator, Role::Implementer, Role::Verifier]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Coordinator => "coordinator",
            Role::Implementer => "implementer",
            Role::Verifier => "verifier",
        }
    }

    /// Directory name used for role-addressed document folders.
    pub fn dir_name(self) -> &'static str {
        match self {
            Role::Coordinator => "Coordinator",
            Role::Implementer => "Implementer",
            Role::Verifier => "Verifier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coordinator" => Ok(Role::Coordinator),
            "implementer" => Ok(Role::Implementer),
            "verifier" => Ok(Role::Verifier),
            _ => Err(FlowError::InvalidRole(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseName
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseName {
    Requirements,
    Design,
    UiDesign,
    ComponentDesign,
    Tasks,
    UiMockup,
    Prototype,
    UserTest,
    Implementation,
    Integration,
    Testing,
    Quality,
}

impl PhaseName {
    pub fn all() -> &'static [PhaseName] {
        &[
            PhaseName::Requirements,
            PhaseName::Design,
            PhaseName::UiDesign,
            PhaseName::ComponentDesign,
            PhaseName::Tasks,
            PhaseName::UiMockup,
            PhaseName::Prototype,
            PhaseName::UserTest,
            PhaseName::Implementation,
            PhaseName::Integration,
            PhaseName::Testing,
            PhaseName::Quality,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseName::Requirements => "requirements",
            PhaseName::Design => "design",
            PhaseName::UiDesign => "ui-design",
            PhaseName::ComponentDesign => "component-design",
            PhaseName::Tasks => "tasks",
            PhaseName::UiMockup => "ui-mockup",
            PhaseName::Prototype => "prototype",
            PhaseName::UserTest => "user-test",
            PhaseName::Implementation => "implementation",
            PhaseName::Integration => "integration",
            PhaseName::Testing => "testing",
            PhaseName::Quality => "quality",
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseName {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseName::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| FlowError::InvalidPhase(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// WorkflowVariant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowVariant {
    /// requirements → design → tasks → implementation → testing → quality
    #[default]
    Standard,
    /// ui-mockup → prototype → implementation → integration
    Prototype,
}

impl WorkflowVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowVariant::Standard => "standard",
            WorkflowVariant::Prototype => "prototype",
        }
    }
}

impl fmt::Display for WorkflowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowVariant {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(WorkflowVariant::Standard),
            "prototype" => Ok(WorkflowVariant::Prototype),
            _ => Err(FlowError::InvalidVariant(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TodoStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ReportStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Completed,
    InProgress,
    Blocked,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportStatus::Completed => "completed",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phase_name_roundtrip() {
        for phase in PhaseName::all() {
            let parsed = PhaseName::from_str(phase.as_str()).unwrap();
            assert_eq!(*phase, parsed);
        }
    }

    #[test]
    fn phase_name_unknown_is_error() {
        assert!(matches!(
            PhaseName::from_str("deploy"),
            Err(FlowError::InvalidPhase(_))
        ));
    }

    #[test]
    fn phase_name_serde_is_kebab_case() {
        let json = serde_json::to_string(&PhaseName::UserTest).unwrap();
        assert_eq!(json, "\"user-test\"");
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::from_str("Verifier").unwrap(), Role::Verifier);
        assert!(Role::from_str("").is_err());
        assert!(Role::from_str("reviewer").is_err());
    }

    #[test]
    fn role_dir_names_are_capitalized() {
        for role in Role::all() {
            let dir = role.dir_name();
            assert!(dir.chars().next().unwrap().is_ascii_uppercase());
            assert_eq!(dir.to_ascii_lowercase(), role.as_str());
        }
    }

    #[test]
    fn todo_status_serde() {
        let json = serde_json::to_string(&TodoStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
