//! Todo-list augmentation and validation.
//!
//! Rules are evaluated in table order against an ordered list of
//! [`TodoItem`]s. Each rule has a set of trigger keywords, a guard keyword
//! whose presence means the rule is already satisfied, and the enforcement
//! item it adds. Items are only ever appended or inserted; existing items are
//! never reordered or removed.

use crate::types::TodoStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TodoItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub content: String,
    pub active_form: String,
    #[serde(default)]
    pub status: TodoStatus,
}

impl TodoItem {
    pub fn new(content: impl Into<String>, active_form: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            active_form: active_form.into(),
            status: TodoStatus::Pending,
        }
    }

    fn mentions(&self, needle: &str) -> bool {
        self.content.to_lowercase().contains(needle)
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    CommitEnforcement,
    RetrospectiveCapture,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::CommitEnforcement => "commit_enforcement",
            RuleId::RetrospectiveCapture => "retrospective_capture",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trigger keyword, tagged with the rule it fires. Keywords are stored
/// lower-case and matched as case-insensitive substrings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerKeyword {
    pub rule: RuleId,
    pub keyword: &'static str,
}

macro_rules! triggers {
    ($($rule:ident => [$($kw:expr),* $(,)?]),* $(,)?) => {
        &[$($(TriggerKeyword { rule: RuleId::$rule, keyword: $kw },)*)*]
    };
}

pub const TRIGGER_KEYWORDS: &[TriggerKeyword] = triggers! {
    CommitEnforcement => [
        "instruction", "report", "handoff", "decision",
        "指示書", "報告書", "引き継ぎ", "決定",
    ],
    RetrospectiveCapture => [
        "implement", "fix", "optimize", "refactor", "design",
        "実装", "修正", "最適化", "リファクタ", "設計",
    ],
};

pub const COMMIT_CONTENT: &str = "Git commit documentation changes";
pub const COMMIT_ACTIVE_FORM: &str = "Committing documentation changes";
pub const LEARNING_CONTENT: &str = "Capture learning insights and patterns";
pub const LEARNING_ACTIVE_FORM: &str = "Capturing learning insights and patterns";

#[derive(Debug, Clone, Copy)]
enum Placement {
    Append,
    /// Insert before the first item mentioning the anchor, else append.
    Before(&'static str),
}

struct EnforcementRule {
    id: RuleId,
    guard: &'static str,
    content: &'static str,
    active_form: &'static str,
    placement: Placement,
    violation: &'static str,
}

const RULES: &[EnforcementRule] = &[
    EnforcementRule {
        id: RuleId::CommitEnforcement,
        guard: "commit",
        content: COMMIT_CONTENT,
        active_form: COMMIT_ACTIVE_FORM,
        placement: Placement::Append,
        violation: "document-producing task has no commit step",
    },
    EnforcementRule {
        id: RuleId::RetrospectiveCapture,
        guard: "learning",
        content: LEARNING_CONTENT,
        active_form: LEARNING_ACTIVE_FORM,
        placement: Placement::Before("git commit"),
        violation: "substantial work has no learning capture step",
    },
];

pub fn keywords_for(rule: RuleId) -> impl Iterator<Item = &'static str> {
    TRIGGER_KEYWORDS
        .iter()
        .filter(move |t| t.rule == rule)
        .map(|t| t.keyword)
}

fn is_triggered(todos: &[TodoItem], rule: RuleId) -> bool {
    todos
        .iter()
        .any(|item| keywords_for(rule).any(|kw| item.mentions(kw)))
}

fn is_satisfied(todos: &[TodoItem], rule: &EnforcementRule) -> bool {
    todos.iter().any(|item| item.mentions(rule.guard))
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-rule overrides as read from config or flags; `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_enforcement: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrospective_capture: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOptions {
    pub commit_enforcement: bool,
    pub retrospective_capture: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            commit_enforcement: true,
            retrospective_capture: true,
        }
    }
}

impl RuleOptions {
    pub fn resolve(overrides: &RuleOverrides) -> Self {
        let defaults = Self::default();
        Self {
            commit_enforcement: overrides
                .commit_enforcement
                .unwrap_or(defaults.commit_enforcement),
            retrospective_capture: overrides
                .retrospective_capture
                .unwrap_or(defaults.retrospective_capture),
        }
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        match rule {
            RuleId::CommitEnforcement => self.commit_enforcement,
            RuleId::RetrospectiveCapture => self.retrospective_capture,
        }
    }
}

// ---------------------------------------------------------------------------
// enhance / validate
// ---------------------------------------------------------------------------

/// Apply every enabled rule in order. Never fails and never shrinks the list.
pub fn enhance(todos: &[TodoItem], options: &RuleOptions) -> Vec<TodoItem> {
    let mut out = todos.to_vec();
    for rule in RULES {
        if !options.is_enabled(rule.id) || !is_triggered(&out, rule.id) || is_satisfied(&out, rule)
        {
            continue;
        }
        let item = TodoItem::new(rule.content, rule.active_form);
        match rule.placement {
            Placement::Append => out.push(item),
            Placement::Before(anchor) => match out.iter().position(|t| t.mentions(anchor)) {
                Some(idx) => out.insert(idx, item),
                None => out.push(item),
            },
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule: RuleId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<RuleViolation>,
}

pub fn validate(todos: &[TodoItem], options: &RuleOptions) -> ValidationResult {
    let violations: Vec<RuleViolation> = RULES
        .iter()
        .filter(|rule| options.is_enabled(rule.id))
        .filter(|rule| is_triggered(todos, rule.id) && !is_satisfied(todos, rule))
        .map(|rule| RuleViolation {
            rule: rule.id,
            description: format!("{}: add \"{}\"", rule.violation, rule.content),
        })
        .collect();
    ValidationResult {
        valid: violations.is_empty(),
        violations,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
