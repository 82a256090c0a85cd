//! Instruction and report documents exchanged between roles.

use crate::error::{FlowError, Result};
use crate::types::{Priority, ReportStatus, Role};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Rendered in place of any optional section that has no content.
pub const PLACEHOLDER: &str = "_None specified_";

pub const MAX_SLUG_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of `YYYYMMDDHHmm` timestamps.
pub trait Clock {
    fn now(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        chrono::Local::now().format("%Y%m%d%H%M").to_string()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl FixedClock {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self(timestamp.into())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> String {
        (**self).now()
    }
}

// ---------------------------------------------------------------------------
// Slug / MessageId
// ---------------------------------------------------------------------------

static STRIP_RE: OnceLock<Regex> = OnceLock::new();
static SEP_RE: OnceLock<Regex> = OnceLock::new();

fn strip_re() -> &'static Regex {
    STRIP_RE.get_or_init(|| Regex::new(r"[^a-z0-9\s\-]").unwrap())
}

fn sep_re() -> &'static Regex {
    SEP_RE.get_or_init(|| Regex::new(r"[\s\-]+").unwrap())
}

/// Filesystem-safe slug of a task description.
///
/// Lower-cases, drops everything but ASCII alphanumerics, whitespace and
/// hyphens, collapses separator runs to a single `-` and bounds the length.
/// Distinct tasks may share a slug; the timestamp in [`MessageId`] tells them
/// apart.
pub fn slug(task: &str) -> String {
    let lowered = task.to_lowercase();
    let stripped = strip_re().replace_all(&lowered, "");
    let joined = sep_re().replace_all(stripped.trim(), "-");
    let mut out: String = joined.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("task");
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId {
    pub from: Role,
    pub to: Role,
    pub timestamp: String,
    pub slug: String,
}

impl MessageId {
    pub fn new(from: Role, to: Role, timestamp: impl Into<String>, task: &str) -> Self {
        Self {
            from,
            to,
            timestamp: timestamp.into(),
            slug: slug(task),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{self}.md")
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_to_{}_{}",
            self.timestamp, self.from, self.to, self.slug
        )
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionRequest {
    pub from: Role,
    pub to: Role,
    pub task: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

impl InstructionRequest {
    pub fn new(from: Role, to: Role, task: impl Into<String>) -> Self {
        Self {
            from,
            to,
            task: task.into(),
            priority: Priority::default(),
            context: None,
            requirements: Vec::new(),
            acceptance_criteria: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub from: Role,
    pub to: Role,
    pub task: String,
    pub status: ReportStatus,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub completed_items: Vec<String>,
    #[serde(default)]
    pub blocked_items: Vec<String>,
    #[serde(default)]
    pub next_actions: Vec<String>,
}

impl ReportRequest {
    pub fn new(from: Role, to: Role, task: impl Into<String>, status: ReportStatus) -> Self {
        Self {
            from,
            to,
            task: task.into(),
            status,
            summary: None,
            completed_items: Vec::new(),
            blocked_items: Vec::new(),
            next_actions: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: MessageId,
    pub from: Role,
    pub to: Role,
    pub task: String,
    pub priority: Priority,
    pub timestamp: String,
    pub context: Option<String>,
    pub requirements: Vec<String>,
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: MessageId,
    pub from: Role,
    pub to: Role,
    pub task: String,
    pub status: ReportStatus,
    pub timestamp: String,
    pub summary: Option<String>,
    pub completed_items: Vec<String>,
    pub blocked_items: Vec<String>,
    pub next_actions: Vec<String>,
}

fn push_text(out: &mut String, heading: &str, text: Option<&str>) {
    out.push_str(&format!("\n## {heading}\n\n"));
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => out.push_str(t),
        None => out.push_str(PLACEHOLDER),
    }
    out.push('\n');
}

fn push_list(out: &mut String, heading: &str, items: &[String], checkbox: bool) {
    out.push_str(&format!("\n## {heading}\n\n"));
    if items.is_empty() {
        out.push_str(PLACEHOLDER);
        out.push('\n');
        return;
    }
    let bullet = if checkbox { "- [ ] " } else { "- " };
    for item in items {
        out.push_str(bullet);
        out.push_str(item);
        out.push('\n');
    }
}

impl Instruction {
    pub fn render(&self) -> String {
        let mut out = format!("# Instruction: {}\n\n", self.task);
        out.push_str(&format!("- **From**: {}\n", self.from));
        out.push_str(&format!("- **To**: {}\n", self.to));
        out.push_str(&format!("- **Priority**: {}\n", self.priority));
        out.push_str(&format!("- **Timestamp**: {}\n", self.timestamp));
        push_text(&mut out, "Context", self.context.as_deref());
        push_list(&mut out, "Requirements", &self.requirements, false);
        push_list(&mut out, "Acceptance Criteria", &self.acceptance_criteria, true);
        out
    }
}

impl Report {
    pub fn render(&self) -> String {
        let mut out = format!("# Report: {}\n\n", self.task);
        out.push_str(&format!("- **From**: {}\n", self.from));
        out.push_str(&format!("- **To**: {}\n", self.to));
        out.push_str(&format!("- **Status**: {}\n", self.status));
        out.push_str(&format!("- **Timestamp**: {}\n", self.timestamp));
        push_text(&mut out, "Summary", self.summary.as_deref());
        push_list(&mut out, "Completed", &self.completed_items, false);
        push_list(&mut out, "Blocked", &self.blocked_items, false);
        push_list(&mut out, "Next Actions", &self.next_actions, false);
        out
    }
}

// ---------------------------------------------------------------------------
// MessageBuilder
// ---------------------------------------------------------------------------

pub struct MessageBuilder<C> {
    clock: C,
}

impl<C: Clock> MessageBuilder<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn build_instruction(&self, req: InstructionRequest) -> Result<Instruction> {
        let task = required_task(&req.task)?;
        let timestamp = self.clock.now();
        Ok(Instruction {
            id: MessageId::new(req.from, req.to, timestamp.clone(), &task),
            from: req.from,
            to: req.to,
            task,
            priority: req.priority,
            timestamp,
            context: req.context,
            requirements: req.requirements,
            acceptance_criteria: req.acceptance_criteria,
        })
    }

    pub fn build_report(&self, req: ReportRequest) -> Result<Report> {
        let task = required_task(&req.task)?;
        let timestamp = self.clock.now();
        Ok(Report {
            id: MessageId::new(req.from, req.to, timestamp.clone(), &task),
            from: req.from,
            to: req.to,
            task,
            status: req.status,
            timestamp,
            summary: req.summary,
            completed_items: req.completed_items,
            blocked_items: req.blocked_items,
            next_actions: req.next_actions,
        })
    }
}

fn required_task(task: &str) -> Result<String> {
    let trimmed = task.trim();
    if trimmed.is_empty() {
        return Err(FlowError::required("task"));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
