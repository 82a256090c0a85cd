use crate::output::{print_json, print_table};
use agentflow_core::todo::{self, RuleOptions, TodoItem};
use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use std::io::Read;
use std::path::Path;

#[derive(Subcommand)]
pub enum TodoSubcommand {
    /// Add the commit and learning items a todo list is missing
    Enhance {
        /// JSON todo list file, or `-` for stdin
        input: String,
        #[command(flatten)]
        rules: RuleArgs,
    },
    /// Check a todo list against the enforcement rules
    Validate {
        /// JSON todo list file, or `-` for stdin
        input: String,
        #[command(flatten)]
        rules: RuleArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// Turn off the commit-enforcement rule
    #[arg(long)]
    pub no_commit_rule: bool,

    /// Turn off the retrospective-capture rule
    #[arg(long)]
    pub no_retrospective_rule: bool,
}

pub fn run(root: &Path, subcmd: TodoSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TodoSubcommand::Enhance { input, rules } => enhance(root, &input, &rules, json),
        TodoSubcommand::Validate { input, rules } => validate(root, &input, &rules, json),
    }
}

fn rule_options(root: &Path, args: &RuleArgs) -> anyhow::Result<RuleOptions> {
    let config = super::load_config(root)?;
    let mut overrides = config.rules.clone();
    if args.no_commit_rule {
        overrides.commit_enforcement = Some(false);
    }
    if args.no_retrospective_rule {
        overrides.retrospective_capture = Some(false);
    }
    Ok(RuleOptions::resolve(&overrides))
}

fn read_todos(input: &str) -> anyhow::Result<Vec<TodoItem>> {
    let data = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read todo list from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };
    serde_json::from_str(&data)
        .context("todo list must be a JSON array of {content, activeForm, status}")
}

fn enhance(root: &Path, input: &str, args: &RuleArgs, json: bool) -> anyhow::Result<()> {
    let options = rule_options(root, args)?;
    let todos = read_todos(input)?;
    let enhanced = todo::enhance(&todos, &options);
    tracing::debug!(before = todos.len(), after = enhanced.len(), "todo list enhanced");

    if json {
        return print_json(&enhanced);
    }
    let rows: Vec<Vec<String>> = enhanced
        .iter()
        .enumerate()
        .map(|(i, t)| vec![(i + 1).to_string(), t.status.to_string(), t.content.clone()])
        .collect();
    print_table(&["#", "STATUS", "CONTENT"], &rows);
    Ok(())
}

fn validate(root: &Path, input: &str, args: &RuleArgs, json: bool) -> anyhow::Result<()> {
    let options = rule_options(root, args)?;
    let todos = read_todos(input)?;
    let result = todo::validate(&todos, &options);

    if json {
        print_json(&result)?;
    } else if result.valid {
        println!("todo list is valid");
    } else {
        for violation in &result.violations {
            println!("[{}] {}", violation.rule.as_str(), violation.description);
        }
    }

    if !result.valid {
        bail!("todo list has {} rule violation(s)", result.violations.len());
    }
    Ok(())
}
