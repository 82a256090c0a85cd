use super::WorkflowArgs;
use crate::output::{print_json, print_table};
use agentflow_core::phase::{self, build_chain, full_workflow, PhaseRoute};
use agentflow_core::types::PhaseName;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ChainEntry<'a> {
    #[serde(flatten)]
    phase: &'a phase::Phase,
    route: PhaseRoute,
}

fn route_label(route: &PhaseRoute) -> String {
    match route.instruction {
        Some((from, to)) => format!("{from} -> {to}"),
        None => "-".to_string(),
    }
}

pub fn show(root: &Path, args: &WorkflowArgs, json: bool) -> anyhow::Result<()> {
    let (_, workflow) = super::resolve_workflow(root, args)?;
    let chain = build_chain(&workflow).context("failed to build phase chain")?;

    if json {
        let entries: Vec<ChainEntry<'_>> = chain
            .phases()
            .iter()
            .map(|p| ChainEntry {
                phase: p,
                route: phase::route(p.name),
            })
            .collect();
        return print_json(&serde_json::json!({
            "variant": chain.variant(),
            "phases": entries,
        }));
    }

    println!("Workflow: {}\n", chain.variant());
    let rows: Vec<Vec<String>> = chain
        .phases()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let route = phase::route(p.name);
            vec![
                (i + 1).to_string(),
                p.name.to_string(),
                route_label(&route),
                format!("{} -> {}", route.report.0, route.report.1),
                p.next_phase.map_or_else(|| "-".to_string(), |n| n.to_string()),
            ]
        })
        .collect();
    print_table(&["#", "PHASE", "INSTRUCTION", "REPORT", "NEXT"], &rows);
    Ok(())
}

pub fn next(root: &Path, current: &str, args: &WorkflowArgs, json: bool) -> anyhow::Result<()> {
    let current: PhaseName = current.parse()?;
    let (_, workflow) = super::resolve_workflow(root, args)?;
    let next = phase::next_phase(current, &workflow)?;

    if json {
        print_json(&serde_json::json!({ "phase": current, "next": next }))?;
    } else {
        match next {
            Some(n) => println!("{n}"),
            None => println!("{current} is the last phase"),
        }
    }
    Ok(())
}

/// Every deliverable in template order; disabled optional phases show up
/// once as skipped.
pub fn plan(root: &Path, args: &WorkflowArgs, json: bool) -> anyhow::Result<()> {
    let (_, workflow) = super::resolve_workflow(root, args)?;
    let records = full_workflow(&workflow);

    if json {
        return print_json(&records);
    }
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.phase.to_string(),
                if r.skipped { "skipped" } else { "" }.to_string(),
                r.deliverable.clone(),
            ]
        })
        .collect();
    print_table(&["PHASE", "", "DELIVERABLE"], &rows);
    Ok(())
}
