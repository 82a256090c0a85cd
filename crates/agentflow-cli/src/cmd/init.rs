use crate::output::print_json;
use agentflow_core::{config::Config, io, paths, types::Role};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Create the `.agentflow/` tree and a default config. Safe to re-run:
/// existing files are left alone.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let mut dirs: Vec<PathBuf> = vec![
        paths::flow_dir(root),
        root.join(paths::RETROSPECTIVES_DIR),
        root.join(paths::FEATURES_DIR),
    ];
    for &role in Role::all() {
        dirs.push(paths::instruction_dir(root, role));
        dirs.push(paths::report_dir(root, role));
    }
    for dir in &dirs {
        io::ensure_dir(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let config_path = paths::config_path(root);
    let created = !config_path.exists();
    if created {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
    }

    if json {
        return print_json(&serde_json::json!({
            "root": root,
            "config": config_path,
            "config_created": created,
            "directories": dirs,
        }));
    }

    println!("Initialized agentflow in: {}", root.display());
    if created {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }
    Ok(())
}
