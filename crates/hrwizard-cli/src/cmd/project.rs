use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use hrwizard_core::{config::Config, gating::GatingEngine, project::Project, types::Family};
use std::path::Path;

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Create a project with every step not started
    Create {
        /// Lowercase id with hyphens, e.g. acme-corp
        id: String,
        /// Display name (default: id with spaces)
        #[arg(long)]
        name: Option<String>,
    },
    /// List projects with their per-family progress
    List,
    /// Show one project's statuses and history
    Show { id: String },
}

pub fn run(root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::Create { id, name } => create(root, id, name, json),
        ProjectSubcommand::List => list(root, json),
        ProjectSubcommand::Show { id } => show(root, &id, json),
    }
}

fn percent_of(p: &Project, family: Family) -> u8 {
    GatingEngine::for_family(family)
        .aggregate_progress(&p.record(family))
        .percent()
}

fn create(root: &Path, id: String, name: Option<String>, json: bool) -> anyhow::Result<()> {
    Config::load(root).context("failed to load config")?;
    let name = name.unwrap_or_else(|| id.replace('-', " "));
    let p = Project::create(root, id, name)?;

    if json {
        print_json(&serde_json::json!({ "id": p.id, "name": p.name }))?;
    } else {
        println!("Created project '{}' ({})", p.id, p.name);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let projects = Project::list(root).context("failed to list projects")?;

    if json {
        let items: Vec<serde_json::Value> = projects
            .iter()
            .map(|p| {
                let percents: serde_json::Map<String, serde_json::Value> = Family::all()
                    .iter()
                    .map(|&f| (f.to_string(), percent_of(p, f).into()))
                    .collect();
                serde_json::json!({ "id": p.id, "name": p.name, "percent": percents })
            })
            .collect();
        return print_json(&items);
    }

    if projects.is_empty() {
        println!("No projects. Run: hrwizard project create <id>");
        return Ok(());
    }

    let rows = projects
        .iter()
        .map(|p| {
            let mut row = vec![p.id.clone(), p.name.clone()];
            row.extend(
                Family::all()
                    .iter()
                    .map(|&f| format!("{}%", percent_of(p, f))),
            );
            row
        })
        .collect();
    print_table(
        &["ID", "NAME", "DIAGNOSIS", "PERFORMANCE", "COMPENSATION"],
        rows,
    );
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let p = Project::load(root, id)?;

    if json {
        return print_json(&p);
    }

    println!("{} ({})", p.name, p.id);
    println!("created {}", p.created_at.format("%Y-%m-%d %H:%M"));
    for &family in Family::all() {
        println!();
        let state = if p.is_submitted(family) {
            " [submitted]"
        } else {
            ""
        };
        println!("{}{state}", family.display_name());
        let rows = hrwizard_core::family::counted_steps(family)
            .map(|s| vec![s.id.to_string(), p.status_of(family, s.id).to_string()])
            .collect();
        print_table(&["STEP", "STATUS"], rows);
    }

    if !p.history.is_empty() {
        println!("\nHistory");
        let rows = p
            .history
            .iter()
            .map(|h| {
                vec![
                    h.at.format("%Y-%m-%d %H:%M").to_string(),
                    h.family.to_string(),
                    h.step.clone(),
                    format!("{} -> {}", h.from, h.to),
                ]
            })
            .collect();
        print_table(&["AT", "FAMILY", "STEP", "CHANGE"], rows);
    }
    Ok(())
}
