use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use hrwizard_core::config::{Config, WarnLevel};
use hrwizard_core::types::Family;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Switch gating between permissive and strict
    SetGating {
        /// permissive or strict
        mode: String,
    },
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::SetGating { mode } => set_gating(root, &mode),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }

    println!("workspace: {}", config.workspace.name);
    println!("gating:    {}", config.gating.mode);
    println!("port:      {}", config.server.port);
    let rows = Family::all()
        .iter()
        .map(|&f| {
            let state = if config.is_family_enabled(f) {
                "enabled"
            } else {
                "disabled"
            };
            vec![f.to_string(), state.to_string()]
        })
        .collect();
    println!();
    print_table(&["FAMILY", "STATE"], rows);
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn set_gating(root: &Path, mode: &str) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    config.gating.mode = mode.parse()?;
    config.save(root).context("failed to write config.yaml")?;
    println!("Gating set to {}.", config.gating.mode);
    Ok(())
}
