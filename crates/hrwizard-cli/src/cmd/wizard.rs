use crate::output::{mark, print_json, print_table, progress_bar};
use anyhow::{bail, Context};
use hrwizard_core::{
    backend::{click_next, send_ticket, HttpBackend, LocalBackend, StepBackend},
    config::Config,
    family,
    gating::{GatingEngine, GatingMode},
    project::Project,
    session::{SaveError, SaveResolution, WizardSession},
    types::Family,
    view::wizard_view,
};
use std::path::Path;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse the family and check it against the workspace config.
fn local_family(root: &Path, raw: &str) -> anyhow::Result<(Family, Config)> {
    let family: Family = raw.parse()?;
    let config = Config::load(root).context("failed to load config")?;
    config.require_family(family)?;
    Ok((family, config))
}

fn backend_for(
    root: &Path,
    family: Family,
    remote: Option<&str>,
) -> anyhow::Result<(Box<dyn StepBackend>, GatingMode)> {
    match remote {
        Some(url) => {
            // The server enforces its own config; local config only picks
            // the gating mode used for local checks.
            let mode = Config::load(root)
                .map(|c| c.gating.mode)
                .unwrap_or_default();
            Ok((Box::new(HttpBackend::new(url)), mode))
        }
        None => {
            let config = Config::load(root).context("failed to load config")?;
            config.require_family(family)?;
            let mode = config.gating.mode;
            Ok((Box::new(LocalBackend::new(root, mode)), mode))
        }
    }
}

/// `KEY=VALUE`; the value is JSON when it parses, a plain string otherwise.
fn parse_assignment(raw: &str) -> anyhow::Result<(String, serde_json::Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty field name in '{raw}'");
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

pub fn status(root: &Path, family: &str, project: &str, json: bool) -> anyhow::Result<()> {
    let (family, config) = local_family(root, family)?;
    let p = Project::load(root, project)?;
    let engine = GatingEngine::for_family(family).with_mode(config.gating.mode);
    let view = wizard_view(
        &engine,
        family,
        &p.id,
        None,
        &p.record(family),
        &p.payload(family),
    );

    if json {
        return print_json(&view);
    }

    println!("{} / {}", p.name, family.display_name());
    println!("{}", progress_bar(view.progress));
    println!();

    let rows = view
        .tabs
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let status = if tab.kind == hrwizard_core::step::StepKind::Overview {
                "-".to_string()
            } else {
                p.status_of(family, tab.id).to_string()
            };
            vec![
                (i + 1).to_string(),
                tab.id.to_string(),
                status,
                mark(tab.enabled),
                mark(tab.complete),
                mark(tab.read_only),
            ]
        })
        .collect();
    print_table(
        &["#", "STEP", "STATUS", "ENABLED", "COMPLETE", "READ-ONLY"],
        rows,
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

pub fn check(
    root: &Path,
    family: &str,
    project: &str,
    step: &str,
    json: bool,
) -> anyhow::Result<()> {
    let (family, config) = local_family(root, family)?;
    let def = family::require_step(family, step)?;
    let p = Project::load(root, project)?;
    let engine = GatingEngine::for_family(family).with_mode(config.gating.mode);
    let record = p.record(family);
    let payload = p.payload(family);

    let enabled = engine.is_step_enabled(def.id, &record, &payload);
    let complete = engine.is_step_complete(def.id, &record, &payload);
    let read_only = engine.is_step_read_only(def.id, &record);
    let fields = engine.field_errors(def.id, &payload);

    if json {
        print_json(&serde_json::json!({
            "step": def.id,
            "enabled": enabled,
            "complete": complete,
            "read_only": read_only,
            "validation": engine.validate_required_fields(def.id, &payload),
            "fields": fields,
        }))?;
    } else {
        println!("{} / {}", family.display_name(), def.display_name);
        println!("  enabled:   {}", mark(enabled));
        println!("  complete:  {}", mark(complete));
        println!("  read-only: {}", mark(read_only));
        for (key, message) in &fields {
            println!("  missing {key}: {message}");
        }
    }

    if !enabled {
        bail!("step '{}' is not reachable yet", def.id);
    }
    if !fields.is_empty() {
        bail!("step '{}' is missing {} required field(s)", def.id, fields.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// save
// ---------------------------------------------------------------------------

pub struct SaveArgs<'a> {
    pub family: &'a str,
    pub project: &'a str,
    pub step: &'a str,
    pub fields: &'a [String],
    pub draft: bool,
    pub remote: Option<&'a str>,
}

/// Drive one wizard page: open the step, type the fields, press Next (or
/// Save draft).
pub fn save(root: &Path, args: SaveArgs<'_>, json: bool) -> anyhow::Result<()> {
    let family: Family = args.family.parse()?;
    let def = family::require_step(family, args.step)?;
    let (backend, mode) = backend_for(root, family, args.remote)?;

    let (record, payload) = backend
        .load_family(family, args.project)
        .with_context(|| format!("failed to load {family} for '{}'", args.project))?;
    let mut session = WizardSession::new(family, args.project, mode, record, payload);
    session.navigate(def.id)?;
    if def.is_overview() && !args.fields.is_empty() {
        bail!("the overview step has no fields");
    }

    for raw in args.fields {
        let (key, value) = parse_assignment(raw)?;
        session.set_field(key, value)?;
    }

    // Next on a read-only step or the overview moves on without a save.
    let saving = args.draft || !(session.is_read_only() || def.is_overview());
    let resolution = if args.draft {
        let ticket = session.request_draft()?;
        send_ticket(&mut session, backend.as_ref(), &ticket)
    } else {
        click_next(&mut session, backend.as_ref())?
    };

    let status = session.record().get(def.id).cloned();
    match resolution {
        SaveResolution::Failed(err) => {
            if json {
                print_json(&serde_json::json!({ "step": def.id, "error": err }))?;
            } else if let SaveError::Validation { fields } = &err {
                for (key, message) in fields {
                    eprintln!("  {key}: {message}");
                }
            }
            bail!("save failed: {}", err.message());
        }
        SaveResolution::Advanced { to } => {
            if json {
                print_json(&serde_json::json!({
                    "step": def.id,
                    "saved": saving,
                    "status": status,
                    "active": to,
                    "progress": session.progress(),
                }))?;
            } else if saving {
                println!("Saved '{}'. Next: {}", def.id, family.step_href(args.project, &to));
            } else {
                println!(
                    "Nothing to save on '{}'; moved to {}",
                    def.id,
                    family.step_href(args.project, &to)
                );
            }
        }
        SaveResolution::Stayed | SaveResolution::Ignored => {
            if json {
                print_json(&serde_json::json!({
                    "step": def.id,
                    "saved": saving,
                    "status": status,
                    "active": session.active(),
                    "progress": session.progress(),
                }))?;
            } else {
                println!("Saved '{}'.", def.id);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// submit / approve / lock
// ---------------------------------------------------------------------------

pub fn submit(
    root: &Path,
    family: &str,
    project: &str,
    remote: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let family: Family = family.parse()?;
    let (backend, _) = backend_for(root, family, remote)?;
    let statuses = backend.submit_family(family, project)?;

    if json {
        print_json(&serde_json::json!({ "family": family, "statuses": statuses }))?;
    } else {
        println!("Submitted {} for '{project}'.", family.display_name());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum Finalize {
    Approve,
    Lock,
}

pub fn finalize(
    root: &Path,
    family: &str,
    project: &str,
    action: Finalize,
    json: bool,
) -> anyhow::Result<()> {
    let (family, _) = local_family(root, family)?;
    let mut p = Project::load(root, project)?;
    let statuses = match action {
        Finalize::Approve => p.approve_family(family)?,
        Finalize::Lock => p.lock_family(family)?,
    };
    p.save(root)?;

    if json {
        print_json(&serde_json::json!({ "family": family, "statuses": statuses }))?;
    } else {
        let verb = match action {
            Finalize::Approve => "Approved",
            Finalize::Lock => "Locked",
        };
        println!("{verb} {} for '{}'.", family.display_name(), p.id);
    }
    Ok(())
}
