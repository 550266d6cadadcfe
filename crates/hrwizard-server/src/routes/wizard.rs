use axum::extract::{Path, State};
use axum::Json;
use hrwizard_core::family;
use hrwizard_core::gating::GatingEngine;
use hrwizard_core::project::{Project, SaveMode};
use hrwizard_core::step::Payload;
use hrwizard_core::types::Family;
use hrwizard_core::view::wizard_view;

use crate::error::AppError;
use crate::state::AppState;

/// Parse the family segment and make sure config allows it.
fn resolve_family(app: &AppState, raw: &str) -> hrwizard_core::Result<(Family, GatingEngine<'static>)> {
    let family: Family = raw.parse()?;
    let config = app.config()?;
    config.require_family(family)?;
    let engine = GatingEngine::for_family(family).with_mode(config.gating.mode);
    Ok((family, engine))
}

/// GET /api/:family/:project: the initial state of a wizard page
/// (statuses, payload, tabs, progress).
pub async fn get_family(
    State(app): State<AppState>,
    Path((family, project)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = super::blocking(move || {
        let (family, engine) = resolve_family(&app, &family)?;
        let p = Project::load(&app.root, &project)?;
        let record = p.record(family);
        let payload = p.payload(family);
        let view = wizard_view(&engine, family, &p.id, None, &record, &payload);

        Ok(serde_json::json!({
            "project": { "id": p.id, "name": p.name },
            "family": family,
            "gating": engine.mode(),
            "statuses": record,
            "payload": payload,
            "submitted_at": p.family(family).and_then(|f| f.submitted_at),
            "tabs": view.tabs,
            "progress": view.progress,
            "percent": view.percent,
        }))
    })
    .await?;

    Ok(Json(result))
}

/// GET /api/:family/:project/:step: one step page.
pub async fn get_step(
    State(app): State<AppState>,
    Path((family, project, step)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = super::blocking(move || {
        let (family, engine) = resolve_family(&app, &family)?;
        let def = family::require_step(family, &step)?;
        let p = Project::load(&app.root, &project)?;
        let record = p.record(family);
        let payload = p.payload(family);

        Ok(serde_json::json!({
            "project": { "id": p.id, "name": p.name },
            "family": family,
            "step": def,
            "status": record.get(def.id),
            "enabled": engine.is_step_enabled(def.id, &record, &payload),
            "complete": engine.is_step_complete(def.id, &record, &payload),
            "read_only": engine.is_step_read_only(def.id, &record),
            "validation": engine.validate_required_fields(def.id, &payload),
            "previous": engine.previous_step(def.id).map(|s| family.step_href(&p.id, s.id)),
            "next": engine.next_step(def.id).map(|s| family.step_href(&p.id, s.id)),
            "payload": payload,
        }))
    })
    .await?;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct SaveStepBody {
    #[serde(default)]
    pub payload: Payload,
    /// Partial save without validation.
    #[serde(default)]
    pub draft: bool,
}

/// POST /api/:family/:project/:step: save one step. 422 with a `fields`
/// map when validation fails.
pub async fn save_step(
    State(app): State<AppState>,
    Path((family, project, step)): Path<(String, String, String)>,
    Json(body): Json<SaveStepBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = super::blocking(move || {
        let (family, engine) = resolve_family(&app, &family)?;
        let mut p = Project::load(&app.root, &project)?;
        let mode = if body.draft {
            SaveMode::Draft
        } else {
            SaveMode::Complete
        };
        let fragment = p.save_step(family, &step, body.payload, mode, engine.mode())?;
        p.save(&app.root)?;
        tracing::info!(project = %p.id, %family, step = %fragment.step, status = %fragment.status, "step saved");
        Ok(serde_json::to_value(&fragment)?)
    })
    .await?;

    Ok(Json(result))
}

#[derive(Clone, Copy)]
enum FamilyAction {
    Submit,
    Approve,
    Lock,
}

async fn family_action(
    app: AppState,
    family: String,
    project: String,
    action: FamilyAction,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = super::blocking(move || {
        let (family, _) = resolve_family(&app, &family)?;
        let mut p = Project::load(&app.root, &project)?;
        let statuses = match action {
            FamilyAction::Submit => p.submit_family(family)?,
            FamilyAction::Approve => p.approve_family(family)?,
            FamilyAction::Lock => p.lock_family(family)?,
        };
        p.save(&app.root)?;
        Ok(serde_json::json!({
            "family": family,
            "statuses": statuses,
        }))
    })
    .await?;

    Ok(Json(result))
}

/// POST /api/:family/:project/submit: move every step to `submitted`.
pub async fn submit_family(
    State(app): State<AppState>,
    Path((family, project)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    family_action(app, family, project, FamilyAction::Submit).await
}

/// POST /api/:family/:project/approve
pub async fn approve_family(
    State(app): State<AppState>,
    Path((family, project)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    family_action(app, family, project, FamilyAction::Approve).await
}

/// POST /api/:family/:project/lock
pub async fn lock_family(
    State(app): State<AppState>,
    Path((family, project)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    family_action(app, family, project, FamilyAction::Lock).await
}
