use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hrwizard_core::gating::GatingEngine;
use hrwizard_core::project::Project;
use hrwizard_core::types::Family;

use crate::error::AppError;
use crate::state::AppState;

fn family_summaries(p: &Project) -> serde_json::Value {
    let families: serde_json::Map<String, serde_json::Value> = Family::all()
        .iter()
        .map(|&f| {
            let progress = GatingEngine::for_family(f).aggregate_progress(&p.record(f));
            (
                f.to_string(),
                serde_json::json!({
                    "progress": progress,
                    "percent": progress.percent(),
                    "submitted": p.is_submitted(f),
                }),
            )
        })
        .collect();
    serde_json::Value::Object(families)
}

/// GET /api/projects: list all projects with per-family progress.
pub async fn list_projects(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = super::blocking(move || {
        let projects = Project::list(&app.root)?;
        let list: Vec<serde_json::Value> = projects
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "name": p.name,
                    "families": family_summaries(p),
                    "updated_at": p.updated_at,
                })
            })
            .collect();
        Ok(serde_json::json!(list))
    })
    .await?;

    Ok(Json(result))
}

/// GET /api/projects/:id: full project detail.
pub async fn get_project(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = super::blocking(move || {
        let p = Project::load(&app.root, &id)?;
        Ok(serde_json::json!({
            "id": p.id,
            "name": p.name,
            "families": family_summaries(&p),
            "history": p.history,
            "created_at": p.created_at,
            "updated_at": p.updated_at,
        }))
    })
    .await?;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct CreateProjectBody {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// POST /api/projects: create a project with every step `not_started`.
pub async fn create_project(
    State(app): State<AppState>,
    Json(body): Json<CreateProjectBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let result = super::blocking(move || {
        // Refuse to create projects outside an initialised workspace.
        app.config()?;
        let name = body.name.unwrap_or_else(|| body.id.replace('-', " "));
        let p = Project::create(&app.root, body.id, name)?;
        Ok(serde_json::json!({
            "id": p.id,
            "name": p.name,
            "families": family_summaries(&p),
        }))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(result)))
}
