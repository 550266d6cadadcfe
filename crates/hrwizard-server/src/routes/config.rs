use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: read-only view of `.hrwizard/config.yaml` plus any
/// validation warnings.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let result = super::blocking(move || {
        let config = app.config()?;
        let warnings = config.validate();
        let mut json = serde_json::to_value(&config)?;
        json["warnings"] = serde_json::to_value(&warnings)?;
        Ok(json)
    })
    .await?;

    Ok(Json(result))
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now(),
    }))
}
