use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hrwizard_core::error::WizardError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

fn status_for(e: &WizardError) -> StatusCode {
    match e {
        WizardError::NotInitialized => StatusCode::BAD_REQUEST,
        WizardError::ProjectNotFound(_)
        | WizardError::UnknownFamily(_)
        | WizardError::StepNotFound { .. } => StatusCode::NOT_FOUND,
        WizardError::ProjectExists(_) => StatusCode::CONFLICT,
        WizardError::InvalidSlug(_)
        | WizardError::InvalidStatus(_)
        | WizardError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        WizardError::FamilyDisabled(_) => StatusCode::FORBIDDEN,
        WizardError::StepLocked { .. } | WizardError::Blocked(_) => StatusCode::CONFLICT,
        WizardError::InvalidTransition { .. } | WizardError::Validation { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WizardError::Remote { .. } | WizardError::Transport(_) => StatusCode::BAD_GATEWAY,
        WizardError::Io(_) | WizardError::Yaml(_) | WizardError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Some(e) = self.0.downcast_ref::<WizardError>() else {
            tracing::error!(error = %self.0, "unhandled error");
            let body = serde_json::json!({ "error": self.0.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
        };

        let status = status_for(e);
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }

        let body = match e {
            WizardError::Validation { fields } => serde_json::json!({
                "error": e.to_string(),
                "fields": fields,
            }),
            _ => serde_json::json!({ "error": e.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn project_not_found_maps_to_404() {
        let err = AppError(WizardError::ProjectNotFound("acme".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unknown_family_maps_to_404() {
        let err = AppError(WizardError::UnknownFamily("payroll".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn step_not_found_maps_to_404() {
        let err = AppError(
            WizardError::StepNotFound {
                family: "diagnosis".into(),
                step: "nope".into(),
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn project_exists_maps_to_409() {
        let err = AppError(WizardError::ProjectExists("acme".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn step_locked_maps_to_409() {
        let err = AppError(
            WizardError::StepLocked {
                step: "workforce".into(),
                status: "locked".into(),
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn blocked_maps_to_409() {
        let err = AppError(WizardError::Blocked("step 'workforce' is not complete".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_maps_to_422() {
        let mut fields = BTreeMap::new();
        fields.insert("present_headcount".to_string(), "required".to_string());
        let err = AppError(WizardError::Validation { fields }.into());
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn invalid_transition_maps_to_422() {
        let err = AppError(
            WizardError::InvalidTransition {
                step: "review".into(),
                from: "not_started".into(),
                to: "approved".into(),
            }
            .into(),
        );
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn family_disabled_maps_to_403() {
        let err = AppError(WizardError::FamilyDisabled("compensation".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn not_initialized_maps_to_400() {
        let err = AppError(WizardError::NotInitialized.into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn io_error_maps_to_500() {
        let io_err = std::io::Error::other("disk full");
        let err = AppError(WizardError::Io(io_err).into());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn non_wizard_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_is_json() {
        let err = AppError(WizardError::ProjectNotFound("acme".into()).into());
        let response = err.into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
