use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("not initialized: run 'hrwizard init'")]
    NotInitialized,

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project already exists: {0}")]
    ProjectExists(String),

    #[error("invalid project id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("unknown wizard family: {0}")]
    UnknownFamily(String),

    #[error("family '{0}' is disabled in config")]
    FamilyDisabled(String),

    #[error("step '{step}' not found in family '{family}'")]
    StepNotFound { family: String, step: String },

    #[error("invalid step status: {0}")]
    InvalidStatus(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("step '{step}' is {status} and can no longer be edited")]
    StepLocked { step: String, status: String },

    #[error("invalid transition for '{step}' from {from} to {to}")]
    InvalidTransition {
        step: String,
        from: String,
        to: String,
    },

    #[error("{}", validation_summary(.fields))]
    Validation { fields: BTreeMap<String, String> },

    #[error("blocked by: {0}")]
    Blocked(String),

    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn validation_summary(fields: &BTreeMap<String, String>) -> String {
    match fields.values().next() {
        Some(first) if fields.len() == 1 => format!("validation failed: {first}"),
        Some(first) => format!(
            "validation failed: {first} (and {} more)",
            fields.len() - 1
        ),
        None => "validation failed".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, WizardError>;
