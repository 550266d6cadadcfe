use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a single wizard step, as recorded by the backend.
///
/// `NotStarted -> InProgress -> Completed -> Submitted -> {Approved | Locked}`.
/// `Completed` is the "saved and valid" mark; the last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotStarted,
    InProgress,
    Completed,
    Submitted,
    Approved,
    Locked,
}

impl StepStatus {
    pub fn all() -> &'static [StepStatus] {
        &[
            StepStatus::NotStarted,
            StepStatus::InProgress,
            StepStatus::Completed,
            StepStatus::Submitted,
            StepStatus::Approved,
            StepStatus::Locked,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::NotStarted => "not_started",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Submitted => "submitted",
            StepStatus::Approved => "approved",
            StepStatus::Locked => "locked",
        }
    }

    /// Counts as done for gating purposes.
    pub fn is_complete(self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Submitted | StepStatus::Approved | StepStatus::Locked
        )
    }

    /// In-progress-or-further; what the progress bar counts.
    pub fn is_started(self) -> bool {
        !matches!(self, StepStatus::NotStarted)
    }

    /// Read-only from here on.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Submitted | StepStatus::Approved | StepStatus::Locked
        )
    }

    /// Forward-only edges of the step state machine. Re-saving a step that
    /// is already in progress or completed is allowed.
    pub fn can_transition_to(self, target: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, target),
            (NotStarted, InProgress)
                | (NotStarted, Completed)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (Completed, InProgress)
                | (Completed, Completed)
                | (InProgress, Submitted)
                | (Completed, Submitted)
                | (Submitted, Approved)
                | (Submitted, Locked)
                | (Approved, Locked)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepStatus {
    type Err = crate::error::WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(StepStatus::NotStarted),
            "in_progress" => Ok(StepStatus::InProgress),
            "completed" => Ok(StepStatus::Completed),
            "submitted" => Ok(StepStatus::Submitted),
            "approved" => Ok(StepStatus::Approved),
            "locked" => Ok(StepStatus::Locked),
            _ => Err(crate::error::WizardError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusValue
// ---------------------------------------------------------------------------

/// One entry of a step status map. The backend sends either a named status
/// or a bare boolean; anything else is kept verbatim and treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Flag(bool),
    Named(StepStatus),
    Other(serde_json::Value),
}

impl StatusValue {
    pub fn status(&self) -> Option<StepStatus> {
        match self {
            StatusValue::Named(s) => Some(*s),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            StatusValue::Flag(b) => *b,
            StatusValue::Named(s) => s.is_complete(),
            StatusValue::Other(_) => false,
        }
    }

    pub fn is_started(&self) -> bool {
        match self {
            StatusValue::Flag(b) => *b,
            StatusValue::Named(s) => s.is_started(),
            StatusValue::Other(_) => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().map(StepStatus::is_terminal).unwrap_or(false)
    }
}

impl From<StepStatus> for StatusValue {
    fn from(s: StepStatus) -> Self {
        StatusValue::Named(s)
    }
}

impl From<bool> for StatusValue {
    fn from(b: bool) -> Self {
        StatusValue::Flag(b)
    }
}

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Diagnosis,
    Performance,
    Compensation,
}

impl Family {
    pub fn all() -> &'static [Family] {
        &[Family::Diagnosis, Family::Performance, Family::Compensation]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Diagnosis => "diagnosis",
            Family::Performance => "performance",
            Family::Compensation => "compensation",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Family::Diagnosis => "Diagnosis",
            Family::Performance => "Performance",
            Family::Compensation => "Compensation",
        }
    }

    pub fn base_path(self) -> &'static str {
        match self {
            Family::Diagnosis => "/diagnosis",
            Family::Performance => "/performance",
            Family::Compensation => "/compensation",
        }
    }

    /// `<base-path>/{project}/{step}`.
    pub fn step_href(self, project: &str, step: &str) -> String {
        format!("{}/{}/{}", self.base_path(), project, step)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Family {
    type Err = crate::error::WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diagnosis" => Ok(Family::Diagnosis),
            "performance" => Ok(Family::Performance),
            "compensation" => Ok(Family::Compensation),
            _ => Err(crate::error::WizardError::UnknownFamily(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_and_display_agree() {
        for &s in StepStatus::all() {
            let parsed: StepStatus = s.as_str().parse().unwrap();
            assert_eq!(parsed, s);
            assert_eq!(s.to_string(), s.as_str());
        }
        assert!("done".parse::<StepStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(StepStatus::Submitted.is_terminal());
        assert!(StepStatus::Approved.is_terminal());
        assert!(StepStatus::Locked.is_terminal());
        assert!(!StepStatus::Completed.is_terminal());
        assert!(!StepStatus::InProgress.is_terminal());
    }

    #[test]
    fn transitions_are_forward_only() {
        assert!(StepStatus::NotStarted.can_transition_to(StepStatus::InProgress));
        assert!(StepStatus::Submitted.can_transition_to(StepStatus::Locked));
        assert!(!StepStatus::Submitted.can_transition_to(StepStatus::InProgress));
        assert!(!StepStatus::Locked.can_transition_to(StepStatus::Approved));
        assert!(!StepStatus::NotStarted.can_transition_to(StepStatus::Submitted));
    }

    #[test]
    fn status_value_accepts_bool_string_and_garbage() {
        let v: StatusValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, StatusValue::Flag(true));
        assert!(v.is_complete());

        let v: StatusValue = serde_json::from_str("\"submitted\"").unwrap();
        assert_eq!(v, StatusValue::Named(StepStatus::Submitted));
        assert!(v.is_terminal());

        let v: StatusValue = serde_json::from_str("\"finished\"").unwrap();
        assert!(matches!(v, StatusValue::Other(_)));
        assert!(!v.is_complete());
        assert!(!v.is_started());

        let v: StatusValue = serde_json::from_str("42").unwrap();
        assert!(!v.is_complete());
    }

    #[test]
    fn false_flag_is_neither_started_nor_complete() {
        let v = StatusValue::Flag(false);
        assert!(!v.is_complete());
        assert!(!v.is_started());
        assert!(!v.is_terminal());
    }

    #[test]
    fn family_paths() {
        assert_eq!(
            Family::Diagnosis.step_href("acme", "workforce"),
            "/diagnosis/acme/workforce"
        );
        assert_eq!("compensation".parse::<Family>().unwrap(), Family::Compensation);
        assert!("payroll".parse::<Family>().is_err());
    }
}
