use crate::error::WizardError;
use crate::family;
use crate::step::{Payload, StepDefinition};
use crate::types::{Family, StatusValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server-supplied step statuses for one family of one project.
pub type StepRecord = BTreeMap<String, StatusValue>;

// ---------------------------------------------------------------------------
// GatingMode
// ---------------------------------------------------------------------------

/// `Permissive` additionally unlocks a step when it, or any step after it,
/// has already been started. Projects that got there before a rule change
/// are never locked out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingMode {
    #[default]
    Permissive,
    Strict,
}

impl GatingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GatingMode::Permissive => "permissive",
            GatingMode::Strict => "strict",
        }
    }
}

impl std::fmt::Display for GatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GatingMode {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permissive" => Ok(GatingMode::Permissive),
            "strict" => Ok(GatingMode::Strict),
            _ => Err(WizardError::InvalidConfig(format!(
                "unknown gating mode '{s}' (expected permissive or strict)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }
}

// ---------------------------------------------------------------------------
// GatingEngine
// ---------------------------------------------------------------------------

/// Decides completion, navigability and progress for one ordered list of
/// steps. Every method is pure; nothing here returns an error.
#[derive(Debug, Clone, Copy)]
pub struct GatingEngine<'a> {
    order: &'a [StepDefinition],
    mode: GatingMode,
}

impl<'a> GatingEngine<'a> {
    pub fn new(order: &'a [StepDefinition]) -> Self {
        Self {
            order,
            mode: GatingMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: GatingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn order(&self) -> &'a [StepDefinition] {
        self.order
    }

    pub fn mode(&self) -> GatingMode {
        self.mode
    }

    fn position(&self, step_id: &str) -> Option<usize> {
        self.order.iter().position(|s| s.id == step_id)
    }

    pub fn step(&self, step_id: &str) -> Option<&'a StepDefinition> {
        self.order.iter().find(|s| s.id == step_id)
    }

    fn first_counted(&self) -> Option<usize> {
        self.order.iter().position(|s| !s.is_overview())
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// A recorded complete status wins; otherwise the step's required-field
    /// rules are checked against the payload. Unknown steps are incomplete.
    pub fn is_step_complete(&self, step_id: &str, record: &StepRecord, payload: &Payload) -> bool {
        let Some(step) = self.step(step_id) else {
            return false;
        };
        if record.get(step_id).is_some_and(StatusValue::is_complete) {
            return true;
        }
        step.payload_complete(payload)
    }

    /// Terminal steps render with every input disabled.
    pub fn is_step_read_only(&self, step_id: &str, record: &StepRecord) -> bool {
        record.get(step_id).is_some_and(StatusValue::is_terminal)
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Overview and the first counted step are always enabled; a later step
    /// needs every earlier counted step complete. Unknown steps are enabled.
    pub fn is_step_enabled(&self, step_id: &str, record: &StepRecord, payload: &Payload) -> bool {
        let Some(idx) = self.position(step_id) else {
            return true;
        };
        if self.order[idx].is_overview() {
            return true;
        }
        if self.first_counted().is_some_and(|first| idx <= first) {
            return true;
        }

        let prior_complete = self.order[..idx]
            .iter()
            .filter(|s| !s.is_overview())
            .all(|s| self.is_step_complete(s.id, record, payload));
        if prior_complete {
            return true;
        }

        match self.mode {
            GatingMode::Strict => false,
            GatingMode::Permissive => self.order[idx..]
                .iter()
                .any(|s| record.get(s.id).is_some_and(StatusValue::is_started)),
        }
    }

    pub fn next_step(&self, step_id: &str) -> Option<&'a StepDefinition> {
        let idx = self.position(step_id)?;
        self.order.get(idx + 1)
    }

    pub fn previous_step(&self, step_id: &str) -> Option<&'a StepDefinition> {
        let idx = self.position(step_id)?;
        idx.checked_sub(1).and_then(|i| self.order.get(i))
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    /// Steps (excluding overview) whose status is in-progress-or-further.
    pub fn aggregate_progress(&self, record: &StepRecord) -> Progress {
        let counted = self.order.iter().filter(|s| !s.is_overview());
        let mut completed = 0;
        let mut total = 0;
        for step in counted {
            total += 1;
            if record.get(step.id).is_some_and(StatusValue::is_started) {
                completed += 1;
            }
        }
        Progress { completed, total }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// First unmet requirement of the step, for blocking a "Next" click.
    pub fn validate_required_fields(&self, step_id: &str, payload: &Payload) -> FieldCheck {
        match self.step(step_id).and_then(|s| s.first_unmet(payload)) {
            Some(rule) => FieldCheck {
                valid: false,
                message: Some(rule.message.to_string()),
            },
            None => FieldCheck::ok(),
        }
    }

    /// Every unmet requirement keyed by field name.
    pub fn field_errors(&self, step_id: &str, payload: &Payload) -> BTreeMap<String, String> {
        let Some(step) = self.step(step_id) else {
            return BTreeMap::new();
        };
        step.required
            .iter()
            .filter(|r| !r.is_satisfied(payload))
            .map(|r| (r.key.to_string(), r.message.to_string()))
            .collect()
    }
}

impl GatingEngine<'static> {
    pub fn for_family(family: Family) -> Self {
        Self::new(family::steps(family))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::RequiredField;
    use crate::types::StepStatus;
    use serde_json::json;

    #[test]
    fn gating_mode_parses() {
        assert_eq!("strict".parse::<GatingMode>().unwrap(), GatingMode::Strict);
        assert_eq!(GatingMode::default().to_string(), "permissive");
        assert!(matches!(
            "lenient".parse::<GatingMode>(),
            Err(WizardError::InvalidConfig(_))
        ));
    }

    const COMPANY: &[RequiredField] = &[RequiredField::non_empty_string(
        "industry_category",
        "Please select an industry category.",
    )];
    const WORKFORCE: &[RequiredField] = &[RequiredField::positive_number(
        "present_headcount",
        "Please enter the current headcount.",
    )];

    static ORDER: &[StepDefinition] = &[
        StepDefinition::overview(),
        StepDefinition::data("company-info", "Company Info", COMPANY),
        StepDefinition::data("workforce", "Workforce", WORKFORCE),
        StepDefinition::review(),
    ];

    fn payload(v: serde_json::Value) -> Payload {
        v.as_object().cloned().unwrap()
    }

    fn record(entries: &[(&str, StatusValue)]) -> StepRecord {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn strict() -> GatingEngine<'static> {
        GatingEngine::new(ORDER).with_mode(GatingMode::Strict)
    }

    #[test]
    fn submitted_company_info_unlocks_workforce_only() {
        let rec = record(&[("company-info", StepStatus::Submitted.into())]);
        let data = payload(json!({"present_headcount": 0}));
        for engine in [GatingEngine::new(ORDER), strict()] {
            assert!(!engine.is_step_complete("workforce", &rec, &data));
            assert!(engine.is_step_enabled("workforce", &rec, &data));
            assert!(!engine.is_step_enabled("review", &rec, &data));
        }
    }

    #[test]
    fn payload_fallback_completes_without_status() {
        let engine = GatingEngine::new(ORDER);
        let data = payload(json!({"industry_category": "Tech"}));
        assert!(engine.is_step_complete("company-info", &StepRecord::new(), &data));
    }

    #[test]
    fn locked_step_is_read_only() {
        let engine = GatingEngine::new(ORDER);
        let rec = record(&[("workforce", StepStatus::Locked.into())]);
        assert!(engine.is_step_read_only("workforce", &rec));
        assert!(!engine.is_step_read_only("company-info", &rec));
    }

    #[test]
    fn boolean_true_counts_as_complete() {
        let engine = strict();
        let rec = record(&[("company-info", true.into()), ("workforce", true.into())]);
        assert!(engine.is_step_complete("workforce", &rec, &Payload::new()));
        assert!(engine.is_step_enabled("review", &rec, &Payload::new()));
    }

    #[test]
    fn in_progress_status_falls_back_to_payload() {
        let engine = GatingEngine::new(ORDER);
        let rec = record(&[("workforce", StepStatus::InProgress.into())]);
        assert!(!engine.is_step_complete("workforce", &rec, &Payload::new()));
        let data = payload(json!({"present_headcount": "25"}));
        assert!(engine.is_step_complete("workforce", &rec, &data));
    }

    #[test]
    fn unknown_step_fails_open_for_navigation_and_closed_for_completion() {
        let engine = strict();
        let rec = record(&[("future-step", StepStatus::Completed.into())]);
        assert!(engine.is_step_enabled("future-step", &rec, &Payload::new()));
        assert!(!engine.is_step_complete("future-step", &rec, &Payload::new()));
        assert!(engine.validate_required_fields("future-step", &Payload::new()).valid);
    }

    #[test]
    fn malformed_status_is_ignored() {
        let engine = strict();
        let rec: StepRecord =
            serde_json::from_value(json!({"company-info": {"weird": 1}, "workforce": 7})).unwrap();
        assert!(!engine.is_step_complete("company-info", &rec, &Payload::new()));
        assert_eq!(engine.aggregate_progress(&rec).completed, 0);
    }

    #[test]
    fn first_counted_step_always_enabled() {
        let statuses: Vec<Option<StatusValue>> = vec![
            None,
            Some(false.into()),
            Some(StepStatus::NotStarted.into()),
            Some(StepStatus::Locked.into()),
        ];
        for mode in [GatingMode::Strict, GatingMode::Permissive] {
            let engine = GatingEngine::new(ORDER).with_mode(mode);
            for s in &statuses {
                let mut rec = StepRecord::new();
                if let Some(v) = s {
                    rec.insert("workforce".to_string(), v.clone());
                }
                assert!(engine.is_step_enabled("company-info", &rec, &Payload::new()));
                assert!(engine.is_step_enabled("overview", &rec, &Payload::new()));
            }
        }
    }

    #[test]
    fn strict_enablement_matches_prior_completion_for_every_record() {
        let values: Vec<Option<StatusValue>> = vec![
            None,
            Some(false.into()),
            Some(true.into()),
            Some(StepStatus::InProgress.into()),
            Some(StepStatus::Completed.into()),
            Some(StepStatus::Locked.into()),
        ];
        let payloads = [
            Payload::new(),
            payload(json!({"industry_category": "Retail"})),
            payload(json!({"industry_category": "Retail", "present_headcount": 9})),
        ];
        let engine = strict();
        let ids = ["company-info", "workforce", "review"];

        for a in &values {
            for b in &values {
                for c in &values {
                    let mut rec = StepRecord::new();
                    for (id, v) in ids.iter().zip([a, b, c]) {
                        if let Some(v) = v {
                            rec.insert(id.to_string(), v.clone());
                        }
                    }
                    for data in &payloads {
                        for (i, step) in ORDER.iter().enumerate().skip(2) {
                            let expected = ORDER[1..i]
                                .iter()
                                .all(|s| engine.is_step_complete(s.id, &rec, data));
                            assert_eq!(
                                engine.is_step_enabled(step.id, &rec, data),
                                expected,
                                "step {} record {:?}",
                                step.id,
                                rec
                            );
                        }
                        let p = engine.aggregate_progress(&rec);
                        assert!(p.completed <= p.total);
                        assert_eq!(p.total, 3);
                    }
                }
            }
        }
    }

    #[test]
    fn permissive_unlocks_when_later_step_already_started() {
        let rec = record(&[("review", StepStatus::InProgress.into())]);
        let permissive = GatingEngine::new(ORDER);
        assert!(permissive.is_step_enabled("workforce", &rec, &Payload::new()));
        assert!(permissive.is_step_enabled("review", &rec, &Payload::new()));
        assert!(!strict().is_step_enabled("workforce", &rec, &Payload::new()));
    }

    #[test]
    fn completion_is_pure() {
        let engine = GatingEngine::new(ORDER);
        let rec = record(&[("company-info", StepStatus::InProgress.into())]);
        let data = payload(json!({"industry_category": "Tech"}));
        let first = engine.is_step_complete("company-info", &rec, &data);
        let second = engine.is_step_complete("company-info", &rec, &data);
        assert_eq!(first, second);
    }

    #[test]
    fn progress_counts_started_steps() {
        let engine = GatingEngine::new(ORDER);
        let rec = record(&[
            ("overview", StepStatus::Completed.into()),
            ("company-info", StepStatus::Submitted.into()),
            ("workforce", StepStatus::InProgress.into()),
            ("review", StepStatus::NotStarted.into()),
            ("stray", StepStatus::Completed.into()),
        ]);
        let p = engine.aggregate_progress(&rec);
        assert_eq!(p, Progress { completed: 2, total: 3 });
        assert_eq!(p.percent(), 66);
    }

    #[test]
    fn validation_reports_first_unmet_rule() {
        let engine = GatingEngine::for_family(Family::Performance);
        let check = engine.validate_required_fields(
            "performance-method",
            &payload(json!({"performance_method": "OKR"})),
        );
        assert!(!check.valid);
        assert_eq!(check.message.as_deref(), Some("Please choose an evaluation unit."));

        let errors = engine.field_errors("performance-method", &Payload::new());
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key("evaluation_unit"));
        assert!(errors.contains_key("performance_method"));
    }

    #[test]
    fn next_and_previous_follow_order() {
        let engine = GatingEngine::new(ORDER);
        assert_eq!(engine.next_step("overview").unwrap().id, "company-info");
        assert!(engine.next_step("review").is_none());
        assert_eq!(engine.previous_step("workforce").unwrap().id, "company-info");
        assert!(engine.previous_step("overview").is_none());
        assert!(engine.next_step("nope").is_none());
    }
}
