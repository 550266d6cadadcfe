use serde::Serialize;
use serde_json::Value;

/// Loosely-typed answers recorded for one family (industry_category,
/// present_headcount, organizational_charts, ...).
pub type Payload = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// FieldKind / RequiredField
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    NonEmptyString,
    PositiveNumber,
    NonEmptyCollection,
}

/// A single required-field rule. Rules are static tables evaluated
/// generically against a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredField {
    pub kind: FieldKind,
    pub key: &'static str,
    pub message: &'static str,
}

impl RequiredField {
    pub const fn non_empty_string(key: &'static str, message: &'static str) -> Self {
        Self {
            kind: FieldKind::NonEmptyString,
            key,
            message,
        }
    }

    pub const fn positive_number(key: &'static str, message: &'static str) -> Self {
        Self {
            kind: FieldKind::PositiveNumber,
            key,
            message,
        }
    }

    pub const fn non_empty_collection(key: &'static str, message: &'static str) -> Self {
        Self {
            kind: FieldKind::NonEmptyCollection,
            key,
            message,
        }
    }

    pub fn is_satisfied(&self, payload: &Payload) -> bool {
        let Some(value) = payload.get(self.key) else {
            return false;
        };
        match self.kind {
            FieldKind::NonEmptyString => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            FieldKind::PositiveNumber => positive_number(value),
            FieldKind::NonEmptyCollection => match value {
                Value::Array(items) => items.iter().any(has_content),
                Value::Object(map) => map.values().any(has_content),
                _ => false,
            },
        }
    }
}

fn positive_number(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().is_some_and(|f| f.is_finite() && f > 0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .is_ok_and(|f| f.is_finite() && f > 0.0),
        _ => false,
    }
}

/// Null, blank strings and empty containers carry nothing.
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

// ---------------------------------------------------------------------------
// StepKind / StepDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Synthetic landing tab; always unlocked, never counted.
    Overview,
    Data,
    /// Terminal summary; gated like any step but never gates anything.
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub kind: StepKind,
    pub required: &'static [RequiredField],
}

impl StepDefinition {
    pub const fn overview() -> Self {
        Self {
            id: "overview",
            display_name: "Overview",
            kind: StepKind::Overview,
            required: &[],
        }
    }

    pub const fn review() -> Self {
        Self {
            id: "review",
            display_name: "Review & Submit",
            kind: StepKind::Review,
            required: &[],
        }
    }

    pub const fn data(
        id: &'static str,
        display_name: &'static str,
        required: &'static [RequiredField],
    ) -> Self {
        Self {
            id,
            display_name,
            kind: StepKind::Data,
            required,
        }
    }

    pub fn is_overview(&self) -> bool {
        self.kind == StepKind::Overview
    }

    /// First rule the payload fails, if any.
    pub fn first_unmet(&self, payload: &Payload) -> Option<&'static RequiredField> {
        self.required.iter().find(|r| !r.is_satisfied(payload))
    }

    /// Payload fallback for completion. A step without rules cannot be
    /// completed from payload alone.
    pub fn payload_complete(&self, payload: &Payload) -> bool {
        !self.required.is_empty() && self.first_unmet(payload).is_none()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
