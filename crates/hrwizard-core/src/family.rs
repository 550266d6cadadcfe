use crate::error::{Result, WizardError};
use crate::step::{RequiredField, StepDefinition, StepKind};
use crate::types::Family;

// ---------------------------------------------------------------------------
// Step tables
// ---------------------------------------------------------------------------

const COMPANY_INFO: &[RequiredField] = &[RequiredField::non_empty_string(
    "industry_category",
    "Please select an industry category.",
)];

const WORKFORCE: &[RequiredField] = &[RequiredField::positive_number(
    "present_headcount",
    "Please enter the current headcount.",
)];

const EXECUTIVES: &[RequiredField] = &[RequiredField::non_empty_collection(
    "executive_positions",
    "Please add at least one executive position.",
)];

const JOB_GRADES: &[RequiredField] = &[RequiredField::non_empty_collection(
    "job_grade_names",
    "Please define at least one job grade.",
)];

const ORG_CHARTS: &[RequiredField] = &[RequiredField::non_empty_collection(
    "organizational_charts",
    "Please upload at least one organizational chart.",
)];

const ORG_STRUCTURE: &[RequiredField] = &[RequiredField::non_empty_collection(
    "organizational_structure",
    "Please select at least one organizational structure type.",
)];

const JOB_STRUCTURE: &[RequiredField] = &[RequiredField::non_empty_collection(
    "job_categories",
    "Please add at least one job category.",
)];

const HR_ISSUES: &[RequiredField] = &[RequiredField::non_empty_collection(
    "hr_issues",
    "Please select at least one HR issue.",
)];

const PERFORMANCE_METHOD: &[RequiredField] = &[
    RequiredField::non_empty_string("evaluation_unit", "Please choose an evaluation unit."),
    RequiredField::non_empty_string(
        "performance_method",
        "Please choose a performance management method.",
    ),
];

const EVALUATION_STRUCTURE: &[RequiredField] = &[RequiredField::non_empty_collection(
    "evaluation_structure",
    "Please configure the evaluation structure.",
)];

const COMPENSATION_STRUCTURE: &[RequiredField] = &[RequiredField::non_empty_string(
    "compensation_structure",
    "Please choose a compensation structure.",
)];

const PAY_DIFFERENTIATION: &[RequiredField] = &[RequiredField::non_empty_string(
    "differentiation_method",
    "Please choose a differentiation method.",
)];

static DIAGNOSIS: &[StepDefinition] = &[
    StepDefinition::overview(),
    StepDefinition::data("company-info", "Company Info", COMPANY_INFO),
    StepDefinition::data("workforce", "Workforce", WORKFORCE),
    StepDefinition::data("executives", "Executives", EXECUTIVES),
    StepDefinition::data("job-grades", "Job Grades", JOB_GRADES),
    StepDefinition::data("organizational-charts", "Organizational Charts", ORG_CHARTS),
    StepDefinition::data(
        "organizational-structure",
        "Organizational Structure",
        ORG_STRUCTURE,
    ),
    StepDefinition::data("job-structure", "Job Structure", JOB_STRUCTURE),
    StepDefinition::data("hr-issues", "HR Issues", HR_ISSUES),
    StepDefinition::review(),
];

static PERFORMANCE: &[StepDefinition] = &[
    StepDefinition::overview(),
    StepDefinition::data("performance-method", "Performance Method", PERFORMANCE_METHOD),
    StepDefinition::data(
        "evaluation-structure",
        "Evaluation Structure",
        EVALUATION_STRUCTURE,
    ),
    StepDefinition::review(),
];

static COMPENSATION: &[StepDefinition] = &[
    StepDefinition::overview(),
    StepDefinition::data(
        "compensation-structure",
        "Compensation Structure",
        COMPENSATION_STRUCTURE,
    ),
    StepDefinition::data(
        "pay-differentiation",
        "Pay Differentiation",
        PAY_DIFFERENTIATION,
    ),
    StepDefinition::review(),
];

/// The fixed step order of a family.
pub fn steps(family: Family) -> &'static [StepDefinition] {
    match family {
        Family::Diagnosis => DIAGNOSIS,
        Family::Performance => PERFORMANCE,
        Family::Compensation => COMPENSATION,
    }
}

pub fn find_step(family: Family, step_id: &str) -> Option<&'static StepDefinition> {
    steps(family).iter().find(|s| s.id == step_id)
}

pub fn require_step(family: Family, step_id: &str) -> Result<&'static StepDefinition> {
    find_step(family, step_id).ok_or_else(|| WizardError::StepNotFound {
        family: family.to_string(),
        step: step_id.to_string(),
    })
}

/// Steps that count towards progress and submission (everything but overview).
pub fn counted_steps(family: Family) -> impl Iterator<Item = &'static StepDefinition> {
    steps(family).iter().filter(|s| !s.is_overview())
}

/// Form steps only: what a submit requires to be complete.
pub fn data_steps(family: Family) -> impl Iterator<Item = &'static StepDefinition> {
    steps(family).iter().filter(|s| s.kind == StepKind::Data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
