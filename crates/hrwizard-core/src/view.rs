use crate::gating::{GatingEngine, Progress, StepRecord};
use crate::step::{Payload, StepKind};
use crate::types::Family;
use serde::Serialize;

// ---------------------------------------------------------------------------
// TabView / WizardView
// ---------------------------------------------------------------------------

/// What a single wizard tab needs to render.
#[derive(Debug, Clone, Serialize)]
pub struct TabView {
    pub id: &'static str,
    pub display_name: &'static str,
    pub kind: StepKind,
    pub href: String,
    pub enabled: bool,
    pub complete: bool,
    pub read_only: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub family: Family,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    pub tabs: Vec<TabView>,
    pub progress: Progress,
    pub percent: u8,
}

impl WizardView {
    pub fn tab(&self, id: &str) -> Option<&TabView> {
        self.tabs.iter().find(|t| t.id == id)
    }
}

/// Build the tab strip and progress bar for one family page.
pub fn wizard_view(
    engine: &GatingEngine<'static>,
    family: Family,
    project: &str,
    active: Option<&str>,
    record: &StepRecord,
    payload: &Payload,
) -> WizardView {
    let tabs = engine
        .order()
        .iter()
        .map(|step| TabView {
            id: step.id,
            display_name: step.display_name,
            kind: step.kind,
            href: family.step_href(project, step.id),
            enabled: engine.is_step_enabled(step.id, record, payload),
            complete: engine.is_step_complete(step.id, record, payload),
            read_only: engine.is_step_read_only(step.id, record),
            active: active == Some(step.id),
        })
        .collect();
    let progress = engine.aggregate_progress(record);

    WizardView {
        family,
        project: project.to_string(),
        active: active.map(str::to_string),
        tabs,
        progress,
        percent: progress.percent(),
    }
}
