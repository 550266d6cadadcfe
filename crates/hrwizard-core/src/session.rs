//! Client-side state of one wizard page: the active step, the form payload,
//! the locally echoed statuses and the single in-flight save.

use crate::gating::{GatingEngine, GatingMode, Progress, StepRecord};
use crate::project::{SaveMode, StepFragment};
use crate::step::Payload;
use crate::types::{Family, StatusValue, StepStatus};
use crate::view::{wizard_view, WizardView};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

/// Local refusals; none of these reach the network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("a save is already in flight")]
    Busy,

    #[error("step '{0}' is read-only")]
    ReadOnly(String),

    #[error("step '{0}' is not available yet")]
    NavigationRefused(String),

    #[error("{0}")]
    Invalid(String),

    #[error("no step after '{0}'")]
    LastStep(String),
}

/// Why a save came back unsuccessful.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaveError {
    Network { message: String },
    Validation { fields: BTreeMap<String, String> },
    Rejected { message: String },
}

impl SaveError {
    pub fn message(&self) -> String {
        match self {
            SaveError::Network { message } | SaveError::Rejected { message } => message.clone(),
            SaveError::Validation { fields } => fields
                .values()
                .next()
                .cloned()
                .unwrap_or_else(|| "validation failed".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveIntent {
    /// Validated save, then move to the next step.
    Next,
    /// Partial save, stay put.
    Draft,
}

impl SaveIntent {
    pub fn mode(self) -> SaveMode {
        match self {
            SaveIntent::Next => SaveMode::Complete,
            SaveIntent::Draft => SaveMode::Draft,
        }
    }
}

/// Handed out when a save is issued; the result must come back with it.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub id: u64,
    pub step: String,
    pub intent: SaveIntent,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextRequest {
    /// Send this save; call `complete_save` with its result.
    Save(SaveTicket),
    /// Read-only step, nothing to save; already moved on.
    Advanced { to: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveResolution {
    Advanced { to: String },
    Stayed,
    /// Result of a cancelled or superseded save.
    Ignored,
    Failed(SaveError),
}

// ---------------------------------------------------------------------------
// WizardSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WizardSession {
    family: Family,
    project: String,
    engine: GatingEngine<'static>,
    active: String,
    record: StepRecord,
    payload: Payload,
    in_flight: Option<u64>,
    next_ticket: u64,
    error: Option<SaveError>,
}

impl WizardSession {
    pub fn new(
        family: Family,
        project: impl Into<String>,
        mode: GatingMode,
        record: StepRecord,
        payload: Payload,
    ) -> Self {
        let engine = GatingEngine::for_family(family).with_mode(mode);
        let active = engine
            .order()
            .first()
            .map(|s| s.id.to_string())
            .unwrap_or_default();
        Self {
            family,
            project: project.into(),
            engine,
            active,
            record,
            payload,
            in_flight: None,
            next_ticket: 1,
            error: None,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn record(&self) -> &StepRecord {
        &self.record
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn error(&self) -> Option<&SaveError> {
        self.error.as_ref()
    }

    /// The Next/Save controls render disabled while this is true.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_read_only(&self) -> bool {
        self.engine.is_step_read_only(&self.active, &self.record)
    }

    pub fn progress(&self) -> Progress {
        self.engine.aggregate_progress(&self.record)
    }

    pub fn view(&self) -> WizardView {
        wizard_view(
            &self.engine,
            self.family,
            &self.project,
            Some(&self.active),
            &self.record,
            &self.payload,
        )
    }

    // -----------------------------------------------------------------------
    // Editing and navigation
    // -----------------------------------------------------------------------

    pub fn set_field(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), SessionError> {
        if self.is_read_only() {
            return Err(SessionError::ReadOnly(self.active.clone()));
        }
        self.payload.insert(key.into(), value);
        Ok(())
    }

    /// Tab click or Back. Leaving the step drops any pending save.
    pub fn navigate(&mut self, step_id: &str) -> Result<(), SessionError> {
        if !self
            .engine
            .is_step_enabled(step_id, &self.record, &self.payload)
        {
            return Err(SessionError::NavigationRefused(step_id.to_string()));
        }
        if step_id != self.active {
            self.cancel();
            self.error = None;
            self.active = step_id.to_string();
        }
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), SessionError> {
        let Some(prev) = self.engine.previous_step(&self.active) else {
            return Ok(());
        };
        self.navigate(prev.id)
    }

    // -----------------------------------------------------------------------
    // Save-then-navigate
    // -----------------------------------------------------------------------

    /// Next click: local validation first, then a save ticket.
    pub fn request_next(&mut self) -> Result<NextRequest, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        let next = self
            .engine
            .next_step(&self.active)
            .ok_or_else(|| SessionError::LastStep(self.active.clone()))?;

        let step_is_overview = self
            .engine
            .step(&self.active)
            .is_some_and(|s| s.is_overview());
        if self.is_read_only() || step_is_overview {
            if !self
                .engine
                .is_step_enabled(next.id, &self.record, &self.payload)
            {
                return Err(SessionError::NavigationRefused(next.id.to_string()));
            }
            self.error = None;
            self.active = next.id.to_string();
            return Ok(NextRequest::Advanced {
                to: self.active.clone(),
            });
        }

        let check = self
            .engine
            .validate_required_fields(&self.active, &self.payload);
        if !check.valid {
            return Err(SessionError::Invalid(
                check.message.unwrap_or_else(|| "required field missing".to_string()),
            ));
        }

        Ok(NextRequest::Save(self.issue(SaveIntent::Next)))
    }

    /// Partial save without validation.
    pub fn request_draft(&mut self) -> Result<SaveTicket, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.is_read_only() {
            return Err(SessionError::ReadOnly(self.active.clone()));
        }
        Ok(self.issue(SaveIntent::Draft))
    }

    fn issue(&mut self, intent: SaveIntent) -> SaveTicket {
        let id = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(id);
        self.error = None;
        SaveTicket {
            id,
            step: self.active.clone(),
            intent,
            payload: self.payload.clone(),
        }
    }

    /// Apply the backend's answer to a ticket. Answers to cancelled or
    /// superseded tickets are dropped.
    pub fn complete_save(
        &mut self,
        ticket: &SaveTicket,
        result: Result<StepFragment, SaveError>,
    ) -> SaveResolution {
        if self.in_flight != Some(ticket.id) {
            tracing::debug!(ticket = ticket.id, "ignoring stale save result");
            return SaveResolution::Ignored;
        }
        self.in_flight = None;

        match result {
            Ok(fragment) => {
                let echoed = match ticket.intent {
                    SaveIntent::Draft => StepStatus::InProgress,
                    SaveIntent::Next => fragment.status,
                };
                self.record
                    .insert(fragment.step.clone(), StatusValue::Named(echoed));

                match ticket.intent {
                    SaveIntent::Draft => SaveResolution::Stayed,
                    SaveIntent::Next => match self.engine.next_step(&ticket.step) {
                        Some(next)
                            if self
                                .engine
                                .is_step_enabled(next.id, &self.record, &self.payload) =>
                        {
                            self.active = next.id.to_string();
                            SaveResolution::Advanced {
                                to: self.active.clone(),
                            }
                        }
                        _ => SaveResolution::Stayed,
                    },
                }
            }
            Err(err) => {
                self.error = Some(err.clone());
                SaveResolution::Failed(err)
            }
        }
    }

    /// Forget the pending save; its result will be ignored.
    pub fn cancel(&mut self) {
        self.in_flight = None;
    }

    /// A fresh page load: server statuses replace the local echo. An active
    /// step the new record gates falls back to the nearest enabled step
    /// before it.
    pub fn reload(&mut self, record: StepRecord, payload: Payload) {
        self.cancel();
        self.record = record;
        self.payload = payload;
        self.error = None;

        if self
            .engine
            .is_step_enabled(&self.active, &self.record, &self.payload)
        {
            return;
        }
        let order = self.engine.order();
        let fallback = order
            .iter()
            .take_while(|s| s.id != self.active)
            .filter(|s| self.engine.is_step_enabled(s.id, &self.record, &self.payload))
            .last()
            .or_else(|| order.first());
        if let Some(step) = fallback {
            tracing::debug!(from = %self.active, to = step.id, "active step gated after reload");
            self.active = step.id.to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
