use crate::error::{Result, WizardError};
use crate::gating::{GatingMode, StepRecord};
use crate::project::{Project, SaveMode, StepFragment};
use crate::session::{NextRequest, SaveError, SaveResolution, SaveTicket, WizardSession};
use crate::step::Payload;
use crate::types::Family;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// StepBackend
// ---------------------------------------------------------------------------

/// Where a wizard page sends its saves.
pub trait StepBackend {
    fn load_family(&self, family: Family, project: &str) -> Result<(StepRecord, Payload)>;

    fn save_step(
        &self,
        family: Family,
        project: &str,
        step: &str,
        payload: &Payload,
        mode: SaveMode,
    ) -> Result<StepFragment>;

    fn submit_family(&self, family: Family, project: &str) -> Result<StepRecord>;
}

impl From<WizardError> for SaveError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Validation { fields } => SaveError::Validation { fields },
            WizardError::Transport(message) => SaveError::Network { message },
            other => SaveError::Rejected {
                message: other.to_string(),
            },
        }
    }
}

/// Send one ticket and feed the answer back into the session.
pub fn send_ticket(
    session: &mut WizardSession,
    backend: &dyn StepBackend,
    ticket: &SaveTicket,
) -> SaveResolution {
    let result = backend
        .save_step(
            session.family(),
            session.project(),
            &ticket.step,
            &ticket.payload,
            ticket.intent.mode(),
        )
        .map_err(SaveError::from);
    session.complete_save(ticket, result)
}

/// The whole Next click: validate locally, save, advance.
pub fn click_next(
    session: &mut WizardSession,
    backend: &dyn StepBackend,
) -> std::result::Result<SaveResolution, crate::session::SessionError> {
    match session.request_next()? {
        NextRequest::Advanced { to } => Ok(SaveResolution::Advanced { to }),
        NextRequest::Save(ticket) => Ok(send_ticket(session, backend, &ticket)),
    }
}

// ---------------------------------------------------------------------------
// LocalBackend
// ---------------------------------------------------------------------------

/// Reads and writes project manifests directly.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    gating: GatingMode,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>, gating: GatingMode) -> Self {
        Self {
            root: root.into(),
            gating,
        }
    }
}

impl StepBackend for LocalBackend {
    fn load_family(&self, family: Family, project: &str) -> Result<(StepRecord, Payload)> {
        let p = Project::load(&self.root, project)?;
        Ok((p.record(family), p.payload(family)))
    }

    fn save_step(
        &self,
        family: Family,
        project: &str,
        step: &str,
        payload: &Payload,
        mode: SaveMode,
    ) -> Result<StepFragment> {
        let mut p = Project::load(&self.root, project)?;
        let fragment = p.save_step(family, step, payload.clone(), mode, self.gating)?;
        p.save(&self.root)?;
        Ok(fragment)
    }

    fn submit_family(&self, family: Family, project: &str) -> Result<StepRecord> {
        let mut p = Project::load(&self.root, project)?;
        let record = p.submit_family(family)?;
        p.save(&self.root)?;
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SaveBody<'a> {
    payload: &'a Payload,
    draft: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    fields: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct FamilyBody {
    statuses: StepRecord,
    #[serde(default)]
    payload: Payload,
}

/// Talks to a running `hrwizard serve`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn url(&self, family: Family, project: &str, tail: Option<&str>) -> String {
        match tail {
            Some(t) => format!("{}/api/{}/{}/{}", self.base_url, family, project, t),
            None => format!("{}/api/{}/{}", self.base_url, family, project),
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::blocking::Response) -> Result<T> {
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| WizardError::Transport(e.to_string()))?;
        if status.is_success() {
            return Ok(serde_json::from_str(&text)?);
        }
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                fields: Some(fields),
                ..
            }) if status.as_u16() == 422 => Err(WizardError::Validation { fields }),
            Ok(body) => Err(WizardError::Remote {
                status: status.as_u16(),
                message: body.error,
            }),
            Err(_) => Err(WizardError::Remote {
                status: status.as_u16(),
                message: text,
            }),
        }
    }
}

impl StepBackend for HttpBackend {
    fn load_family(&self, family: Family, project: &str) -> Result<(StepRecord, Payload)> {
        let resp = self
            .client
            .get(self.url(family, project, None))
            .send()
            .map_err(|e| WizardError::Transport(e.to_string()))?;
        let body: FamilyBody = Self::decode(resp)?;
        Ok((body.statuses, body.payload))
    }

    fn save_step(
        &self,
        family: Family,
        project: &str,
        step: &str,
        payload: &Payload,
        mode: SaveMode,
    ) -> Result<StepFragment> {
        let body = SaveBody {
            payload,
            draft: mode == SaveMode::Draft,
        };
        let resp = self
            .client
            .post(self.url(family, project, Some(step)))
            .json(&body)
            .send()
            .map_err(|e| WizardError::Transport(e.to_string()))?;
        Self::decode(resp)
    }

    fn submit_family(&self, family: Family, project: &str) -> Result<StepRecord> {
        let resp = self
            .client
            .post(self.url(family, project, Some("submit")))
            .send()
            .map_err(|e| WizardError::Transport(e.to_string()))?;
        let body: FamilyBody = Self::decode(resp)?;
        Ok(body.statuses)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
