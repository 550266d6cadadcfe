use crate::error::{Result, WizardError};
use crate::gating::GatingMode;
use crate::paths;
use crate::types::Family;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatingConfig {
    #[serde(default)]
    pub mode: GatingMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3180
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub gating: GatingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub families: BTreeMap<Family, FamilyConfig>,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: 1,
            workspace: WorkspaceConfig {
                name: name.into(),
                description: None,
            },
            gating: GatingConfig::default(),
            server: ServerConfig::default(),
            families: BTreeMap::new(),
        }
    }

    /// Families are enabled unless switched off explicitly.
    pub fn is_family_enabled(&self, family: Family) -> bool {
        self.families.get(&family).map(|f| f.enabled).unwrap_or(true)
    }

    pub fn require_family(&self, family: Family) -> Result<()> {
        if self.is_family_enabled(family) {
            Ok(())
        } else {
            Err(WizardError::FamilyDisabled(family.to_string()))
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(WizardError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.workspace.name.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "workspace.name is empty".to_string(),
            });
        }

        if self.server.port == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "server.port is 0; the OS will pick a port on every start".to_string(),
            });
        }

        if Family::all().iter().all(|&f| !self.is_family_enabled(f)) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "every wizard family is disabled".to_string(),
            });
        }

        if self.version != 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("unknown config version {}", self.version),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
