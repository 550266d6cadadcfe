use hrwizard_core::config::Config;
use std::path::PathBuf;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
}

impl AppState {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Config is re-read per request so edits to config.yaml apply without
    /// a restart.
    pub fn config(&self) -> hrwizard_core::Result<Config> {
        Config::load(&self.root)
    }
}
