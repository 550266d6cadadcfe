pub mod backend;
pub mod config;
pub mod error;
pub mod family;
pub mod gating;
pub mod io;
pub mod paths;
pub mod project;
pub mod session;
pub mod step;
pub mod types;
pub mod view;

pub use error::{Result, WizardError};
