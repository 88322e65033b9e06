//! Configuration for the registry print service

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default hard wall-clock limit for one conversion run.
pub const DEFAULT_CONVERT_TIMEOUT_SECS: u64 = 60;

/// Main configuration structure, assembled once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base directory under which per-request workspaces are created.
    pub temp_dir: PathBuf,

    /// Path to the DOCX template merged on every request.
    pub template_path: PathBuf,

    /// Explicit converter binary path; conventional install locations are
    /// probed when absent.
    pub soffice_path: Option<PathBuf>,

    #[serde(default = "default_convert_timeout_secs")]
    pub convert_timeout_secs: u64,
}

fn default_convert_timeout_secs() -> u64 {
    DEFAULT_CONVERT_TIMEOUT_SECS
}

impl ServiceConfig {
    pub fn convert_timeout(&self) -> Duration {
        Duration::from_secs(self.convert_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.temp_dir.as_os_str().is_empty() {
            return Err(Error::Resource("temp directory path is empty".to_string()));
        }

        if !self.template_path.is_file() {
            return Err(Error::Render(format!(
                "template not found at {}",
                self.template_path.display()
            )));
        }

        if self.convert_timeout_secs == 0 {
            return Err(Error::Resource(
                "conversion timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}
