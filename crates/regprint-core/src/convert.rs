//! External document-to-PDF conversion
//!
//! Conversion shells out to a LibreOffice binary in headless mode. One
//! invocation either produces the PDF or fails the request; there are no
//! retries. Concurrent invocations are safe because each request runs the
//! converter inside its own workspace directory.

use crate::error::ConvertError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[cfg(not(windows))]
const BINARY_CANDIDATES: &[&str] = &[
    "/usr/bin/soffice",
    "/usr/local/bin/soffice",
    "/opt/libreoffice/program/soffice",
];

#[cfg(windows)]
const BINARY_CANDIDATES: &[&str] = &[
    "C:\\Program Files\\LibreOffice\\program\\soffice.exe",
    "C:\\Program Files (x86)\\LibreOffice\\program\\soffice.exe",
];

/// Converts a rendered document into a PDF next to it.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `document`, leaving the PDF at `output`. Returns the final
    /// output path.
    async fn convert(&self, document: &Path, output: &Path) -> Result<PathBuf, ConvertError>;
}

#[derive(Debug, Clone)]
pub struct SofficeConverter {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(binary: Option<PathBuf>, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    /// Locate the converter binary. An explicit configuration override wins;
    /// otherwise conventional install locations are probed in order.
    fn resolve_binary(&self) -> Result<PathBuf, ConvertError> {
        if let Some(path) = &self.binary {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(ConvertError::NotFound);
        }
        BINARY_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
            .ok_or(ConvertError::NotFound)
    }

    /// Run `--version` against the resolved binary. Used as a startup probe.
    pub async fn probe(&self) -> Result<String, ConvertError> {
        let binary = self.resolve_binary()?;
        let mut command = Command::new(&binary);
        command
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let output = command.output().await?;
        if !output.status.success() {
            return Err(ConvertError::ProcessFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl DocumentConverter for SofficeConverter {
    async fn convert(&self, document: &Path, output: &Path) -> Result<PathBuf, ConvertError> {
        let binary = self.resolve_binary()?;
        let out_dir = output.parent().unwrap_or_else(|| Path::new("."));

        log::debug!(
            "converting {} with {} into {}",
            document.display(),
            binary.display(),
            out_dir.display()
        );

        let mut command = Command::new(&binary);
        command
            .args([
                "--headless",
                "--invisible",
                "--nodefault",
                "--nofirststartwizard",
                "--nolockcheck",
                "--nologo",
                "--norestore",
                "--convert-to",
                "pdf",
                "--outdir",
            ])
            .arg(out_dir)
            .arg(document)
            .env("SAL_USE_VCLPLUGIN", "svp")
            .current_dir(out_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Dropping the future on timeout kills the child process.
        let result = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result?,
            Err(_) => {
                log_diagnostics(out_dir);
                return Err(ConvertError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !result.status.success() {
            log_diagnostics(out_dir);
            return Err(ConvertError::ProcessFailed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }

        // The converter names its output after the input document.
        let stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = out_dir.join(format!("{stem}.pdf"));

        let metadata = match std::fs::metadata(&produced) {
            Ok(metadata) => metadata,
            Err(_) => {
                log_diagnostics(out_dir);
                return Err(ConvertError::OutputMissing { path: produced });
            }
        };
        if metadata.len() == 0 {
            return Err(ConvertError::OutputEmpty { path: produced });
        }

        if produced != output {
            std::fs::copy(&produced, output)?;
            std::fs::remove_file(&produced)?;
        }

        Ok(output.to_path_buf())
    }
}

/// Dump the output directory contents at error level so operators can see
/// what the converter left behind. Never consulted programmatically.
fn log_diagnostics(dir: &Path) {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                log::error!(
                    "conversion workspace entry: {} ({} bytes)",
                    entry.path().display(),
                    size
                );
            }
        }
        Err(e) => log::error!("cannot list conversion workspace {}: {}", dir.display(), e),
    }
}
