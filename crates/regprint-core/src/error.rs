//! Error types for the registry print pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for all pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request payload: {0}")]
    Input(String),

    #[error("Workspace allocation failed: {0}")]
    Resource(String),

    #[error("Template rendering failed: {0}")]
    Render(String),

    #[error("PDF conversion failed: {0}")]
    Convert(#[from] ConvertError),
}

impl Error {
    /// Stable machine-readable kind, used in error payloads and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Input(_) => "input_error",
            Error::Resource(_) => "resource_error",
            Error::Render(_) => "render_error",
            Error::Convert(e) => e.kind(),
        }
    }
}

/// Typed failures of a single external converter invocation.
///
/// One invocation either succeeds or fails the whole request; there are no
/// retries. Timeouts kill the subprocess, so a `Timeout` never leaves a
/// conversion lingering past the bound.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("conversion binary not found in any configured or conventional location")]
    NotFound,

    #[error("conversion timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("conversion process exited with status {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("conversion produced no output at expected location: {path}")]
    OutputMissing { path: PathBuf },

    #[error("conversion produced an empty file: {path}")]
    OutputEmpty { path: PathBuf },

    #[error("conversion I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::NotFound => "conversion_not_found",
            ConvertError::Timeout { .. } => "conversion_timeout",
            ConvertError::ProcessFailed { .. } => "conversion_process_failed",
            ConvertError::OutputMissing { .. } => "conversion_output_missing",
            ConvertError::OutputEmpty { .. } => "conversion_output_empty",
            ConvertError::Io(_) => "conversion_io",
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_per_variant() {
        assert_eq!(Error::Input("x".into()).kind(), "input_error");
        assert_eq!(Error::Resource("x".into()).kind(), "resource_error");
        assert_eq!(Error::Render("x".into()).kind(), "render_error");
        assert_eq!(
            Error::Convert(ConvertError::NotFound).kind(),
            "conversion_not_found"
        );
        assert_eq!(
            Error::Convert(ConvertError::Timeout { secs: 60 }).kind(),
            "conversion_timeout"
        );
    }

    #[test]
    fn process_failure_carries_stderr() {
        let e = ConvertError::ProcessFailed {
            code: Some(77),
            stderr: "soffice: cannot open display".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("77"), "got: {msg}");
        assert!(msg.contains("cannot open display"), "got: {msg}");
    }
}
