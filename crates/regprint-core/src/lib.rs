//! Registry Print Core Library
//!
//! The generation pipeline for registry extract PDFs: per-request workspace
//! management, DOCX template rendering, external PDF conversion, page
//! counting and the two-pass orchestration that ties them together.

pub mod config;
pub mod convert;
pub mod error;
pub mod observe;
pub mod pages;
pub mod pipeline;
pub mod render;
pub mod workspace;

// Re-export main types for easy access
pub use config::ServiceConfig;
pub use error::{ConvertError, Error, Result};

pub use convert::{DocumentConverter, SofficeConverter};
pub use observe::{CountingObserver, NullObserver, PipelineObserver};
pub use pages::{LopdfPageCounter, PageCounter};
pub use pipeline::{FinishedPdf, Pipeline};
pub use render::{DocxRenderer, RenderContext, TemplateRenderer, Value};
pub use workspace::{Workspace, WorkspaceManager};
