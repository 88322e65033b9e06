//! Generation pipeline
//!
//! Drives one request through the fixed two-pass sequence: render the
//! template, convert to PDF, count the pages, then render and convert once
//! more with the corrected `registry_pages` figure. The page count depends on
//! the rendered table, so it is only knowable after the first full pass;
//! the displayed figure subtracts one cover page from it.

use crate::convert::DocumentConverter;
use crate::error::Result;
use crate::observe::PipelineObserver;
use crate::pages::PageCounter;
use crate::render::{self, TemplateRenderer};
use crate::workspace::{Workspace, WorkspaceManager};
use regprint_types::GenerationRequest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// A successfully generated PDF, still living inside its workspace.
///
/// The workspace is kept alive until the bytes have been delivered; the
/// caller destroys it afterwards.
#[derive(Debug)]
pub struct FinishedPdf {
    pub path: PathBuf,
    pub pages: u32,
    pub workspace: Workspace,
}

pub struct Pipeline<R, C, P> {
    template_path: PathBuf,
    workspaces: WorkspaceManager,
    renderer: R,
    converter: C,
    counter: P,
    observer: Arc<dyn PipelineObserver>,
}

impl<R, C, P> Pipeline<R, C, P>
where
    R: TemplateRenderer,
    C: DocumentConverter,
    P: PageCounter,
{
    pub fn new(
        template_path: impl Into<PathBuf>,
        workspaces: WorkspaceManager,
        renderer: R,
        converter: C,
        counter: P,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            template_path: template_path.into(),
            workspaces,
            renderer,
            converter,
            counter,
            observer,
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Generate the PDF for one request.
    ///
    /// On failure the workspace is destroyed before the error is returned; on
    /// success it travels with the result so the caller can read the bytes
    /// out first.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<FinishedPdf> {
        let started = Instant::now();

        let workspace = match self.workspaces.create() {
            Ok(workspace) => workspace,
            Err(e) => {
                self.observer.request_failed(e.kind());
                return Err(e);
            }
        };

        match self.run(request, &workspace).await {
            Ok((path, pages)) => {
                self.observer.request_completed(pages, started.elapsed());
                Ok(FinishedPdf {
                    path,
                    pages,
                    workspace,
                })
            }
            Err(e) => {
                workspace.destroy();
                self.observer.request_failed(e.kind());
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        workspace: &Workspace,
    ) -> Result<(PathBuf, u32)> {
        let document = workspace.document_path();
        let pdf = workspace.pdf_path();

        // Pass 1: no registry_pages yet.
        let context = render::context::build(request, None);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("pass 1 context: {}", render::loggable(&context));
        }
        self.renderer
            .render(&self.template_path, &context, &document)?;
        self.converter.convert(&document, &pdf).await?;

        let pages = self.counter.count(&pdf);
        let registry_pages = pages.saturating_sub(1);
        log::debug!("first pass has {pages} pages, registry_pages = {registry_pages}");

        // Pass 2: same context rebuilt from scratch, plus the page figure.
        let context = render::context::build(request, Some(registry_pages));
        self.renderer
            .render(&self.template_path, &context, &document)?;
        self.converter.convert(&document, &pdf).await?;

        let final_pages = self.counter.count(&pdf);
        Ok((pdf, final_pages))
    }
}

impl<R, C, P> std::fmt::Debug for Pipeline<R, C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("template_path", &self.template_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConvertError, Error};
    use crate::observe::CountingObserver;
    use crate::render::{RenderContext, Value};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRenderer {
        contexts: Mutex<Vec<RenderContext>>,
        fail: bool,
    }

    impl TemplateRenderer for RecordingRenderer {
        fn render(&self, _template: &Path, context: &RenderContext, output: &Path) -> Result<()> {
            if self.fail {
                return Err(Error::Render("boom".into()));
            }
            self.contexts.lock().unwrap().push(context.clone());
            std::fs::write(output, b"docx").unwrap();
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubConverter {
        calls: AtomicU64,
        fail: bool,
    }

    #[async_trait]
    impl DocumentConverter for StubConverter {
        async fn convert(&self, _document: &Path, output: &Path) -> std::result::Result<PathBuf, ConvertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ConvertError::Timeout { secs: 60 });
            }
            std::fs::write(output, b"%PDF-stub").unwrap();
            Ok(output.to_path_buf())
        }
    }

    struct FixedCounter(u32);

    impl PageCounter for FixedCounter {
        fn count(&self, _pdf: &Path) -> u32 {
            self.0
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::from_json_str("{}").unwrap()
    }

    fn pipeline_in(
        base: &Path,
        renderer: RecordingRenderer,
        converter: StubConverter,
        pages: u32,
        observer: Arc<CountingObserver>,
    ) -> Pipeline<RecordingRenderer, StubConverter, FixedCounter> {
        Pipeline::new(
            base.join("template.docx"),
            WorkspaceManager::new(base),
            renderer,
            converter,
            FixedCounter(pages),
            observer,
        )
    }

    #[tokio::test]
    async fn renders_and_converts_exactly_twice() {
        let base = tempfile::tempdir().unwrap();
        let observer = Arc::new(CountingObserver::new());
        let pipeline = pipeline_in(
            base.path(),
            RecordingRenderer::default(),
            StubConverter::default(),
            5,
            observer.clone(),
        );

        let finished = pipeline.generate(&request()).await.unwrap();
        assert_eq!(pipeline.converter.calls.load(Ordering::SeqCst), 2);

        let contexts = pipeline.renderer.contexts.lock().unwrap();
        assert_eq!(contexts.len(), 2);
        assert!(!contexts[0].contains_key("registry_pages"));
        assert_eq!(contexts[1]["registry_pages"], Value::str("4"));

        assert_eq!(finished.pages, 5);
        assert!(finished.path.exists());
        assert_eq!(observer.completed(), 1);
        assert_eq!(observer.failed(), 0);

        finished.workspace.destroy();
        assert!(!finished.path.exists());
    }

    #[tokio::test]
    async fn single_page_count_saturates_to_zero() {
        let base = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(
            base.path(),
            RecordingRenderer::default(),
            StubConverter::default(),
            0,
            Arc::new(CountingObserver::new()),
        );

        pipeline.generate(&request()).await.unwrap();
        let contexts = pipeline.renderer.contexts.lock().unwrap();
        assert_eq!(contexts[1]["registry_pages"], Value::str("0"));
    }

    #[tokio::test]
    async fn conversion_failure_cleans_workspace_and_counts() {
        let base = tempfile::tempdir().unwrap();
        let observer = Arc::new(CountingObserver::new());
        let pipeline = pipeline_in(
            base.path(),
            RecordingRenderer::default(),
            StubConverter {
                fail: true,
                ..Default::default()
            },
            5,
            observer.clone(),
        );

        let err = pipeline.generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), "conversion_timeout");
        assert_eq!(observer.failed(), 1);

        // No workspace directories left behind.
        let leftovers: Vec<_> = std::fs::read_dir(base.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");
    }

    #[tokio::test]
    async fn render_failure_stops_before_conversion() {
        let base = tempfile::tempdir().unwrap();
        let observer = Arc::new(CountingObserver::new());
        let pipeline = pipeline_in(
            base.path(),
            RecordingRenderer {
                fail: true,
                ..Default::default()
            },
            StubConverter::default(),
            5,
            observer.clone(),
        );

        let err = pipeline.generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), "render_error");
        assert_eq!(pipeline.converter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(observer.failed(), 1);
    }
}
