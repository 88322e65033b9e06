//! Per-request scratch directories
//!
//! Every generation request gets its own directory under the configured base
//! path. Nothing is shared between requests and nothing survives a request:
//! the workspace is destroyed after the PDF bytes have been read out, and
//! destruction is best-effort so a stubborn file never turns a finished
//! request into a failure.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Disambiguates workspaces created within the same second by one process.
static WORKSPACE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Creates uniquely named workspaces under a fixed base directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create a fresh workspace directory for one request.
    ///
    /// The name combines wall-clock seconds, the process id and a per-process
    /// counter, so concurrent requests never collide.
    pub fn create(&self) -> Result<Workspace> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let seq = WORKSPACE_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!("regprint_{}_{}_{}", timestamp, std::process::id(), seq);
        let root = self.base_dir.join(name);

        std::fs::create_dir_all(&root).map_err(|e| {
            Error::Resource(format!(
                "cannot create workspace {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Workspace { root })
    }
}

/// One request's scratch directory.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the rendered document is written. Both render passes reuse the
    /// same path; the second pass overwrites the first.
    pub fn document_path(&self) -> PathBuf {
        self.root.join("output.docx")
    }

    /// Where the converter leaves the PDF.
    pub fn pdf_path(&self) -> PathBuf {
        self.root.join("output.pdf")
    }

    /// Remove the workspace and everything in it.
    ///
    /// Read-only files are made writable first so converter droppings cannot
    /// block removal. Failures are logged and skipped; calling this twice is
    /// harmless.
    pub fn destroy(&self) {
        remove_tree(&self.root);
    }
}

fn remove_tree(path: &Path) {
    if !path.exists() {
        return;
    }

    force_writable(path);

    if path.is_dir() {
        match std::fs::read_dir(path) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    remove_tree(&entry.path());
                }
            }
            Err(e) => {
                log::warn!("cannot list {} during cleanup: {}", path.display(), e);
            }
        }
        if let Err(e) = std::fs::remove_dir(path) {
            log::warn!("cannot remove directory {}: {}", path.display(), e);
        }
    } else if let Err(e) = std::fs::remove_file(path) {
        log::warn!("cannot remove file {}: {}", path.display(), e);
    }
}

fn force_writable(path: &Path) {
    if let Ok(metadata) = path.metadata() {
        let mut perms = metadata.permissions();
        if perms.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            let _ = std::fs::set_permissions(path, perms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn creates_directory_under_base() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path());

        let ws = manager.create().unwrap();
        assert!(ws.root().is_dir());
        assert!(ws.root().starts_with(base.path()));
        assert!(ws
            .root()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("regprint_"));
    }

    #[test]
    fn sibling_workspaces_are_unique() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path());

        let mut roots = HashSet::new();
        for _ in 0..20 {
            let ws = manager.create().unwrap();
            assert!(roots.insert(ws.root().to_path_buf()));
        }
    }

    #[test]
    fn concurrent_workspaces_are_disjoint() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .map(|_| manager.create().unwrap().root().to_path_buf())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut roots = HashSet::new();
        for handle in handles {
            for root in handle.join().unwrap() {
                assert!(roots.insert(root));
            }
        }
        assert_eq!(roots.len(), 80);
    }

    #[test]
    fn destroy_removes_nested_content() {
        let base = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(base.path()).create().unwrap();

        let nested = ws.root().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("out.pdf"), b"pdf").unwrap();

        ws.destroy();
        assert!(!ws.root().exists());
    }

    #[test]
    fn destroy_handles_readonly_files() {
        let base = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(base.path()).create().unwrap();

        let file = ws.root().join("locked.docx");
        std::fs::write(&file, b"x").unwrap();
        let mut perms = std::fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&file, perms).unwrap();

        ws.destroy();
        assert!(!ws.root().exists());
    }

    #[test]
    fn destroy_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(base.path()).create().unwrap();

        ws.destroy();
        ws.destroy();
        assert!(!ws.root().exists());
    }

    #[test]
    fn working_paths_live_in_workspace() {
        let base = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(base.path()).create().unwrap();

        assert_eq!(ws.document_path().parent().unwrap(), ws.root());
        assert_eq!(
            ws.pdf_path().file_name().unwrap().to_string_lossy(),
            "output.pdf"
        );
        ws.destroy();
    }
}
