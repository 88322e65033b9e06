//! PDF page counting
//!
//! An inaccurate page count only skews the displayed "registry pages" figure,
//! so counting never fails a request: unreadable PDFs fall back to a fixed
//! default.

use std::path::Path;

/// Page count returned when the PDF cannot be parsed.
pub const FALLBACK_PAGE_COUNT: u32 = 3;

pub trait PageCounter: Send + Sync {
    /// Count the pages of the PDF at `pdf`. Infallible; degraded results are
    /// allowed.
    fn count(&self, pdf: &Path) -> u32;
}

#[derive(Debug, Clone, Default)]
pub struct LopdfPageCounter;

impl LopdfPageCounter {
    pub fn new() -> Self {
        Self
    }
}

impl PageCounter for LopdfPageCounter {
    fn count(&self, pdf: &Path) -> u32 {
        match lopdf::Document::load(pdf) {
            Ok(document) => document.get_pages().len() as u32,
            Err(e) => {
                log::warn!(
                    "cannot count pages of {}, assuming {}: {}",
                    pdf.display(),
                    FALLBACK_PAGE_COUNT,
                    e
                );
                FALLBACK_PAGE_COUNT
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    // Smallest well-formed PDF lopdf will load, with `count` empty pages.
    fn minimal_pdf(count: usize) -> Vec<u8> {
        let mut document = lopdf::Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let kids: Vec<lopdf::Object> = (0..count)
            .map(|_| {
                document
                    .add_object(lopdf::dictionary! {
                        "Type" => "Page",
                        "Parent" => pages_id,
                    })
                    .into()
            })
            .collect();
        document.objects.insert(
            pages_id,
            lopdf::Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Count" => count as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = document.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn counts_pages_of_valid_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, minimal_pdf(4)).unwrap();

        assert_eq!(LopdfPageCounter::new().count(&path), 4);
    }

    #[test]
    fn garbage_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        assert_eq!(LopdfPageCounter::new().count(&path), FALLBACK_PAGE_COUNT);
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.pdf");

        assert_eq!(LopdfPageCounter::new().count(&path), FALLBACK_PAGE_COUNT);
    }
}
