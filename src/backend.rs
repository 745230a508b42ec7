//! Document access used by highlight extraction
//!
//! [`DocumentBackend`] is the seam between the extraction pipeline and the
//! PDF library. [`LopdfBackend`] is the lopdf implementation; tests supply
//! in-memory ones.

use crate::annotations::{page_annotations, Annotation};
use crate::extractor::{extract_page_text, PageText};
use crate::geometry::Rect;
use crate::PdfError;
use lopdf::{Document, ObjectId};
use once_cell::unsync::OnceCell;
use std::path::Path;

/// Per-page access to a loaded document. Page numbers are 1-indexed.
pub trait DocumentBackend {
    /// Number of pages in the document
    fn page_count(&self) -> u32;

    /// Annotations of a page in native order
    fn annotations(&self, page: u32) -> Result<Vec<Annotation>, PdfError>;

    /// Block/line/span structure of a page
    fn positioned_text(&self, page: u32) -> Result<&PageText, PdfError>;

    /// Plain text of the part of a page inside `clip`
    fn render_text(&self, page: u32, clip: &Rect) -> Result<String, PdfError>;
}

/// lopdf-backed document
///
/// Positioned text is extracted lazily, once per page, and reused by
/// [`DocumentBackend::render_text`].
pub struct LopdfBackend {
    doc: Document,
    page_ids: Vec<ObjectId>,
    page_text: Vec<OnceCell<PageText>>,
}

impl LopdfBackend {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PdfError> {
        let doc = Document::load(path)?;
        Self::from_document(doc)
    }

    pub fn load_mem(buffer: &[u8]) -> Result<Self, PdfError> {
        let doc = Document::load_mem(buffer)?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: Document) -> Result<Self, PdfError> {
        // get_pages is keyed by page number, so values come out in page order
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let page_text = page_ids.iter().map(|_| OnceCell::new()).collect();

        Ok(Self {
            doc,
            page_ids,
            page_text,
        })
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, PdfError> {
        page.checked_sub(1)
            .and_then(|i| self.page_ids.get(i as usize))
            .copied()
            .ok_or(PdfError::PageNotFound(page))
    }
}

impl DocumentBackend for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    fn annotations(&self, page: u32) -> Result<Vec<Annotation>, PdfError> {
        page_annotations(&self.doc, self.page_id(page)?)
    }

    fn positioned_text(&self, page: u32) -> Result<&PageText, PdfError> {
        let page_id = self.page_id(page)?;
        let cell = &self.page_text[(page - 1) as usize];
        cell.get_or_try_init(|| extract_page_text(&self.doc, page_id))
    }

    fn render_text(&self, page: u32, clip: &Rect) -> Result<String, PdfError> {
        Ok(self.positioned_text(page)?.text_in_rect(clip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_not_found() {
        let backend = LopdfBackend::from_document(Document::with_version("1.5")).unwrap();
        assert_eq!(backend.page_count(), 0);
        assert!(matches!(backend.annotations(0), Err(PdfError::PageNotFound(0))));
        assert!(matches!(
            backend.positioned_text(1),
            Err(PdfError::PageNotFound(1))
        ));
    }
}
