//! Highlight extraction from PDFs using lopdf
//!
//! This crate provides:
//! - Recovery of the text under highlight annotations, with graceful
//!   fallback when highlight geometry is imprecise
//! - Typographic cleanup of the recovered text (ligatures, line-break
//!   hyphens, clipping fragments)
//! - Export of the results as markdown, plain text or docx

pub mod annotations;
pub mod backend;
pub mod export;
pub mod extractor;
pub mod geometry;
pub mod highlights;
pub mod normalize;
pub mod region;
pub mod validity;

pub use annotations::{Annotation, AnnotationKind, HIGHLIGHT_KIND};
pub use backend::{DocumentBackend, LopdfBackend};
pub use export::{ExportError, OutputFormat};
pub use extractor::{BlockKind, PageText, TextBlock, TextLine, TextSpan};
pub use geometry::{coverage_fraction, intersects, mostly_within, Point, Rect};
pub use highlights::{
    extract_highlights, extract_highlights_from, extract_highlights_mem,
    extract_highlights_with_config, ExtractionConfig, Highlight,
};
pub use normalize::clean;
pub use region::{HighlightRegion, Tier};
pub use validity::is_valid;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("page {0} does not exist")]
    PageNotFound(u32),
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Parse(e.to_string())
    }
}
