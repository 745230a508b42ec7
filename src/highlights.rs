//! Highlight extraction across a whole document
//!
//! Pages and annotations are visited strictly in document order; the output
//! order is the order highlights were found.

use crate::backend::{DocumentBackend, LopdfBackend};
use crate::extractor::PageText;
use crate::normalize::clean;
use crate::region::{extract_with_config, HighlightRegion, COVERAGE_THRESHOLD};
use crate::validity::{is_valid_with, MIN_LETTER_RATIO, MIN_TEXT_CHARS};
use crate::PdfError;
use log::{debug, info, warn};
use std::path::Path;

/// One highlighted passage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    /// Page number (1-indexed)
    pub page: u32,
    /// Cleaned text, never empty
    pub text: String,
}

/// Tunables for highlight extraction
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Share of a span that must lie inside a highlight to count (default: 0.5)
    pub coverage_threshold: f32,
    /// Minimum length of accepted text, in characters (default: 3)
    pub min_text_chars: usize,
    /// Letters must exceed this share of non-whitespace characters (default: 0.4)
    pub min_letter_ratio: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: COVERAGE_THRESHOLD,
            min_text_chars: MIN_TEXT_CHARS,
            min_letter_ratio: MIN_LETTER_RATIO,
        }
    }
}

/// Extract highlights from a PDF file
pub fn extract_highlights<P: AsRef<Path>>(path: P) -> Result<Vec<Highlight>, PdfError> {
    extract_highlights_with_config(path, &ExtractionConfig::default())
}

/// Extract highlights from a PDF file with custom configuration
pub fn extract_highlights_with_config<P: AsRef<Path>>(
    path: P,
    config: &ExtractionConfig,
) -> Result<Vec<Highlight>, PdfError> {
    let backend = LopdfBackend::load(path)?;
    Ok(extract_highlights_from(&backend, config))
}

/// Extract highlights from a PDF held in memory
pub fn extract_highlights_mem(buffer: &[u8]) -> Result<Vec<Highlight>, PdfError> {
    let backend = LopdfBackend::load_mem(buffer)?;
    Ok(extract_highlights_from(&backend, &ExtractionConfig::default()))
}

/// Extract highlights through any document backend
///
/// Backend failures on a single page degrade that page instead of failing
/// the run: without annotations the page is skipped, without positioned text
/// only the clip-based strategies can find anything.
pub fn extract_highlights_from<B: DocumentBackend>(
    backend: &B,
    config: &ExtractionConfig,
) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    let empty_page = PageText::default();

    for page in 1..=backend.page_count() {
        let annotations = match backend.annotations(page) {
            Ok(annotations) => annotations,
            Err(e) => {
                warn!("page {}: cannot read annotations: {}", page, e);
                continue;
            }
        };

        let regions: Vec<HighlightRegion> = annotations
            .iter()
            .filter(|a| a.kind.is_highlight())
            .map(HighlightRegion::from_annotation)
            .collect();
        if regions.is_empty() {
            continue;
        }

        let page_text = match backend.positioned_text(page) {
            Ok(text) => text,
            Err(e) => {
                warn!("page {}: no positioned text: {}", page, e);
                &empty_page
            }
        };

        for region in &regions {
            let raw = extract_with_config(
                region,
                page_text,
                |clip| backend.render_text(page, clip),
                config,
            );
            let text = clean(&raw.text);

            if is_valid_with(&text, config.min_text_chars, config.min_letter_ratio) {
                highlights.push(Highlight { page, text });
            } else {
                debug!("page {}: discarding {:?}", page, raw.text);
            }
        }
    }

    info!("found {} highlight(s)", highlights.len());
    highlights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{Annotation, AnnotationKind};
    use crate::extractor::{TextBlock, TextLine, TextSpan};
    use crate::geometry::{Point, Rect};

    /// In-memory backend: one set of annotations and spans per page
    struct MockBackend {
        pages: Vec<(Vec<Annotation>, PageText)>,
        broken_annotations: Vec<u32>,
    }

    impl MockBackend {
        fn new(pages: Vec<(Vec<Annotation>, PageText)>) -> Self {
            Self {
                pages,
                broken_annotations: Vec::new(),
            }
        }

        fn page(&self, page: u32) -> Result<&(Vec<Annotation>, PageText), PdfError> {
            self.pages
                .get((page as usize).wrapping_sub(1))
                .ok_or(PdfError::PageNotFound(page))
        }
    }

    impl DocumentBackend for MockBackend {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn annotations(&self, page: u32) -> Result<Vec<Annotation>, PdfError> {
            if self.broken_annotations.contains(&page) {
                return Err(PdfError::Parse("bad annots".into()));
            }
            Ok(self.page(page)?.0.clone())
        }

        fn positioned_text(&self, page: u32) -> Result<&PageText, PdfError> {
            Ok(&self.page(page)?.1)
        }

        fn render_text(&self, page: u32, clip: &Rect) -> Result<String, PdfError> {
            Ok(self.page(page)?.1.text_in_rect(clip))
        }
    }

    fn line_page(text: &str, y: f32) -> PageText {
        let span = TextSpan {
            text: text.to_string(),
            rect: Rect::new(100.0, y, 100.0 + text.len() as f32 * 5.0, y + 10.0),
            font: "F1".into(),
            font_size: 10.0,
            char_bounds: Vec::new(),
        };
        PageText::new(vec![TextBlock::text(vec![TextLine::new(vec![span])])])
    }

    fn highlight_over(kind: AnnotationKind, x0: f32, y0: f32, x1: f32, y1: f32) -> Annotation {
        Annotation::new(
            kind,
            Some(Rect::new(x0, y0, x1, y1)),
            vec![
                Point::new(x0, y1),
                Point::new(x1, y1),
                Point::new(x0, y0),
                Point::new(x1, y0),
            ],
        )
    }

    #[test]
    fn test_two_pages_in_order() {
        let backend = MockBackend::new(vec![
            (
                vec![highlight_over(AnnotationKind::Highlight, 95.0, 495.0, 300.0, 515.0)],
                line_page("First page passage", 500.0),
            ),
            (
                vec![highlight_over(AnnotationKind::Highlight, 95.0, 295.0, 300.0, 315.0)],
                line_page("Second page passage", 300.0),
            ),
        ]);

        let highlights = extract_highlights_from(&backend, &ExtractionConfig::default());
        assert_eq!(
            highlights,
            vec![
                Highlight {
                    page: 1,
                    text: "First page passage".into()
                },
                Highlight {
                    page: 2,
                    text: "Second page passage".into()
                },
            ]
        );
    }

    #[test]
    fn test_non_highlight_annotations_ignored() {
        let backend = MockBackend::new(vec![(
            vec![
                highlight_over(AnnotationKind::Underline, 95.0, 495.0, 300.0, 515.0),
                highlight_over(AnnotationKind::Text, 95.0, 495.0, 300.0, 515.0),
            ],
            line_page("Underlined only", 500.0),
        )]);

        assert!(extract_highlights_from(&backend, &ExtractionConfig::default()).is_empty());
    }

    #[test]
    fn test_duplicates_kept_and_noise_dropped() {
        let annot = highlight_over(AnnotationKind::Highlight, 95.0, 495.0, 300.0, 515.0);
        let miss = highlight_over(AnnotationKind::Highlight, 0.0, 0.0, 20.0, 20.0);
        let backend = MockBackend::new(vec![(
            vec![annot.clone(), miss, annot],
            line_page("Same words twice", 500.0),
        )]);

        let highlights = extract_highlights_from(&backend, &ExtractionConfig::default());
        assert_eq!(highlights.len(), 2);
        assert!(highlights.iter().all(|h| h.text == "Same words twice"));
    }

    #[test]
    fn test_broken_page_is_skipped() {
        let mut backend = MockBackend::new(vec![
            (
                vec![highlight_over(AnnotationKind::Highlight, 95.0, 495.0, 300.0, 515.0)],
                line_page("Unreadable page", 500.0),
            ),
            (
                vec![highlight_over(AnnotationKind::Highlight, 95.0, 495.0, 300.0, 515.0)],
                line_page("Readable page", 500.0),
            ),
        ]);
        backend.broken_annotations.push(1);

        let highlights = extract_highlights_from(&backend, &ExtractionConfig::default());
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].page, 2);
    }

    #[test]
    fn test_empty_document() {
        let backend = MockBackend::new(Vec::new());
        assert!(extract_highlights_from(&backend, &ExtractionConfig::default()).is_empty());
    }

    #[test]
    fn test_default_config_uses_named_constants() {
        let config = ExtractionConfig::default();
        assert!((config.coverage_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.min_text_chars, 3);
        assert!((config.min_letter_ratio - 0.4).abs() < f32::EPSILON);
    }
}
