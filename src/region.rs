//! Text recovery for one highlighted region
//!
//! Highlight geometry is only approximate, so recovery tries three strategies
//! from most to least precise and keeps the first whose cleaned output reads
//! as prose:
//! 1. render each quad of the highlight separately
//! 2. collect spans mostly covered by the highlight rectangle
//! 3. render the whole highlight rectangle (always accepted)

use crate::annotations::Annotation;
use crate::extractor::{BlockKind, PageText};
use crate::geometry::{mostly_within, Point, Rect};
use crate::highlights::ExtractionConfig;
use crate::normalize::clean;
use crate::validity::is_valid_with;
use crate::PdfError;
use log::debug;

/// Share of a span's area that must lie inside the highlight rectangle
pub const COVERAGE_THRESHOLD: f32 = 0.5;

/// The marked area of one highlight
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRegion {
    /// Flat point list, four points per quad
    pub quad_points: Vec<Point>,
    /// Overall bounding rectangle
    pub bounds: Rect,
}

impl HighlightRegion {
    pub fn new(quad_points: Vec<Point>, bounds: Rect) -> Self {
        Self {
            quad_points,
            bounds,
        }
    }

    /// Region of an annotation; bounds fall back to the extent of the quad
    /// points when the annotation has no rectangle
    pub fn from_annotation(annot: &Annotation) -> Self {
        let bounds = annot
            .rect
            .or_else(|| Rect::from_points(&annot.quad_points))
            .unwrap_or_default();
        Self::new(annot.quad_points.clone(), bounds)
    }

    /// Bounding rectangle of every complete quad, in order. A trailing group
    /// of fewer than four points is ignored.
    pub fn quad_rects(&self) -> Vec<Rect> {
        self.quad_points
            .chunks_exact(4)
            .filter_map(Rect::from_points)
            .collect()
    }
}

/// Which strategy produced a region's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    QuadPoints,
    SpanCoverage,
    RawClip,
}

/// Raw (uncleaned) text recovered for a region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionText {
    pub tier: Tier,
    pub text: String,
}

/// Recover the raw text of a region using the default thresholds
///
/// `render` returns the page text clipped to a rectangle.
pub fn extract<F>(region: &HighlightRegion, page_text: &PageText, render: F) -> String
where
    F: Fn(&Rect) -> Result<String, PdfError>,
{
    extract_with_config(region, page_text, render, &ExtractionConfig::default()).text
}

/// Recover the raw text of a region, reporting which strategy produced it
pub fn extract_with_config<F>(
    region: &HighlightRegion,
    page_text: &PageText,
    render: F,
    config: &ExtractionConfig,
) -> RegionText
where
    F: Fn(&Rect) -> Result<String, PdfError>,
{
    let acceptable = |text: &String| {
        is_valid_with(&clean(text), config.min_text_chars, config.min_letter_ratio)
    };

    let strategies: [(Tier, &dyn Fn() -> Option<String>); 2] = [
        (Tier::QuadPoints, &|| quad_text(region, &render)),
        (Tier::SpanCoverage, &|| {
            span_text(region, page_text, config.coverage_threshold)
        }),
    ];

    for (tier, strategy) in strategies {
        if let Some(text) = strategy().filter(|t| acceptable(t)) {
            debug!("region text from {:?}: {:?}", tier, text);
            return RegionText { tier, text };
        }
    }

    let text = raw_clip_text(region, &render);
    debug!("region text from {:?}: {:?}", Tier::RawClip, text);
    RegionText {
        tier: Tier::RawClip,
        text,
    }
}

/// Text of each quad rendered separately, joined with single spaces
///
/// A render failure abandons the whole strategy.
fn quad_text<F>(region: &HighlightRegion, render: &F) -> Option<String>
where
    F: Fn(&Rect) -> Result<String, PdfError>,
{
    let mut parts = Vec::new();

    for rect in region.quad_rects() {
        match render(&rect) {
            Ok(text) if !text.is_empty() => parts.push(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => {
                debug!("quad render failed for {:?}: {}", rect, e);
                return None;
            }
        }
    }

    let joined = parts.join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Spans mostly inside the region bounds, concatenated per line
fn span_text(region: &HighlightRegion, page_text: &PageText, threshold: f32) -> Option<String> {
    let mut parts = Vec::new();

    for block in page_text
        .blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Text)
    {
        for line in block
            .lines
            .iter()
            .filter(|l| l.rect.intersects(&region.bounds))
        {
            let line_text: String = line
                .spans
                .iter()
                .filter(|s| mostly_within(&s.rect, &region.bounds, threshold))
                .map(|s| s.text.as_str())
                .collect();

            if !line_text.is_empty() {
                parts.push(line_text);
            }
        }
    }

    let joined = parts.join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// The region bounds rendered as-is; failures come back empty
fn raw_clip_text<F>(region: &HighlightRegion, render: &F) -> String
where
    F: Fn(&Rect) -> Result<String, PdfError>,
{
    match render(&region.bounds) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!("clip render failed for {:?}: {}", region.bounds, e);
            String::new()
        }
    }
}
