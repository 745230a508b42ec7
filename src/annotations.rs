//! Page annotation parsing
//!
//! Reads the `/Annots` array of a page and keeps what highlight extraction
//! needs: the kind, the bounding rectangle and the quad points.

use crate::extractor::resolve;
use crate::geometry::{Point, Rect};
use crate::PdfError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Numeric kind code of highlight annotations
pub const HIGHLIGHT_KIND: i32 = 8;

/// Annotation subtype, see ISO 32000-1 section 12.5.6
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKind {
    Text,
    Link,
    FreeText,
    Line,
    Square,
    Circle,
    Polygon,
    PolyLine,
    Highlight,
    Underline,
    Squiggly,
    StrikeOut,
    Redact,
    Stamp,
    Caret,
    Ink,
    Popup,
    FileAttachment,
    Sound,
    Movie,
    RichMedia,
    Widget,
    Other(String),
}

impl AnnotationKind {
    pub fn from_subtype(name: &[u8]) -> Self {
        match name {
            b"Text" => Self::Text,
            b"Link" => Self::Link,
            b"FreeText" => Self::FreeText,
            b"Line" => Self::Line,
            b"Square" => Self::Square,
            b"Circle" => Self::Circle,
            b"Polygon" => Self::Polygon,
            b"PolyLine" => Self::PolyLine,
            b"Highlight" => Self::Highlight,
            b"Underline" => Self::Underline,
            b"Squiggly" => Self::Squiggly,
            b"StrikeOut" => Self::StrikeOut,
            b"Redact" => Self::Redact,
            b"Stamp" => Self::Stamp,
            b"Caret" => Self::Caret,
            b"Ink" => Self::Ink,
            b"Popup" => Self::Popup,
            b"FileAttachment" => Self::FileAttachment,
            b"Sound" => Self::Sound,
            b"Movie" => Self::Movie,
            b"RichMedia" => Self::RichMedia,
            b"Widget" => Self::Widget,
            other => Self::Other(String::from_utf8_lossy(other).to_string()),
        }
    }

    /// Numeric code for the kind, in MuPDF's annotation type numbering;
    /// `None` for unknown subtypes
    pub fn code(&self) -> Option<i32> {
        let code = match self {
            Self::Text => 0,
            Self::Link => 1,
            Self::FreeText => 2,
            Self::Line => 3,
            Self::Square => 4,
            Self::Circle => 5,
            Self::Polygon => 6,
            Self::PolyLine => 7,
            Self::Highlight => 8,
            Self::Underline => 9,
            Self::Squiggly => 10,
            Self::StrikeOut => 11,
            Self::Redact => 12,
            Self::Stamp => 13,
            Self::Caret => 14,
            Self::Ink => 15,
            Self::Popup => 16,
            Self::FileAttachment => 17,
            Self::Sound => 18,
            Self::Movie => 19,
            Self::RichMedia => 20,
            Self::Widget => 21,
            Self::Other(_) => return None,
        };
        Some(code)
    }

    pub fn is_highlight(&self) -> bool {
        self.code() == Some(HIGHLIGHT_KIND)
    }
}

/// An annotation on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// `/Rect`, normalized
    pub rect: Option<Rect>,
    /// `/QuadPoints` as a flat point list, four points per quad
    pub quad_points: Vec<Point>,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, rect: Option<Rect>, quad_points: Vec<Point>) -> Self {
        Self {
            kind,
            rect,
            quad_points,
        }
    }

    /// Build from an annotation dictionary
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let kind = dict
            .get(b"Subtype")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_name().ok())
            .map(AnnotationKind::from_subtype)
            .unwrap_or_else(|| AnnotationKind::Other(String::new()));

        let rect = dict
            .get(b"Rect")
            .ok()
            .and_then(|o| number_array(doc, o))
            .filter(|nums| nums.len() >= 4)
            .map(|n| Rect::new(n[0], n[1], n[2], n[3]).normalized());

        let quad_points = dict
            .get(b"QuadPoints")
            .ok()
            .and_then(|o| number_array(doc, o))
            .map(|nums| {
                nums.chunks_exact(2)
                    .map(|xy| Point::new(xy[0], xy[1]))
                    .collect()
            })
            .unwrap_or_default();

        Self::new(kind, rect, quad_points)
    }
}

/// Annotations of a page in their native `/Annots` order
///
/// Entries that are neither dictionaries nor references to dictionaries are
/// skipped.
pub fn page_annotations(doc: &Document, page_id: ObjectId) -> Result<Vec<Annotation>, PdfError> {
    let page = doc.get_dictionary(page_id)?;

    let annots = match page.get(b"Annots") {
        Ok(obj) => resolve(doc, obj),
        Err(_) => return Ok(Vec::new()),
    };
    let Ok(entries) = annots.as_array() else {
        return Ok(Vec::new());
    };

    let annotations = entries
        .iter()
        .filter_map(|entry| resolve(doc, entry).as_dict().ok())
        .map(|dict| Annotation::from_dict(doc, dict))
        .collect();

    Ok(annotations)
}

fn number_array(doc: &Document, obj: &Object) -> Option<Vec<f32>> {
    let arr = resolve(doc, obj).as_array().ok()?;
    Some(
        arr.iter()
            .filter_map(|o| match resolve(doc, o) {
                Object::Integer(i) => Some(*i as f32),
                Object::Real(r) => Some(*r),
                _ => None,
            })
            .collect(),
    )
}
