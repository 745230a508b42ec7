//! Positioned text extraction from PDF pages using lopdf
//!
//! Walks a page's content stream, tracking the graphics and text state, and
//! produces a block/line/span structure with bounding rectangles. The same
//! structure backs clipped text rendering for highlight regions.

use crate::geometry::{Point, Rect};
use crate::PdfError;
use log::debug;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, HashMap};

/// Baselines closer than this (in points) belong to the same line
const LINE_Y_TOLERANCE: f32 = 3.0;

/// Lines further apart than this many font sizes start a new block
const BLOCK_GAP_FACTOR: f32 = 2.0;

/// A TJ adjustment wider than this (thousandths of an em) reads as a space
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Fraction of the font size below / above the baseline covered by a glyph
const DESCENT: f32 = 0.2;
const ASCENT: f32 = 0.8;

/// A run of same-style text with its bounding rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub rect: Rect,
    pub font: String,
    pub font_size: f32,
    /// x-range of each character, in text order; empty when unknown
    pub char_bounds: Vec<(f32, f32)>,
}

impl TextSpan {
    /// x-range of each character, split evenly across the span when the
    /// per-character ranges are unknown
    pub fn char_extents(&self) -> Vec<(f32, f32)> {
        let count = self.text.chars().count();
        if self.char_bounds.len() == count {
            self.char_bounds.clone()
        } else {
            spread(self.rect.x0, self.rect.x1, count)
        }
    }
}

/// Spans sharing a baseline, left to right
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub rect: Rect,
    pub spans: Vec<TextSpan>,
}

impl TextLine {
    pub fn new(spans: Vec<TextSpan>) -> Self {
        let rect = spans
            .iter()
            .fold(Rect::default(), |acc, s| acc.union(&s.rect));
        Self { rect, spans }
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Image,
}

/// A group of lines (or a placed image) on the page
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub rect: Rect,
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn text(lines: Vec<TextLine>) -> Self {
        let rect = lines
            .iter()
            .fold(Rect::default(), |acc, l| acc.union(&l.rect));
        Self {
            kind: BlockKind::Text,
            rect,
            lines,
        }
    }

    pub fn image(rect: Rect) -> Self {
        Self {
            kind: BlockKind::Image,
            rect,
            lines: Vec::new(),
        }
    }
}

/// All positioned text of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub blocks: Vec<TextBlock>,
}

impl PageText {
    pub fn new(blocks: Vec<TextBlock>) -> Self {
        Self { blocks }
    }

    /// Text whose glyph centers fall inside `clip`, one output line per text line
    ///
    /// Glyph boxes come from [`TextSpan::char_extents`].
    pub fn text_in_rect(&self, clip: &Rect) -> String {
        let mut out = Vec::new();

        for block in self.blocks.iter().filter(|b| b.kind == BlockKind::Text) {
            for line in &block.lines {
                if !line.rect.intersects(clip) && !clip.contains_point(line.rect.center()) {
                    continue;
                }

                let mut line_text = String::new();
                let mut prev_end: Option<f32> = None;

                for span in &line.spans {
                    let Some((clipped, start, end)) = clip_span(span, clip) else {
                        continue;
                    };

                    if let Some(prev) = prev_end {
                        let gap = start - prev;
                        if gap > span.font_size * 0.25
                            && !line_text.ends_with(' ')
                            && !clipped.starts_with(' ')
                        {
                            line_text.push(' ');
                        }
                    }
                    line_text.push_str(&clipped);
                    prev_end = Some(end);
                }

                if !line_text.is_empty() {
                    out.push(line_text);
                }
            }
        }

        out.join("\n")
    }
}

/// Characters of `span` whose centers lie in `clip`, with the x-range they
/// occupy
fn clip_span(span: &TextSpan, clip: &Rect) -> Option<(String, f32, f32)> {
    let chars: Vec<char> = span.text.chars().collect();
    if chars.is_empty() {
        return None;
    }

    let extents = span.char_extents();
    let cy = (span.rect.y0 + span.rect.y1) / 2.0;

    let mut text = String::new();
    let mut start = None;
    let mut end = span.rect.x0;

    for (c, &(a, b)) in chars.iter().zip(&extents) {
        let center = Point::new((a + b) / 2.0, cy);
        if clip.contains_point(center) {
            start.get_or_insert(a.min(b));
            end = a.max(b);
            text.push(*c);
        }
    }

    start.map(|s| (text, s, end))
}

/// `count` equal slices of `x0..x1`
fn spread(x0: f32, x1: f32, count: usize) -> Vec<(f32, f32)> {
    let step = if count > 0 { (x1 - x0) / count as f32 } else { 0.0 };
    (0..count)
        .map(|i| (x0 + step * i as f32, x0 + step * (i + 1) as f32))
        .collect()
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn transform_point(m: &[f32; 6], x: f32, y: f32) -> Point {
    Point::new(m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Read a six-number matrix operand array, identity where entries are missing
fn matrix_from_array(values: &[Object]) -> Option<[f32; 6]> {
    if values.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (i, v) in values.iter().take(6).enumerate() {
        if let Some(n) = get_number(v) {
            m[i] = n;
        }
    }
    Some(m)
}

/// Glyph widths of a font, in thousandths of an em
#[derive(Debug, Clone)]
struct FontMetrics {
    first_char: u32,
    widths: Vec<f32>,
    /// Per-CID widths of a composite font (`/W`)
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
    /// Composite (Type0) fonts use two-byte codes
    two_byte: bool,
}

impl FontMetrics {
    const DEFAULT_WIDTH: f32 = 500.0;
    const DEFAULT_CID_WIDTH: f32 = 1000.0;

    fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let is_type0 = font
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|n| n == b"Type0")
            .unwrap_or(false);
        if is_type0 {
            return Self::composite(doc, font);
        }

        let first_char = font
            .get(b"FirstChar")
            .and_then(Object::as_i64)
            .unwrap_or(0)
            .max(0) as u32;

        let widths = font
            .get(b"Widths")
            .ok()
            .map(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|arr| arr.iter().map(|w| get_number(w).unwrap_or(0.0)).collect())
            .unwrap_or_default();

        Self {
            first_char,
            widths,
            cid_widths: HashMap::new(),
            default_width: Self::DEFAULT_WIDTH,
            two_byte: false,
        }
    }

    /// Widths of a Type0 font come from its descendant CIDFont
    fn composite(doc: &Document, font: &Dictionary) -> Self {
        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .map(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| arr.first())
            .map(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok());

        let default_width = descendant
            .and_then(|d| d.get(b"DW").ok())
            .and_then(|obj| get_number(resolve(doc, obj)))
            .unwrap_or(Self::DEFAULT_CID_WIDTH);

        let cid_widths = descendant
            .and_then(|d| d.get(b"W").ok())
            .map(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|w| parse_cid_widths(doc, w))
            .unwrap_or_default();

        Self {
            first_char: 0,
            widths: Vec::new(),
            cid_widths,
            default_width,
            two_byte: true,
        }
    }

    fn fallback() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: Self::DEFAULT_WIDTH,
            two_byte: false,
        }
    }

    /// Character codes of a string operand
    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u16::from_be_bytes([*hi, *lo]) as u32,
                    [single] => *single as u32,
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| b as u32).collect()
        }
    }

    /// Width of a single code, in thousandths of an em
    fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width);
        }

        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

/// Parse a CIDFont `/W` array
///
/// Entries are either `c [w1 w2 ...]` (consecutive CIDs from `c`) or
/// `c_first c_last w` (one width for a range).
fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;

    while i + 1 < w.len() {
        let Some(first) = get_number(resolve(doc, &w[i])).map(|n| n.max(0.0) as u32) else {
            break;
        };

        match resolve(doc, &w[i + 1]) {
            Object::Array(list) => {
                for (j, value) in list.iter().enumerate() {
                    if let Some(width) = get_number(resolve(doc, value)) {
                        widths.insert(first + j as u32, width);
                    }
                }
                i += 2;
            }
            last => {
                let (Some(last), Some(width)) = (
                    get_number(last).map(|n| n.max(0.0) as u32),
                    w.get(i + 2).and_then(|o| get_number(resolve(doc, o))),
                ) else {
                    break;
                };
                if last >= first && last - first <= 0xFFFF {
                    for cid in first..=last {
                        widths.insert(cid, width);
                    }
                }
                i += 3;
            }
        }
    }

    widths
}

/// Text state carried between operators
struct TextState {
    font: String,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    leading: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
}

impl TextState {
    fn new() -> Self {
        Self {
            font: String::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            leading: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply_matrices(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Move the text position along the baseline by `tx` text-space units
    fn advance(&mut self, tx: f32) {
        self.text_matrix = multiply_matrices(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
    }

    /// Horizontal advance of one glyph, in unscaled text space units
    fn glyph_advance(&self, code: u32, metrics: &FontMetrics) -> f32 {
        let mut w = metrics.width(code) / 1000.0 * self.font_size + self.char_spacing;
        // Word spacing applies to the single-byte code 32 only
        if code == 32 && !metrics.two_byte {
            w += self.word_spacing;
        }
        w
    }

    /// Device-space x of the current text position
    fn device_x(&self, ctm: &[f32; 6]) -> f32 {
        transform_point(&multiply_matrices(&self.text_matrix, ctm), 0.0, 0.0).x
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Form XObjects nested deeper than this are not followed
const MAX_FORM_DEPTH: usize = 8;

/// Things placed on the page, in content stream order
enum Placed {
    Span(TextSpan),
    Image(Rect),
}

/// An XObject named in a resource dictionary
enum XObject<'a> {
    Image,
    Form(&'a Stream),
}

/// Fonts and XObjects available to a content stream
struct Resources<'a> {
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    metrics: BTreeMap<Vec<u8>, FontMetrics>,
    xobjects: BTreeMap<Vec<u8>, XObject<'a>>,
}

impl<'a> Resources<'a> {
    /// Resources of a page, including those inherited from the page tree
    fn for_page(doc: &'a Document, page_id: ObjectId) -> Self {
        let fonts = doc.get_page_fonts(page_id).unwrap_or_default();

        let mut xobjects = BTreeMap::new();
        if let Ok((inline, ids)) = doc.get_page_resources(page_id) {
            let dicts = inline
                .into_iter()
                .chain(ids.into_iter().filter_map(|id| doc.get_dictionary(id).ok()));
            for dict in dicts {
                collect_xobjects(doc, dict, &mut xobjects);
            }
        }

        Self::new(doc, fonts, xobjects)
    }

    /// Resources of a form XObject
    fn from_dict(doc: &'a Document, dict: &'a Dictionary) -> Self {
        let mut fonts = BTreeMap::new();
        if let Some(font_dict) = dict
            .get(b"Font")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_dict().ok())
        {
            for (name, value) in font_dict.iter() {
                if let Ok(font) = resolve(doc, value).as_dict() {
                    fonts.insert(name.clone(), font);
                }
            }
        }

        let mut xobjects = BTreeMap::new();
        collect_xobjects(doc, dict, &mut xobjects);

        Self::new(doc, fonts, xobjects)
    }

    fn new(
        doc: &'a Document,
        fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
        xobjects: BTreeMap<Vec<u8>, XObject<'a>>,
    ) -> Self {
        let metrics = fonts
            .iter()
            .map(|(name, dict)| (name.clone(), FontMetrics::from_dict(doc, dict)))
            .collect();
        Self {
            fonts,
            metrics,
            xobjects,
        }
    }
}

/// Image and form XObjects of a resource dictionary; earlier entries win
fn collect_xobjects<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    out: &mut BTreeMap<Vec<u8>, XObject<'a>>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve(doc, x).as_dict().ok())
    else {
        return;
    };

    for (name, value) in xobjects.iter() {
        let Ok(stream) = resolve(doc, value).as_stream() else {
            continue;
        };
        let kind = match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => XObject::Image,
            Ok(b"Form") => XObject::Form(stream),
            _ => continue,
        };
        out.entry(name.clone()).or_insert(kind);
    }
}

/// Extract the positioned text structure of a single page
pub fn extract_page_text(doc: &Document, page_id: ObjectId) -> Result<PageText, PdfError> {
    let resources = Resources::for_page(doc, page_id);

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| PdfError::Parse(e.to_string()))?;
    let content = Content::decode(&content_data).map_err(|e| PdfError::Parse(e.to_string()))?;

    let mut walker = ContentWalker {
        doc,
        placed: Vec::new(),
    };
    walker.walk(&content, &resources, IDENTITY, 0);

    Ok(PageText::new(group_into_blocks(walker.placed)))
}

/// Interprets content streams, collecting placed spans and images
struct ContentWalker<'a> {
    doc: &'a Document,
    placed: Vec<Placed>,
}

impl<'a> ContentWalker<'a> {
    fn walk(
        &mut self,
        content: &Content,
        resources: &Resources<'a>,
        base_ctm: [f32; 6],
        depth: usize,
    ) {
        let mut ctm = base_ctm;
        let mut ctm_stack: Vec<[f32; 6]> = Vec::new();
        let mut state = TextState::new();
        let mut in_text_block = false;

        for op in &content.operations {
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => {
                    if let Some(saved) = ctm_stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(new_matrix) = matrix_from_array(&op.operands) {
                        ctm = multiply_matrices(&new_matrix, &ctm);
                    }
                }
                "BT" => {
                    in_text_block = true;
                    state.text_matrix = IDENTITY;
                    state.line_matrix = IDENTITY;
                }
                "ET" => in_text_block = false,
                "Tf" => {
                    if op.operands.len() >= 2 {
                        if let Ok(name) = op.operands[0].as_name() {
                            state.font = String::from_utf8_lossy(name).to_string();
                        }
                        if let Some(size) = get_number(&op.operands[1]) {
                            state.font_size = size;
                        }
                    }
                }
                "Tc" => {
                    if let Some(v) = op.operands.first().and_then(get_number) {
                        state.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(v) = op.operands.first().and_then(get_number) {
                        state.word_spacing = v;
                    }
                }
                "TL" => {
                    if let Some(v) = op.operands.first().and_then(get_number) {
                        state.leading = v;
                    }
                }
                "Td" | "TD" => {
                    if op.operands.len() >= 2 {
                        let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        state.next_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(matrix) = matrix_from_array(&op.operands) {
                        state.text_matrix = matrix;
                        state.line_matrix = matrix;
                    }
                }
                "T*" => state.next_line(0.0, -state.leading),
                "Tj" | "'" | "\"" => {
                    if op.operator != "Tj" {
                        if op.operator == "\"" && op.operands.len() >= 3 {
                            state.word_spacing = get_number(&op.operands[0]).unwrap_or(0.0);
                            state.char_spacing = get_number(&op.operands[1]).unwrap_or(0.0);
                        }
                        state.next_line(0.0, -state.leading);
                    }
                    if !in_text_block {
                        continue;
                    }
                    if let Some(operand) = op.operands.last() {
                        let parts = [operand.clone()];
                        if let Some(span) = show_text(self.doc, resources, &mut state, &ctm, &parts) {
                            self.placed.push(Placed::Span(span));
                        }
                    }
                }
                "TJ" => {
                    if !in_text_block {
                        continue;
                    }
                    if let Some(Ok(array)) = op.operands.first().map(Object::as_array) {
                        if let Some(span) = show_text(self.doc, resources, &mut state, &ctm, array) {
                            self.placed.push(Placed::Span(span));
                        }
                    }
                }
                "Do" => {
                    let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                        continue;
                    };
                    match resources.xobjects.get(name) {
                        Some(XObject::Image) => {
                            let corners = [
                                transform_point(&ctm, 0.0, 0.0),
                                transform_point(&ctm, 1.0, 0.0),
                                transform_point(&ctm, 0.0, 1.0),
                                transform_point(&ctm, 1.0, 1.0),
                            ];
                            if let Some(rect) = Rect::from_points(&corners) {
                                self.placed.push(Placed::Image(rect));
                            }
                        }
                        Some(XObject::Form(form)) => self.walk_form(*form, resources, &ctm, depth),
                        None => {}
                    }
                }
                _ => {}
            }
        }
    }

    /// Interpret a form XObject in place, under its `/Matrix`
    fn walk_form(
        &mut self,
        form: &'a Stream,
        parent: &Resources<'a>,
        ctm: &[f32; 6],
        depth: usize,
    ) {
        if depth >= MAX_FORM_DEPTH {
            debug!("form XObjects nested deeper than {}, skipping", MAX_FORM_DEPTH);
            return;
        }

        let content = match form
            .get_plain_content()
            .and_then(|data| Content::decode(&data))
        {
            Ok(content) => content,
            Err(e) => {
                debug!("skipping unreadable form XObject: {}", e);
                return;
            }
        };

        let matrix = form
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|obj| resolve(self.doc, obj).as_array().ok())
            .and_then(|values| matrix_from_array(values))
            .unwrap_or(IDENTITY);

        // Forms without their own resources use the caller's
        let own = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve(self.doc, obj).as_dict().ok())
            .map(|dict| Resources::from_dict(self.doc, dict));
        let resources = own.as_ref().unwrap_or(parent);

        self.walk(&content, resources, multiply_matrices(&matrix, ctm), depth + 1);
    }
}

/// Show a Tj string or TJ array as one span, advancing the text matrix
///
/// Each character's x-range comes from the font's glyph widths. When the
/// decoded text does not map one character per code, the string's extent is
/// split evenly across its characters.
fn show_text(
    doc: &Document,
    resources: &Resources,
    state: &mut TextState,
    ctm: &[f32; 6],
    parts: &[Object],
) -> Option<TextSpan> {
    let fallback = FontMetrics::fallback();
    let font_metrics = resources
        .metrics
        .get(state.font.as_bytes())
        .unwrap_or(&fallback);
    let size = state.font_size;

    let start_matrix = multiply_matrices(&state.text_matrix, ctm);
    let start = transform_point(&start_matrix, 0.0, 0.0);
    let mut text = String::new();
    let mut char_bounds = Vec::new();

    for part in parts {
        match part {
            Object::String(bytes, _) => {
                let part_start = state.device_x(ctm);
                let mut glyph_bounds = Vec::new();
                for code in font_metrics.codes(bytes) {
                    let x0 = state.device_x(ctm);
                    state.advance(state.glyph_advance(code, font_metrics));
                    glyph_bounds.push((x0, state.device_x(ctm)));
                }

                let decoded =
                    extract_text_from_operand(part, doc, &resources.fonts, &state.font)
                        .unwrap_or_default();
                let count = decoded.chars().count();
                if count == glyph_bounds.len() {
                    char_bounds.extend(glyph_bounds);
                } else {
                    char_bounds.extend(spread(part_start, state.device_x(ctm), count));
                }
                text.push_str(&decoded);
            }
            Object::Integer(_) | Object::Real(_) => {
                let adjust = get_number(part).unwrap_or(0.0);
                let x0 = state.device_x(ctm);
                state.advance(-adjust / 1000.0 * size);
                if -adjust > TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                    char_bounds.push((x0, state.device_x(ctm)));
                }
            }
            _ => {}
        }
    }

    if text.trim().is_empty() {
        return None;
    }

    let end_matrix = multiply_matrices(&state.text_matrix, ctm);
    let end = transform_point(&end_matrix, 0.0, 0.0);
    let rendered_size = effective_font_size(size, &start_matrix);

    let baseline = start.y.min(end.y);
    let rect = Rect::new(
        start.x.min(end.x),
        baseline - rendered_size * DESCENT,
        start.x.max(end.x),
        start.y.max(end.y) + rendered_size * ASCENT,
    );

    Some(TextSpan {
        text,
        rect,
        font: state.font.clone(),
        font_size: rendered_size,
        char_bounds,
    })
}

/// Follow a reference to the object it names; other objects pass through
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Group placed items into blocks of lines, preserving stream order
///
/// Consecutive spans on the same baseline form a line; consecutive lines with
/// a small vertical gap form a block. An image closes the current block.
fn group_into_blocks(placed: Vec<Placed>) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut lines: Vec<Vec<TextSpan>> = Vec::new();

    for item in placed {
        match item {
            Placed::Image(rect) => {
                flush_lines(&mut lines, &mut blocks);
                blocks.push(TextBlock::image(rect));
            }
            Placed::Span(span) => {
                let same_line = lines
                    .last()
                    .and_then(|l| l.last())
                    .map_or(false, |last| (last.rect.y0 - span.rect.y0).abs() < LINE_Y_TOLERANCE);

                if same_line {
                    if let Some(line) = lines.last_mut() {
                        line.push(span);
                    }
                    continue;
                }

                let far_from_previous = lines.last().and_then(|l| l.last()).map_or(false, |last| {
                    let gap = (last.rect.y0 - span.rect.y0).abs();
                    gap > last.font_size.max(span.font_size) * BLOCK_GAP_FACTOR
                });
                if far_from_previous {
                    flush_lines(&mut lines, &mut blocks);
                }
                lines.push(vec![span]);
            }
        }
    }
    flush_lines(&mut lines, &mut blocks);

    blocks
}

fn flush_lines(lines: &mut Vec<Vec<TextSpan>>, blocks: &mut Vec<TextBlock>) {
    if lines.is_empty() {
        return;
    }
    let built = lines
        .drain(..)
        .map(|mut spans| {
            spans.sort_by(|a, b| {
                a.rect
                    .x0
                    .partial_cmp(&b.rect.x0)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            TextLine::new(spans)
        })
        .collect();
    blocks.push(TextBlock::text(built));
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute effective font size from base size and text matrix
fn effective_font_size(base_size: f32, matrix: &[f32; 6]) -> f32 {
    let scale_x = (matrix[0].powi(2) + matrix[1].powi(2)).sqrt();
    let scale_y = (matrix[2].powi(2) + matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

/// Decode a text operand through the font encoding
fn extract_text_from_operand(
    obj: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        // Fallback: try UTF-16BE then Latin-1
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}
