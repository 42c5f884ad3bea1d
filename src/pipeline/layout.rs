//! Line classification and page layout for the rewritten résumé.
//!
//! This half of the renderer is pure: it turns raw model text into a list of
//! [`Segment`]s and then into positioned lines on A4 pages. [`super::render`]
//! only draws what this module decides, which keeps the heading/body contract
//! testable without a PDF engine.
//!
//! ## Heading heuristic
//!
//! One flat pass over the source lines:
//!
//! 1. a blank line is a paragraph gap;
//! 2. a line whose trimmed text ends with `:` is a heading;
//! 3. a line equal (ASCII case-insensitively) to a known section name is a heading;
//! 4. everything else is body text.
//!
//! There is no nesting and no reordering. Multi-word headings without a colon
//! are body text; that limitation is intentional.

use serde::{Deserialize, Serialize};

/// Section names recognised as headings even without a trailing colon.
pub const SECTION_NAMES: [&str; 6] = [
    "summary",
    "skills",
    "experience",
    "projects",
    "certifications",
    "education",
];

/// A4 portrait, in PDF points.
pub const PAGE_WIDTH_PT: f32 = 595.0;
pub const PAGE_HEIGHT_PT: f32 = 842.0;

/// Average Helvetica glyph advance as a fraction of the font size.
///
/// Used for wrapping only; slightly generous so wrapped lines stay inside the margin.
const AVG_GLYPH_WIDTH_EM: f32 = 0.52;

/// Role of one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Heading,
    Body,
    Gap,
}

/// One classified source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Trimmed line text; empty for gaps.
    pub text: String,
}

impl Segment {
    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Heading,
            text: text.into(),
        }
    }

    pub fn body(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Body,
            text: text.into(),
        }
    }

    pub fn gap() -> Self {
        Self {
            kind: SegmentKind::Gap,
            text: String::new(),
        }
    }
}

/// Whether a single source line is a section heading.
pub fn is_heading(line: &str) -> bool {
    let t = line.trim();
    if t.is_empty() {
        return false;
    }
    t.ends_with(':') || SECTION_NAMES.iter().any(|name| t.eq_ignore_ascii_case(name))
}

/// Classify every source line, in order.
pub fn segment(raw: &str) -> Vec<Segment> {
    raw.lines()
        .map(|line| {
            let t = line.trim();
            if t.is_empty() {
                Segment::gap()
            } else if is_heading(t) {
                Segment::heading(t)
            } else {
                Segment::body(t)
            }
        })
        .collect()
}

/// Typography knobs for the rendered PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderStyle {
    /// Margin on all four sides. Default: 72 pt (one inch).
    pub margin_pt: f32,
    /// Default: 14 pt.
    pub heading_font_size: f32,
    /// Default: 11 pt.
    pub body_font_size: f32,
    /// Baseline-to-baseline distance as a multiple of the font size. Default: 1.35.
    pub line_spacing: f32,
    /// Vertical space inserted for a blank source line below other content. Default: 8 pt.
    pub paragraph_gap_pt: f32,
    /// Extra space above a heading that does not start a page. Default: 6 pt.
    pub heading_space_before_pt: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            margin_pt: 72.0,
            heading_font_size: 14.0,
            body_font_size: 11.0,
            line_spacing: 1.35,
            paragraph_gap_pt: 8.0,
            heading_space_before_pt: 6.0,
        }
    }
}

impl RenderStyle {
    /// Check the style leaves room for at least one line of each kind.
    pub fn validate(&self) -> Result<(), String> {
        let knobs = [
            self.margin_pt,
            self.body_font_size,
            self.heading_font_size,
            self.line_spacing,
            self.paragraph_gap_pt,
            self.heading_space_before_pt,
        ];
        if knobs.iter().any(|v| !v.is_finite()) {
            return Err("style values must be finite numbers".into());
        }
        if !(self.body_font_size > 0.0 && self.heading_font_size > 0.0) {
            return Err("font sizes must be positive".into());
        }
        if self.heading_font_size <= self.body_font_size {
            return Err("heading font must be larger than body font".into());
        }
        if self.line_spacing < 1.0 {
            return Err("line spacing must be at least 1.0".into());
        }
        if self.margin_pt < 0.0 || self.paragraph_gap_pt < 0.0 || self.heading_space_before_pt < 0.0 {
            return Err("margins and gaps must not be negative".into());
        }
        let usable_height = PAGE_HEIGHT_PT - 2.0 * self.margin_pt;
        let usable_width = PAGE_WIDTH_PT - 2.0 * self.margin_pt;
        if usable_height < self.heading_font_size * self.line_spacing
            || usable_width < self.heading_font_size * 4.0
        {
            return Err(format!("margin of {} pt leaves no room for text", self.margin_pt));
        }
        Ok(())
    }

    fn font_size(&self, kind: SegmentKind) -> f32 {
        match kind {
            SegmentKind::Heading => self.heading_font_size,
            _ => self.body_font_size,
        }
    }

    /// How many characters of the given style fit on one line.
    fn chars_per_line(&self, kind: SegmentKind) -> usize {
        let usable = PAGE_WIDTH_PT - 2.0 * self.margin_pt;
        ((usable / (self.font_size(kind) * AVG_GLYPH_WIDTH_EM)).floor() as usize).max(1)
    }
}

/// A line of text at a fixed position on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub kind: SegmentKind,
    pub text: String,
    /// Left edge, points from the page's left side.
    pub x: f32,
    /// Baseline, points from the page's bottom (PDF coordinates).
    pub y: f32,
    pub font_size: f32,
    /// Index into the segment list this line came from.
    pub segment: usize,
}

/// Everything drawn on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

/// Position segments on as many pages as needed.
///
/// Always returns at least one page, so an empty rewrite still yields a valid PDF.
pub fn layout(segments: &[Segment], style: &RenderStyle) -> Vec<PageLayout> {
    let top = PAGE_HEIGHT_PT - style.margin_pt;
    let bottom = style.margin_pt;

    let mut pages = vec![PageLayout::default()];
    let mut cursor = top;

    for (index, seg) in segments.iter().enumerate() {
        if seg.kind == SegmentKind::Gap {
            // A gap at the top of a page would only push content down.
            if cursor < top {
                cursor -= style.paragraph_gap_pt;
            }
            continue;
        }

        if seg.kind == SegmentKind::Heading && cursor < top {
            cursor -= style.heading_space_before_pt;
        }

        let font_size = style.font_size(seg.kind);
        let advance = font_size * style.line_spacing;

        for piece in wrap(&seg.text, style.chars_per_line(seg.kind)) {
            if cursor - advance < bottom {
                pages.push(PageLayout::default());
                cursor = top;
            }
            let baseline = cursor - font_size;
            cursor -= advance;
            if let Some(page) = pages.last_mut() {
                page.lines.push(PlacedLine {
                    kind: seg.kind,
                    text: piece,
                    x: style.margin_pt,
                    y: baseline,
                    font_size,
                    segment: index,
                });
            }
        }
    }

    pages
}

/// Greedy word wrap. Words longer than a line are split by characters.
///
/// Only breaks a single source line into several visual lines; it never
/// joins text from different source lines.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}
