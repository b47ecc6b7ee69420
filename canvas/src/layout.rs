//! Word-wrap layout for sticky notes and text blocks.
//!
//! Wrapping is greedy: words fill a line until the next one would overflow;
//! a single word wider than the line is split into chunks. When a height
//! limit is given, lines that would cross it are dropped.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use frames::element::{TEXT_FONT_FACTOR, TextBox};

use crate::consts::{LINE_HEIGHT_RATIO, STICKY_FONT_RATIO, STICKY_PAD_X_RATIO, STICKY_PAD_Y_RATIO};

/// Measures rendered text width in world units.
pub trait TextMeasure {
    fn width(&self, text: &str, font_px: f64) -> f64;
}

/// Fixed-advance approximation used when no canvas context is available.
#[derive(Debug, Clone, Copy)]
pub struct EstimateMeasure {
    /// Advance per character as a fraction of the font size.
    pub advance: f64,
}

impl Default for EstimateMeasure {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasure for EstimateMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn width(&self, text: &str, font_px: f64) -> f64 {
        text.chars().count() as f64 * font_px * self.advance
    }
}

/// Font and box metrics for laying out a text element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub font_px: f64,
    pub pad_x: f64,
    pub pad_y: f64,
    pub line_height: f64,
    /// Usable wrap width.
    pub max_width: f64,
    /// Height limit for lines, if clipped.
    pub max_height: Option<f64>,
}

impl TextMetrics {
    /// Sticky notes scale font and padding with the note width.
    #[must_use]
    pub fn sticky(note: &TextBox) -> Self {
        let font_px = note.width * STICKY_FONT_RATIO;
        let pad_x = note.width * STICKY_PAD_X_RATIO;
        let pad_y = note.height * STICKY_PAD_Y_RATIO;
        Self {
            font_px,
            pad_x,
            pad_y,
            line_height: font_px * LINE_HEIGHT_RATIO,
            max_width: note.width - pad_x * 2.0,
            max_height: Some(note.height - pad_y * 2.0),
        }
    }

    /// Free text: font from the element size, wrapped at its width, unclipped.
    #[must_use]
    pub fn text(block: &TextBox) -> Self {
        let font_px = text_font_px(block);
        Self {
            font_px,
            pad_x: 0.0,
            pad_y: 0.0,
            line_height: font_px * LINE_HEIGHT_RATIO,
            max_width: block.width,
            max_height: None,
        }
    }
}

#[must_use]
pub fn text_font_px(block: &TextBox) -> f64 {
    block.stroke_width * TEXT_FONT_FACTOR
}

/// Laid-out lines and the height they occupy.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    pub height: f64,
}

struct Wrapper<'a, M: TextMeasure + ?Sized> {
    measure: &'a M,
    metrics: TextMetrics,
    lines: Vec<String>,
    y: f64,
    full: bool,
}

impl<M: TextMeasure + ?Sized> Wrapper<'_, M> {
    fn fits_another(&self) -> bool {
        self.metrics
            .max_height
            .is_none_or(|max| self.y + self.metrics.line_height <= max)
    }

    fn emit(&mut self, line: String) {
        if !self.fits_another() {
            self.full = true;
            return;
        }
        self.lines.push(line);
        self.y += self.metrics.line_height;
    }

    fn too_wide(&self, text: &str) -> bool {
        self.measure.width(text, self.metrics.font_px) > self.metrics.max_width
    }

    fn chunk_word(&mut self, word: &str) {
        let mut rest: Vec<char> = word.chars().collect();
        while !rest.is_empty() && !self.full {
            let mut take = 0;
            let mut chunk = String::new();
            for c in &rest {
                chunk.push(*c);
                if self.too_wide(&chunk) {
                    break;
                }
                take += 1;
            }
            let take = take.max(1);
            self.emit(rest[..take].iter().collect());
            rest.drain(..take);
        }
    }

    fn paragraph(&mut self, paragraph: &str) {
        let start = self.lines.len();
        let mut line = String::new();
        for (n, word) in paragraph.split(' ').enumerate() {
            if self.full {
                return;
            }
            if self.too_wide(word) {
                if !line.trim().is_empty() {
                    self.emit(std::mem::take(&mut line));
                }
                line.clear();
                self.chunk_word(word);
                continue;
            }
            let candidate = format!("{line}{word} ");
            if n > 0 && self.too_wide(&candidate) {
                self.emit(std::mem::replace(&mut line, format!("{word} ")));
            } else {
                line = candidate;
            }
        }
        // A paragraph that ended on a chunked word has nothing left to flush.
        if !self.full && (!line.is_empty() || self.lines.len() == start) {
            self.emit(line);
        }
    }
}

/// Greedy word wrap of `text` under `metrics`.
#[must_use]
pub fn wrap_text<M: TextMeasure + ?Sized>(measure: &M, text: &str, metrics: TextMetrics) -> TextLayout {
    let mut wrapper = Wrapper { measure, metrics, lines: Vec::new(), y: 0.0, full: false };
    for paragraph in text.split('\n') {
        if wrapper.full {
            break;
        }
        wrapper.paragraph(paragraph);
    }
    let lines = wrapper.lines.into_iter().map(|l| l.trim_end().to_owned()).collect();
    TextLayout { lines, height: wrapper.y }
}
