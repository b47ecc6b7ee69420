#![allow(clippy::float_cmp)]

use super::*;

/// Every character is exactly one unit wide at any font size.
struct Mono;

impl TextMeasure for Mono {
    fn width(&self, text: &str, _font_px: f64) -> f64 {
        text.chars().count() as f64
    }
}

fn metrics(max_width: f64, max_height: Option<f64>) -> TextMetrics {
    TextMetrics { font_px: 10.0, pad_x: 0.0, pad_y: 0.0, line_height: 12.0, max_width, max_height }
}

fn note(width: f64, height: f64) -> TextBox {
    TextBox {
        x: 0.0,
        y: 0.0,
        width,
        height,
        text: String::new(),
        fixed_width: false,
        color: "#000".into(),
        stroke_width: 5.0,
    }
}

#[test]
fn wraps_greedily_at_word_boundaries() {
    let layout = wrap_text(&Mono, "aa bb cc dd", metrics(6.0, None));
    assert_eq!(layout.lines, vec!["aa bb", "cc dd"]);
    assert_eq!(layout.height, 24.0);
}

#[test]
fn long_words_are_chunked() {
    let layout = wrap_text(&Mono, "abcdefghij", metrics(4.0, None));
    assert_eq!(layout.lines, vec!["abcd", "efgh", "ij"]);
}

#[test]
fn newlines_start_new_paragraphs() {
    let layout = wrap_text(&Mono, "one\ntwo", metrics(40.0, None));
    assert_eq!(layout.lines, vec!["one", "two"]);
}

#[test]
fn lines_past_height_are_dropped() {
    let layout = wrap_text(&Mono, "a b c d e f", metrics(2.0, Some(30.0)));
    assert_eq!(layout.lines, vec!["a", "b"]);
    assert_eq!(layout.height, 24.0);
}

#[test]
fn empty_text_yields_one_empty_line() {
    let layout = wrap_text(&Mono, "", metrics(10.0, None));
    assert_eq!(layout.lines, vec![String::new()]);
}

#[test]
fn sticky_metrics_scale_with_width() {
    let m = TextMetrics::sticky(&note(200.0, 200.0));
    assert!((m.font_px - 20.0).abs() < 1e-9);
    assert!((m.pad_x - 10.0).abs() < 1e-9);
    assert!((m.pad_y - 30.0).abs() < 1e-9);
    assert!((m.line_height - 24.0).abs() < 1e-9);
    assert_eq!(m.max_height, Some(140.0));

    let doubled = TextMetrics::sticky(&note(400.0, 400.0));
    assert!((doubled.font_px / m.font_px - 2.0).abs() < 1e-9);
}

#[test]
fn text_metrics_use_element_size() {
    let m = TextMetrics::text(&note(120.0, 30.0));
    assert_eq!(m.font_px, 25.0);
    assert_eq!(m.max_height, None);
    assert_eq!(m.max_width, 120.0);
}

#[test]
fn estimate_measure_is_linear_in_length() {
    let est = EstimateMeasure::default();
    assert!((est.width("abcd", 10.0) - 2.0 * est.width("ab", 10.0)).abs() < 1e-9);
}
