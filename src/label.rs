//! Single-page 89 x 28 mm label: plain text, centered, shrunk until it fits.

use crate::config::mm;
use crate::error::Error;
use crate::fonts::FontFace;
use crate::pdf::PdfBuilder;

const LABEL_WIDTH_MM: f32 = 89.0;
const LABEL_HEIGHT_MM: f32 = 28.0;
const MARGIN_X_MM: f32 = 4.0;
const MARGIN_Y_MM: f32 = 3.0;
const MAX_LINES: usize = 4;
const MAX_FONT_SIZE: f32 = 14.0;
const MIN_FONT_SIZE: f32 = 6.0;

pub struct LabelLayout {
    pub font_size: f32,
    pub lines: Vec<String>,
}

fn line_height(size: f32) -> f32 {
    mm(size * 0.4)
}

/// Greedy word wrap; a single word wider than `max_width` keeps its own line.
fn wrap(
    out: &mut PdfBuilder,
    text: &str,
    size: f32,
    max_width: f32,
) -> Result<Vec<String>, Error> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && out.text_width(FontFace::REGULAR, &candidate, size)? > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines)
}

fn fit(out: &mut PdfBuilder, text: &str) -> Result<LabelLayout, Error> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let raw_lines: Vec<&str> = normalized
        .trim()
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();
    let available_width = mm(LABEL_WIDTH_MM - 2.0 * MARGIN_X_MM);
    let available_height = mm(LABEL_HEIGHT_MM - 2.0 * MARGIN_Y_MM);

    let mut font_size = MAX_FONT_SIZE;
    loop {
        let mut lines = Vec::new();
        for raw in &raw_lines {
            lines.extend(wrap(out, raw, font_size, available_width)?);
            if lines.len() > MAX_LINES {
                break;
            }
        }
        lines.truncate(MAX_LINES);

        let fits = lines.len() as f32 * line_height(font_size) <= available_height;
        if fits || font_size - 1.0 < MIN_FONT_SIZE {
            return Ok(LabelLayout { font_size, lines });
        }
        font_size -= 1.0;
    }
}

/// Layout without rendering, for previews and tests.
pub fn layout(text: &str) -> Result<LabelLayout, Error> {
    let mut out = PdfBuilder::new(mm(LABEL_WIDTH_MM), mm(LABEL_HEIGHT_MM), None, None);
    fit(&mut out, text)
}

pub fn render(text: &str) -> Result<Vec<u8>, Error> {
    let mut out = PdfBuilder::new(mm(LABEL_WIDTH_MM), mm(LABEL_HEIGHT_MM), None, None);
    let LabelLayout { font_size, lines } = fit(&mut out, text)?;

    let available_width = mm(LABEL_WIDTH_MM - 2.0 * MARGIN_X_MM);
    let available_height = mm(LABEL_HEIGHT_MM - 2.0 * MARGIN_Y_MM);
    let line_h = line_height(font_size);
    let mut y = mm(MARGIN_Y_MM)
        + (available_height - lines.len() as f32 * line_h) / 2.0
        + line_h * 0.8;

    for line in &lines {
        let width = out.text_width(FontFace::REGULAR, line, font_size)?;
        let x = mm(MARGIN_X_MM) + (available_width - width) / 2.0;
        out.show_text(FontFace::REGULAR, line, x, y, font_size, 0.0)?;
        y += line_h;
    }
    log::debug!("label: {} line(s) at {font_size}pt", lines.len());
    Ok(out.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_oversized_word_alone() {
        let mut out = PdfBuilder::new(mm(LABEL_WIDTH_MM), mm(LABEL_HEIGHT_MM), None, None);
        let long = "W".repeat(40);
        let lines = wrap(&mut out, &format!("a {long} b"), 14.0, 100.0).unwrap();
        assert_eq!(lines, ["a", long.as_str(), "b"]);
    }

    #[test]
    fn wrap_fills_lines_greedily() {
        let mut out = PdfBuilder::new(mm(LABEL_WIDTH_MM), mm(LABEL_HEIGHT_MM), None, None);
        let lines = wrap(&mut out, "one two three", 10.0, 1000.0).unwrap();
        assert_eq!(lines, ["one two three"]);
    }
}
