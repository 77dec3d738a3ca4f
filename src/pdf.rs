//! Flow-layout PDF output: blocks are measured, wrapped and stacked top to bottom across
//! fixed-size pages.

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

use crate::config::{PageSetup, mm};
use crate::error::Error;
use crate::fonts::{FontEntry, FontFace, FontSet, has_unencodable, to_winansi_bytes};
use crate::model::{Block, StyleFlags, TextRun, collapse_whitespace};
use crate::numbering::ListNumberingContext;

const BODY_SIZE: f32 = 11.0;
const HEADING_SIZES: [f32; 6] = [18.0, 16.0, 14.0, 12.0, 11.0, 10.0];
const SCRIPT_SCALE: f32 = 0.7;

/// Pages plus the fonts they reference; shared by the document and label renderers.
pub(crate) struct PdfBuilder {
    pdf: Pdf,
    next_ref: i32,
    catalog_id: Ref,
    pages_id: Ref,
    fonts: FontSet,
    pages: Vec<Content>,
    page_width: f32,
    page_height: f32,
}

impl PdfBuilder {
    pub(crate) fn new(
        page_width: f32,
        page_height: f32,
        body_font: Option<String>,
        mono_font: Option<String>,
    ) -> Self {
        PdfBuilder {
            pdf: Pdf::new(),
            next_ref: 3,
            catalog_id: Ref::new(1),
            pages_id: Ref::new(2),
            fonts: FontSet::new(body_font, mono_font),
            pages: vec![Content::new()],
            page_width,
            page_height,
        }
    }

    fn alloc(&mut self) -> Ref {
        let r = Ref::new(self.next_ref);
        self.next_ref += 1;
        r
    }

    pub(crate) fn font(&mut self, face: FontFace) -> Result<&FontEntry, Error> {
        let next_ref = &mut self.next_ref;
        let mut alloc = || {
            let r = Ref::new(*next_ref);
            *next_ref += 1;
            r
        };
        self.fonts.get(&mut self.pdf, face, &mut alloc)
    }

    pub(crate) fn text_width(
        &mut self,
        face: FontFace,
        text: &str,
        size: f32,
    ) -> Result<f32, Error> {
        Ok(self.font(face)?.text_width(text, size))
    }

    pub(crate) fn new_page(&mut self) {
        self.pages.push(Content::new());
    }

    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Draw `text` with its baseline at `top_y` points below the page's top edge.
    pub(crate) fn show_text(
        &mut self,
        face: FontFace,
        text: &str,
        x: f32,
        top_y: f32,
        size: f32,
        rise: f32,
    ) -> Result<(), Error> {
        if has_unencodable(text) {
            log::warn!("dropping characters outside WinAnsi from {text:?}");
        }
        let bytes = to_winansi_bytes(text);
        if bytes.is_empty() {
            return Ok(());
        }
        let name = self.font(face)?.pdf_name.clone();
        let baseline = self.page_height - top_y;
        let Some(content) = self.pages.last_mut() else {
            return Err(Error::Pdf("no page to draw on".into()));
        };
        content.begin_text();
        content.set_font(Name(name.as_bytes()), size);
        if rise != 0.0 {
            content.set_rise(rise);
        }
        content.next_line(x, baseline).show(Str(&bytes));
        // rise is text state and outlives the text object
        if rise != 0.0 {
            content.set_rise(0.0);
        }
        content.end_text();
        Ok(())
    }

    /// Horizontal rule used for underline and strikethrough.
    pub(crate) fn rule(&mut self, x: f32, top_y: f32, width: f32, thickness: f32) {
        let y = self.page_height - top_y;
        if let Some(content) = self.pages.last_mut() {
            content
                .set_line_width(thickness)
                .move_to(x, y)
                .line_to(x + width, y)
                .stroke();
        }
    }

    pub(crate) fn finish(mut self) -> Vec<u8> {
        let page_ids: Vec<Ref> = (0..self.pages.len()).map(|_| self.alloc()).collect();
        let content_ids: Vec<Ref> = (0..self.pages.len()).map(|_| self.alloc()).collect();

        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        self.pdf
            .pages(self.pages_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        let media_box = Rect::new(0.0, 0.0, self.page_width, self.page_height);
        for ((content, page_id), content_id) in self
            .pages
            .into_iter()
            .zip(page_ids)
            .zip(content_ids)
        {
            self.pdf.stream(content_id, &content.finish());

            let mut page = self.pdf.page(page_id);
            page.media_box(media_box)
                .parent(self.pages_id)
                .contents(content_id);
            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            for entry in self.fonts.entries() {
                fonts.pair(Name(entry.pdf_name.as_bytes()), entry.font_ref);
            }
        }

        self.pdf.finish()
    }
}

/// A measured piece of one line.
struct Segment {
    text: String,
    face: FontFace,
    style: StyleFlags,
    size: f32,
    width: f32,
    locked: bool, // list prefix, never merged with text
}

struct Line {
    segments: Vec<Segment>,
    start_x: f32,
    x: f32,
    has_words: bool,
}

impl Line {
    fn starting_at(x: f32) -> Self {
        Line {
            segments: Vec::new(),
            start_x: x,
            x,
            has_words: false,
        }
    }

    fn push(&mut self, segment: Segment) {
        self.x += segment.width;
        if !segment.locked {
            self.has_words = true;
        }
        if let Some(last) = self.segments.last_mut()
            && !last.locked
            && !segment.locked
            && last.face == segment.face
            && last.style == segment.style
            && last.size == segment.size
        {
            last.text.push_str(&segment.text);
            last.width += segment.width;
            return;
        }
        self.segments.push(segment);
    }
}

fn font_size(block: &Block) -> f32 {
    match block {
        Block::Heading { level, .. } => HEADING_SIZES
            .get(usize::from(*level).saturating_sub(1))
            .copied()
            .unwrap_or(14.0),
        _ => BODY_SIZE,
    }
}

fn line_height(block: &Block, size: f32) -> f32 {
    match block {
        Block::Heading { .. } => mm(size * 0.45),
        _ => mm(5.0),
    }
}

fn space_after(block: &Block) -> f32 {
    match block {
        Block::Heading { .. } => mm(3.0),
        Block::Paragraph { .. } => mm(2.0),
        Block::ListItem { .. } => 0.0,
    }
}

fn list_indent(block: &Block) -> f32 {
    match block {
        Block::ListItem { nesting_level, .. } => *nesting_level as f32 * mm(5.0),
        _ => 0.0,
    }
}

pub struct PaginatedRenderer<'a> {
    setup: &'a PageSetup,
    out: PdfBuilder,
    numbering: ListNumberingContext,
    y: f32,
}

impl<'a> PaginatedRenderer<'a> {
    pub fn new(setup: &'a PageSetup) -> Self {
        PaginatedRenderer {
            setup,
            out: PdfBuilder::new(
                setup.page_width,
                setup.page_height,
                setup.body_font.clone(),
                setup.mono_font.clone(),
            ),
            numbering: ListNumberingContext::new(),
            y: 0.0,
        }
    }

    fn top_of_page(&self) -> f32 {
        self.setup.margin_top + mm(5.0)
    }

    pub fn render(mut self, blocks: &[Block]) -> Result<Vec<u8>, Error> {
        self.numbering.reset();
        self.y = self.top_of_page();
        for block in blocks {
            self.render_block(block)?;
        }
        log::debug!(
            "rendered {} blocks onto {} page(s)",
            blocks.len(),
            self.out.page_count()
        );
        Ok(self.out.finish())
    }

    fn render_block(&mut self, block: &Block) -> Result<(), Error> {
        let size = font_size(block);
        let line_h = line_height(block, size);
        let heading = matches!(block, Block::Heading { .. });
        let start_x = self.setup.margin_left + list_indent(block);

        let mut line = Line::starting_at(start_x);
        if let Some(prefix) = self.numbering.prefix_for(block) {
            let width = self.out.text_width(FontFace::REGULAR, &prefix, size)?;
            line.push(Segment {
                text: prefix,
                face: FontFace::REGULAR,
                style: StyleFlags::default(),
                size,
                width,
                locked: true,
            });
        }
        // wrapped lines hang under the text, not under the prefix
        let text_x = line.x;

        for run in block.runs() {
            if run.is_line_break() {
                self.flush(&mut line, line_h, text_x)?;
                continue;
            }
            let mut style = run.style;
            if heading {
                style.bold = true;
            }
            self.layout_run(run, style, size, line_h, text_x, &mut line)?;
        }
        if !line.segments.is_empty() {
            self.flush(&mut line, line_h, text_x)?;
        }

        self.y += space_after(block);
        Ok(())
    }

    fn layout_run(
        &mut self,
        run: &TextRun,
        style: StyleFlags,
        size: f32,
        line_h: f32,
        text_x: f32,
        line: &mut Line,
    ) -> Result<(), Error> {
        let face = FontFace::for_style(&style);
        let size = if style.superscript || style.subscript {
            size * SCRIPT_SCALE
        } else {
            size
        };
        let max_x = self.setup.page_width - self.setup.margin_right;
        let text = collapse_whitespace(&run.text);

        for piece in text.split_inclusive(' ') {
            let is_space = piece.trim_matches(' ').is_empty();
            if is_space && !line.has_words {
                continue;
            }
            let word = piece.trim_end_matches(' ');
            let word_width = self.out.text_width(face, word, size)?;
            if line.x + word_width > max_x && line.has_words {
                self.flush(line, line_h, text_x)?;
                if is_space {
                    continue;
                }
            }

            if line.x + word_width > max_x {
                self.break_long_word(word, face, style, size, line_h, text_x, max_x, line)?;
                let rest = &piece[word.len()..];
                if !rest.is_empty() {
                    let width = self.out.text_width(face, rest, size)?;
                    line.push(Segment {
                        text: rest.to_string(),
                        face,
                        style,
                        size,
                        width,
                        locked: false,
                    });
                }
                continue;
            }

            let width = self.out.text_width(face, piece, size)?;
            line.push(Segment {
                text: piece.to_string(),
                face,
                style,
                size,
                width,
                locked: false,
            });
        }
        Ok(())
    }

    /// Split a word wider than the whole line at character boundaries.
    #[allow(clippy::too_many_arguments)]
    fn break_long_word(
        &mut self,
        word: &str,
        face: FontFace,
        style: StyleFlags,
        size: f32,
        line_h: f32,
        text_x: f32,
        max_x: f32,
        line: &mut Line,
    ) -> Result<(), Error> {
        let mut chunk = String::new();
        let mut chunk_width = 0.0;
        for c in word.chars() {
            let mut buf = [0u8; 4];
            let cw = self.out.text_width(face, c.encode_utf8(&mut buf), size)?;
            if line.x + chunk_width + cw > max_x && (!chunk.is_empty() || line.has_words) {
                if !chunk.is_empty() {
                    line.push(Segment {
                        text: std::mem::take(&mut chunk),
                        face,
                        style,
                        size,
                        width: chunk_width,
                        locked: false,
                    });
                }
                chunk_width = 0.0;
                self.flush(line, line_h, text_x)?;
            }
            chunk.push(c);
            chunk_width += cw;
        }
        if !chunk.is_empty() {
            line.push(Segment {
                text: chunk,
                face,
                style,
                size,
                width: chunk_width,
                locked: false,
            });
        }
        Ok(())
    }

    /// Draw the pending line at the cursor, breaking the page first if it would cross the
    /// bottom margin, then advance the cursor and reset the line to `next_x`.
    fn flush(&mut self, line: &mut Line, line_h: f32, next_x: f32) -> Result<(), Error> {
        let limit = self.setup.page_height - self.setup.margin_bottom;
        if self.y + line_h > limit && self.y > self.top_of_page() {
            self.out.new_page();
            self.y = self.top_of_page();
        }

        let mut x = line.start_x;
        for segment in line.segments.drain(..) {
            let rise = if segment.style.superscript {
                segment.size * 0.5
            } else if segment.style.subscript {
                -segment.size * 0.25
            } else {
                0.0
            };
            self.out
                .show_text(segment.face, &segment.text, x, self.y, segment.size, rise)?;

            let visible = self.out.text_width(segment.face, segment.text.trim_end(), segment.size)?;
            let thickness = segment.size * 0.05;
            if segment.style.underline {
                self.out.rule(x, self.y - rise + segment.size * 0.12, visible, thickness);
            }
            if segment.style.strikethrough {
                self.out.rule(x, self.y - rise - segment.size * 0.3, visible, thickness);
            }
            x += segment.width;
        }

        self.y += line_h;
        *line = Line::starting_at(next_x);
        Ok(())
    }
}

pub fn render(blocks: &[Block], setup: &PageSetup) -> Result<Vec<u8>, Error> {
    PaginatedRenderer::new(setup).render(blocks)
}
