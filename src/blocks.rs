//! Token stream to document blocks.
//!
//! Two stacks drive the builder: open inline format frames, and open list containers.
//! Block boundaries never touch the format stack; only explicit open/close tags do, so a
//! styled `<span>` wrapping several paragraphs styles all of them.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Block, ListType, StyleFlags, TextRun};
use crate::tokenizer::Token;

static FONT_WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"font-weight\s*:\s*(bold|[0-9]+)").expect("valid pattern"));
static FONT_STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"font-style\s*:\s*(italic|oblique)").expect("valid pattern"));
static UNDERLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"text-decoration[^:;]*:\s*[^;]*underline").expect("valid pattern")
});
static LINE_THROUGH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"text-decoration[^:;]*:\s*[^;]*line-through").expect("valid pattern")
});
static MONOSPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"font-family\s*:\s*[^;]*(mono|courier|consolas|menlo)").expect("valid pattern")
});
static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n+").expect("valid pattern"));

/// Block containers besides headings, list items and lists.
const PARAGRAPH_TAGS: &[&str] = &["p", "div", "blockquote", "pre", "tr"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Property {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Superscript,
    Subscript,
}

impl Property {
    fn flags(self) -> StyleFlags {
        let mut f = StyleFlags::default();
        match self {
            Property::Bold => f.bold = true,
            Property::Italic => f.italic = true,
            Property::Underline => f.underline = true,
            Property::Strikethrough => f.strikethrough = true,
            Property::Code => f.code = true,
            Property::Superscript => f.superscript = true,
            Property::Subscript => f.subscript = true,
        }
        f
    }
}

fn semantic_property(tag: &str) -> Option<Property> {
    match tag {
        "strong" | "b" => Some(Property::Bold),
        "em" | "i" => Some(Property::Italic),
        "u" => Some(Property::Underline),
        "s" | "strike" | "del" => Some(Property::Strikethrough),
        "code" | "kbd" | "samp" => Some(Property::Code),
        "sup" => Some(Property::Superscript),
        "sub" => Some(Property::Subscript),
        _ => None,
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', d @ b'1'..=b'6'] => Some(*d - b'0'),
        _ => None,
    }
}

fn list_type(tag: &str) -> Option<ListType> {
    match tag {
        "ul" => Some(ListType::Bullet),
        "ol" => Some(ListType::Ordered),
        _ => None,
    }
}

/// Inline formatting signals in a `style` attribute. Each property is matched on its own,
/// so one declaration list can set several flags.
pub fn parse_style_attribute(style: &str) -> StyleFlags {
    let style = style.to_lowercase();
    let bold = FONT_WEIGHT_RE.captures(&style).is_some_and(|caps| {
        let value = &caps[1];
        value == "bold" || value.parse::<u32>().is_ok_and(|weight| weight >= 700)
    });
    StyleFlags {
        bold,
        italic: FONT_STYLE_RE.is_match(&style),
        underline: UNDERLINE_RE.is_match(&style),
        strikethrough: LINE_THROUGH_RE.is_match(&style),
        code: MONOSPACE_RE.is_match(&style),
        superscript: false,
        subscript: false,
    }
}

#[derive(Clone, Debug, PartialEq)]
enum FrameScope {
    Semantic(Property),
    Css(StyleFlags),
    Link(String),
}

/// One open inline scope. Frames pushed by the same open tag share `origin`, so the
/// matching close tag removes them together.
#[derive(Clone, Debug)]
struct FormatFrame {
    origin: usize,
    scope: FrameScope,
}

/// An element still waiting for its close tag, styled or not.
#[derive(Clone, Debug)]
struct OpenElement {
    tag: String,
    origin: usize,
}

#[derive(Clone, Copy, Debug)]
struct ListFrame {
    list_type: ListType,
    item_index: Option<usize>,
}

#[derive(Default)]
pub struct BlockBuilder {
    blocks: Vec<Block>,
    format_stack: Vec<FormatFrame>,
    open_elements: Vec<OpenElement>,
    list_stack: Vec<ListFrame>,
    current: Option<Block>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(mut self, tokens: &[Token]) -> Vec<Block> {
        for (position, token) in tokens.iter().enumerate() {
            match token {
                Token::Open {
                    tag, self_closing, ..
                } => self.open_tag(tag, token, *self_closing, position),
                Token::Close { tag } => self.close_tag(tag),
                Token::Text { content } => self.text(content),
            }
        }
        self.finalize_block();

        let mut blocks = self.blocks;
        blocks.retain(Block::has_content);
        blocks
    }

    fn open_tag(&mut self, tag: &str, token: &Token, self_closing: bool, origin: usize) {
        if let Some(list_type) = list_type(tag) {
            // `<ul/>` has no items and no close
            if !self_closing {
                self.list_stack.push(ListFrame {
                    list_type,
                    item_index: None,
                });
            }
        } else if tag == "li" {
            self.open_list_item();
        } else if let Some(level) = heading_level(tag) {
            self.finalize_block();
            self.current = Some(Block::Heading {
                level,
                runs: Vec::new(),
            });
        } else if PARAGRAPH_TAGS.contains(&tag) {
            self.finalize_block();
            self.current = Some(Block::Paragraph { runs: Vec::new() });
        }

        if tag == "br" {
            let run = self.make_run("\n".to_string());
            self.ensure_block().runs_mut().push(run);
        }
        // nothing will close a self-closing tag, so it opens no scope
        if self_closing {
            return;
        }

        self.open_elements.push(OpenElement {
            tag: tag.to_string(),
            origin,
        });
        if let Some(property) = semantic_property(tag) {
            self.push_frame(origin, FrameScope::Semantic(property));
        }
        if let Some(style) = token.attribute("style") {
            let flags = parse_style_attribute(style);
            if !flags.is_plain() {
                self.push_frame(origin, FrameScope::Css(flags));
            }
        }
        if tag == "a" {
            let href = token.attribute("href").unwrap_or_default().to_string();
            self.push_frame(origin, FrameScope::Link(href));
        }
    }

    fn open_list_item(&mut self) {
        self.finalize_block();
        let nesting_level = self.list_stack.len().saturating_sub(1);
        let (list_type, item_index) = match self.list_stack.last_mut() {
            Some(frame) => {
                let index = frame.item_index.map_or(0, |i| i + 1);
                frame.item_index = Some(index);
                (frame.list_type, index)
            }
            None => {
                log::warn!("<li> outside of any list, treating it as a top-level bullet");
                (ListType::Bullet, 0)
            }
        };
        self.current = Some(Block::ListItem {
            list_type,
            nesting_level,
            item_index,
            runs: Vec::new(),
        });
    }

    fn close_tag(&mut self, tag: &str) {
        if list_type(tag).is_some() {
            self.list_stack.pop();
            if self.list_stack.is_empty() {
                self.finalize_block();
            }
        } else if tag == "li" || heading_level(tag).is_some() || PARAGRAPH_TAGS.contains(&tag) {
            self.finalize_block();
        }
        self.close_element(tag);
    }

    fn text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        let run = self.make_run(content.to_string());
        self.ensure_block().runs_mut().push(run);
    }

    fn push_frame(&mut self, origin: usize, scope: FrameScope) {
        self.format_stack.push(FormatFrame { origin, scope });
    }

    /// Close the nearest open element named `tag`, which need not be innermost, and drop
    /// the frames its open tag pushed. Unmatched closes are ignored.
    fn close_element(&mut self, tag: &str) {
        let Some(position) = self.open_elements.iter().rposition(|e| e.tag == tag) else {
            return;
        };
        let origin = self.open_elements.remove(position).origin;
        self.format_stack.retain(|f| f.origin != origin);
    }

    fn resolved_style(&self) -> StyleFlags {
        self.format_stack
            .iter()
            .fold(StyleFlags::default(), |acc, frame| match &frame.scope {
                FrameScope::Semantic(p) => acc.union(p.flags()),
                FrameScope::Css(flags) => acc.union(*flags),
                FrameScope::Link(_) => acc,
            })
    }

    fn current_href(&self) -> Option<String> {
        self.format_stack.iter().rev().find_map(|frame| match &frame.scope {
            FrameScope::Link(href) if !href.is_empty() => Some(href.clone()),
            _ => None,
        })
    }

    fn make_run(&self, text: String) -> TextRun {
        TextRun {
            text,
            style: self.resolved_style(),
            href: self.current_href(),
        }
    }

    fn ensure_block(&mut self) -> &mut Block {
        self.current.get_or_insert_with(|| Block::Paragraph { runs: Vec::new() })
    }

    fn finalize_block(&mut self) {
        let Some(mut block) = self.current.take() else {
            return;
        };
        let runs = block.runs_mut();
        let leading = runs.iter().take_while(|r| r.is_blank()).count();
        runs.drain(..leading);
        while runs.last().is_some_and(TextRun::is_blank) {
            runs.pop();
        }
        if !runs.is_empty() {
            self.blocks.push(block);
        }
    }
}

pub fn build(tokens: &[Token]) -> Vec<Block> {
    BlockBuilder::new().build(tokens)
}

/// Plain-text fallback: blank-line separated paragraphs, no formatting.
pub fn from_plain_text(text: &str) -> Vec<Block> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    PARAGRAPH_BREAK_RE
        .split(&normalized)
        .map(str::trim)
        .filter(|para| !para.is_empty())
        .map(|para| Block::Paragraph {
            runs: vec![TextRun::plain(para)],
        })
        .collect()
}
