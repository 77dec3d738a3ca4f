#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListType {
    Bullet,
    Ordered,
}

/// Resolved inline style of a run. Every flag is the OR of all open format frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StyleFlags {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub superscript: bool,
    pub subscript: bool,
}

impl StyleFlags {
    pub fn union(self, other: StyleFlags) -> StyleFlags {
        StyleFlags {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
            strikethrough: self.strikethrough || other.strikethrough,
            code: self.code || other.code,
            superscript: self.superscript || other.superscript,
            subscript: self.subscript || other.subscript,
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == StyleFlags::default()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: StyleFlags,
    pub href: Option<String>, // innermost enclosing <a href>
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        TextRun {
            text: text.into(),
            style: StyleFlags::default(),
            href: None,
        }
    }

    /// Runs produced by `<br>`.
    pub fn is_line_break(&self) -> bool {
        self.text == "\n"
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Heading {
        level: u8, // 1..=6
        runs: Vec<TextRun>,
    },
    Paragraph {
        runs: Vec<TextRun>,
    },
    ListItem {
        list_type: ListType,
        nesting_level: usize,
        item_index: usize,
        runs: Vec<TextRun>,
    },
}

impl Block {
    pub fn runs(&self) -> &[TextRun] {
        match self {
            Block::Heading { runs, .. }
            | Block::Paragraph { runs }
            | Block::ListItem { runs, .. } => runs,
        }
    }

    pub(crate) fn runs_mut(&mut self) -> &mut Vec<TextRun> {
        match self {
            Block::Heading { runs, .. }
            | Block::Paragraph { runs }
            | Block::ListItem { runs, .. } => runs,
        }
    }

    /// Concatenated run text, tags and styles dropped.
    pub fn text(&self) -> String {
        self.runs().iter().map(|r| r.text.as_str()).collect()
    }

    pub fn has_content(&self) -> bool {
        self.runs().iter().any(|r| !r.is_blank())
    }
}

/// Collapse HTML source whitespace (newlines, indentation, repeated spaces) to single
/// spaces. Non-breaking spaces are kept as they are.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() && c != '\u{00A0}' {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    if pending_space {
        out.push(' ');
    }
    out
}
