//! Single-pass HTML tokenizer.
//!
//! There is no tree: the scanner walks the string once with a tag pattern and emits
//! open/close/text tokens in document order. Nesting is never validated; mismatched
//! tags are left for the block builder to tolerate.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::entities;

/// Elements that never receive a closing token.
pub const VOID_ELEMENTS: &[&str] = &[
    "br", "hr", "img", "input", "meta", "link", "area", "base", "col", "embed", "source", "track",
    "wbr",
];

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)(\w+)([^>]*?)(/?)>").expect("tag pattern is valid"));

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .expect("attribute pattern is valid")
});

// Comments and declarations are markup, not text.
static MARKUP_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<![^>]*>").expect("comment pattern is valid"));

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Open {
        tag: String,
        attributes: HashMap<String, String>,
        self_closing: bool,
    },
    Close {
        tag: String,
    },
    Text {
        content: String,
    },
}

impl Token {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            Token::Open { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }
}

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse `name="v" name='v' name=v name` into a map. Names are lowercased, values
/// entity-decoded; a later duplicate overwrites an earlier one.
pub fn parse_attributes(raw: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let raw = raw.trim();
    if raw.is_empty() {
        return attrs;
    }
    for caps in ATTR_RE.captures_iter(raw) {
        let name = caps[1].to_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or("");
        attrs.insert(name, entities::decode(value));
    }
    attrs
}

/// Ordinary whitespace between tags is layout noise; a non-breaking space is content.
fn is_meaningful_text(raw: &str) -> bool {
    !raw.trim().is_empty() || raw.contains('\u{00A0}')
}

fn push_text(tokens: &mut Vec<Token>, raw: &str) {
    if raw.is_empty() || !is_meaningful_text(raw) {
        return;
    }
    tokens.push(Token::Text {
        content: entities::decode(raw),
    });
}

/// Text span between two tags, with markup comments cut out.
fn push_span(tokens: &mut Vec<Token>, span: &str) {
    if !span.contains("<!") {
        push_text(tokens, span);
        return;
    }
    let mut last = 0;
    for m in MARKUP_DECL_RE.find_iter(span) {
        push_text(tokens, &span[last..m.start()]);
        last = m.end();
    }
    push_text(tokens, &span[last..]);
}

pub fn tokenize(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    if html.is_empty() {
        return tokens;
    }

    let mut last_end = 0;
    let mut search_from = 0;
    let mut comment_close_missing = false;
    while let Some(caps) = TAG_RE.captures_at(html, search_from) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        // A tag-like match inside a comment belongs to the comment.
        if let Some(comment_end) =
            comment_covering(html, last_end, whole.start(), &mut comment_close_missing)
        {
            search_from = comment_end;
            continue;
        }

        push_span(&mut tokens, &html[last_end..whole.start()]);

        let closing = !caps[1].is_empty();
        let tag = caps[2].to_lowercase();
        if closing {
            tokens.push(Token::Close { tag });
        } else {
            let self_closing = !caps[4].is_empty() || is_void_element(&tag);
            tokens.push(Token::Open {
                attributes: parse_attributes(&caps[3]),
                tag,
                self_closing,
            });
        }

        last_end = whole.end();
        search_from = last_end;
    }

    push_span(&mut tokens, &html[last_end..]);
    tokens
}

/// If an unterminated `<!--` opened between `from` and `at` swallows position `at`,
/// return the byte offset just past its `-->`. `close_missing` records that no `-->`
/// follows some earlier position, hence none follows any later one either.
fn comment_covering(
    html: &str,
    from: usize,
    at: usize,
    close_missing: &mut bool,
) -> Option<usize> {
    if *close_missing {
        return None;
    }
    let open = html[from..at].rfind("<!--")? + from;
    if html[open + 4..at].contains("-->") {
        return None;
    }
    let Some(close) = html[at..].find("-->") else {
        *close_missing = true;
        return None;
    };
    Some(at + close + 3)
}
