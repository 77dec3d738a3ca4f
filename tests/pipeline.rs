use flashdoc::blocks::{self, parse_style_attribute};
use flashdoc::entities::decode;
use flashdoc::numbering::ListNumberingContext;
use flashdoc::tokenizer::{Token, tokenize};
use flashdoc::{Block, ListType, StyleFlags, blocks_from_selection, parse_html};

fn run_texts(block: &Block) -> Vec<&str> {
    block.runs().iter().map(|r| r.text.as_str()).collect()
}

fn prefixes(blocks: &[Block]) -> Vec<Option<String>> {
    let mut ctx = ListNumberingContext::new();
    ctx.reset();
    blocks.iter().map(|b| ctx.prefix_for(b)).collect()
}

fn bold() -> StyleFlags {
    StyleFlags {
        bold: true,
        ..Default::default()
    }
}

fn text(content: &str) -> Token {
    Token::Text {
        content: content.into(),
    }
}

// --- entities ---

#[test]
fn decodes_named_decimal_and_hex() {
    assert_eq!(decode("&amp;&mdash;&#8364;&#x20AC;"), "&\u{2014}\u{20AC}\u{20AC}");
    assert_eq!(
        decode("caf&eacute; &Uuml;ber &szlig; &copy; &rarr; &pi;"),
        "caf\u{e9} \u{dc}ber \u{df} \u{a9} \u{2192} \u{3c0}"
    );
    assert_eq!(decode("&#X41;&#65;"), "AA");
}

#[test]
fn decodes_each_reference_once() {
    assert_eq!(decode("&amp;lt;"), "&lt;");
    assert_eq!(decode("&amp;#38;"), "&#38;");
}

#[test]
fn leaves_unknown_and_malformed_references() {
    assert_eq!(decode("&bogus; &amp &#; &#xZZ;"), "&bogus; &amp &#; &#xZZ;");
    assert_eq!(decode("&#0;"), "&#0;");
    assert_eq!(decode("&#x110000;"), "&#x110000;");
    assert_eq!(decode("&#xD800;"), "&#xD800;");
    assert_eq!(decode("&#99999999999999;"), "&#99999999999999;");
    assert_eq!(decode(""), "");
    assert_eq!(decode("AT&T"), "AT&T");
}

// --- tokenizer ---

#[test]
fn tokenizes_in_document_order_with_attributes() {
    let tokens = tokenize(r#"<P CLASS="a" data-x='y' width=10 hidden>Hi &amp; bye</p>"#);
    assert_eq!(tokens.len(), 3);
    match &tokens[0] {
        Token::Open { tag, attributes, self_closing } => {
            assert_eq!(tag, "p");
            assert!(!self_closing);
            assert_eq!(attributes.get("class").map(String::as_str), Some("a"));
            assert_eq!(attributes.get("data-x").map(String::as_str), Some("y"));
            assert_eq!(attributes.get("width").map(String::as_str), Some("10"));
            assert_eq!(attributes.get("hidden").map(String::as_str), Some(""));
        }
        other => panic!("expected open tag, got {other:?}"),
    }
    assert_eq!(tokens[1], text("Hi & bye"));
    assert!(matches!(&tokens[2], Token::Close { tag } if tag == "p"));
}

#[test]
fn attribute_values_are_decoded() {
    let tokens = tokenize(r#"<a href="/q?a=1&amp;b=2" title='&quot;x&quot;'>"#);
    assert_eq!(tokens[0].attribute("href"), Some("/q?a=1&b=2"));
    assert_eq!(tokens[0].attribute("title"), Some("\"x\""));
}

#[test]
fn drops_whitespace_between_tags_but_keeps_nbsp() {
    let tokens = tokenize("<p>a</p>\n   <p>b</p>");
    assert_eq!(tokens.len(), 6);

    let tokens = tokenize("<b>x</b>\u{a0}<i>y</i>");
    assert!(tokens.contains(&text("\u{a0}")));
}

#[test]
fn void_and_self_closing_tags_get_no_close_token() {
    let tokens = tokenize("a<br>b<img src=x.png/><span/>c");
    let opens: Vec<(&str, bool)> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Open { tag, self_closing, .. } => Some((tag.as_str(), *self_closing)),
            _ => None,
        })
        .collect();
    assert_eq!(opens, vec![("br", true), ("img", true), ("span", true)]);
    assert!(!tokens.iter().any(|t| matches!(t, Token::Close { .. })));
}

#[test]
fn concatenated_text_reproduces_content() {
    let html = "<div>One <b>two</b><i> three</i></div>\n<p>four &lt;5&gt;</p>trailing";
    let text: String = tokenize(html)
        .iter()
        .filter_map(|t| match t {
            Token::Text { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "One two three four <5>trailing");
}

#[test]
fn unclosed_angle_bracket_is_text() {
    let tokens = tokenize("1 < 2 and <b>bold");
    assert_eq!(tokens[0], text("1 < 2 and "));
    assert_eq!(tokens.last(), Some(&text("bold")));
}

// --- block builder ---

#[test]
fn nested_formats_resolve_per_run() {
    let blocks = parse_html("<strong>A<em>B</em>C</strong>");
    assert_eq!(blocks.len(), 1);
    let runs = blocks[0].runs();
    assert_eq!(run_texts(&blocks[0]), ["A", "B", "C"]);
    assert!(runs[0].style.bold && !runs[0].style.italic);
    assert!(runs[1].style.bold && runs[1].style.italic);
    assert!(runs[2].style.bold && !runs[2].style.italic);
}

#[test]
fn css_style_sets_flags() {
    let blocks = parse_html(r#"<span style="font-weight:700;text-decoration:underline">X</span>"#);
    assert_eq!(blocks.len(), 1);
    let run = &blocks[0].runs()[0];
    assert_eq!(run.text, "X");
    assert!(run.style.bold && run.style.underline);
    assert!(!run.style.italic && !run.style.strikethrough && !run.style.code);
}

#[test]
fn style_attribute_signals_are_independent() {
    assert!(!parse_style_attribute("font-weight: 600").bold);
    assert!(parse_style_attribute("FONT-WEIGHT: BOLD").bold);
    let all = parse_style_attribute(
        "font-weight:800; font-style: oblique; text-decoration: underline line-through; font-family: 'Fira Mono', serif",
    );
    assert!(all.bold && all.italic && all.underline && all.strikethrough && all.code);
    assert!(parse_style_attribute("text-decoration-line: line-through").strikethrough);
    assert!(parse_style_attribute("font-family: Menlo").code);
    assert!(parse_style_attribute("color: red").is_plain());
}

#[test]
fn overlapping_close_order_removes_matching_frame() {
    let blocks = parse_html("<b>1<i>2</b>3</i>4");
    let runs = blocks[0].runs();
    assert_eq!(run_texts(&blocks[0]), ["1", "2", "3", "4"]);
    assert_eq!(runs[0].style, bold());
    assert!(runs[1].style.bold && runs[1].style.italic);
    assert!(!runs[2].style.bold && runs[2].style.italic);
    assert!(runs[3].style.is_plain());
}

#[test]
fn unmatched_close_is_ignored() {
    let blocks = parse_html("<p>a</u>b</p>");
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].runs().iter().all(|r| r.style.is_plain()));
}

#[test]
fn semantic_tag_with_style_closes_both_frames() {
    let blocks = parse_html(r#"<p><b style="font-style:italic">x</b>y</p>"#);
    let runs = blocks[0].runs();
    assert!(runs[0].style.bold && runs[0].style.italic);
    assert!(runs[1].style.is_plain());
}

#[test]
fn unstyled_inner_span_keeps_outer_style() {
    let blocks = parse_html(
        r#"<span style="font-weight:bold">A <span style="color:red">B</span> C</span>"#,
    );
    let runs = blocks[0].runs();
    assert_eq!(run_texts(&blocks[0]), ["A ", "B", " C"]);
    assert!(runs.iter().all(|r| r.style.bold));
}

#[test]
fn nested_divs_close_their_own_scope() {
    let blocks = parse_html(r#"<div style="font-style:italic"><div>x</div>y</div>z"#);
    assert_eq!(blocks.len(), 3);
    assert!(blocks[0].runs()[0].style.italic);
    assert!(blocks[1].runs()[0].style.italic);
    assert!(!blocks[2].runs()[0].style.italic);
}

#[test]
fn nested_same_name_styled_spans() {
    let blocks = parse_html(concat!(
        r#"<p><span style="font-weight:bold">a<span style="font-style:italic">b</span>"#,
        r#"c</span>d</p>"#,
    ));
    let runs = blocks[0].runs();
    assert!(runs[0].style.bold && !runs[0].style.italic);
    assert!(runs[1].style.bold && runs[1].style.italic);
    assert!(runs[2].style.bold && !runs[2].style.italic);
    assert!(runs[3].style.is_plain());
}

#[test]
fn self_closing_format_tags_open_no_scope() {
    let blocks = parse_html(concat!(
        r#"<p><i/>plain<b/> text<a name="x"/> here</p>"#,
        r#"<p><span style="font-weight:bold"/>next</p>"#,
    ));
    assert_eq!(blocks.len(), 2);
    for run in blocks.iter().flat_map(|b| b.runs()) {
        assert!(run.style.is_plain(), "{run:?}");
        assert_eq!(run.href, None);
    }
}

#[test]
fn self_closing_list_does_not_nest_later_items() {
    let blocks = parse_html("<ul/><ul><li>x</li></ul>");
    assert!(matches!(&blocks[0], Block::ListItem { nesting_level: 0, .. }));
}

#[test]
fn styled_span_carries_across_paragraphs() {
    let blocks = parse_html(
        r#"<span style="font-style:italic"><p>one</p><p>two</p></span><p>three</p>"#,
    );
    assert_eq!(blocks.len(), 3);
    assert!(blocks[0].runs()[0].style.italic);
    assert!(blocks[1].runs()[0].style.italic);
    assert!(!blocks[2].runs()[0].style.italic);
}

#[test]
fn ordered_lists_restart_numbering() {
    let blocks = parse_html("<ol><li>a</li><li>b</li></ol><ol><li>c</li></ol>");
    let indices: Vec<usize> = blocks
        .iter()
        .map(|b| match b {
            Block::ListItem { item_index, list_type: ListType::Ordered, .. } => *item_index,
            other => panic!("expected ordered item, got {other:?}"),
        })
        .collect();
    assert_eq!(indices, [0, 1, 0]);
    assert_eq!(
        prefixes(&blocks),
        [Some("1. ".to_string()), Some("2. ".to_string()), Some("1. ".to_string())]
    );
}

#[test]
fn nested_list_levels() {
    let blocks = parse_html("<ul><li>a<ul><li>b</li></ul></li></ul>");
    assert_eq!(blocks.len(), 2);
    let levels: Vec<usize> = blocks
        .iter()
        .map(|b| match b {
            Block::ListItem { nesting_level, .. } => *nesting_level,
            other => panic!("expected list item, got {other:?}"),
        })
        .collect();
    assert_eq!(levels, [0, 1]);
    assert_eq!(run_texts(&blocks[0]), ["a"]);
    assert_eq!(run_texts(&blocks[1]), ["b"]);

    let p = prefixes(&blocks);
    assert_eq!(p[0].as_deref(), Some("\u{2022} "));
    assert_eq!(p[1].as_deref(), Some("o "));
    assert_ne!(p[0], p[1]);
}

#[test]
fn deep_bullets_clamp_to_last_glyph() {
    let blocks = parse_html(
        "<ul><li>1<ul><li>2<ul><li>3<ul><li>4</li></ul></li></ul></li></ul></li></ul>",
    );
    let p = prefixes(&blocks);
    assert_eq!(p[2], p[3]);
}

#[test]
fn switching_list_type_restarts_count() {
    let blocks = parse_html("<ol><li>a</li></ol><ul><li>b</li></ul><ol><li>c</li></ol>");
    let p = prefixes(&blocks);
    assert_eq!(p[0].as_deref(), Some("1. "));
    assert_eq!(p[1].as_deref(), Some("\u{2022} "));
    assert_eq!(p[2].as_deref(), Some("1. "));
}

#[test]
fn nested_ordered_list_restarts_under_next_parent() {
    let blocks = parse_html(
        "<ul><li>A<ol><li>x</li><li>y</li></ol></li><li>B<ol><li>z</li></ol></li></ul>",
    );
    let p: Vec<String> = prefixes(&blocks).into_iter().flatten().collect();
    assert_eq!(p, ["\u{2022} ", "1. ", "2. ", "\u{2022} ", "1. "]);
}

// Only top-level items decide whether a new outer list started, so a nested list of
// another type between two outer items does not reset the outer count.
#[test]
fn nested_bullets_do_not_interrupt_outer_count() {
    let blocks = parse_html("<ol><li>one<ul><li>sub</li></ul></li><li>two</li></ol>");
    let p: Vec<String> = prefixes(&blocks).into_iter().flatten().collect();
    assert_eq!(p, ["1. ", "o ", "2. "]);
}

#[test]
fn numbering_context_is_reset_between_documents() {
    let blocks = parse_html("<ol><li>a</li><li>b</li></ol>");
    let mut ctx = ListNumberingContext::new();
    ctx.reset();
    let first: Vec<_> = blocks.iter().map(|b| ctx.prefix_for(b)).collect();
    ctx.reset();
    let second: Vec<_> = blocks.iter().map(|b| ctx.prefix_for(b)).collect();
    assert_eq!(first, second);
}

#[test]
fn paragraph_prefix_is_none() {
    let blocks = parse_html("<ol><li>a</li></ol><p>text</p><ol><li>b</li></ol>");
    let p = prefixes(&blocks);
    assert_eq!(p[1], None);
    assert_eq!(p[2].as_deref(), Some("1. "));
}

#[test]
fn orphan_list_items_become_top_level_bullets() {
    let blocks = parse_html("<li>x</li><li>y</li>");
    assert_eq!(blocks.len(), 2);
    for block in &blocks {
        assert!(matches!(
            block,
            Block::ListItem {
                list_type: ListType::Bullet,
                nesting_level: 0,
                item_index: 0,
                ..
            }
        ));
    }
}

#[test]
fn empty_blocks_are_dropped() {
    let blocks = parse_html("<p></p><p>   </p><p>Real text</p>");
    assert_eq!(blocks.len(), 1);
    assert!(matches!(&blocks[0], Block::Paragraph { .. }));
    assert_eq!(blocks[0].text(), "Real text");
}

#[test]
fn blank_edge_runs_are_trimmed() {
    let blocks = parse_html("<ul><li>\u{a0}<b>x</b>\u{a0}</li></ul><p><br></p>");
    assert_eq!(blocks.len(), 1);
    assert_eq!(run_texts(&blocks[0]), ["x"]);
}

#[test]
fn line_break_run_carries_style() {
    let blocks = parse_html("<p>a<b><br>b</b></p>");
    let runs = blocks[0].runs();
    assert_eq!(run_texts(&blocks[0]), ["a", "\n", "b"]);
    assert!(runs[1].is_line_break());
    assert!(runs[1].style.bold);
}

#[test]
fn headings_and_block_tags() {
    let blocks = parse_html("<h2>Title</h2><blockquote>quote</blockquote><h7>not a heading</h7>");
    assert!(matches!(&blocks[0], Block::Heading { level: 2, .. }));
    assert!(matches!(&blocks[1], Block::Paragraph { .. }));
    // unknown tags only add their text to the current (or a lazily created) block
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[2].text(), "not a heading");
}

#[test]
fn links_mark_runs_with_href() {
    let blocks = parse_html(r#"<p>see <a href="https://x.y/?a=1&amp;b=2">here</a>.</p>"#);
    let runs = blocks[0].runs();
    assert_eq!(runs[0].href, None);
    assert_eq!(runs[1].href.as_deref(), Some("https://x.y/?a=1&b=2"));
    assert_eq!(runs[2].href, None);
}

#[test]
fn sub_and_superscript() {
    let blocks = parse_html("<p>H<sub>2</sub>O x<sup>2</sup></p>");
    let runs = blocks[0].runs();
    assert!(runs[1].style.subscript);
    assert!(runs[3].style.superscript);
}

#[test]
fn builder_accepts_token_stream_directly() {
    let tokens = vec![
        Token::Open {
            tag: "em".into(),
            attributes: Default::default(),
            self_closing: false,
        },
        text("hi"),
    ];
    let built = blocks::build(&tokens);
    assert_eq!(built.len(), 1);
    assert!(built[0].runs()[0].style.italic);
}

// --- fallback ---

#[test]
fn plain_text_fallback() {
    let blocks = blocks_from_selection("", "Para one\n\nPara two");
    assert_eq!(blocks.len(), 2);
    assert_eq!(run_texts(&blocks[0]), ["Para one"]);
    assert_eq!(run_texts(&blocks[1]), ["Para two"]);
    assert!(blocks.iter().all(|b| matches!(b, Block::Paragraph { .. })));
    assert!(blocks.iter().flat_map(|b| b.runs()).all(|r| r.style.is_plain()));
}

#[test]
fn blank_html_uses_fallback_and_crlf_is_normalized() {
    let blocks = blocks_from_selection("  \n ", "a\r\n\r\n\r\nb\nstill b\n\n   \n");
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].text(), "b\nstill b");
}
