use std::io::{Cursor, Read};

use flashdoc::docx::{MAX_LIST_LEVEL, numbering_reference};
use flashdoc::{ListType, parse_html, render_docx};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn read_part(docx: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).expect("not a zip archive");
    let mut file = archive.by_name(name).unwrap_or_else(|_| panic!("missing {name}"));
    let mut xml = String::new();
    file.read_to_string(&mut xml).expect("part is not UTF-8");
    xml
}

fn render(html: &str) -> Vec<u8> {
    render_docx(&parse_html(html)).expect("render failed")
}

fn wml<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    node.descendants()
        .filter(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
        .collect()
}

fn val<'a>(node: roxmltree::Node<'a, '_>) -> Option<&'a str> {
    node.attribute((WML_NS, "val"))
}

fn has(node: roxmltree::Node, prop: &str) -> bool {
    !wml(node, prop).is_empty()
}

/// (ilvl, numId) of every numbered paragraph, in document order.
fn list_levels(document: &str) -> Vec<(String, String)> {
    let doc = roxmltree::Document::parse(document).expect("document.xml parses");
    wml(doc.root(), "numPr")
        .into_iter()
        .map(|num_pr| {
            let attr = |name: &str| {
                wml(num_pr, name)
                    .first()
                    .and_then(|n| val(*n))
                    .unwrap_or("")
                    .to_string()
            };
            (attr("ilvl"), attr("numId"))
        })
        .collect()
}

#[test]
fn package_has_all_parts() {
    let docx = render("<p>hello</p>");
    let archive = zip::ZipArchive::new(Cursor::new(&docx[..])).expect("not a zip archive");
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/_rels/document.xml.rels",
            "word/document.xml",
            "word/numbering.xml",
            "word/styles.xml",
        ]
    );
    for name in names {
        let xml = read_part(&docx, name);
        roxmltree::Document::parse(&xml).unwrap_or_else(|e| panic!("{name}: {e}"));
    }
}

#[test]
fn run_formatting_maps_to_properties() {
    let docx = render("<p><b>B</b><i>I</i><u>U</u><s>S</s><code>C</code></p>");
    let xml = read_part(&docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let runs = wml(doc.root(), "r");
    assert_eq!(runs.len(), 5);

    assert!(has(runs[0], "b") && !has(runs[0], "i"));
    assert!(has(runs[1], "i") && !has(runs[1], "b"));
    assert!(has(runs[2], "u"));
    assert!(has(runs[3], "strike"));
    let fonts = wml(runs[4], "rFonts");
    assert_eq!(fonts[0].attribute((WML_NS, "ascii")), Some("Courier New"));
}

#[test]
fn text_is_escaped_and_preserved() {
    let docx = render("<p>a &lt; b &amp; c</p>");
    let xml = read_part(&docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let texts: Vec<&str> = wml(doc.root(), "t").iter().filter_map(|t| t.text()).collect();
    assert_eq!(texts, ["a < b & c"]);
}

#[test]
fn headings_get_style_and_bold() {
    let docx = render("<h3>Title</h3>");
    let xml = read_part(&docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let style = wml(doc.root(), "pStyle");
    assert_eq!(val(style[0]), Some("Heading3"));
    assert_eq!(wml(doc.root(), "b").len(), 1);
    assert_eq!(val(wml(doc.root(), "sz")[0]), Some("28"));
}

#[test]
fn line_breaks_become_br() {
    let docx = render("<p>one<br>two</p>");
    let xml = read_part(&docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).unwrap();
    assert_eq!(wml(doc.root(), "br").len(), 1);
    assert_eq!(wml(doc.root(), "p").len(), 1);
}

#[test]
fn separate_lists_get_separate_instances() {
    let docx = render("<ol><li>a</li><li>b</li></ol><p>gap</p><ol><li>c</li></ol>");
    let levels = list_levels(&read_part(&docx, "word/document.xml"));
    assert_eq!(levels.len(), 3);
    assert_eq!(levels[0], levels[1]);
    assert_ne!(levels[0].1, levels[2].1);

    let numbering = read_part(&docx, "word/numbering.xml");
    let doc = roxmltree::Document::parse(&numbering).unwrap();
    assert_eq!(wml(doc.root(), "abstractNum").len(), 2);
    let nums = wml(doc.root(), "num");
    assert_eq!(nums.len(), 2);
    for num in nums {
        let abstract_id = wml(num, "abstractNumId");
        assert_eq!(val(abstract_id[0]), Some("1"));
        assert!(!wml(num, "startOverride").is_empty());
    }
}

#[test]
fn nesting_is_clamped_to_declared_levels() {
    let docx = render(
        "<ul><li>0<ul><li>1<ul><li>2<ul><li>3<ul><li>4</li></ul></li></ul></li></ul></li></ul></li></ul>",
    );
    let levels = list_levels(&read_part(&docx, "word/document.xml"));
    let ilvls: Vec<&str> = levels.iter().map(|(ilvl, _)| ilvl.as_str()).collect();
    assert_eq!(ilvls, ["0", "1", "2", "2", "2"]);
}

#[test]
fn numbering_references() {
    assert_eq!(numbering_reference(ListType::Bullet, 0), ("bullet-list", 0));
    assert_eq!(numbering_reference(ListType::Ordered, 1), ("ordered-list", 1));
    assert_eq!(numbering_reference(ListType::Ordered, 7), ("ordered-list", MAX_LIST_LEVEL));
}

#[test]
fn numbering_definitions_declare_formats() {
    let docx = render("<ul><li>x</li></ul>");
    let numbering = read_part(&docx, "word/numbering.xml");
    let doc = roxmltree::Document::parse(&numbering).unwrap();
    let formats: Vec<&str> = wml(doc.root(), "numFmt").into_iter().filter_map(val).collect();
    assert_eq!(
        formats,
        ["bullet", "bullet", "bullet", "decimal", "lowerLetter", "lowerRoman"]
    );
    let texts: Vec<&str> = wml(doc.root(), "lvlText").into_iter().filter_map(val).collect();
    assert_eq!(texts[0], "\u{2022}");
    assert_eq!(texts[3], "%1.");
}

#[test]
fn links_use_hyperlink_style() {
    let docx = render(r#"<p><a href="https://example.com">site</a></p>"#);
    let xml = read_part(&docx, "word/document.xml");
    assert!(xml.contains(r#"<w:rStyle w:val="Hyperlink"/>"#));
    let styles = read_part(&docx, "word/styles.xml");
    assert!(styles.contains(r#"w:styleId="Hyperlink""#));
}

#[test]
fn empty_document_is_valid() {
    let docx = render_docx(&[]).expect("render failed");
    let xml = read_part(&docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).unwrap();
    assert!(wml(doc.root(), "p").is_empty());
    assert_eq!(wml(doc.root(), "sectPr").len(), 1);
}
