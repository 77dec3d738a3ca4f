//! WordprocessingML output. Each block becomes one `w:p`; list numbering is left to the
//! word processor through the definitions in `word/numbering.xml`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Error;
use crate::model::{Block, ListType, TextRun, collapse_whitespace};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const BODY_FONT: &str = "Calibri";
const CODE_FONT: &str = "Courier New";
/// Half-points.
const BODY_SIZE: u32 = 22;
const HEADING_SIZES: [u32; 6] = [36, 32, 28, 24, 22, 20];

/// Deepest level (zero-based) the numbering definitions declare.
pub const MAX_LIST_LEVEL: usize = 2;

struct LevelDef {
    num_fmt: &'static str,
    lvl_text: &'static str,
    indent_left: u32, // twips
    indent_hanging: u32,
}

const fn level_def(num_fmt: &'static str, lvl_text: &'static str, indent_left: u32) -> LevelDef {
    LevelDef {
        num_fmt,
        lvl_text,
        indent_left,
        indent_hanging: 360,
    }
}

pub struct NumberingDefinition {
    pub reference: &'static str,
    pub abstract_id: u32,
    levels: [LevelDef; MAX_LIST_LEVEL + 1],
}

static BULLET_LIST: NumberingDefinition = NumberingDefinition {
    reference: "bullet-list",
    abstract_id: 0,
    levels: [
        level_def("bullet", "\u{2022}", 720),
        level_def("bullet", "\u{25CB}", 1440),
        level_def("bullet", "\u{25AA}", 2160),
    ],
};

static ORDERED_LIST: NumberingDefinition = NumberingDefinition {
    reference: "ordered-list",
    abstract_id: 1,
    levels: [
        level_def("decimal", "%1.", 720),
        level_def("lowerLetter", "%2)", 1440),
        level_def("lowerRoman", "%3.", 2160),
    ],
};

pub fn numbering_definition(list_type: ListType) -> &'static NumberingDefinition {
    match list_type {
        ListType::Bullet => &BULLET_LIST,
        ListType::Ordered => &ORDERED_LIST,
    }
}

/// Definition reference and clamped level a list item is rendered with.
pub fn numbering_reference(list_type: ListType, nesting_level: usize) -> (&'static str, usize) {
    (
        numbering_definition(list_type).reference,
        nesting_level.min(MAX_LIST_LEVEL),
    )
}

/// Text safe for XML 1.0 character data.
fn xml_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .collect();
    html_escape::encode_text(&cleaned).into_owned()
}

fn xml_attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

/// A `w:num` instance per list started in the document. All instances of one list type
/// share the abstract definition; the separate instance makes the word processor restart
/// counting at 1.
#[derive(Default)]
struct NumInstances {
    instances: Vec<&'static NumberingDefinition>,
    active: HashMap<(ListType, usize), u32>,
}

impl NumInstances {
    fn num_id(&mut self, list_type: ListType, level: usize, item_index: usize) -> u32 {
        if item_index == 0 {
            self.active.retain(|&(_, l), _| l < level);
        }
        if let Some(&id) = self.active.get(&(list_type, level)) {
            return id;
        }
        self.instances.push(numbering_definition(list_type));
        let id = self.instances.len() as u32;
        self.active.insert((list_type, level), id);
        id
    }

    fn close_lists(&mut self) {
        self.active.clear();
    }
}

#[derive(Default)]
pub struct StyledDocumentRenderer {
    nums: NumInstances,
}

impl StyledDocumentRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(mut self, blocks: &[Block]) -> Result<Vec<u8>, Error> {
        let mut body = String::new();
        for block in blocks {
            self.write_paragraph(&mut body, block);
        }
        let document = document_xml(&body);
        let styles = styles_xml();
        let numbering = self.numbering_xml();
        log::debug!(
            "docx: {} paragraphs, {} list instance(s)",
            blocks.len(),
            self.nums.instances.len()
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        let parts: [(&str, &str); 6] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML),
            ("_rels/.rels", RELS_XML),
            ("word/document.xml", document.as_str()),
            ("word/_rels/document.xml.rels", WORD_RELS_XML),
            ("word/styles.xml", styles.as_str()),
            ("word/numbering.xml", numbering.as_str()),
        ];
        for (name, xml) in parts {
            zip.start_file(name, opt)?;
            zip.write_all(xml.as_bytes())?;
        }
        Ok(zip.finish()?.into_inner())
    }

    fn write_paragraph(&mut self, out: &mut String, block: &Block) {
        let (size, spacing_before, spacing_after, force_bold) = match block {
            Block::Heading { level, .. } => {
                let size = HEADING_SIZES
                    .get(usize::from(*level).saturating_sub(1))
                    .copied()
                    .unwrap_or(28);
                (size, 240, 120, true)
            }
            Block::ListItem { .. } => (BODY_SIZE, 0, 80, false),
            Block::Paragraph { .. } => (BODY_SIZE, 0, 120, false),
        };

        out.push_str("<w:p><w:pPr>");
        match *block {
            Block::Heading { level, .. } => {
                let _ = write!(out, r#"<w:pStyle w:val="Heading{level}"/>"#);
                self.nums.close_lists();
            }
            Block::ListItem {
                list_type,
                nesting_level,
                item_index,
                ..
            } => {
                let (_, level) = numbering_reference(list_type, nesting_level);
                let num_id = self.nums.num_id(list_type, level, item_index);
                let _ = write!(
                    out,
                    r#"<w:numPr><w:ilvl w:val="{level}"/><w:numId w:val="{num_id}"/></w:numPr>"#
                );
            }
            Block::Paragraph { .. } => self.nums.close_lists(),
        }
        let _ = write!(
            out,
            r#"<w:spacing w:before="{spacing_before}" w:after="{spacing_after}"/></w:pPr>"#
        );

        for run in block.runs() {
            write_run(out, run, size, force_bold);
        }
        out.push_str("</w:p>");
    }

    fn numbering_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, r#"<w:numbering xmlns:w="{WML_NS}">"#);
        for def in [&BULLET_LIST, &ORDERED_LIST] {
            let _ = write!(
                xml,
                r#"<w:abstractNum w:abstractNumId="{}"><w:multiLevelType w:val="hybridMultilevel"/>"#,
                def.abstract_id
            );
            for (ilvl, lvl) in def.levels.iter().enumerate() {
                let _ = write!(
                    xml,
                    concat!(
                        r#"<w:lvl w:ilvl="{}"><w:start w:val="1"/><w:numFmt w:val="{}"/>"#,
                        r#"<w:lvlText w:val="{}"/><w:lvlJc w:val="left"/>"#,
                        r#"<w:pPr><w:ind w:left="{}" w:hanging="{}"/></w:pPr></w:lvl>"#
                    ),
                    ilvl,
                    lvl.num_fmt,
                    xml_attr(lvl.lvl_text),
                    lvl.indent_left,
                    lvl.indent_hanging
                );
            }
            xml.push_str("</w:abstractNum>");
        }
        for (i, def) in self.nums.instances.iter().enumerate() {
            let _ = write!(
                xml,
                r#"<w:num w:numId="{}"><w:abstractNumId w:val="{}"/>"#,
                i + 1,
                def.abstract_id
            );
            for ilvl in 0..=MAX_LIST_LEVEL {
                let _ = write!(
                    xml,
                    r#"<w:lvlOverride w:ilvl="{ilvl}"><w:startOverride w:val="1"/></w:lvlOverride>"#
                );
            }
            xml.push_str("</w:num>");
        }
        xml.push_str("</w:numbering>");
        xml
    }
}

fn write_run(out: &mut String, run: &TextRun, size: u32, force_bold: bool) {
    if run.is_line_break() {
        out.push_str("<w:r><w:br/></w:r>");
        return;
    }
    let style = run.style;
    out.push_str("<w:r><w:rPr>");
    if run.href.is_some() {
        out.push_str(r#"<w:rStyle w:val="Hyperlink"/>"#);
    }
    if style.code {
        let _ = write!(
            out,
            r#"<w:rFonts w:ascii="{CODE_FONT}" w:hAnsi="{CODE_FONT}" w:cs="{CODE_FONT}"/>"#
        );
    }
    if style.bold || force_bold {
        out.push_str("<w:b/>");
    }
    if style.italic {
        out.push_str("<w:i/>");
    }
    if style.strikethrough {
        out.push_str("<w:strike/>");
    }
    let _ = write!(out, r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/>"#);
    if style.underline {
        out.push_str(r#"<w:u w:val="single"/>"#);
    }
    if style.superscript {
        out.push_str(r#"<w:vertAlign w:val="superscript"/>"#);
    } else if style.subscript {
        out.push_str(r#"<w:vertAlign w:val="subscript"/>"#);
    }
    let _ = write!(
        out,
        r#"</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        xml_text(&collapse_whitespace(&run.text))
    );
}

fn document_xml(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="{wml}" xmlns:r="{rel}"><w:body>{body}"#,
            r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/>"#,
            r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>"#,
            r#"</w:sectPr></w:body></w:document>"#
        ),
        wml = WML_NS,
        rel = REL_NS,
        body = body
    )
}

fn styles_xml() -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    let _ = write!(
        xml,
        concat!(
            r#"<w:styles xmlns:w="{wml}"><w:docDefaults><w:rPrDefault><w:rPr>"#,
            r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#,
            r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:rPrDefault>"#,
            r#"<w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults>"#,
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#
        ),
        wml = WML_NS,
        font = BODY_FONT,
        size = BODY_SIZE
    );
    for (i, size) in HEADING_SIZES.iter().enumerate() {
        let level = i + 1;
        let _ = write!(
            xml,
            concat!(
                r#"<w:style w:type="paragraph" w:styleId="Heading{level}">"#,
                r#"<w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>"#,
                r#"<w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="{outline}"/></w:pPr>"#,
                r#"<w:rPr><w:b/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:style>"#
            ),
            level = level,
            outline = i,
            size = size
        );
    }
    xml.push_str(concat!(
        r#"<w:style w:type="character" w:styleId="Hyperlink"><w:name w:val="Hyperlink"/>"#,
        r#"<w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr></w:style>"#,
        r#"</w:styles>"#
    ));
    xml
}

const CONTENT_TYPES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    r#"<Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>"#,
    r#"</Types>"#
);

const RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

const WORD_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>"#,
    r#"</Relationships>"#
);

pub fn render(blocks: &[Block]) -> Result<Vec<u8>, Error> {
    StyledDocumentRenderer::new().render(blocks)
}
