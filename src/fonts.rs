use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::error::Error;
use crate::model::StyleFlags;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Family {
    Proportional,
    Monospace,
}

/// One of the eight faces a run can select: two families times four style combinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct FontFace {
    pub(crate) family: Family,
    pub(crate) bold: bool,
    pub(crate) italic: bool,
}

impl FontFace {
    pub(crate) const REGULAR: FontFace = FontFace {
        family: Family::Proportional,
        bold: false,
        italic: false,
    };

    pub(crate) fn for_style(style: &StyleFlags) -> Self {
        FontFace {
            family: if style.code { Family::Monospace } else { Family::Proportional },
            bold: style.bold,
            italic: style.italic,
        }
    }

    fn standard_name(&self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (Family::Proportional, false, false) => "Helvetica",
            (Family::Proportional, true, false) => "Helvetica-Bold",
            (Family::Proportional, false, true) => "Helvetica-Oblique",
            (Family::Proportional, true, true) => "Helvetica-BoldOblique",
            (Family::Monospace, false, false) => "Courier",
            (Family::Monospace, true, false) => "Courier-Bold",
            (Family::Monospace, false, true) => "Courier-Oblique",
            (Family::Monospace, true, true) => "Courier-BoldOblique",
        }
    }
}

pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    widths_1000: Vec<f32>,
}

impl FontEntry {
    /// Advance width in points of `text` at `size`, measured over its WinAnsi encoding.
    pub(crate) fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: f32 = to_winansi_bytes(text)
            .iter()
            .filter(|&&b| b >= 32)
            .map(|&b| self.widths_1000.get((b - 32) as usize).copied().unwrap_or(0.0))
            .sum();
        units / 1000.0 * size
    }
}

/// (lowercase family name, bold, italic) -> (file path, face index within TTC)
type FontLookup = HashMap<(String, bool, bool), (PathBuf, u32)>;

static FONT_INDEX: OnceLock<FontLookup> = OnceLock::new();

fn font_family_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode())
        .find_map(|name| name.to_string())
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    if let Ok(val) = std::env::var("FLASHDOC_FONTS") {
        let sep = if cfg!(windows) { ';' } else { ':' };
        dirs.extend(
            val.split(sep)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(PathBuf::from),
        );
    }

    #[cfg(target_os = "macos")]
    dirs.extend([
        "/Library/Fonts".into(),
        "/System/Library/Fonts".into(),
        "/System/Library/Fonts/Supplemental".into(),
    ]);

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    dirs.push(
        std::env::var("WINDIR")
            .map(|windir| PathBuf::from(windir).join("Fonts"))
            .unwrap_or_else(|_| "C:\\Windows\\Fonts".into()),
    );

    dirs
}

fn scan_font_dirs() -> FontLookup {
    let mut index = FontLookup::new();
    let mut stack = font_directories();
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for path in entries.flatten().map(|e| e.path()) {
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let is_collection = match path.extension().and_then(|e| e.to_str()) {
                Some("ttf" | "otf" | "TTF" | "OTF") => false,
                Some("ttc" | "TTC") => true,
                _ => continue,
            };
            let Ok(data) = std::fs::read(&path) else {
                continue;
            };
            let face_count = if is_collection {
                ttf_parser::fonts_in_collection(&data).unwrap_or(1)
            } else {
                1
            };
            for face_idx in 0..face_count {
                let Ok(face) = Face::parse(&data, face_idx) else {
                    continue;
                };
                if let Some(family) = font_family_name(&face) {
                    index
                        .entry((family.to_lowercase(), face.is_bold(), face.is_italic()))
                        .or_insert((path.clone(), face_idx));
                }
            }
        }
    }
    log::debug!("indexed {} font faces", index.len());
    index
}

/// Exact style match first, then the family's regular face.
fn find_font_file(family: &str, bold: bool, italic: bool) -> Option<(PathBuf, u32)> {
    let index = FONT_INDEX.get_or_init(scan_font_dirs);
    let key = family.to_lowercase();
    index
        .get(&(key.clone(), bold, italic))
        .or_else(|| index.get(&(key, false, false)))
        .cloned()
}

/// Windows-1252 byte to Unicode for 0x80..=0x9F; other bytes map to the same code point.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

fn char_to_winansi(c: char) -> Option<u8> {
    match c as u32 {
        0x0000..=0x007F | 0x00A0..=0x00FF => Some(c as u8),
        _ => (0x80u8..=0x9F).find(|&b| winansi_to_char(b) == c && b as u32 != c as u32),
    }
}

/// Encode for a WinAnsi `Str`. Typographic spaces become plain spaces; anything else
/// outside the code page is dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match c {
            '\u{2002}' | '\u{2003}' | '\u{2009}' => Some(b' '),
            '\u{2212}' => Some(b'-'),
            _ => char_to_winansi(c),
        })
        .collect()
}

pub(crate) fn has_unencodable(s: &str) -> bool {
    to_winansi_bytes(s).len() != s.chars().count()
}

/// Helvetica and Helvetica-Oblique advance widths (AFM, 1000 units/em) for WinAnsi
/// bytes 32..=255. Undefined code points are 0.
const HELVETICA_WIDTHS: [u16; 224] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// Helvetica-Bold and Helvetica-BoldOblique widths, same layout.
const HELVETICA_BOLD_WIDTHS: [u16; 224] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 0,
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

fn helvetica_widths(bold: bool) -> Vec<f32> {
    let table = if bold { &HELVETICA_BOLD_WIDTHS } else { &HELVETICA_WIDTHS };
    table.iter().map(|&w| f32::from(w)).collect()
}

fn courier_widths() -> Vec<f32> {
    vec![600.0; 224]
}

/// Embed a TrueType/OpenType program and return its WinAnsi widths.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    alloc: &mut impl FnMut() -> Ref,
    ps_name: &str,
    font_data: &[u8],
    face_index: u32,
) -> Result<Vec<f32>, Error> {
    let face = Face::parse(font_data, face_index)
        .map_err(|e| Error::Font(format!("{ps_name}: {e}")))?;
    let data_len = i32::try_from(font_data.len())
        .map_err(|_| Error::Font(format!("{ps_name}: font program too large")))?;

    let units = face.units_per_em() as f32;
    let scale = |v: f32| v / units * 1000.0;
    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        scale(bb.x_min as f32),
        scale(bb.y_min as f32),
        scale(bb.x_max as f32),
        scale(bb.y_max as f32),
    );

    let widths: Vec<f32> = (32u8..=255u8)
        .map(|byte| {
            face.glyph_index(winansi_to_char(byte))
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map(|adv| scale(adv as f32))
                .unwrap_or(0.0)
        })
        .collect();

    let descriptor_ref = alloc();
    let data_ref = alloc();

    pdf.stream(data_ref, font_data)
        .pair(Name(b"Length1"), data_len);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(if face.is_italic() { -12.0 } else { 0.0 })
        .ascent(scale(face.ascender() as f32))
        .descent(scale(face.descender() as f32))
        .cap_height(face.capital_height().map(|h| scale(h as f32)).unwrap_or(700.0))
        .stem_v(if face.is_bold() { 140.0 } else { 80.0 })
        .font_file2(data_ref);

    {
        let mut dict = pdf.indirect(font_ref).dict();
        dict.pair(Name(b"Type"), Name(b"Font"));
        dict.pair(Name(b"Subtype"), Name(b"TrueType"));
        dict.pair(Name(b"BaseFont"), Name(ps_name.as_bytes()));
        dict.pair(Name(b"Encoding"), Name(b"WinAnsiEncoding"));
        dict.pair(Name(b"FirstChar"), 32i32);
        dict.pair(Name(b"LastChar"), 255i32);
        dict.pair(Name(b"FontDescriptor"), descriptor_ref);
        dict.insert(Name(b"Widths"))
            .array()
            .items(widths.iter().copied());
    }

    Ok(widths)
}

fn register_standard(pdf: &mut Pdf, font_ref: Ref, face: FontFace) -> Vec<f32> {
    pdf.type1_font(font_ref)
        .base_font(Name(face.standard_name().as_bytes()))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    match face.family {
        Family::Proportional => helvetica_widths(face.bold),
        Family::Monospace => courier_widths(),
    }
}

/// Faces used by one document, registered into the PDF on first use.
pub(crate) struct FontSet {
    body_family: Option<String>,
    mono_family: Option<String>,
    entries: HashMap<FontFace, FontEntry>,
    order: Vec<FontFace>,
}

impl FontSet {
    pub(crate) fn new(body_family: Option<String>, mono_family: Option<String>) -> Self {
        FontSet {
            body_family,
            mono_family,
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub(crate) fn get(
        &mut self,
        pdf: &mut Pdf,
        face: FontFace,
        alloc: &mut impl FnMut() -> Ref,
    ) -> Result<&FontEntry, Error> {
        if !self.entries.contains_key(&face) {
            let entry = self.register(pdf, face, alloc)?;
            self.entries.insert(face, entry);
            self.order.push(face);
        }
        Ok(&self.entries[&face])
    }

    fn register(
        &self,
        pdf: &mut Pdf,
        face: FontFace,
        alloc: &mut impl FnMut() -> Ref,
    ) -> Result<FontEntry, Error> {
        let font_ref = alloc();
        let pdf_name = format!("F{}", self.order.len() + 1);
        let configured = match face.family {
            Family::Proportional => self.body_family.as_deref(),
            Family::Monospace => self.mono_family.as_deref(),
        };

        let located = configured.and_then(|family| {
            let found = find_font_file(family, face.bold, face.italic);
            if found.is_none() {
                log::warn!(
                    "Font not found: {family} bold={} italic={} - using {}",
                    face.bold,
                    face.italic,
                    face.standard_name()
                );
            }
            found.map(|(path, index)| (family, path, index))
        });

        let widths_1000 = match located {
            Some((family, path, face_index)) => {
                let data = std::fs::read(&path)?;
                let ps_name = match (face.bold, face.italic) {
                    (true, true) => format!("{}-BoldItalic", family.replace(' ', "")),
                    (true, false) => format!("{}-Bold", family.replace(' ', "")),
                    (false, true) => format!("{}-Italic", family.replace(' ', "")),
                    (false, false) => family.replace(' ', ""),
                };
                embed_truetype(pdf, font_ref, alloc, &ps_name, &data, face_index)?
            }
            None => register_standard(pdf, font_ref, face),
        };

        Ok(FontEntry {
            pdf_name,
            font_ref,
            widths_1000,
        })
    }

    /// Registered faces in registration order, for the page resource dictionaries.
    pub(crate) fn entries(&self) -> impl Iterator<Item = &FontEntry> {
        self.order.iter().map(|face| &self.entries[face])
    }
}
