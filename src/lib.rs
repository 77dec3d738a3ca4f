pub mod blocks;
pub mod config;
pub mod docx;
pub mod entities;
mod error;
mod fonts;
pub mod label;
pub mod model;
pub mod numbering;
pub mod pdf;
pub mod tokenizer;

pub use config::PageSetup;
pub use error::Error;
pub use model::{Block, ListType, StyleFlags, TextRun};

/// What the browser hands over for one save: the selection's HTML (may be empty) and its
/// plain-text rendering.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub html: String,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Pdf,
    Docx,
    Label,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf | OutputFormat::Label => "pdf",
            OutputFormat::Docx => "docx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Pdf | OutputFormat::Label => "application/pdf",
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "docx" => Ok(OutputFormat::Docx),
            "label" => Ok(OutputFormat::Label),
            other => Err(Error::InvalidInput(format!("unknown output format: {other}"))),
        }
    }
}

pub fn parse_html(html: &str) -> Vec<Block> {
    let tokens = tokenizer::tokenize(html);
    let blocks = blocks::build(&tokens);
    log::debug!("{} tokens -> {} blocks", tokens.len(), blocks.len());
    blocks
}

/// Blocks for a selection: the HTML when there is any, otherwise blank-line separated
/// paragraphs of the plain text.
pub fn blocks_from_selection(html: &str, text: &str) -> Vec<Block> {
    if html.trim().is_empty() {
        log::debug!("no HTML in selection, using plain-text paragraphs");
        return blocks::from_plain_text(text);
    }
    parse_html(html)
}

pub fn render_pdf(blocks: &[Block], setup: &PageSetup) -> Result<Vec<u8>, Error> {
    pdf::render(blocks, setup)
}

pub fn render_docx(blocks: &[Block]) -> Result<Vec<u8>, Error> {
    docx::render(blocks)
}

pub fn render_label(text: &str) -> Result<Vec<u8>, Error> {
    label::render(text)
}

pub fn convert(
    selection: &Selection,
    format: OutputFormat,
    setup: &PageSetup,
) -> Result<Vec<u8>, Error> {
    match format {
        OutputFormat::Label => render_label(&selection.text),
        OutputFormat::Pdf => {
            let blocks = blocks_from_selection(&selection.html, &selection.text);
            render_pdf(&blocks, setup)
        }
        OutputFormat::Docx => {
            let blocks = blocks_from_selection(&selection.html, &selection.text);
            render_docx(&blocks)
        }
    }
}
