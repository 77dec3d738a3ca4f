use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use flashdoc::{Error, OutputFormat, PageSetup, Selection};

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pdf,
    Docx,
    Label,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Pdf => OutputFormat::Pdf,
            Format::Docx => OutputFormat::Docx,
            Format::Label => OutputFormat::Label,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Page {
    A4,
    Letter,
}

#[derive(Parser)]
#[command(name = "flashdoc", about = "Save a rich-text selection as PDF, DOCX or a label")]
struct Args {
    /// Output format
    #[arg(value_enum)]
    format: Format,
    /// HTML of the selection
    #[arg(long)]
    html: Option<PathBuf>,
    /// Plain text of the selection (used when there is no HTML, and for labels)
    #[arg(long)]
    text: Option<PathBuf>,
    /// Output file (defaults to the input with the format's extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Page size for PDF output
    #[arg(long, value_enum, default_value = "a4")]
    page: Page,
    /// Proportional font family to embed instead of Helvetica
    #[arg(long)]
    font: Option<String>,
    /// Monospace font family to embed instead of Courier
    #[arg(long)]
    mono_font: Option<String>,
    /// Print the parsed blocks instead of writing a file
    #[arg(long)]
    dump_blocks: bool,
}

fn read_input(path: Option<&Path>) -> Result<String, Error> {
    let Some(path) = path else {
        return Ok(String::new());
    };
    if !path.is_file() {
        return Err(Error::InvalidInput(format!(
            "file not found: {}",
            path.display()
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn fail(e: Error) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.html.is_none() && args.text.is_none() {
        fail(Error::InvalidInput("provide --html and/or --text".into()));
    }

    let selection = Selection {
        html: read_input(args.html.as_deref()).unwrap_or_else(|e| fail(e)),
        text: read_input(args.text.as_deref()).unwrap_or_else(|e| fail(e)),
    };

    if args.dump_blocks {
        for block in flashdoc::blocks_from_selection(&selection.html, &selection.text) {
            println!("{block:#?}");
        }
        return;
    }

    let format = OutputFormat::from(args.format);
    let mut setup = match args.page {
        Page::A4 => PageSetup::a4(),
        Page::Letter => PageSetup::letter(),
    };
    setup.body_font = args.font;
    setup.mono_font = args.mono_font;

    let output = args.output.unwrap_or_else(|| {
        let input = args.html.as_ref().or(args.text.as_ref());
        input
            .map(|p| p.with_extension(format.extension()))
            .unwrap_or_else(|| PathBuf::from(format!("selection.{}", format.extension())))
    });

    let result = flashdoc::convert(&selection, format, &setup)
        .and_then(|bytes| std::fs::write(&output, bytes).map_err(Error::Io));
    match result {
        Ok(()) => log::info!("wrote {}", output.display()),
        Err(e) => fail(e),
    }
}
