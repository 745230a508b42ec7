//! CLI tool for exporting PDF highlights

use clap::Parser;
use pdf_highlights::export::save;
use pdf_highlights::{extract_highlights, OutputFormat};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-highlights",
    version,
    about = "Extract highlighted text from PDF files",
    after_help = "Examples:\n  pdf-highlights document.pdf -f md\n  pdf-highlights document.pdf -f txt -o my_highlights.txt\n  pdf-highlights document.pdf -f docx"
)]
struct Cli {
    /// Path to the PDF file
    pdf: PathBuf,

    /// Output format: md (markdown), txt (plain text), or docx (Word document)
    #[arg(
        short,
        long,
        default_value = "md",
        value_parser = clap::builder::PossibleValuesParser::new(["md", "txt", "docx"])
    )]
    format: String,

    /// Output file path. Defaults to the PDF name with a `_highlights` suffix
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// `{stem}_highlights.{ext}` in the working directory
fn default_output_path(pdf: &Path, format: OutputFormat) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    PathBuf::from(format!("{}_highlights.{}", stem, format.extension()))
}

/// Warning for inputs without a `.pdf` extension
fn extension_warning(pdf: &Path) -> Option<&'static str> {
    let is_pdf = pdf
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    (!is_pdf).then_some("Warning: File does not have .pdf extension")
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let format: OutputFormat = match cli.format.parse() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if !cli.pdf.exists() {
        eprintln!("Error: File not found: {}", cli.pdf.display());
        process::exit(1);
    }

    if let Some(warning) = extension_warning(&cli.pdf) {
        println!("{}", warning);
    }

    if !format.is_available() {
        eprintln!(
            "Error: {} output requires the `docx` feature; rebuild with `--features docx`",
            format
        );
        process::exit(1);
    }

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.pdf, format));

    let pdf_name = cli
        .pdf
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| cli.pdf.display().to_string());

    println!("Extracting highlights from: {}", pdf_name);

    let highlights = match extract_highlights(&cli.pdf) {
        Ok(highlights) => highlights,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if highlights.is_empty() {
        println!("No highlights found in the PDF.");
        return;
    }

    println!("Found {} highlight(s)", highlights.len());

    if let Err(e) = save(&highlights, &pdf_name, format, &output_path) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    println!("Highlights saved to: {}", output_path.display());
}
