//! pdfalt CLI - list the alt text attributed to images in a PDF

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfalt::parser::PdfBackend;
use pdfalt::resolve::StructureTreeWalker;
use pdfalt::{AltTextDocument, FallbackMode, JsonFormat, PageSelection, ParseOptions};

#[derive(Parser)]
#[command(name = "pdfalt")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Attribute accessibility alt text to images in PDF files", long_about = None)]
struct Cli {
    /// Input PDF file (same as `pdfalt scan FILE`)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve alt text for the images on each page
    Scan {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-5", "1,3,5")
        #[arg(short, long)]
        pages: Option<String>,

        /// Ordering used to pair leftover images with leftover figures
        #[arg(long, value_enum, default_value = "spatial", env = "PDFALT_FALLBACK")]
        fallback: Fallback,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        /// Compact JSON (no pretty printing)
        #[arg(long, requires = "json")]
        compact: bool,

        /// Fail on unreadable pages instead of treating them as untagged
        #[arg(long)]
        strict: bool,
    },

    /// Show document and tagging information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Fallback {
    /// Reading order: top to bottom, left to right
    Spatial,
    /// Paint order in the content stream
    Draw,
}

impl From<Fallback> for FallbackMode {
    fn from(fallback: Fallback) -> Self {
        match fallback {
            Fallback::Spatial => FallbackMode::Spatial,
            Fallback::Draw => FallbackMode::Draw,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Scan {
            input,
            output,
            pages,
            fallback,
            json,
            compact,
            strict,
        }) => {
            let format = match (json, compact) {
                (false, _) => None,
                (true, false) => Some(JsonFormat::Pretty),
                (true, true) => Some(JsonFormat::Compact),
            };
            cmd_scan(
                &input,
                output.as_deref(),
                pages.as_deref(),
                fallback.into(),
                format,
                strict,
            )
        }
        Some(Commands::Info { input, json }) => cmd_info(&input, json),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            if let Some(input) = cli.input {
                cmd_scan(&input, None, None, FallbackMode::default(), None, false)
            } else {
                println!("{}", "Usage: pdfalt <FILE>".yellow());
                println!("       pdfalt --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_scan(
    input: &Path,
    output: Option<&Path>,
    pages: Option<&str>,
    fallback: FallbackMode,
    format: Option<JsonFormat>,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let selection = match pages {
        Some(p) => PageSelection::parse(p)?,
        None => PageSelection::All,
    };

    let mut options = ParseOptions::new()
        .with_pages(selection.clone())
        .with_fallback_mode(fallback);
    if strict {
        options = options.strict();
    }

    let doc = AltTextDocument::open_with_options(input, options)?;
    let selected = doc
        .backend()
        .pages()
        .into_keys()
        .filter(|n| selection.includes(*n))
        .count();

    let pb = if selected > 1 {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Resolving {} pages...", selected));
        pb
    } else {
        ProgressBar::hidden()
    };

    let results = doc.resolve_all()?;
    let found: usize = results.iter().map(|p| p.results.len()).sum();
    pb.finish_and_clear();
    log::info!("{} images with alt text across {} pages", found, results.len());

    let rendered = match format {
        Some(format) => pdfalt::render::to_json(&results, format)?,
        None => pdfalt::render::to_text(&results)?,
    };

    if let Some(path) = output {
        fs::write(path, &rendered)?;
        println!(
            "{} {} ({} images with alt text)",
            "Saved to".green(),
            path.display(),
            found
        );
    } else {
        println!("{}", rendered);
    }

    Ok(())
}

fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let doc = AltTextDocument::open(input)?;

    let mut figures = Vec::new();
    for number in doc.backend().pages().into_keys() {
        let counts = match doc.structure_tree(number) {
            Ok(Some(tree)) => {
                let walk = StructureTreeWalker::walk(&tree);
                let described = walk.direct.len() + walk.slots.iter().flatten().count();
                (walk.direct.len() + walk.slots.len(), described)
            }
            Ok(None) => (0, 0),
            Err(e) => {
                log::warn!("Could not read structure of page {}: {}", number, e);
                (0, 0)
            }
        };
        figures.push((number, counts));
    }
    let total: usize = figures.iter().map(|(_, (count, _))| count).sum();
    let described: usize = figures.iter().map(|(_, (_, with_alt))| with_alt).sum();

    if json {
        let value = serde_json::json!({
            "file": input.display().to_string(),
            "version": doc.version(),
            "pages": doc.page_count(),
            "encrypted": doc.is_encrypted(),
            "tagged": doc.is_tagged(),
            "figures": total,
            "figures_with_alt": described,
            "figures_per_page": figures
                .iter()
                .map(|(page, (count, with_alt))| {
                    serde_json::json!({ "page": page, "figures": count, "with_alt": with_alt })
                })
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), doc.version());
    println!("{}: {}", "Pages".bold(), doc.page_count());
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if doc.is_encrypted() { "Yes" } else { "No" }
    );
    println!(
        "{}: {}",
        "Tagged".bold(),
        if doc.is_tagged() {
            "Yes".green()
        } else {
            "No".yellow()
        }
    );

    println!();
    println!("{}", "Figures".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Total".bold(), total);
    println!("{}: {}", "With alt text".bold(), described);
    for (page, (count, with_alt)) in figures.iter().filter(|(_, (count, _))| *count > 0) {
        println!(
            "  {} page {}: {} ({} with alt text)",
            "├─".dimmed(),
            page,
            count,
            with_alt
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfalt".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Alt text attribution for PDF images");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdfalt".dimmed());
    println!("License: MIT");
}
