//! Docsuite CLI tool
//!
//! Runs the HTTP service, or performs the same document operations on local files.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docsuite::config::AppConfig;
use docsuite::convert::{convert_bytes, SofficeConverter, TargetFormat};
use docsuite::pdf::{
    compress_pdf, extract_metadata, merge_pdfs, split_pdf, watermark_pdf, CompressionLevel,
    ImageWatermark, MergeOptions, WatermarkSpec,
};
use docsuite::server::{self, AppState};
use docsuite::storage::Workspace;

/// Docsuite - Merge, split, compress, watermark and convert documents
#[derive(Parser)]
#[command(name = "docsuite")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Start the HTTP service on port 8080
    docsuite serve --port 8080

    # Merge numbered PDFs in order
    docsuite merge -o handout.pdf \"[0-9]*.pdf\"

    # Keep pages 1 to 3 and 7
    docsuite split report.pdf --pages 1-3,7 -o excerpt.pdf

    # Stamp a diagonal DRAFT watermark and open the result
    docsuite watermark report.pdf --text DRAFT -o draft.pdf --open

    # Convert a Word document to PDF (needs LibreOffice)
    docsuite convert letter.docx -o letter.pdf")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Host address to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Merge multiple PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Keep only the selected pages of a PDF
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Page selection, e.g. "1-3,7"
        #[arg(long)]
        pages: String,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Stamp a text and/or image watermark on every page
    Watermark {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Watermark text, drawn diagonally across the page
        #[arg(long)]
        text: Option<String>,

        /// PNG or JPEG drawn centered on the page
        #[arg(long)]
        image: Option<PathBuf>,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Reduce the size of a PDF
    Compress {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// low, moderate or high
        #[arg(long, default_value = "moderate")]
        level: String,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Convert .docx to PDF or PDF to .docx through LibreOffice
    Convert {
        /// Input .docx or .pdf file; the extension picks the direction
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")
        .and_then(|config| run(cli.command, config));

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Serve { host, port } => cmd_serve(config, host, port),
        Commands::Merge { inputs, output, open } => cmd_merge(inputs, output, open),
        Commands::Split { input, pages, output, open } => cmd_split(&config, input, &pages, output, open),
        Commands::Watermark { input, output, text, image, open } => {
            cmd_watermark(&config, input, output, text, image, open)
        }
        Commands::Compress { input, output, level, open } => cmd_compress(input, output, &level, open),
        Commands::Convert { input, output, open } => cmd_convert(&config, input, output, open),
        Commands::Info { input } => cmd_info(input),
        Commands::Config => {
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            // Sort within a pattern; argument order is kept across patterns
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

fn read_input(input: &Path) -> Result<Vec<u8>> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }
    std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn write_output(output: &Path, bytes: &[u8], open: bool) -> Result<()> {
    std::fs::write(output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    eprintln!("Output: {}", output.display());

    if open {
        open_file(output)?;
    }
    Ok(())
}

/// Run the HTTP service
fn cmd_serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = AppState::from_config(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(state))?;

    Ok(())
}

/// Merge multiple PDFs into one
fn cmd_merge(inputs: Vec<String>, output: PathBuf, open: bool) -> Result<()> {
    // Expand glob patterns
    let inputs = expand_globs(inputs)?;

    // Validate inputs exist
    for path in &inputs {
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
    }

    eprintln!("Merging {} PDF files...", inputs.len());

    let options = MergeOptions {
        input_paths: inputs,
        output_path: output.clone(),
    };

    merge_pdfs(&options)?;

    eprintln!("Merged to: {}", output.display());

    if open {
        open_file(&output)?;
    }

    Ok(())
}

/// Keep the selected pages
fn cmd_split(config: &AppConfig, input: PathBuf, pages: &str, output: PathBuf, open: bool) -> Result<()> {
    let bytes = read_input(&input)?;

    let result = split_pdf(&bytes, pages, config.split.options())?;
    eprintln!("Kept {} pages: {:?}", result.pages.len(), result.pages);

    write_output(&output, &result.bytes, open)
}

/// Stamp a watermark
fn cmd_watermark(
    config: &AppConfig,
    input: PathBuf,
    output: PathBuf,
    text: Option<String>,
    image: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let bytes = read_input(&input)?;

    let image = match image {
        Some(path) => Some(ImageWatermark {
            bytes: read_input(&path)?,
            content_type: image_content_type(&path).map(str::to_string),
        }),
        None => None,
    };

    let spec = WatermarkSpec::from_parts(text, image);
    if spec.is_blank() {
        eprintln!("Warning: no watermark text or image given");
    }

    eprintln!("Adding watermark...");
    let watermarked = watermark_pdf(&bytes, &spec, &config.watermark)?;

    write_output(&output, &watermarked, open)
}

/// MIME type guessed from a file extension
fn image_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Compress a PDF
fn cmd_compress(input: PathBuf, output: PathBuf, level: &str, open: bool) -> Result<()> {
    let level: CompressionLevel = level.parse()?;
    let bytes = read_input(&input)?;

    let result = compress_pdf(&bytes, level)?;
    eprintln!(
        "Compressed ({}): {} -> {} bytes",
        level, result.original_size, result.compressed_size
    );

    write_output(&output, &result.bytes, open)
}

/// Convert between Word and PDF
fn cmd_convert(config: &AppConfig, input: PathBuf, output: PathBuf, open: bool) -> Result<()> {
    let Some(target) = TargetFormat::for_input(&input) else {
        bail!("Only .docx and .pdf inputs can be converted: {}", input.display());
    };
    let bytes = read_input(&input)?;

    let converter = SofficeConverter::new(&config.converter.soffice);
    let workspace = Workspace::new(config.storage.temp_dir.as_deref())?;

    eprintln!("Converting to {}...", target.extension());
    let converted = convert_bytes(&converter, &workspace, &bytes, target)?;

    write_output(&output, &converted, open)
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let bytes = read_input(&input)?;
    let metadata = extract_metadata(&bytes)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);
    println!(
        "Page size: {} x {} pt",
        metadata.first_page.width, metadata.first_page.height
    );

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}
