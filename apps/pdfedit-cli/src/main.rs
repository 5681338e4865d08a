//! pdfedit command line
//!
//! Runs the editor's document operations on files: inspect, merge, split,
//! stamp text or an image onto a page, and (with the `render` feature)
//! rasterize a page to PNG.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdfedit_core::{
    add_image_sized, add_text_styled, merge_documents, parse_ranges, split_document, ImageKind,
    PageInfo, PdfPoint, Rgb, TextStyle,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfedit")]
#[command(version, about = "Merge, split and annotate PDF files")]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show page count and page sizes
    Info {
        file: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Concatenate files in the order given
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write one file per page range, e.g. "1-3, 4, 5-8"
    Split {
        file: PathBuf,
        #[arg(short, long)]
        ranges: String,
        /// Directory for the output files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Draw text on a page
    AddText {
        file: PathBuf,
        #[arg(long)]
        text: String,
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u32,
        /// Distance from the left edge, in points
        #[arg(long)]
        x: f64,
        /// Distance from the bottom edge, in points
        #[arg(long)]
        y: f64,
        #[arg(long, default_value = "12")]
        size: f64,
        /// Hex colour such as "#1a1a1a"
        #[arg(long, default_value = "#000000")]
        color: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Place a JPEG or PNG image on a page
    AddImage {
        file: PathBuf,
        #[arg(long)]
        image: PathBuf,
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long, default_value = "100")]
        width: f64,
        #[arg(long, default_value = "100")]
        height: f64,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Render a page to PNG through PDFium
    #[cfg(feature = "render")]
    Render {
        file: PathBuf,
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "1.5")]
        scale: f32,
        /// Directory containing the PDFium library
        #[arg(long, default_value = "./")]
        pdfium_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct InfoReport {
    file: String,
    page_count: u32,
    pages: Vec<PageInfo>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(args.command)
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Info { file, json } => {
            let report = info(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}: {} pages", report.file, report.page_count);
                for page in &report.pages {
                    println!(
                        "  {:>4}  {:>7.1} x {:<7.1} rot {:>3}  {:?}",
                        page.page_num, page.width, page.height, page.rotation, page.orientation
                    );
                }
            }
        }
        Command::Merge { files, output } => {
            let inputs = files.iter().map(read).collect::<Result<Vec<_>>>()?;
            let merged = merge_documents(&inputs).context("Merge failed")?;
            write(&output, &merged)?;
            tracing::info!(inputs = files.len(), output = %output.display(), "merged");
        }
        Command::Split {
            file,
            ranges,
            output_dir,
        } => {
            let written = split(&file, &ranges, &output_dir)?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Command::AddText {
            file,
            text,
            page,
            x,
            y,
            size,
            color,
            output,
        } => {
            let bytes = read(&file)?;
            let style = TextStyle {
                font_size: size,
                color: Rgb::from_hex(&color),
            };
            let point = PdfPoint { x, y };
            let edited = add_text_styled(&bytes, &text, point, page_index(page)?, &style)
                .with_context(|| format!("Failed to add text to {}", file.display()))?;
            write(&output, &edited)?;
        }
        Command::AddImage {
            file,
            image,
            page,
            x,
            y,
            width,
            height,
            output,
        } => {
            let bytes = read(&file)?;
            let image_bytes = read(&image)?;
            let kind = ImageKind::from_file_name(&image.to_string_lossy())?;
            let edited = add_image_sized(
                &bytes,
                &image_bytes,
                PdfPoint { x, y },
                page_index(page)?,
                kind,
                (width, height),
            )
            .with_context(|| format!("Failed to add image to {}", file.display()))?;
            write(&output, &edited)?;
        }
        #[cfg(feature = "render")]
        Command::Render {
            file,
            page,
            scale,
            pdfium_dir,
            output,
        } => {
            use pdfedit_core::{render_page, PdfiumRasterizer, RgbaSurface};

            let bytes = read(&file)?;
            let rasterizer = PdfiumRasterizer::bind(&pdfium_dir)?;
            let mut surface = RgbaSurface::new();
            let viewport = render_page(&rasterizer, &bytes, page, &mut surface, scale)?;
            write(&output, &surface.to_png()?)?;
            tracing::info!(width = viewport.width, height = viewport.height, "rendered");
        }
    }
    Ok(())
}

fn info(path: &Path) -> Result<InfoReport> {
    let bytes = read(path)?;
    let pages = PageInfo::all_from_bytes(&bytes)
        .with_context(|| format!("Failed to read pages of {}", path.display()))?;
    Ok(InfoReport {
        file: path.display().to_string(),
        page_count: pages.len() as u32,
        pages,
    })
}

fn split(file: &Path, ranges: &str, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let bytes = read(file)?;
    let ranges = parse_ranges(ranges)?;
    let parts = split_document(&bytes, &ranges)
        .with_context(|| format!("Failed to split {}", file.display()))?;

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "split".to_string());

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(parts.len());
    for (range, part) in ranges.iter().zip(parts) {
        let path = output_dir.join(format!("{}_{}-{}.pdf", stem, range.start + 1, range.end + 1));
        write(&path, &part)?;
        written.push(path);
    }
    Ok(written)
}

fn page_index(page: u32) -> Result<u32> {
    if page == 0 {
        bail!("Page numbers start at 1");
    }
    Ok(page - 1)
}

fn read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
