mod pages;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rtl_docx::docx::{self, DocxOptions};
use rtl_docx::{pair_up, render, replace_in_docx, DocumentBuilder};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an RTL .docx from per-page HTML fragments.
    Convert(ConvertArgs),
    /// Find and replace text in an existing .docx.
    Replace(ReplaceArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Page fragment file; repeat once per page, in page order.
    #[arg(long = "html-file", conflicts_with = "pages_dir")]
    html_files: Vec<PathBuf>,

    /// Directory holding `page_<N>.html` fragments.
    #[arg(long)]
    pages_dir: Option<PathBuf>,

    /// First page to convert (1-based, with --pages-dir).
    #[arg(long, default_value_t = 1)]
    start: u32,

    /// Last page to convert, inclusive (with --pages-dir). Defaults to the last page.
    #[arg(long)]
    end: Option<u32>,

    /// Output .docx path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Base name for the default output file.
    #[arg(long, default_value = "document")]
    name: String,

    /// Document title metadata (optional).
    #[arg(long)]
    title: Option<String>,
}

#[derive(Args, Debug)]
struct ReplaceArgs {
    /// Input .docx path.
    #[arg(long)]
    docx: PathBuf,

    /// Text to find; pairs with the --replace at the same position.
    #[arg(long = "find")]
    finds: Vec<String>,

    /// Replacement text.
    #[arg(long = "replace")]
    replaces: Vec<String>,

    /// Output .docx path.
    #[arg(long)]
    out: PathBuf,
}

fn read_fragment(path: &Path) -> Result<String> {
    let mut html = String::new();
    File::open(path)
        .with_context(|| format!("open {}", path.display()))?
        .read_to_string(&mut html)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(html)
}

/// Renders each page in order. A page that cannot be read is reported and
/// skipped; pages already rendered stay as they are.
fn render_pages(pages: &[(u32, PathBuf)], doc: &mut DocumentBuilder) -> usize {
    let mut rendered = 0;
    for (number, path) in pages {
        match read_fragment(path) {
            Ok(html) => {
                log::info!("processing page {number}: {}", path.display());
                render(&html, doc);
                rendered += 1;
            }
            Err(e) => log::error!("error processing page {number}: {e:#}"),
        }
    }
    rendered
}

fn convert(args: ConvertArgs) -> Result<()> {
    let (pages, range, base_dir) = if let Some(dir) = &args.pages_dir {
        let found = pages::scan_pages_dir(dir)?;
        let (selected, range) = pages::select_pages(&found, args.start, args.end)
            .with_context(|| format!("pages in {}", dir.display()))?;
        (selected, Some(range), dir.clone())
    } else {
        if args.html_files.is_empty() {
            bail!("no input: pass --html-file or --pages-dir");
        }
        let selected: Vec<(u32, PathBuf)> = (1u32..).zip(args.html_files.iter().cloned()).collect();
        (selected, None, PathBuf::from("."))
    };

    let mut doc = DocumentBuilder::new();
    let rendered = render_pages(&pages, &mut doc);
    if rendered == 0 {
        bail!("none of the {} pages could be read", pages.len());
    }

    let out = args
        .out
        .unwrap_or_else(|| base_dir.join(pages::default_output_name(&args.name, range)));
    let opts = DocxOptions { title: args.title };
    docx::save(&doc.finish(), &opts, &out)
        .with_context(|| format!("write {}", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

fn replace(args: ReplaceArgs) -> Result<()> {
    let pairs = pair_up(&args.finds, &args.replaces)?;
    if pairs.is_empty() {
        log::warn!("no non-empty find texts given; output is a plain copy");
    }

    let input = std::fs::read(&args.docx).with_context(|| format!("read {}", args.docx.display()))?;
    let (output, report) = replace_in_docx(&input, &pairs)
        .with_context(|| format!("process {}", args.docx.display()))?;
    std::fs::write(&args.out, output).with_context(|| format!("write {}", args.out.display()))?;

    log::info!(
        "replaced {} occurrences in {} of {} paragraphs",
        report.occurrences,
        report.paragraphs_changed,
        report.paragraphs
    );
    println!("{}", args.out.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Convert(args) => convert(args),
        Command::Replace(args) => replace(args),
    }
}
