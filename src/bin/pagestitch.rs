//! CLI binary for pagestitch.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use pagestitch::{convert, convert_to_file, ConversionConfig, PageSelection};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  pagestitch document.pdf

  # Convert to file
  pagestitch document.pdf -o output.md

  # Specific pages
  pagestitch --pages 1-5 paper.pdf -o paper.md

  # Convert from URL
  pagestitch https://arxiv.org/pdf/1706.03762 -o attention.md

  # Structured JSON output (blocks with page provenance + stats)
  pagestitch --json document.pdf > output.json

  # Keep page furniture, merge more conservatively
  pagestitch --keep-furniture --text-threshold 0.7 document.pdf

ENVIRONMENT VARIABLES:
  PAGESTITCH_BASE_URL     OpenAI-compatible endpoint, e.g. https://api.openai.com/v1
  PAGESTITCH_API_KEY      API key for the endpoint
  PAGESTITCH_MODEL        Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium

SETUP:
  1. Point at an endpoint:  export PAGESTITCH_BASE_URL=https://api.openai.com/v1
  2. Set the key:           export PAGESTITCH_API_KEY=sk-...
  3. Convert:               pagestitch document.pdf -o output.md
"#;

/// Convert PDF files and URLs to one stitched Markdown document.
#[derive(Parser, Debug)]
#[command(
    name = "pagestitch",
    version,
    about = "Convert PDF files and URLs to one stitched Markdown document using Vision LLMs",
    long_about = "Convert PDF documents (local files or URLs) to a single coherent Markdown \
document. Each page is transcribed by a vision language model, then paragraphs and tables \
split across page boundaries are stitched back together and page furniture is removed.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "PAGESTITCH_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision model ID sent to the endpoint (e.g. gpt-4o).
    #[arg(long, env = "PAGESTITCH_MODEL")]
    model: Option<String>,

    /// OpenAI-compatible endpoint base URL.
    #[arg(long, env = "PAGESTITCH_BASE_URL")]
    base_url: Option<String>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PAGESTITCH_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Number of concurrent model API calls.
    #[arg(short, long, env = "PAGESTITCH_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PAGESTITCH_PAGES", default_value = "all")]
    pages: String,

    /// Paragraph continuation threshold (0.0–1.0); merge only above this.
    #[arg(long, env = "PAGESTITCH_TEXT_THRESHOLD", default_value_t = 0.5)]
    text_threshold: f64,

    /// Table header-repeat distance threshold (0.0–1.0).
    #[arg(long, env = "PAGESTITCH_TABLE_THRESHOLD", default_value_t = 0.25)]
    table_threshold: f64,

    /// Keep page furniture (headers/footers/page numbers) in the output.
    #[arg(long, env = "PAGESTITCH_KEEP_FURNITURE")]
    keep_furniture: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAGESTITCH_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PAGESTITCH_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max model output tokens per page.
    #[arg(long, env = "PAGESTITCH_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Model temperature (0.0–2.0).
    #[arg(long, env = "PAGESTITCH_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per page on model failure.
    #[arg(long, env = "PAGESTITCH_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Output structured JSON (blocks + stats) instead of Markdown.
    #[arg(long, env = "PAGESTITCH_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs (includes seam decisions).
    #[arg(short, long, env = "PAGESTITCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGESTITCH_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAGESTITCH_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-page model call timeout in seconds.
    #[arg(long, env = "PAGESTITCH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // ── Run conversion ───────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = convert_to_file(&cli.input, output_path, &config)
            .await
            .context("Conversion failed")?;

        if !cli.quiet {
            eprintln!(
                "Converted {} pages → {} ({} blocks, {} merges, {}ms)",
                stats.total_pages,
                output_path.display(),
                stats.output_blocks,
                stats.merges,
                stats.total_duration_ms,
            );
            if stats.failed_pages > 0 {
                eprintln!("  {} pages failed", stats.failed_pages);
            }
        }
    } else {
        let document = convert(&cli.input, &config)
            .await
            .context("Conversion failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&document).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let markdown = document.to_markdown();
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(markdown.as_bytes())
                .context("Failed to write to stdout")?;
            // Ensure a trailing newline on stdout.
            if !markdown.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }

        if !cli.quiet && !cli.json {
            eprintln!(
                "Converted {} pages in {}ms ({} blocks, {} merges, {} furniture dropped)",
                document.stats.total_pages,
                document.stats.total_duration_ms,
                document.stats.output_blocks,
                document.stats.merges,
                document.stats.furniture_dropped,
            );
            if document.stats.failed_pages > 0 {
                eprintln!("  {} pages failed", document.stats.failed_pages);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let pages = parse_pages(&cli.pages)?;

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .pages(pages)
        .text_similarity_threshold(cli.text_threshold)
        .table_distance_threshold(cli.table_threshold)
        .drop_furniture(!cli.keep_furniture)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Fields the builder doesn't have setters for on this path.
    config.password = cli.password.clone();
    config.system_prompt = system_prompt;

    Ok(config)
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        for &p in &pages {
            if p < 1 {
                anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
            }
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_variants() {
        assert!(matches!(parse_pages("all").unwrap(), PageSelection::All));
        assert!(matches!(
            parse_pages("5").unwrap(),
            PageSelection::Single(5)
        ));
        assert!(matches!(
            parse_pages("3-15").unwrap(),
            PageSelection::Range(3, 15)
        ));
        assert!(matches!(
            parse_pages("1,3,5").unwrap(),
            PageSelection::Set(ref v) if v == &vec![1, 3, 5]
        ));
        assert!(parse_pages("15-3").is_err());
        assert!(parse_pages("zero").is_err());
    }
}
