//! The `shutter index` command.

use clap::{Args, ValueEnum};
use serde::Serialize;
use shutter_core::pipeline::discover_scopes;
use shutter_core::{sort_photos, Config, FullPhoto, PhotoIndexer, ProcessingStats, Scope, SortMode};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use super::overrides::parse_sort_mode;

/// Arguments for the `index` command.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Sub-directory of the photos directory to index (root when omitted)
    #[arg(conflicts_with = "all")]
    pub scope: Option<String>,

    /// Index the root and every sub-directory
    #[arg(long)]
    pub all: bool,

    /// Ignore existing caches for this run
    #[arg(short, long)]
    pub force: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Sort mode (defaults to `photo.sort`)
    #[arg(long, value_parser = parse_sort_mode)]
    pub sort: Option<SortMode>,

    /// Reverse the sort order
    #[arg(short, long)]
    pub reverse: bool,
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON array
    Json,
    /// One JSON photo per line
    Jsonl,
}

/// Photos of one scope, as emitted by `--all`.
#[derive(Debug, Serialize)]
pub struct ScopeListing {
    /// Scope name, empty for the root
    pub scope: String,
    pub photos: Vec<FullPhoto>,
}

/// Execute the index command.
pub async fn execute(args: IndexArgs, config: Config) -> anyhow::Result<()> {
    let scopes = if args.all {
        discover_scopes(&config.photos_dir())?
    } else {
        vec![Scope::parse(args.scope.as_deref())?]
    };

    let indexer = PhotoIndexer::from_config(&config)?;
    let cancel = indexer.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, waiting for in-flight files to finish");
            cancel.cancel();
        }
    });

    let sort = args.sort.unwrap_or(config.photo.sort);
    let reverse = args.reverse || config.photo.default_reverse;
    let start = Instant::now();
    let mut totals = ProcessingStats::default();
    let mut listings = Vec::with_capacity(scopes.len());

    for scope in scopes {
        let (photos, stats) = indexer.index_with_stats(&scope, args.force).await?;
        accumulate(&mut totals, &stats);
        listings.push(ScopeListing {
            scope: scope.name().unwrap_or_default().to_string(),
            photos: sort_photos(photos, sort, reverse),
        });
    }
    totals.total_seconds = start.elapsed().as_secs_f64();

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_listings(&mut writer, &listings, args.format, args.all)?;
            writer.flush()?;
            tracing::info!("Output written to {:?}", path);
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_listings(&mut writer, &listings, args.format, args.all)?;
            writer.flush()?;
        }
    }

    print_summary(&totals, indexer.processor_name());
    Ok(())
}

fn accumulate(totals: &mut ProcessingStats, stats: &ProcessingStats) {
    totals.extracted += stats.extracted;
    totals.cached += stats.cached;
    totals.unsupported += stats.unsupported;
    totals.failed += stats.failed;
}

/// Write the result. A single scope is written as a bare photo list; `--all`
/// keeps the per-scope grouping in JSON mode.
pub fn write_listings<W: Write>(
    writer: &mut W,
    listings: &[ScopeListing],
    format: OutputFormat,
    grouped: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Json if grouped => {
            serde_json::to_writer_pretty(&mut *writer, listings).map_err(io::Error::other)?;
            writeln!(writer)
        }
        OutputFormat::Json => {
            let photos: Vec<&FullPhoto> = listings.iter().flat_map(|l| &l.photos).collect();
            serde_json::to_writer_pretty(&mut *writer, &photos).map_err(io::Error::other)?;
            writeln!(writer)
        }
        OutputFormat::Jsonl => {
            for photo in listings.iter().flat_map(|l| &l.photos) {
                serde_json::to_writer(&mut *writer, photo).map_err(io::Error::other)?;
                writeln!(writer)?;
            }
            Ok(())
        }
    }
}

fn print_summary(stats: &ProcessingStats, processor: &str) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Indexed:      {:>8}", stats.indexed());
    eprintln!("      extracted:  {:>8}", stats.extracted);
    eprintln!("      cached:     {:>8}", stats.cached);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    if stats.unsupported > 0 {
        eprintln!("    Skipped:      {:>8}", stats.unsupported);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Processor:    {:>8}", processor);
    eprintln!("    Duration:     {:>7.1}s", stats.total_seconds);
    eprintln!("  ====================================");
}
