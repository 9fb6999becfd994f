//! note-index - search numbered notes from the command line
//!
//! ```bash
//! # Free-text search, best title matches first
//! note-index search notes.txt --text "eager loading"
//!
//! # Every entry tagged both `caching` and `perf`
//! note-index search notes.txt --tag caching --tag perf
//!
//! # All entries numbered 7, with bodies
//! note-index show notes.txt 7
//!
//! # Persist the parsed store, then search the snapshot
//! note-index snapshot notes.txt ./notes.snapshot
//! note-index search ./notes.snapshot --text routing
//! ```
//!
//! Set `RUST_LOG=note_index=debug` for parser and index detail on stderr.

use std::collections::BTreeSet;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use note_index::store::{Snapshot, SnapshotConfig, SnapshotWriter};
use note_index::{ingest, Config, Entry, EntryId, EntryStore, IndexBuilder, QueryEngine, SearchRequest, Segment};

#[derive(Parser, Debug)]
#[command(name = "note-index")]
#[command(version)]
#[command(about = "Index and search numbered notes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search entries by text, tags or number
    Search(SearchArgs),
    /// Print every entry with the given number
    Show {
        /// Notes file or snapshot directory
        source: PathBuf,
        /// Entry number
        id: u64,
    },
    /// Summarize entries, duplicate numbers and index size
    Stats {
        /// Notes file or snapshot directory
        source: PathBuf,
    },
    /// Write the parsed store to a snapshot directory
    Snapshot {
        /// Notes file
        source: PathBuf,
        /// Output directory (must not exist)
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Notes file or snapshot directory
    source: PathBuf,

    /// Free-text query; every token must match
    #[arg(long, short)]
    text: Option<String>,

    /// Required tag (repeatable)
    #[arg(long = "tag", short = 'g')]
    tags: Vec<String>,

    /// Exact entry number; other selectors are ignored
    #[arg(long)]
    id: Option<u64>,

    /// Maximum number of results
    #[arg(long, short)]
    limit: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("note_index=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        if is_broken_pipe(e.as_ref()) {
            return;
        }
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Search(args) => {
            let store = open_store(&args.source, &config)?;
            let mut request = SearchRequest::new();
            request.text = args.text;
            if !args.tags.is_empty() {
                request.tags = Some(args.tags.into_iter().collect());
            }
            request.id = args.id.map(Into::into);
            request.limit = args.limit.or(config.search.default_limit);

            let engine = QueryEngine::new(Arc::new(store));
            let result = engine.search(&request)?;

            match cli.format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?,
                OutputFormat::Human => {
                    if result.is_empty() {
                        writeln!(out, "No matching entries")?;
                    }
                    for ranked in &result.entries {
                        writeln!(out, "{}", heading_line(&ranked.entry))?;
                    }
                    if result.search.excluded_by_limit > 0 {
                        writeln!(out, "({} more not shown)", result.search.excluded_by_limit)?;
                    }
                }
            }
        }
        Commands::Show { source, id } => {
            let store = open_store(&source, &config)?;
            let entries = store.get(id.into());
            match cli.format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?,
                OutputFormat::Human => {
                    if entries.is_empty() {
                        writeln!(out, "No entry numbered {id}")?;
                    }
                    for (n, entry) in entries.iter().enumerate() {
                        if n > 0 {
                            writeln!(out)?;
                        }
                        write_entry(&mut out, entry)?;
                    }
                }
            }
        }
        Commands::Stats { source } => {
            let store = open_store(&source, &config)?;
            let index = IndexBuilder.build(&store);
            let duplicates = store.duplicate_ids();
            let distinct_ids: BTreeSet<EntryId> = store.all().iter().map(|e| e.id()).collect();
            let stats = serde_json::json!({
                "entries": store.len(),
                "distinct_ids": distinct_ids.len(),
                "duplicate_ids": duplicates.keys().collect::<Vec<_>>(),
                "tokens": index.token_count(),
                "tags": index.tag_count(),
            });
            match cli.format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?,
                OutputFormat::Human => {
                    writeln!(out, "Entries:       {}", stats["entries"])?;
                    writeln!(out, "Distinct ids:  {}", stats["distinct_ids"])?;
                    writeln!(out, "Duplicate ids: {}", duplicates.len())?;
                    for (id, orders) in &duplicates {
                        writeln!(out, "  {id}: {} occurrences", orders.len())?;
                    }
                    writeln!(out, "Tokens:        {}", stats["tokens"])?;
                    writeln!(out, "Tags:          {}", stats["tags"])?;
                }
            }
        }
        Commands::Snapshot { source, output } => {
            let store = open_store(&source, &config)?;
            let snapshot = SnapshotWriter::new(SnapshotConfig::v0()).write(&store, &output)?;
            match cli.format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&snapshot.manifest)?)?,
                OutputFormat::Human => writeln!(
                    out,
                    "Wrote {} entries to {} ({})",
                    snapshot.manifest.entry_count,
                    output.display(),
                    snapshot.manifest.snapshot_version
                )?,
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// A closed pipe (`note-index ... | head`) is not a failure.
fn is_broken_pipe(e: &(dyn Error + 'static)) -> bool {
    e.downcast_ref::<io::Error>()
        .map_or(false, |e| e.kind() == io::ErrorKind::BrokenPipe)
}

/// A directory is read as a snapshot, anything else as raw notes.
fn open_store(source: &Path, config: &Config) -> Result<EntryStore, Box<dyn Error>> {
    if source.is_dir() {
        return Ok(Snapshot::load(source)?);
    }
    let raw = fs::read_to_string(source)?;
    Ok(ingest(&raw, &config.parser_config()?)?)
}

fn heading_line(entry: &Entry) -> String {
    let mut line = format!("#{} {}", entry.id(), entry.title());
    if !entry.tags().is_empty() {
        let tags: Vec<&str> = entry.tags().iter().collect();
        line.push_str(&format!("  [{}]", tags.join(", ")));
    }
    line
}

fn write_entry(out: &mut impl Write, entry: &Entry) -> io::Result<()> {
    writeln!(out, "{}", heading_line(entry))?;
    for segment in entry.segments() {
        match segment {
            Segment::Text { text } => writeln!(out, "{text}")?,
            Segment::Code { label, code } => {
                writeln!(out, "--- {}", label.as_deref().unwrap_or("code"))?;
                for line in code.lines() {
                    writeln!(out, "    {line}")?;
                }
                writeln!(out, "---")?;
            }
        }
    }
    Ok(())
}
