use clap::Parser;
use std::path::PathBuf;

/// Concurrent N-Quad loader for graph stores.
#[derive(Clone, Debug, Parser)]
#[command(name = "quadloader")]
#[command(about = "Load N-Quad files (plain or gzip) into a graph store; use --dry-run to load into memory only.")]
pub struct Cli {
    /// Input files, processed in order. `.gz` input is detected and decompressed. `-` reads stdin.
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// SQLite store path. Default: QUADLOADER_STORE, else `quadloader.db` in the current directory.
    #[arg(long, short)]
    pub store: Option<PathBuf>,

    /// Only load subjects whose stable hash is divisible by this.
    #[arg(long = "mod", short = 'm', value_name = "M")]
    pub sample_mod: Option<u64>,

    /// Reorder window size. 1 keeps input order.
    #[arg(long, short = 'w', value_name = "W")]
    pub window: Option<usize>,

    /// Parser threads. Default: available CPU threads.
    #[arg(long, short = 'p', value_name = "P")]
    pub parsers: Option<usize>,

    /// Executor threads (store calls in flight).
    #[arg(long, short = 'e', value_name = "E")]
    pub executors: Option<usize>,

    /// Line channel capacity.
    #[arg(long, value_name = "C1")]
    pub line_cap: Option<usize>,

    /// Statement channel capacity.
    #[arg(long, value_name = "C2")]
    pub quad_cap: Option<usize>,

    /// Telemetry interval in milliseconds.
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Seed for the reorder window, for reproducible input order.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Load into an in-memory store and report counts; nothing is written.
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Show a live counter of processed statements.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,
}
