//! CLI command handler: resolve options, open the store, load each input through a fresh pipeline.

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::Opts;
use crate::engine::arg_parser::Cli;
use crate::engine::input::open_input;
use crate::engine::progress::{create_counter, progress_callback, refresh_bar};
use crate::pipeline::{Pipeline, PipelineTuning};
use crate::store::{GraphStore, MemoryStore, SqliteStore};
use crate::utils::config::PackagePaths;
use crate::utils::{apply_file_to_opts, load_loader_toml, setup_logging};

/// Overwrite opts field from the CLI when the flag was given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $cli_field:ident => $opts_field:ident) => {
        if let Some(v) = $cli.$cli_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply CLI flags over `opts` (flags win over the config file).
pub fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    if cli.store.is_some() {
        opts.store_path = cli.store.clone();
    }
    apply_cli_opt!(cli, opts, sample_mod => sample_mod);
    apply_cli_opt!(cli, opts, window => window);
    apply_cli_opt!(cli, opts, line_cap => line_channel_cap);
    apply_cli_opt!(cli, opts, quad_cap => quad_channel_cap);
    apply_cli_opt!(cli, opts, verbose => verbose);
    apply_cli_opt!(cli, opts, progress => progress);
    if cli.parsers.is_some() {
        opts.parser_threads = cli.parsers;
    }
    if cli.executors.is_some() {
        opts.executor_threads = cli.executors;
    }
    if cli.seed.is_some() {
        opts.seed = cli.seed;
    }
    if let Some(ms) = cli.interval_ms {
        opts.telemetry_interval = Duration::from_millis(ms);
    }
    opts.dry_run = cli.dry_run;
}

/// Defaults < `.quadloader.toml` in `dir` < CLI flags.
pub fn build_opts(cli: &Cli, dir: &Path) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_loader_toml(dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    apply_cli_to_opts(cli, &mut opts);
    opts
}

/// Store path: explicit option, else `QUADLOADER_STORE` (environment or `.env`), else the package default.
pub fn resolve_store_path(opts: &Opts) -> PathBuf {
    if let Some(p) = &opts.store_path {
        return p.clone();
    }
    let paths = PackagePaths::get();
    let _ = dotenvy::dotenv();
    match std::env::var(paths.store_env_var()) {
        Ok(s) if !s.trim().is_empty() => PathBuf::from(s.trim()),
        _ => PathBuf::from(paths.store_filename()),
    }
}

fn open_store(opts: &Opts) -> Result<Arc<dyn GraphStore>> {
    if opts.dry_run {
        warn!("RUNNING IN DRY-RUN MODE. NOTHING WILL BE WRITTEN TO THE STORE.");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = resolve_store_path(opts);
    info!("Store: {}", path.display());
    Ok(Arc::new(SqliteStore::open(&path)?))
}

/// Load every input file in order. Stops at the first failed file.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = build_opts(cli, Path::new("."));
    setup_logging(opts.verbose);
    let tuning = PipelineTuning::resolve(&opts)?;
    info!(
        "mod={} window={} parsers={} executors={}",
        tuning.sample_mod, tuning.window, tuning.parser_threads, tuning.executor_threads
    );
    let store = open_store(&opts)?;

    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let bar = opts.progress.then(|| {
        let b = create_counter("Loading");
        refresh_bar(&b);
        b
    });

    let mut total = 0_u64;
    for path in &cli.files {
        info!("Handling {}", path.display());
        let source = open_input(path)?;
        let mut pipeline = Pipeline::new(tuning.clone()).with_cancel(Arc::clone(&cancel_requested));
        if let Some(b) = &bar {
            pipeline = pipeline.with_progress(progress_callback(b));
        }
        let count = pipeline
            .run(source, Arc::clone(&store))
            .with_context(|| format!("while loading {}", path.display()))?;
        info!("{}: {} quads processed", path.display(), count);
        total += count;
    }

    let stats = store.stats()?;
    info!(
        "Done: {} quads processed; store holds {} nodes and {} edges",
        total, stats.nodes, stats.edges
    );
    Ok(())
}
