//! Load `.quadloader.toml` from a directory (CLI only). Lib callers pass [`LoadOpts`](crate::LoadOpts) directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Deserialize)]
pub struct LoaderToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    store: Option<String>,
    sample_mod: Option<u64>,
    window: Option<usize>,
    parser_threads: Option<usize>,
    executor_threads: Option<usize>,
    line_channel_cap: Option<usize>,
    quad_channel_cap: Option<usize>,
    telemetry_interval_ms: Option<u64>,
    seed: Option<u64>,
    verbose: Option<bool>,
    progress: Option<bool>,
}

/// Load the package config file from `dir` if present. Returns None if missing or unreadable; a malformed file is logged and ignored.
pub fn load_loader_toml(dir: &Path) -> Option<LoaderToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_loader_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub fn parse_loader_toml(s: &str) -> Result<LoaderToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags. dry_run is never in the file.
pub fn apply_file_to_opts(file: &LoaderToml, opts: &mut Opts) {
    let sec = &file.settings;
    if let Some(ref p) = sec.store {
        opts.store_path = Some(PathBuf::from(p));
    }
    apply_file_opt!(sec, opts, sample_mod => sample_mod);
    apply_file_opt!(sec, opts, window => window);
    apply_file_opt!(sec, opts, line_channel_cap => line_channel_cap);
    apply_file_opt!(sec, opts, quad_channel_cap => quad_channel_cap);
    apply_file_opt!(sec, opts, verbose => verbose);
    apply_file_opt!(sec, opts, progress => progress);
    if sec.parser_threads.is_some() {
        opts.parser_threads = sec.parser_threads;
    }
    if sec.executor_threads.is_some() {
        opts.executor_threads = sec.executor_threads;
    }
    if sec.seed.is_some() {
        opts.seed = sec.seed;
    }
    if let Some(ms) = sec.telemetry_interval_ms {
        opts.telemetry_interval = Duration::from_millis(ms);
    }
}
