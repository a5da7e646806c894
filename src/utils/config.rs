//! Application configuration constants.
//! Tuning defaults and bounds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    store_filename: String,
    config_filename: String,
    store_env_var: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                store_filename: format!("{pkg}.db"),
                config_filename: format!(".{pkg}.toml"),
                store_env_var: format!("{}_STORE", pkg.to_uppercase()),
            }
        })
    }

    /// Default SQLite store filename (`quadloader.db`).
    pub fn store_filename(&self) -> &str {
        &self.store_filename
    }

    /// Config file looked up in the working directory (`.quadloader.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Env var naming the store path (`QUADLOADER_STORE`).
    pub fn store_env_var(&self) -> &str {
        &self.store_env_var
    }
}

// ---- Pipeline defaults ----

/// Defaults for every pipeline tunable. Overridden by `.quadloader.toml`, then by CLI flags.
pub struct TuningDefaults;

impl TuningDefaults {
    /// Load every subject.
    pub const SAMPLE_MOD: u64 = 1;
    /// Reorder window. Large enough to split runs of lines sharing a subject.
    pub const WINDOW: usize = 1000;
    pub const LINE_CHANNEL_CAP: usize = 10_000;
    pub const QUAD_CHANNEL_CAP: usize = 10_000;
    /// Executors mostly wait on the store, so the pool is much larger than the parser pool.
    pub const EXECUTOR_THREADS: usize = 512;
    pub const TELEMETRY_INTERVAL: Duration = Duration::from_secs(1);
}

// ---- Worker threads ----

/// Bounds for executor pool sizing.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available CPU threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Hard cap on executor threads regardless of memory.
    pub executor_max: usize,
    /// Floor for any pool.
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            executor_max: Self::EXECUTOR_MAX_THREADS,
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const EXECUTOR_MAX_THREADS: usize = 4096;
    pub const FLOOR_THREADS: usize = 1;
    /// Stack size for executor threads. They only hold one statement and a store call.
    pub const EXECUTOR_STACK_SIZE: usize = 256 * 1024;
    /// Fraction of available memory executor stacks may claim.
    pub const EXECUTOR_MEMORY_FRACTION: f64 = 0.25;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }
}

// ---- Store ----

/// Label given to every node created by the loader.
pub const ENTITY_LABEL: &str = "Entity";
/// Property key holding a node's external id.
pub const XID_KEY: &str = "_xid_";
