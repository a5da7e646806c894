//! Public and internal types for the quadloader API and pipeline.

use std::path::PathBuf;
use std::time::Duration;

use crate::utils::config::TuningDefaults;

/// Object position of a statement: either another node (edge target) or a literal value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuadObject {
    /// External id of the target node.
    Id(String),
    /// Literal value, unescaped.
    Value(String),
}

/// One parsed statement. Built by a parser worker from one input line and consumed by exactly one executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quad {
    pub subject: String,
    pub predicate: String,
    pub object: QuadObject,
    /// Language tag of a literal (`"chat"@fr` → `fr`).
    pub language: Option<String>,
    /// Datatype IRI of a typed literal, without angle brackets.
    pub datatype: Option<String>,
    /// Graph label (fourth term), if present.
    pub label: Option<String>,
}

impl Quad {
    pub fn object_id(&self) -> Option<&str> {
        match &self.object {
            QuadObject::Id(id) => Some(id),
            QuadObject::Value(_) => None,
        }
    }

    pub fn object_value(&self) -> Option<&str> {
        match &self.object {
            QuadObject::Value(v) => Some(v),
            QuadObject::Id(_) => None,
        }
    }

    /// Property name used when the object is a literal: the predicate, suffixed by `.lang` when tagged.
    pub fn property_name(&self) -> String {
        match &self.language {
            Some(lang) if !lang.is_empty() => format!("{}.{}", self.predicate, lang),
            _ => self.predicate.clone(),
        }
    }
}

/// Lib-only options for [`load_reader`](crate::load_reader). `None` fields fall back to [`TuningDefaults`].
#[derive(Clone, Debug, Default)]
pub struct LoadOpts {
    /// Sampling divisor M: only subjects whose stable hash is divisible by M are loaded. 1 loads everything.
    pub sample_mod: Option<u64>,
    /// Reorder window W. 1 keeps input order.
    pub window: Option<usize>,
    /// Parser pool size P. Defaults to the rayon thread count.
    pub parser_threads: Option<usize>,
    /// Executor pool size E.
    pub executor_threads: Option<usize>,
    /// Line channel capacity C1.
    pub line_channel_cap: Option<usize>,
    /// Statement channel capacity C2.
    pub quad_channel_cap: Option<usize>,
    /// Telemetry sampling interval.
    pub telemetry_interval: Option<Duration>,
    /// Seed for the reorder RNG. When None, seeded from OS entropy.
    pub seed: Option<u64>,
}

impl From<&LoadOpts> for Opts {
    fn from(o: &LoadOpts) -> Self {
        let mut opts = Opts::default();
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = o.$field {
                    opts.$field = v;
                }
            };
        }
        take!(sample_mod);
        take!(window);
        take!(line_channel_cap);
        take!(quad_channel_cap);
        take!(telemetry_interval);
        opts.parser_threads = o.parser_threads;
        opts.executor_threads = o.executor_threads;
        opts.seed = o.seed;
        opts
    }
}

/// Full options (CLI). Use [`LoadOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    /// SQLite store path. When None, uses `QUADLOADER_STORE` or the package default filename.
    pub store_path: Option<PathBuf>,
    pub sample_mod: u64,
    pub window: usize,
    /// When None, derived from the rayon thread count.
    pub parser_threads: Option<usize>,
    /// When None, uses the default and is still bounded by host memory.
    pub executor_threads: Option<usize>,
    pub line_channel_cap: usize,
    pub quad_channel_cap: usize,
    pub telemetry_interval: Duration,
    pub seed: Option<u64>,
    /// Verbose logging.
    pub verbose: bool,
    /// Show a kdam counter of processed statements.
    pub progress: bool,
    /// Load into an in-memory store instead of SQLite; nothing is persisted.
    pub dry_run: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            store_path: None,
            sample_mod: TuningDefaults::SAMPLE_MOD,
            window: TuningDefaults::WINDOW,
            parser_threads: None,
            executor_threads: None,
            line_channel_cap: TuningDefaults::LINE_CHANNEL_CAP,
            quad_channel_cap: TuningDefaults::QUAD_CHANNEL_CAP,
            telemetry_interval: TuningDefaults::TELEMETRY_INTERVAL,
            seed: None,
            verbose: false,
            progress: false,
            dry_run: false,
        }
    }
}
