//! Quadloader: concurrent N-Quad loader for graph stores.
//!
//! Lines are read through a bounded random reorder window, decoded by a parser pool, sampled by a
//! stable subject hash, and applied to a [`GraphStore`] by a large executor pool. Shared
//! [`Counters`] track progress and a reporter thread logs them while the load runs.

pub mod engine;
pub mod pipeline;
pub mod rdf;
pub mod store;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use pipeline::{CounterSnapshot, Counters, Pipeline, PipelineError, PipelineTuning};
pub use store::{GraphStore, MemoryStore, NodeHandle, Props, SqliteStore, StoreStats};

use log::debug;
use std::io::BufRead;
use std::sync::Arc;

/// Result alias used by public quadloader API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Load every statement from `source` into `store` and return how many were applied.
///
/// Blocks until the pipeline completes or aborts. Unset fields of `opts` use the package defaults
/// (see [`TuningDefaults`](crate::utils::config::TuningDefaults)). On failure the error is a
/// [`PipelineError`] naming the stage and the offending line or subject; downcast to inspect it.
///
/// ```ignore
/// let store = Arc::new(quadloader::MemoryStore::new());
/// let opts = quadloader::LoadOpts { window: Some(1), ..Default::default() };
/// let n = quadloader::load_reader(std::io::Cursor::new(data), store.clone(), &opts)?;
/// ```
pub fn load_reader<B>(source: B, store: Arc<dyn GraphStore>, opts: &LoadOpts) -> Result<u64>
where
    B: BufRead + Send + 'static,
{
    let opts = Opts::from(opts);
    let tuning = PipelineTuning::resolve(&opts)?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        tuning
    );
    Ok(Pipeline::new(tuning).run(source, store)?)
}
