//! Load pipeline: randomizing reader, parser pool, sampling filter, executor pool, telemetry, orchestrator.

pub mod context;
pub mod counters;
pub mod error_handler;
pub mod executor;
pub mod orchestrator;
pub mod parse;
pub mod reader;
pub mod sampling;
pub mod telemetry;

pub use context::{PipelineChannels, PipelineTuning, create_pipeline_channels};
pub use counters::{CounterSnapshot, Counters};
pub use error_handler::{Abort, PipelineError, recv_or_abort, send_or_abort};
pub use executor::{apply_quad, executor_loop, resolve_node, spawn_executors};
pub use orchestrator::Pipeline;
pub use parse::{ParserOutcome, parser_loop, spawn_parsers};
pub use reader::{RawLine, Window, run_reader, spawn_reader};
pub use sampling::{Sampler, accept, stable_hash};
pub use telemetry::{Telemetry, TelemetryParams, snapshot_line, spawn_telemetry};
