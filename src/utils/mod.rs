pub mod config;
pub mod limits;
pub mod loader_toml;
pub mod logger;

pub use config::*;
pub use limits::{bound_executor_threads, max_executors_by_memory};
pub use loader_toml::{apply_file_to_opts, load_loader_toml};
pub use logger::setup_logging;
