//! Engine module: CLI definition, run handler, input opening, progress display.

pub mod arg_parser;
pub mod cli;
pub mod input;
pub mod progress;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{apply_cli_to_opts, build_opts, handle_run, resolve_store_path};
pub use input::{InputSource, open_input};
