//! Quadloader CLI: stream N-Quad files into a graph store.

use anyhow::Result;
use clap::Parser;
use quadloader::engine::arg_parser::Cli;
use quadloader::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
