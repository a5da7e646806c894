//! Parser pool: P workers turn raw lines into quads.

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::counters::Counters;
use super::error_handler::{Abort, PipelineError, recv_or_abort, send_or_abort};
use super::reader::RawLine;
use crate::Quad;
use crate::rdf::parse_line;

/// What a parser worker reports on its completion channel: quads published, or the first decode error.
pub type ParserOutcome = Result<u64, PipelineError>;

/// Drain `line_rx`, decode each line and publish on `quad_tx`.
///
/// `parsed` is bumped before the quad is published. Stops at the first decode error and returns
/// it instead of aborting, so the orchestrator decides. Stops quietly on abort.
pub fn parser_loop(
    line_rx: &Receiver<RawLine>,
    quad_tx: &Sender<Quad>,
    counters: &Counters,
    abort: &Abort,
) -> ParserOutcome {
    let mut published = 0_u64;
    while let Some(raw) = recv_or_abort(line_rx, abort) {
        let line = raw.text.trim_matches([' ', '\t']);
        let quad = parse_line(line).map_err(|source| PipelineError::Parse {
            line: raw.number,
            input: line.to_string(),
            source,
        })?;
        counters.incr_parsed();
        if !send_or_abort(quad_tx, quad, abort) {
            break;
        }
        published += 1;
    }
    Ok(published)
}

/// Spawn `num_threads` parser workers. Each drops its `quad_tx` clone and then reports on `done_tx`.
/// If a thread can't be spawned the pipeline is aborted and the workers started so far are returned.
pub fn spawn_parsers(
    num_threads: usize,
    line_rx: &Receiver<RawLine>,
    quad_tx: &Sender<Quad>,
    done_tx: &Sender<ParserOutcome>,
    counters: &Arc<Counters>,
    abort: &Arc<Abort>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(num_threads);
    for i in 0..num_threads {
        let line_rx = line_rx.clone();
        let quad_tx = quad_tx.clone();
        let done_tx = done_tx.clone();
        let counters = Arc::clone(counters);
        let abort_w = Arc::clone(abort);
        let spawned = thread::Builder::new()
            .name(format!("parser-{i}"))
            .spawn(move || {
                let outcome = parser_loop(&line_rx, &quad_tx, &counters, &abort_w);
                drop(quad_tx);
                let _ = done_tx.send(outcome);
            });
        match spawned {
            Ok(h) => handles.push(h),
            Err(source) => {
                abort.fail(PipelineError::Spawn {
                    stage: "parser",
                    source,
                });
                break;
            }
        }
    }
    handles
}
