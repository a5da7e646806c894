use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::context::{PipelineTuning, create_pipeline_channels};
use super::counters::Counters;
use super::error_handler::{Abort, PipelineError};
use super::executor::spawn_executors;
use super::parse::spawn_parsers;
use super::reader::spawn_reader;
use super::sampling::Sampler;
use super::telemetry::{OnProgress, TelemetryParams, spawn_telemetry};
use crate::store::GraphStore;

/// Lifecycle of one run. Only moves forward; `Aborted` is reachable from any state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PipelineState {
    Idle,
    ReadingAndParsing,
    Draining,
    Complete,
    Aborted,
}

/// One load: reader → line channel → parser pool → quad channel → executor pool → store.
pub struct Pipeline {
    tuning: PipelineTuning,
    counters: Arc<Counters>,
    cancel: Option<Arc<AtomicBool>>,
    on_progress: Option<OnProgress>,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(tuning: PipelineTuning) -> Self {
        Self {
            tuning,
            counters: Arc::new(Counters::new()),
            cancel: None,
            on_progress: None,
            state: PipelineState::Idle,
        }
    }

    /// Use caller-owned counters (e.g. to watch them from another thread while `run` blocks).
    pub fn with_counters(mut self, counters: Arc<Counters>) -> Self {
        self.counters = counters;
        self
    }

    /// Abort with [`PipelineError::Cancelled`] once `flag` is set (polled at the telemetry interval).
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Called with the processed delta whenever telemetry reports.
    pub fn with_progress(mut self, on_progress: OnProgress) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    pub fn tuning(&self) -> &PipelineTuning {
        &self.tuning
    }

    fn enter(&mut self, next: PipelineState) {
        debug!("pipeline: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run to completion and return the number of quads applied to `store`.
    ///
    /// Shutdown order: the reader closes the line channel at end of input; every parser reports on
    /// the completion channel; the quad channel is closed; executors drain it and are joined; the
    /// reporter is stopped. The first fatal error from any stage aborts every stage and is returned;
    /// counters keep whatever they reached.
    pub fn run<B>(mut self, source: B, store: Arc<dyn GraphStore>) -> Result<u64, PipelineError>
    where
        B: BufRead + Send + 'static,
    {
        let tuning = self.tuning.clone();
        let counters = Arc::clone(&self.counters);
        let abort = Arc::new(Abort::new());
        let channels = create_pipeline_channels(&tuning);
        debug!("pipeline tuning: {:?}", tuning);

        let queue_rx = channels.quad_rx.clone();
        let telemetry = spawn_telemetry(TelemetryParams {
            interval: tuning.telemetry_interval,
            counters: Arc::clone(&counters),
            abort: Arc::clone(&abort),
            queued: Box::new(move || queue_rx.len()),
            cancel: self.cancel.take(),
            on_progress: self.on_progress.take(),
        })
        .map_err(|source| PipelineError::Spawn {
            stage: "telemetry",
            source,
        })?;

        self.enter(PipelineState::ReadingAndParsing);
        let seed = tuning.seed;
        let reader = spawn_reader(
            source,
            channels.line_tx,
            tuning.window,
            move || match seed {
                Some(s) => ChaCha8Rng::seed_from_u64(s),
                None => ChaCha8Rng::from_entropy(),
            },
            Arc::clone(&counters),
            Arc::clone(&abort),
        );
        let reader = match reader {
            Ok(h) => Some(h),
            Err(source) => {
                abort.fail(PipelineError::Spawn {
                    stage: "reader",
                    source,
                });
                None
            }
        };

        let parsers = spawn_parsers(
            tuning.parser_threads,
            &channels.line_rx,
            &channels.quad_tx,
            &channels.done_tx,
            &counters,
            &abort,
        );
        drop(channels.line_rx);
        drop(channels.done_tx);

        let sampler = Sampler::new(tuning.sample_mod);
        let executors = spawn_executors(
            tuning.executor_threads,
            &channels.quad_rx,
            &store,
            sampler,
            &counters,
            &abort,
        );
        drop(channels.quad_rx);
        debug!(
            "started {} parsers and {} executors",
            parsers.len(),
            executors.len()
        );

        // Wait for every parser to report; a decode error aborts everything.
        for _ in 0..parsers.len() {
            match channels.done_rx.recv() {
                Ok(Ok(published)) => debug!("parser finished, published {}", published),
                Ok(Err(err)) => abort.fail(err),
                Err(_) => {
                    abort.fail(PipelineError::Panicked { stage: "parser" });
                    break;
                }
            }
        }
        for h in parsers {
            if h.join().is_err() {
                abort.fail(PipelineError::Panicked { stage: "parser" });
            }
        }

        self.enter(PipelineState::Draining);
        // Last sender: executors see end-of-stream once the queue is empty.
        drop(channels.quad_tx);
        let mut applied = 0_u64;
        for h in executors {
            match h.join() {
                Ok(n) => applied += n,
                Err(_) => abort.fail(PipelineError::Panicked { stage: "executor" }),
            }
        }
        if let Some(h) = reader {
            match h.join() {
                Ok(emitted) => debug!("reader emitted {} lines", emitted),
                Err(_) => abort.fail(PipelineError::Panicked { stage: "reader" }),
            }
        }

        telemetry.stop();
        let snap = counters.snapshot();
        debug!(
            "final counters read={} parsed={} processed={} ignored={}",
            snap.read, snap.parsed, snap.processed, snap.ignored
        );

        if let Some(err) = abort.take_error() {
            self.enter(PipelineState::Aborted);
            return Err(err);
        }
        self.enter(PipelineState::Complete);
        debug!("executors applied {} quads", applied);
        Ok(counters.processed())
    }
}
