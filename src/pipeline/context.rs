//! Pipeline tuning and channels: resolved sizes and the bounded channels wiring the stages together.

use anyhow::bail;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::time::Duration;

use super::parse::ParserOutcome;
use super::reader::RawLine;
use crate::utils::config::{TuningDefaults, WorkerThreadLimits};
use crate::utils::limits::{bound_executor_threads, max_executors_by_memory};
use crate::{Opts, Quad, Result};

/// Concrete sizes for one run, derived from [`Opts`] with every bound applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineTuning {
    /// Sampling divisor M (≥ 1).
    pub sample_mod: u64,
    /// Reorder window W (≥ 1).
    pub window: usize,
    /// Parser pool size P.
    pub parser_threads: usize,
    /// Executor pool size E.
    pub executor_threads: usize,
    /// Line channel capacity C1.
    pub line_channel_cap: usize,
    /// Statement channel capacity C2.
    pub quad_channel_cap: usize,
    pub telemetry_interval: Duration,
    pub seed: Option<u64>,
}

impl PipelineTuning {
    /// Resolve against the current host: P defaults to the rayon thread count, E is capped by
    /// [`WorkerThreadLimits`] and available memory. A sampling divisor of 0 is rejected.
    pub fn resolve(opts: &Opts) -> Result<Self> {
        let limits = WorkerThreadLimits::current();
        Self::resolve_with(opts, &limits, max_executors_by_memory())
    }

    /// Same as [`resolve`](Self::resolve) with explicit host limits.
    pub fn resolve_with(
        opts: &Opts,
        limits: &WorkerThreadLimits,
        memory_cap: Option<usize>,
    ) -> Result<Self> {
        if opts.sample_mod == 0 {
            bail!("sample mod must be at least 1");
        }
        if opts.telemetry_interval.is_zero() {
            bail!("telemetry interval must be non-zero");
        }
        let parser_threads = opts
            .parser_threads
            .unwrap_or(limits.all_threads)
            .max(limits.floor);
        let executor_threads = bound_executor_threads(
            opts.executor_threads
                .unwrap_or(TuningDefaults::EXECUTOR_THREADS),
            limits,
            memory_cap,
        );
        Ok(Self {
            sample_mod: opts.sample_mod,
            window: opts.window.max(1),
            parser_threads,
            executor_threads,
            line_channel_cap: opts.line_channel_cap.max(1),
            quad_channel_cap: opts.quad_channel_cap.max(1),
            telemetry_interval: opts.telemetry_interval,
            seed: opts.seed,
        })
    }
}

/// Channels for one run. Reader gets `line_tx`; parsers get `line_rx`, `quad_tx`, `done_tx`;
/// executors get `quad_rx`; the orchestrator keeps `done_rx`.
pub struct PipelineChannels {
    pub line_tx: Sender<RawLine>,
    pub line_rx: Receiver<RawLine>,
    pub quad_tx: Sender<Quad>,
    pub quad_rx: Receiver<Quad>,
    pub done_tx: Sender<ParserOutcome>,
    pub done_rx: Receiver<ParserOutcome>,
}

pub fn create_pipeline_channels(tuning: &PipelineTuning) -> PipelineChannels {
    let (line_tx, line_rx) = bounded::<RawLine>(tuning.line_channel_cap);
    let (quad_tx, quad_rx) = bounded::<Quad>(tuning.quad_channel_cap);
    // One slot per parser so no worker blocks reporting completion.
    let (done_tx, done_rx) = bounded::<ParserOutcome>(tuning.parser_threads);
    PipelineChannels {
        line_tx,
        line_rx,
        quad_tx,
        quad_rx,
        done_tx,
        done_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(all_threads: usize) -> WorkerThreadLimits {
        WorkerThreadLimits {
            all_threads,
            ..WorkerThreadLimits::default()
        }
    }

    #[test]
    fn defaults_follow_host() {
        let t = PipelineTuning::resolve_with(&Opts::default(), &limits(6), None).unwrap();
        assert_eq!(t.parser_threads, 6);
        assert_eq!(t.executor_threads, 512);
        assert_eq!(t.window, 1000);
        assert_eq!(t.sample_mod, 1);
    }

    #[test]
    fn sizes_are_clamped() {
        let opts = Opts {
            window: 0,
            line_channel_cap: 0,
            quad_channel_cap: 0,
            parser_threads: Some(0),
            executor_threads: Some(1_000_000),
            ..Opts::default()
        };
        let t = PipelineTuning::resolve_with(&opts, &limits(4), Some(300)).unwrap();
        assert_eq!(t.window, 1);
        assert_eq!(t.line_channel_cap, 1);
        assert_eq!(t.quad_channel_cap, 1);
        assert_eq!(t.parser_threads, 1);
        assert_eq!(t.executor_threads, 300);
    }

    #[test]
    fn zero_sample_mod_is_rejected() {
        let opts = Opts {
            sample_mod: 0,
            ..Opts::default()
        };
        assert!(PipelineTuning::resolve_with(&opts, &limits(2), None).is_err());
    }
}
