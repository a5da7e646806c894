//! Mutation executor pool: E workers apply sampled quads to the graph store.

use crossbeam_channel::Receiver;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::counters::Counters;
use super::error_handler::{Abort, PipelineError, recv_or_abort};
use super::sampling::Sampler;
use crate::store::{GraphStore, NodeHandle, Props};
use crate::utils::config::{ENTITY_LABEL, WorkerThreadLimits, XID_KEY};
use crate::{Quad, QuadObject, Result};

/// Get-or-create the entity node for external id `xid`.
pub fn resolve_node(store: &dyn GraphStore, xid: &str) -> Result<NodeHandle> {
    let (handle, created) = store.get_or_create_node(ENTITY_LABEL, XID_KEY, xid)?;
    if created {
        log::debug!("Added new entity id={} {}={}", handle.0, XID_KEY, xid);
    }
    Ok(handle)
}

/// Apply one quad: an edge between two entities, or a property on the subject.
pub fn apply_quad(store: &dyn GraphStore, quad: &Quad) -> Result<()> {
    let subject = resolve_node(store, &quad.subject)?;
    match &quad.object {
        QuadObject::Id(object_id) => {
            let object = resolve_node(store, object_id)?;
            store.relate(subject, &quad.predicate, object, &Props::new())
        }
        QuadObject::Value(value) => store.merge_property(subject, &quad.property_name(), value),
    }
}

/// Drain `quad_rx`: sample, apply, count. A store error aborts the pipeline. Returns quads processed by this worker.
pub fn executor_loop(
    quad_rx: &Receiver<Quad>,
    store: &dyn GraphStore,
    sampler: Sampler,
    counters: &Counters,
    abort: &Abort,
) -> u64 {
    let mut processed = 0_u64;
    while let Some(quad) = recv_or_abort(quad_rx, abort) {
        if !sampler.accept(&quad.subject) {
            counters.incr_ignored();
            continue;
        }
        if let Err(e) = apply_quad(store, &quad) {
            abort.fail(PipelineError::Store {
                subject: quad.subject,
                message: format!("{e:#}"),
            });
            break;
        }
        counters.incr_processed();
        processed += 1;
    }
    processed
}

/// Spawn `num_threads` executor workers with small stacks. A worker that panics aborts the
/// pipeline with [`PipelineError::Panicked`]. If a thread can't be spawned the pipeline is aborted
/// and the workers started so far are returned.
pub fn spawn_executors(
    num_threads: usize,
    quad_rx: &Receiver<Quad>,
    store: &Arc<dyn GraphStore>,
    sampler: Sampler,
    counters: &Arc<Counters>,
    abort: &Arc<Abort>,
) -> Vec<JoinHandle<u64>> {
    let mut handles = Vec::with_capacity(num_threads);
    for i in 0..num_threads {
        let quad_rx = quad_rx.clone();
        let store = Arc::clone(store);
        let counters = Arc::clone(counters);
        let abort_w = Arc::clone(abort);
        let spawned = thread::Builder::new()
            .name(format!("exec-{i}"))
            .stack_size(WorkerThreadLimits::EXECUTOR_STACK_SIZE)
            .spawn(move || {
                let worker = panic::catch_unwind(AssertUnwindSafe(|| {
                    executor_loop(&quad_rx, store.as_ref(), sampler, &counters, &abort_w)
                }));
                // A dead executor stops draining the quad channel; abort so blocked senders wake.
                worker.unwrap_or_else(|_| {
                    abort_w.fail(PipelineError::Panicked { stage: "executor" });
                    0
                })
            });
        match spawned {
            Ok(h) => handles.push(h),
            Err(source) => {
                abort.fail(PipelineError::Spawn {
                    stage: "executor",
                    source,
                });
                break;
            }
        }
    }
    handles
}
