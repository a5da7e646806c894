//! Randomizing line reader: bounded reorder window in front of the line channel.

use crossbeam_channel::Sender;
use rand::Rng;
use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::counters::Counters;
use super::error_handler::{Abort, PipelineError, send_or_abort};
use crate::rdf::is_skippable;

/// One raw input line with its 1-based line number in the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLine {
    pub number: u64,
    pub text: String,
}

/// Fixed-capacity reorder buffer with replace-and-emit semantics.
///
/// While filling, items are stored in arrival order and nothing is emitted. Once full, each
/// offered item evicts the occupant of a uniformly random slot, which is returned to the caller.
/// Every item offered comes out exactly once: either evicted by [`Window::offer`] or left for
/// [`Window::drain`]. A capacity of 1 reproduces input order.
#[derive(Debug)]
pub struct Window<T> {
    slots: Vec<T>,
    capacity: usize,
}

impl<T> Window<T> {
    /// Capacity 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    /// Store `item`; once full, swap it into slot `rng.gen_range(0..capacity)` and return the evicted item.
    pub fn offer<R: Rng + ?Sized>(&mut self, item: T, rng: &mut R) -> Option<T> {
        if !self.is_full() {
            self.slots.push(item);
            return None;
        }
        let k = rng.gen_range(0..self.capacity);
        Some(std::mem::replace(&mut self.slots[k], item))
    }

    /// Remaining items in slot order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, T> {
        self.slots.drain(..)
    }
}

/// Read `source` line by line through a [`Window`] of `window` slots, emitting on `line_tx`.
///
/// Blank and `#` lines are skipped and not counted. `read` is bumped once per counted line consumed
/// from the source. A read error aborts the pipeline. The channel closes when this returns
/// (`line_tx` is dropped). Returns the number of lines emitted.
pub fn run_reader<B, R>(
    source: B,
    line_tx: Sender<RawLine>,
    window: usize,
    rng: &mut R,
    counters: &Counters,
    abort: &Abort,
) -> u64
where
    B: BufRead,
    R: Rng + ?Sized,
{
    let mut buf = Window::new(window);
    let mut emitted = 0_u64;
    let mut number = 0_u64;

    for line in source.lines() {
        number += 1;
        let text = match line {
            Ok(t) => t,
            Err(source) => {
                abort.fail(PipelineError::Read {
                    line: number - 1,
                    source,
                });
                return emitted;
            }
        };
        if is_skippable(&text) {
            continue;
        }
        counters.incr_read();
        if let Some(out) = buf.offer(RawLine { number, text }, rng) {
            if !send_or_abort(&line_tx, out, abort) {
                return emitted;
            }
            emitted += 1;
        }
    }

    for out in buf.drain() {
        if !send_or_abort(&line_tx, out, abort) {
            return emitted;
        }
        emitted += 1;
    }
    log::debug!("reader: end of input after {} lines, {} emitted", number, emitted);
    drop(line_tx);
    emitted
}

/// Spawn the reader thread. The reorder RNG is created inside the thread from `make_rng`.
pub fn spawn_reader<B, R, F>(
    source: B,
    line_tx: Sender<RawLine>,
    window: usize,
    make_rng: F,
    counters: Arc<Counters>,
    abort: Arc<Abort>,
) -> std::io::Result<JoinHandle<u64>>
where
    B: BufRead + Send + 'static,
    R: Rng,
    F: FnOnce() -> R + Send + 'static,
{
    thread::Builder::new()
        .name("reader".to_string())
        .spawn(move || {
            let mut rng = make_rng();
            run_reader(source, line_tx, window, &mut rng, &counters, &abort)
        })
}
