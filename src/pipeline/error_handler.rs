//! First-error capture and the shared abort signal fanned out to every pool.

use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::sync::Mutex;
use thiserror::Error;

use crate::rdf::ParseError;

/// A fatal pipeline failure, naming the stage and the offending input.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("read failed after line {line}: {source}")]
    Read {
        line: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("parse failed at line {line} ({input:?}): {source}")]
    Parse {
        line: u64,
        input: String,
        #[source]
        source: ParseError,
    },
    #[error("store mutation failed for subject {subject:?}: {message}")]
    Store { subject: String, message: String },
    #[error("could not start {stage} worker: {source}")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} worker panicked")]
    Panicked { stage: &'static str },
    #[error("load cancelled")]
    Cancelled,
}

/// Shared abort state: the first recorded error wins, and recording it closes `done` so every
/// blocked send/recv that selects on [`Abort::signal`] wakes up.
pub struct Abort {
    first_error: Mutex<Option<PipelineError>>,
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

impl Default for Abort {
    fn default() -> Self {
        Self::new()
    }
}

impl Abort {
    pub fn new() -> Self {
        let (trigger, done) = bounded::<()>(0);
        Self {
            first_error: Mutex::new(None),
            trigger: Mutex::new(Some(trigger)),
            done,
        }
    }

    /// Record `err` if no error was recorded yet, then fire the signal. Later errors are logged and dropped.
    pub fn fail(&self, err: PipelineError) {
        match self.first_error.lock() {
            Ok(mut slot) => {
                if slot.is_none() {
                    log::error!("Aborting load: {}", err);
                    *slot = Some(err);
                } else {
                    log::debug!("Suppressed error after abort: {}", err);
                }
            }
            Err(poisoned) => {
                poisoned.into_inner().get_or_insert(err);
            }
        }
        self.fire();
    }

    fn fire(&self) {
        let sender = match self.trigger.lock() {
            Ok(mut t) => t.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        // Dropping the only sender disconnects `done`.
        drop(sender);
    }

    pub fn is_aborted(&self) -> bool {
        match self.trigger.lock() {
            Ok(t) => t.is_none(),
            Err(_) => true,
        }
    }

    /// Receiver that becomes ready (disconnected) once the pipeline aborts.
    pub fn signal(&self) -> &Receiver<()> {
        &self.done
    }

    /// Take the recorded error, if any.
    pub fn take_error(&self) -> Option<PipelineError> {
        match self.first_error.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Blocking send that gives up when the pipeline aborts or the receivers are gone.
/// Returns false when the item was not delivered.
pub fn send_or_abort<T>(tx: &Sender<T>, item: T, abort: &Abort) -> bool {
    select! {
        send(tx, item) -> res => res.is_ok(),
        recv(abort.signal()) -> _ => false,
    }
}

/// Blocking receive that returns None on end-of-stream or abort.
pub fn recv_or_abort<T>(rx: &Receiver<T>, abort: &Abort) -> Option<T> {
    select! {
        recv(rx) -> msg => msg.ok(),
        recv(abort.signal()) -> _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn first_error_wins() {
        let abort = Abort::new();
        assert!(!abort.is_aborted());
        abort.fail(PipelineError::Cancelled);
        abort.fail(PipelineError::Panicked { stage: "parser" });
        assert!(abort.is_aborted());
        assert!(matches!(abort.take_error(), Some(PipelineError::Cancelled)));
        assert!(abort.take_error().is_none());
    }

    #[test]
    fn abort_unblocks_full_channel_send() {
        let abort = std::sync::Arc::new(Abort::new());
        let (tx, _rx) = bounded::<u32>(1);
        assert!(send_or_abort(&tx, 1, &abort));
        let a = std::sync::Arc::clone(&abort);
        let h = thread::spawn(move || send_or_abort(&tx, 2, &a));
        thread::sleep(Duration::from_millis(50));
        abort.fail(PipelineError::Cancelled);
        assert!(!h.join().unwrap());
    }

    #[test]
    fn recv_sees_end_of_stream() {
        let abort = Abort::new();
        let (tx, rx) = bounded::<u32>(2);
        tx.send(7).unwrap();
        drop(tx);
        assert_eq!(recv_or_abort(&rx, &abort), Some(7));
        assert_eq!(recv_or_abort(&rx, &abort), None);
    }
}
