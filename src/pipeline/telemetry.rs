//! Periodic counter reporter. Reads counters lock-free on a ticker and never blocks the workers.

use crossbeam_channel::{Sender, bounded, select, tick};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::counters::{CounterSnapshot, Counters};
use super::error_handler::{Abort, PipelineError};

/// Callback types handed to the reporter.
pub type QueueLen = Box<dyn Fn() -> usize + Send>;
pub type OnProgress = Box<dyn Fn(usize) + Send>;

/// Format a snapshot line, or None when `processed` hasn't moved since `prev_processed`.
pub fn snapshot_line(prev_processed: u64, snap: &CounterSnapshot, queued: usize) -> Option<String> {
    if snap.processed == prev_processed {
        return None;
    }
    Some(format!(
        "Counters read={} parsed={} processed={} ignored={} pending={} queued={}",
        snap.read,
        snap.parsed,
        snap.processed,
        snap.ignored,
        snap.pending(),
        queued
    ))
}

/// Running reporter. Call [`Telemetry::stop`] to end it.
pub struct Telemetry {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Telemetry {
    /// Stop the ticker and wait for the reporter thread.
    pub fn stop(self) {
        drop(self.stop_tx);
        if self.handle.join().is_err() {
            log::warn!("telemetry thread panicked");
        }
    }
}

/// Everything the reporter reads. `cancel` is polled each tick; when set, the pipeline is aborted.
pub struct TelemetryParams {
    pub interval: Duration,
    pub counters: Arc<Counters>,
    pub abort: Arc<Abort>,
    pub queued: QueueLen,
    pub cancel: Option<Arc<AtomicBool>>,
    pub on_progress: Option<OnProgress>,
}

pub fn spawn_telemetry(params: TelemetryParams) -> std::io::Result<Telemetry> {
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let handle = thread::Builder::new()
        .name("telemetry".to_string())
        .spawn(move || {
            let TelemetryParams {
                interval,
                counters,
                abort,
                queued,
                cancel,
                on_progress,
            } = params;
            let ticker = tick(interval);
            let mut prev = 0_u64;
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed)) && !abort.is_aborted() {
                            abort.fail(PipelineError::Cancelled);
                        }
                        let snap = counters.snapshot();
                        if let Some(line) = snapshot_line(prev, &snap, queued()) {
                            log::info!("{}", line);
                            if let Some(cb) = on_progress.as_ref() {
                                cb((snap.processed - prev) as usize);
                            }
                            prev = snap.processed;
                        }
                    },
                    recv(stop_rx) -> _ => break,
                }
            }
        })?;
    Ok(Telemetry { stop_tx, handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn stalled_processed_is_suppressed() {
        let snap = CounterSnapshot {
            read: 10,
            parsed: 8,
            processed: 5,
            ignored: 1,
        };
        assert!(snapshot_line(5, &snap, 0).is_none());
        let line = snapshot_line(4, &snap, 3).unwrap();
        assert!(line.contains("processed=5"));
        assert!(line.contains("pending=2"));
        assert!(line.contains("queued=3"));
    }

    #[test]
    fn reporter_sees_progress_and_honours_cancel() {
        let counters = Arc::new(Counters::new());
        let abort = Arc::new(Abort::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(Mutex::new(0_usize));
        let seen_cb = Arc::clone(&seen);
        let t = spawn_telemetry(TelemetryParams {
            interval: Duration::from_millis(10),
            counters: Arc::clone(&counters),
            abort: Arc::clone(&abort),
            queued: Box::new(|| 0),
            cancel: Some(Arc::clone(&cancel)),
            on_progress: Some(Box::new(move |n| *seen_cb.lock().unwrap() += n)),
        })
        .unwrap();
        for _ in 0..3 {
            counters.incr_processed();
        }
        thread::sleep(Duration::from_millis(60));
        cancel.store(true, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(60));
        t.stop();
        assert_eq!(*seen.lock().unwrap(), 3);
        assert!(matches!(abort.take_error(), Some(PipelineError::Cancelled)));
    }
}
