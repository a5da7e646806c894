//! Shared pipeline counters. One instance per run, injected into every stage.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters updated with atomic adds only.
///
/// At any observation `processed + ignored <= parsed <= read`; all equalities hold once a run
/// completes without error.
#[derive(Debug, Default)]
pub struct Counters {
    read: AtomicU64,
    parsed: AtomicU64,
    processed: AtomicU64,
    ignored: AtomicU64,
}

/// Point-in-time copy of [`Counters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub read: u64,
    pub parsed: u64,
    pub processed: u64,
    pub ignored: u64,
}

impl CounterSnapshot {
    /// Parsed statements not yet processed or ignored.
    pub fn pending(&self) -> u64 {
        self.parsed
            .saturating_sub(self.processed)
            .saturating_sub(self.ignored)
    }
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_read(&self) {
        self.read.fetch_add(1, Ordering::Release);
    }

    pub fn incr_parsed(&self) {
        self.parsed.fetch_add(1, Ordering::Release);
    }

    pub fn incr_processed(&self) {
        self.processed.fetch_add(1, Ordering::Release);
    }

    pub fn incr_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Release);
    }

    pub fn read(&self) -> u64 {
        self.read.load(Ordering::Relaxed)
    }

    pub fn parsed(&self) -> u64 {
        self.parsed.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Load downstream counters first so a concurrent snapshot never shows `parsed < processed + ignored`.
    pub fn snapshot(&self) -> CounterSnapshot {
        let processed = self.processed.load(Ordering::Acquire);
        let ignored = self.ignored.load(Ordering::Acquire);
        let parsed = self.parsed.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        CounterSnapshot {
            read,
            parsed,
            processed,
            ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let ctr = Arc::new(Counters::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctr = Arc::clone(&ctr);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        ctr.incr_read();
                        ctr.incr_parsed();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = ctr.snapshot();
        assert_eq!(snap.read, 8000);
        assert_eq!(snap.parsed, 8000);
        assert_eq!(snap.pending(), 8000);
    }

    #[test]
    fn pending_never_underflows() {
        let snap = CounterSnapshot {
            read: 1,
            parsed: 1,
            processed: 1,
            ignored: 1,
        };
        assert_eq!(snap.pending(), 0);
    }
}
