//! Host resource limits for capping the executor pool.

use sysinfo::System;

use super::config::WorkerThreadLimits;

/// Bytes of memory currently available, or `None` if the platform doesn't report it.
pub fn available_memory_bytes() -> Option<u64> {
    let mut sys = System::new();
    sys.refresh_memory();
    match sys.available_memory() {
        0 => None,
        n => Some(n),
    }
}

/// Max executor threads whose stacks fit in the usable share of available memory.
/// Returns `None` if no memory figure is available (use caller's default).
pub fn max_executors_by_memory() -> Option<usize> {
    let avail = available_memory_bytes()?;
    let usable = (avail as f64 * WorkerThreadLimits::EXECUTOR_MEMORY_FRACTION) as u64;
    let per_worker = WorkerThreadLimits::EXECUTOR_STACK_SIZE as u64;
    Some(((usable / per_worker) as usize).max(WorkerThreadLimits::FLOOR_THREADS))
}

/// Clamp a requested executor count to `[floor, executor_max]` and to the memory cap (when known).
pub fn bound_executor_threads(requested: usize, limits: &WorkerThreadLimits, memory_cap: Option<usize>) -> usize {
    let mut n = requested.clamp(limits.floor, limits.executor_max);
    if let Some(cap) = memory_cap
        && cap < n
    {
        log::debug!("Capping executor threads {} -> {} (memory)", n, cap);
        n = cap;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_respects_hard_cap_and_floor() {
        let limits = WorkerThreadLimits::default();
        assert_eq!(bound_executor_threads(0, &limits, None), 1);
        assert_eq!(bound_executor_threads(100_000, &limits, None), limits.executor_max);
        assert_eq!(bound_executor_threads(64, &limits, None), 64);
    }

    #[test]
    fn bound_respects_memory_cap() {
        let limits = WorkerThreadLimits::default();
        assert_eq!(bound_executor_threads(512, &limits, Some(40)), 40);
        assert_eq!(bound_executor_threads(8, &limits, Some(40)), 8);
    }
}
