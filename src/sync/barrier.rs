// Spin barrier with early thread removal
//
// All registered threads must call sync() before any of them proceeds.
// A thread that is done (or failed) calls remove_thread() instead, which
// counts as arriving at the current barrier and shrinks the group for the
// following ones. No timeouts: a thread that never arrives blocks the rest.

use std::sync::atomic::{AtomicI32, Ordering};

/// How a thread waits for the others
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Busy-spin if every thread can have its own core, otherwise yield
    Auto,
    Busy,
    Yield,
}

pub struct SpinBarrier {
    num_cores: i32,
    num_threads: AtomicI32,
    num_entered: AtomicI32,
    num_leaving: AtomicI32,
    num_removed: AtomicI32,
}

impl SpinBarrier {
    pub fn new(num_threads: u32) -> Self {
        Self::with_cores(num_threads, num_cpus::get() as u32)
    }

    /// Barrier that assumes `num_cores` logical cores when resolving `WaitMode::Auto`
    pub fn with_cores(num_threads: u32, num_cores: u32) -> Self {
        debug_assert!(num_threads > 0);
        Self {
            num_cores: num_cores.max(1) as i32,
            num_threads: AtomicI32::new(num_threads as i32),
            num_entered: AtomicI32::new(0),
            num_leaving: AtomicI32::new(0),
            num_removed: AtomicI32::new(0),
        }
    }

    /// Re-arm for a new group. No thread may be inside the barrier.
    pub fn reset(&self, num_threads: u32) {
        debug_assert_eq!(self.num_leaving.load(Ordering::SeqCst), 0);
        debug_assert!(num_threads > 0);

        self.num_threads.store(num_threads as i32, Ordering::SeqCst);
        self.num_entered.store(0, Ordering::SeqCst);
        self.num_leaving.store(0, Ordering::SeqCst);
        self.num_removed.store(0, Ordering::SeqCst);
    }

    /// Number of threads the next sync waits for
    pub fn num_threads(&self) -> u32 {
        self.num_threads.load(Ordering::SeqCst).max(0) as u32
    }

    pub fn sync(&self, mode: WaitMode) {
        // num_threads only changes while every thread is inside the barrier,
        // so all participants see the same snapshot here.
        let cached_num_threads = self.num_threads.load(Ordering::SeqCst);
        let mode = self.resolve(mode, cached_num_threads);

        // num_entered must not be touched until every thread leaving the
        // previous barrier has observed it at zero.
        self.wait_for_leavers(mode);

        if self.num_entered.fetch_add(1, Ordering::SeqCst) + 1 == cached_num_threads {
            // This thread is not removed, so num_leaving stays >= 1 until
            // the decrement below.
            self.release();
        } else {
            while self.num_entered.load(Ordering::SeqCst) != 0 {
                wait(mode);
            }
        }

        self.num_leaving.fetch_sub(1, Ordering::SeqCst);
    }

    /// Leave the group. Counts as arriving at the current barrier.
    pub fn remove_thread(&self, mode: WaitMode) {
        let cached_num_threads = self.num_threads.load(Ordering::SeqCst);
        let mode = self.resolve(mode, cached_num_threads);

        self.wait_for_leavers(mode);

        // The last thread to enter applies the removal
        self.num_removed.fetch_add(1, Ordering::SeqCst);

        if self.num_entered.fetch_add(1, Ordering::SeqCst) + 1 == cached_num_threads {
            self.release();
        }
    }

    fn release(&self) {
        let removed = self.num_removed.swap(0, Ordering::SeqCst);
        let remaining = (self.num_threads.load(Ordering::SeqCst) - removed).max(0);

        self.num_threads.store(remaining, Ordering::SeqCst);
        self.num_leaving.store(remaining, Ordering::SeqCst);
        self.num_entered.store(0, Ordering::SeqCst);
    }

    fn wait_for_leavers(&self, mode: WaitMode) {
        while self.num_leaving.load(Ordering::SeqCst) > 0 {
            wait(mode);
        }
    }

    fn resolve(&self, mode: WaitMode, num_threads: i32) -> WaitMode {
        match mode {
            WaitMode::Auto if num_threads <= self.num_cores => WaitMode::Busy,
            WaitMode::Auto => WaitMode::Yield,
            other => other,
        }
    }
}

#[inline]
fn wait(mode: WaitMode) {
    match mode {
        WaitMode::Yield => std::thread::yield_now(),
        _ => std::hint::spin_loop(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn single_thread_never_blocks() {
        let barrier = SpinBarrier::new(1);
        for _ in 0..10 {
            barrier.sync(WaitMode::Busy);
        }
        barrier.remove_thread(WaitMode::Busy);
        assert_eq!(barrier.num_threads(), 0);
    }

    #[test]
    fn auto_mode_depends_on_core_count() {
        let barrier = SpinBarrier::with_cores(4, 2);
        assert_eq!(barrier.resolve(WaitMode::Auto, 2), WaitMode::Busy);
        assert_eq!(barrier.resolve(WaitMode::Auto, 4), WaitMode::Yield);
        assert_eq!(barrier.resolve(WaitMode::Busy, 64), WaitMode::Busy);
    }

    #[test]
    fn sync_orders_phases() {
        const THREADS: u32 = 4;
        const PHASES: u32 = 50;

        let barrier = SpinBarrier::with_cores(THREADS, 1);
        let counter = AtomicU32::new(0);

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for phase in 0..PHASES {
                        counter.fetch_add(1, Ordering::SeqCst);
                        barrier.sync(WaitMode::Auto);
                        // Every thread has incremented for this phase
                        assert!(counter.load(Ordering::SeqCst) >= (phase + 1) * THREADS);
                        barrier.sync(WaitMode::Auto);
                    }
                    barrier.remove_thread(WaitMode::Auto);
                });
            }
        });

        assert_eq!(counter.load(Ordering::SeqCst), THREADS * PHASES);
        assert_eq!(barrier.num_threads(), 0);
    }

    #[test]
    fn removed_thread_does_not_block_survivors() {
        let barrier = SpinBarrier::with_cores(3, 1);

        std::thread::scope(|s| {
            // Leaves immediately
            s.spawn(|| barrier.remove_thread(WaitMode::Auto));

            for _ in 0..2 {
                s.spawn(|| {
                    for _ in 0..20 {
                        barrier.sync(WaitMode::Auto);
                    }
                    barrier.remove_thread(WaitMode::Auto);
                });
            }
        });

        assert_eq!(barrier.num_threads(), 0);
    }

    #[test]
    fn reset_rearms() {
        let barrier = SpinBarrier::new(1);
        barrier.remove_thread(WaitMode::Busy);
        barrier.reset(2);
        assert_eq!(barrier.num_threads(), 2);

        std::thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| {
                    barrier.sync(WaitMode::Yield);
                    barrier.remove_thread(WaitMode::Yield);
                });
            }
        });
        assert_eq!(barrier.num_threads(), 0);
    }
}
