// Thread group - launch workers together, merge their verdicts
//
// Workers share one SpinBarrier. A worker that returns early, fails or
// panics is removed from the barrier so the remaining workers keep going.
// Each worker reports into its own ResultCollector; run() folds them into
// a single TestStatus.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crate::error::TestError;
use crate::status::{ResultCollector, TestResult, TestStatus};

use super::barrier::{SpinBarrier, WaitMode};

/// Barrier view handed to a running worker
pub struct ThreadBarrier<'b> {
    barrier: &'b SpinBarrier,
}

impl ThreadBarrier<'_> {
    /// Wait until every live worker in the group reaches this point
    pub fn sync(&self) {
        self.barrier.sync(WaitMode::Auto);
    }
}

/// Body of one worker
pub trait ThreadGroupThread: Send {
    fn run_thread(&mut self, barrier: &ThreadBarrier<'_>) -> Result<(), TestError>;
}

/// Closures make quick workers, mostly for tests
impl<F> ThreadGroupThread for F
where
    F: FnMut(&ThreadBarrier<'_>) -> Result<(), TestError> + Send,
{
    fn run_thread(&mut self, barrier: &ThreadBarrier<'_>) -> Result<(), TestError> {
        self(barrier)
    }
}

pub struct ThreadGroup<'a> {
    threads: Vec<Box<dyn ThreadGroupThread + 'a>>,
    barrier: SpinBarrier,
}

impl Default for ThreadGroup<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ThreadGroup<'a> {
    pub fn new() -> Self {
        Self {
            threads: Vec::new(),
            barrier: SpinBarrier::new(1),
        }
    }

    pub fn add(&mut self, thread: Box<dyn ThreadGroupThread + 'a>) {
        self.threads.push(thread);
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Start all workers, join them and merge their results
    pub fn run(&mut self) -> TestStatus {
        if self.threads.is_empty() {
            return TestStatus::pass("No threads");
        }

        self.barrier.reset(self.threads.len() as u32);

        let barrier = &self.barrier;
        let threads = &mut self.threads;

        let thread_results: Vec<ResultCollector> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(threads.len());

            for (ndx, worker) in threads.iter_mut().enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("group-worker-{}", ndx))
                    .spawn_scoped(scope, move || run_worker(ndx, worker.as_mut(), barrier));

                match spawned {
                    Ok(handle) => handles.push(Ok(handle)),
                    Err(e) => {
                        // Never started, so it must not hold up the others
                        barrier.remove_thread(WaitMode::Auto);
                        log::error!("Failed to start worker {}: {}", ndx, e);
                        handles.push(Err(format!("Failed to start thread: {}", e)));
                    }
                }
            }

            handles
                .into_iter()
                .map(|handle| match handle {
                    Ok(handle) => handle.join().unwrap_or_else(|payload| {
                        let mut results = ResultCollector::new();
                        results.add_result(TestResult::Crash, panic_message(payload.as_ref()));
                        results
                    }),
                    Err(message) => {
                        let mut results = ResultCollector::new();
                        results.fail(message);
                        results
                    }
                })
                .collect()
        });

        let mut collector = ResultCollector::new();
        for results in &thread_results {
            collector.add_result(results.result(), results.message());
        }
        collector.into_status()
    }
}

fn run_worker<'w>(
    ndx: usize,
    worker: &mut (dyn ThreadGroupThread + 'w),
    barrier: &SpinBarrier,
) -> ResultCollector {
    let mut results = ResultCollector::with_prefix(format!("[worker {}] ", ndx));
    let thread_barrier = ThreadBarrier { barrier };

    match panic::catch_unwind(AssertUnwindSafe(|| worker.run_thread(&thread_barrier))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => results.add_result(e.result(), e.to_string()),
        Err(payload) => results.fail(panic_message(payload.as_ref())),
    }

    barrier.remove_thread(WaitMode::Auto);
    results
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Exception".to_string()
    }
}

/// Worker count for multithreaded cases: logical cores clamped to [2, 8]
pub fn default_thread_count() -> u32 {
    (num_cpus::get() as u32).clamp(2, 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_passes() {
        let mut group = ThreadGroup::new();
        assert!(group.run().is_pass());
    }

    #[test]
    fn panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(17u32);
        assert_eq!(panic_message(payload.as_ref()), "Exception");
    }

    #[test]
    fn default_thread_count_is_clamped() {
        let count = default_thread_count();
        assert!((2..=8).contains(&count));
    }
}
