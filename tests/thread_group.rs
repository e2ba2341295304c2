// ThreadGroup behaviour without a Vulkan driver

use std::sync::atomic::{AtomicU32, Ordering};

use vk_objmgmt_cts::sync::{ThreadBarrier, ThreadGroup};
use vk_objmgmt_cts::{TestError, TestResult};

fn passing(_: &ThreadBarrier<'_>) -> Result<(), TestError> {
    Ok(())
}

#[test]
fn all_workers_pass() {
    let mut group = ThreadGroup::new();
    for _ in 0..4 {
        group.add(Box::new(passing));
    }

    let status = group.run();
    assert_eq!(status.result, TestResult::Pass);
}

#[test]
fn workers_share_borrowed_state() {
    const THREADS: u32 = 6;
    const ITERS: u32 = 25;

    let counter = AtomicU32::new(0);
    let mut group = ThreadGroup::new();

    for _ in 0..THREADS {
        group.add(Box::new(|barrier: &ThreadBarrier<'_>| {
            for _ in 0..ITERS {
                barrier.sync();
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }));
    }

    assert!(group.run().is_pass());
    drop(group);
    assert_eq!(counter.load(Ordering::SeqCst), THREADS * ITERS);
}

#[test]
fn one_failure_fails_the_group() {
    let mut group = ThreadGroup::new();
    group.add(Box::new(passing));
    group.add(Box::new(|_: &ThreadBarrier<'_>| Err(TestError::fail("object mismatch"))));
    group.add(Box::new(passing));

    let status = group.run();
    assert_eq!(status.result, TestResult::Fail);
    assert!(status.message.contains("object mismatch"), "{}", status.message);
}

#[test]
fn early_failure_does_not_block_syncing_workers() {
    let mut group = ThreadGroup::new();

    // Leaves before the first sync
    group.add(Box::new(|_: &ThreadBarrier<'_>| Err(TestError::fail("gave up"))));

    for _ in 0..3 {
        group.add(Box::new(|barrier: &ThreadBarrier<'_>| {
            for _ in 0..20 {
                barrier.sync();
            }
            Ok(())
        }));
    }

    assert_eq!(group.run().result, TestResult::Fail);
}

#[test]
fn panicking_worker_is_reported_as_failure() {
    let mut group = ThreadGroup::new();
    group.add(Box::new(passing));
    group.add(Box::new(|barrier: &ThreadBarrier<'_>| -> Result<(), TestError> {
        barrier.sync();
        panic!("worker blew up")
    }));
    group.add(Box::new(|barrier: &ThreadBarrier<'_>| {
        for _ in 0..5 {
            barrier.sync();
        }
        Ok(())
    }));

    let status = group.run();
    assert_eq!(status.result, TestResult::Fail);
    assert!(status.message.contains("worker blew up"), "{}", status.message);
}

#[test]
fn worst_result_wins() {
    let mut group = ThreadGroup::new();
    group.add(Box::new(|_: &ThreadBarrier<'_>| Err(TestError::not_supported("no events"))));
    group.add(Box::new(|_: &ThreadBarrier<'_>| {
        Err(TestError::Vk {
            call: "vkCreateBuffer",
            result: ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
        })
    }));
    group.add(Box::new(|_: &ThreadBarrier<'_>| Err(TestError::fail("bad handle"))));

    let status = group.run();
    assert_eq!(status.result, TestResult::ResourceError);
    assert!(status.message.contains("vkCreateBuffer"), "{}", status.message);
}

#[test]
fn skipped_worker_is_not_hidden_by_passing_one() {
    let mut group = ThreadGroup::new();
    group.add(Box::new(passing));
    group.add(Box::new(|_: &ThreadBarrier<'_>| Err(TestError::not_supported("no events"))));

    let status = group.run();
    assert_eq!(status.result, TestResult::NotSupported);
    assert!(status.message.contains("no events"), "{}", status.message);
}

#[test]
fn group_can_run_twice() {
    let mut group = ThreadGroup::new();
    for _ in 0..3 {
        group.add(Box::new(|barrier: &ThreadBarrier<'_>| {
            barrier.sync();
            Ok(())
        }));
    }

    assert!(group.run().is_pass());
    assert!(group.run().is_pass());
}
