// Runner over a synthetic tree; cases take a plain counter as context

use std::sync::atomic::{AtomicU32, Ordering};

use vk_objmgmt_cts::runner::{ResultsFile, Runner};
use vk_objmgmt_cts::tree::{CaseFilter, TestCase, TestCaseGroup};
use vk_objmgmt_cts::{TestError, TestResult, TestStatus};

fn sample_tree() -> TestCaseGroup<AtomicU32> {
    let mut root = TestCaseGroup::new("root", "synthetic");

    let mut fast = TestCaseGroup::new("fast", "");
    fast.add_case(TestCase::new("ok", |runs: &AtomicU32| {
        runs.fetch_add(1, Ordering::SeqCst);
        Ok(TestStatus::pass("Ok"))
    }));
    fast.add_case(
        TestCase::new("unsupported", |runs: &AtomicU32| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(TestStatus::pass("Ok"))
        })
        .with_support(|_: &AtomicU32| Err(TestError::not_supported("feature missing"))),
    );
    root.add_group(fast);

    let mut slow = TestCaseGroup::new("slow", "");
    slow.add_case(TestCase::new("fails", |runs: &AtomicU32| {
        runs.fetch_add(1, Ordering::SeqCst);
        Err(TestError::fail("wrong handle"))
    }));
    slow.add_case(TestCase::new("crashes", |_: &AtomicU32| -> Result<TestStatus, TestError> {
        panic!("segfault-ish")
    }));
    root.add_group(slow);

    root
}

#[test]
fn runs_every_selected_case() {
    let root = sample_tree();
    let runs = AtomicU32::new(0);

    let summary = Runner::default().run(&root, &runs);

    assert_eq!(summary.total(), 4);
    assert_eq!(summary.count(TestResult::Pass), 1);
    assert_eq!(summary.count(TestResult::NotSupported), 1);
    assert_eq!(summary.count(TestResult::Fail), 1);
    assert_eq!(summary.count(TestResult::Crash), 1);
    assert_eq!(summary.exit_code(), 1);

    // The unsupported body never ran, the crashing one does not count
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn filter_limits_execution() {
    let root = sample_tree();
    let runs = AtomicU32::new(0);
    let runner = Runner::new(CaseFilter::new(vec!["root.fast.*".to_string()]));

    assert_eq!(runner.selected_paths(&root), vec!["root.fast.ok", "root.fast.unsupported"]);

    let summary = runner.run(&root, &runs);
    assert_eq!(summary.total(), 2);
    assert_eq!(summary.exit_code(), 0);
}

#[test]
fn results_file_has_one_line_per_case() {
    let root = sample_tree();
    let path = std::env::temp_dir().join(format!("objmgmt-results-{}.txt", std::process::id()));

    let runner = Runner::new(CaseFilter::default()).with_results_file(ResultsFile::create(&path).unwrap());
    runner.run(&root, &AtomicU32::new(0));
    drop(runner);

    let content = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "root.fast.ok Pass Ok");
    assert_eq!(lines[1], "root.fast.unsupported NotSupported feature missing");
    assert_eq!(lines[2], "root.slow.fails Fail wrong handle");
    assert_eq!(lines[3], "root.slow.crashes Crash segfault-ish");
}
