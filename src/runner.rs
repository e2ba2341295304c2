// =============================================================================
// RUNNER - execute selected leaves and summarize
// =============================================================================
//
// Cases run one at a time in tree order. A support check failure skips the
// body. Errors become the status of their result type; a panic escaping a
// body becomes Crash so the remaining cases still run.

use anyhow::{Context as _, Result};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use crate::backend::context::validation_error_count;
use crate::status::{TestResult, TestStatus};
use crate::sync::thread_group::panic_message;
use crate::tree::{CaseFilter, TestCase, TestCaseGroup};

/// Verdict of one executed leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub path: String,
    pub status: TestStatus,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<CaseOutcome>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn count(&self, result: TestResult) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.result == result)
            .count()
    }

    /// Paths of cases that make the run fail
    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.result.is_failure())
    }

    /// 0 when no case is worse than CompatibilityWarning, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.failures().next().is_some() {
            1
        } else {
            0
        }
    }

    pub fn log(&self) {
        log::info!("Test run totals: {} cases", self.total());
        for result in TestResult::ALL {
            let count = self.count(result);
            if count > 0 {
                log::info!("  {:<22} {}", result.name(), count);
            }
        }
        for outcome in self.failures() {
            log::warn!("  {} : {}", outcome.path, outcome.status);
        }
    }
}

/// Line-per-case results sink: `path result message`
pub struct ResultsFile {
    writer: Mutex<BufWriter<File>>,
}

impl ResultsFile {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("Failed to create results file: {:?}", path))?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn record(&self, outcome: &CaseOutcome) -> Result<()> {
        let mut writer = self.writer.lock();
        writeln!(
            writer,
            "{} {} {}",
            outcome.path,
            outcome.status.result,
            outcome.status.message.replace('\n', " ")
        )?;
        writer.flush()?;
        Ok(())
    }
}

/// Support check, body, then the validation layer verdict
pub fn execute_case<C>(case: &TestCase<C>, context: &C) -> TestStatus {
    let errors_before = validation_error_count();

    let executed = panic::catch_unwind(AssertUnwindSafe(|| {
        case.check_support(context)?;
        case.execute(context)
    }));

    let status = match executed {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => e.into_status(),
        Err(payload) => TestStatus::new(TestResult::Crash, panic_message(payload.as_ref())),
    };

    let new_errors = validation_error_count().saturating_sub(errors_before);
    if status.is_pass() && new_errors > 0 {
        return TestStatus::fail(format!("{} validation errors reported", new_errors));
    }

    status
}

#[derive(Default)]
pub struct Runner {
    filter: CaseFilter,
    results_file: Option<ResultsFile>,
}

impl Runner {
    pub fn new(filter: CaseFilter) -> Self {
        Self {
            filter,
            results_file: None,
        }
    }

    pub fn with_results_file(mut self, results_file: ResultsFile) -> Self {
        self.results_file = Some(results_file);
        self
    }

    /// Leaf paths the filter selects, without running anything
    pub fn selected_paths<C>(&self, root: &TestCaseGroup<C>) -> Vec<String> {
        root.leaves()
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| self.filter.matches(path))
            .collect()
    }

    pub fn run<C>(&self, root: &TestCaseGroup<C>, context: &C) -> RunSummary {
        let mut summary = RunSummary::default();

        for (path, case) in root.leaves() {
            if !self.filter.matches(&path) {
                continue;
            }

            log::info!("Test case '{}'..", path);
            let start = Instant::now();
            let status = execute_case(case, context);

            match status.result {
                TestResult::Pass | TestResult::NotSupported => {
                    log::info!("  {} ({:.2?})", status, start.elapsed())
                }
                TestResult::QualityWarning | TestResult::CompatibilityWarning => log::warn!("  {}", status),
                _ => log::error!("  {}", status),
            }

            let outcome = CaseOutcome { path, status };
            if let Some(results_file) = &self.results_file {
                if let Err(e) = results_file.record(&outcome) {
                    log::error!("Failed to record result for {}: {:?}", outcome.path, e);
                }
            }
            summary.outcomes.push(outcome);
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TestError;

    fn case(name: &str, result: TestResult) -> TestCase<()> {
        TestCase::new(name, move |_: &()| Ok(TestStatus::new(result, "done")))
    }

    #[test]
    fn support_failure_skips_body() {
        let case = TestCase::new("skipped", |_: &()| -> Result<TestStatus, TestError> {
            panic!("body must not run")
        })
        .with_support(|_: &()| Err(TestError::not_supported("missing feature")));

        assert_eq!(execute_case(&case, &()), TestStatus::not_supported("missing feature"));
    }

    #[test]
    fn panicking_body_crashes() {
        let case = TestCase::new("boom", |_: &()| -> Result<TestStatus, TestError> { panic!("driver exploded") });

        let status = execute_case(&case, &());
        assert_eq!(status.result, TestResult::Crash);
        assert_eq!(status.message, "driver exploded");
    }

    #[test]
    fn exit_code_follows_worst_result() {
        let mut root = TestCaseGroup::new("root", "");
        root.add_case(case("pass", TestResult::Pass));
        root.add_case(case("unsupported", TestResult::NotSupported));
        root.add_case(case("warn", TestResult::QualityWarning));

        let summary = Runner::default().run(&root, &());
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.exit_code(), 0);

        root.add_case(case("broken", TestResult::Fail));
        let summary = Runner::default().run(&root, &());
        assert_eq!(summary.count(TestResult::Fail), 1);
        assert_eq!(summary.exit_code(), 1);
    }
}
