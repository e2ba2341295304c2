// Test verdicts
//
// TestResult is the per-case outcome, TestStatus pairs it with a message,
// ResultCollector folds many outcomes into the worst one.

use std::fmt;

/// Outcome of a single test case or worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestResult {
    Pass,
    NotSupported,
    QualityWarning,
    CompatibilityWarning,
    Fail,
    ResourceError,
    InternalError,
    Crash,
    Timeout,
}

impl TestResult {
    /// Every result, lowest priority first
    pub const ALL: [TestResult; 9] = [
        TestResult::Pass,
        TestResult::NotSupported,
        TestResult::QualityWarning,
        TestResult::CompatibilityWarning,
        TestResult::Fail,
        TestResult::ResourceError,
        TestResult::InternalError,
        TestResult::Crash,
        TestResult::Timeout,
    ];

    /// Higher priority wins when results are merged. A skipped worker
    /// outranks a passing one; crashes and internal errors outrank failures.
    pub fn priority(self) -> u32 {
        match self {
            TestResult::Pass => 10,
            TestResult::NotSupported => 20,
            TestResult::QualityWarning => 30,
            TestResult::CompatibilityWarning => 40,
            TestResult::Fail => 60,
            TestResult::ResourceError => 70,
            TestResult::InternalError => 80,
            TestResult::Crash => 90,
            TestResult::Timeout => 100,
        }
    }

    /// Whether this result should make the run exit non-zero
    pub fn is_failure(self) -> bool {
        self.priority() > TestResult::CompatibilityWarning.priority()
    }

    pub fn name(self) -> &'static str {
        match self {
            TestResult::NotSupported => "NotSupported",
            TestResult::Pass => "Pass",
            TestResult::QualityWarning => "QualityWarning",
            TestResult::CompatibilityWarning => "CompatibilityWarning",
            TestResult::Fail => "Fail",
            TestResult::ResourceError => "ResourceError",
            TestResult::InternalError => "InternalError",
            TestResult::Crash => "Crash",
            TestResult::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Verdict returned by a test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestStatus {
    pub result: TestResult,
    pub message: String,
}

impl TestStatus {
    pub fn new(result: TestResult, message: impl Into<String>) -> Self {
        Self { result, message: message.into() }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(TestResult::Pass, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(TestResult::Fail, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(TestResult::NotSupported, message)
    }

    pub fn is_pass(&self) -> bool {
        self.result == TestResult::Pass
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.result, self.message)
    }
}

/// Folds results into the highest-priority one.
///
/// Starts out as `Pass` with message "Pass". A result with strictly higher
/// priority replaces both result and message. A non-pass result with equal
/// priority appends its message, so several failing workers all show up.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    result: Option<TestResult>,
    message: String,
    prefix: String,
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Collector whose logged messages are prefixed, e.g. with a worker name
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            result: None,
            message: "Pass".to_string(),
            prefix: prefix.into(),
        }
    }

    pub fn result(&self) -> TestResult {
        self.result.unwrap_or(TestResult::Pass)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn add_result(&mut self, result: TestResult, message: impl Into<String>) {
        let message = message.into();

        if result != TestResult::Pass {
            log::info!("{}{}: {}", self.prefix, result, message);
        }

        match self.result {
            None => {
                self.result = Some(result);
                self.message = message;
            }
            Some(current) if result.priority() > current.priority() => {
                self.result = Some(result);
                self.message = message;
            }
            Some(current) if result == current && result != TestResult::Pass => {
                if !message.is_empty() && message != self.message {
                    self.message.push_str("; ");
                    self.message.push_str(&message);
                }
            }
            Some(_) => {}
        }
    }

    /// Records `result` unless `condition` holds; returns `condition`
    pub fn check_result(&mut self, condition: bool, result: TestResult, message: &str) -> bool {
        if !condition {
            self.add_result(result, message);
        }
        condition
    }

    pub fn check(&mut self, condition: bool, message: &str) -> bool {
        self.check_result(condition, TestResult::Fail, message)
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.add_result(TestResult::Fail, message);
    }

    pub fn into_status(self) -> TestStatus {
        TestStatus::new(self.result(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collector_passes() {
        let collector = ResultCollector::new();
        assert_eq!(collector.result(), TestResult::Pass);
        assert_eq!(collector.message(), "Pass");
    }

    #[test]
    fn worse_result_replaces_message() {
        let mut collector = ResultCollector::new();
        collector.add_result(TestResult::Pass, "Ok");
        collector.add_result(TestResult::QualityWarning, "slow");
        collector.add_result(TestResult::Fail, "broken");
        collector.add_result(TestResult::Pass, "Ok");

        assert_eq!(collector.result(), TestResult::Fail);
        assert_eq!(collector.message(), "broken");
    }

    #[test]
    fn equal_failures_are_combined() {
        let mut collector = ResultCollector::new();
        collector.fail("thread 0 failed");
        collector.fail("thread 1 failed");

        assert_eq!(collector.result(), TestResult::Fail);
        assert_eq!(collector.message(), "thread 0 failed; thread 1 failed");
    }

    #[test]
    fn not_supported_outranks_pass() {
        let mut collector = ResultCollector::new();
        collector.add_result(TestResult::NotSupported, "no feature");
        collector.add_result(TestResult::Pass, "Pass");
        assert_eq!(collector.result(), TestResult::NotSupported);
        assert_eq!(collector.message(), "no feature");

        let mut collector = ResultCollector::new();
        collector.add_result(TestResult::Pass, "Pass");
        collector.add_result(TestResult::NotSupported, "worker 1: no feature");
        assert_eq!(collector.result(), TestResult::NotSupported);
        assert_eq!(collector.message(), "worker 1: no feature");

        let mut collector = ResultCollector::new();
        collector.add_result(TestResult::NotSupported, "no feature");
        assert_eq!(collector.result(), TestResult::NotSupported);
    }

    #[test]
    fn crash_outranks_everything_but_timeout() {
        for result in TestResult::ALL {
            if result != TestResult::Timeout && result != TestResult::Crash {
                assert!(TestResult::Crash.priority() > result.priority(), "{}", result);
            }
        }
    }

    #[test]
    fn check_records_only_on_false() {
        let mut collector = ResultCollector::new();
        assert!(collector.check(true, "unused"));
        assert_eq!(collector.result(), TestResult::Pass);
        assert!(!collector.check(false, "value mismatch"));
        assert_eq!(collector.into_status(), TestStatus::fail("value mismatch"));
    }

    #[test]
    fn failure_threshold() {
        assert!(!TestResult::Pass.is_failure());
        assert!(!TestResult::NotSupported.is_failure());
        assert!(!TestResult::CompatibilityWarning.is_failure());
        assert!(TestResult::Fail.is_failure());
        assert!(TestResult::Crash.is_failure());
    }
}
