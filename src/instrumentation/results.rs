//! Per-test outcomes derived from instrumentation status events.
use super::parser::{ResultEvent, StatusEvent};
use serde::Serialize;

pub const STATUS_CODE_START: i32 = 1;
pub const STATUS_CODE_IN_PROGRESS: i32 = 2;
pub const STATUS_CODE_OK: i32 = 0;
pub const STATUS_CODE_ERROR: i32 = -1;
pub const STATUS_CODE_FAILURE: i32 = -2;
pub const STATUS_CODE_IGNORED: i32 = -3;
pub const STATUS_CODE_ASSUMPTION_FAILURE: i32 = -4;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Pass,
    Fail,
    Skip,
    Crash,
    Unknown,
}

impl ResultType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Crash => "crash",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub name: String,
    pub result_type: ResultType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub crashed: usize,
    pub unknown: usize,
}

impl TestSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.result_type {
                ResultType::Pass => summary.passed += 1,
                ResultType::Fail => summary.failed += 1,
                ResultType::Skip => summary.skipped += 1,
                ResultType::Crash => summary.crashed += 1,
                ResultType::Unknown => summary.unknown += 1,
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.crashed == 0 && self.unknown == 0
    }
}

/// Folds status events into test results as they arrive.
///
/// A test opens on `START` and closes on the next terminal code. A test that
/// is still open when another starts, or when the stream ends, crashed.
#[derive(Debug, Default)]
pub struct TestResultCollector {
    current: Option<String>,
    results: Vec<TestResult>,
}

impl TestResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results completed so far, in completion order.
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn observe(&mut self, event: &StatusEvent) {
        let result_type = match event.code {
            STATUS_CODE_START => {
                if let Some(name) = self.current.take() {
                    tracing::warn!(test = %name, "test started before previous test finished");
                    self.push_crash(name);
                }
                self.current = Some(test_name(event).unwrap_or_default());
                return;
            }
            STATUS_CODE_IN_PROGRESS => return,
            STATUS_CODE_OK => ResultType::Pass,
            STATUS_CODE_ERROR | STATUS_CODE_FAILURE => ResultType::Fail,
            STATUS_CODE_IGNORED | STATUS_CODE_ASSUMPTION_FAILURE => ResultType::Skip,
            code => {
                tracing::warn!(code, "unknown instrumentation status code");
                ResultType::Unknown
            }
        };
        let opened = self.current.take();
        let name = test_name(event).or(opened).unwrap_or_default();
        self.results.push(TestResult {
            name,
            result_type,
            log: event.bundle.get("stack").map(str::to_string),
        });
    }

    /// Close the stream, marking any still-running test as crashed.
    ///
    /// A `shortMsg` in the result bundle means the instrumentation process
    /// itself died; its text becomes the crashed test's log.
    pub fn finish(mut self, result: &ResultEvent) -> Vec<TestResult> {
        if let Some(name) = self.current.take() {
            self.push_crash(name);
            if let (Some(last), Some(msg)) = (self.results.last_mut(), result.bundle.get("shortMsg"))
            {
                last.log = Some(msg.to_string());
            }
        }
        self.results
    }

    fn push_crash(&mut self, name: String) {
        self.results.push(TestResult {
            name,
            result_type: ResultType::Crash,
            log: None,
        });
    }
}

fn test_name(event: &StatusEvent) -> Option<String> {
    match (event.bundle.get("class"), event.bundle.get("test")) {
        (Some(class), Some(test)) => Some(format!("{class}#{test}")),
        (Some(class), None) => Some(class.to_string()),
        (None, Some(test)) => Some(test.to_string()),
        (None, None) => None,
    }
}

/// Convenience for fully buffered streams.
pub fn collect_test_results<'a, I>(events: I, result: &ResultEvent) -> Vec<TestResult>
where
    I: IntoIterator<Item = &'a StatusEvent>,
{
    let mut collector = TestResultCollector::new();
    for event in events {
        collector.observe(event);
    }
    collector.finish(result)
}
