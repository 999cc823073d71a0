//! Android instrumentation test output decoding.
mod bundle;
mod parser;
mod results;

pub use bundle::Bundle;
pub use parser::{
    Group, InstrumentationParser, InstrumentationStream, ParserState, ResultEvent, StatusEvent,
    StatusEvents,
};
pub use results::{
    collect_test_results, ResultType, TestResult, TestResultCollector, TestSummary,
};
