//! Incremental decoder for `am instrument -r` status output.
//!
//! The stream is a sequence of tagged lines:
//!
//! ```text
//! INSTRUMENTATION_STATUS: <key>=<value>
//! INSTRUMENTATION_STATUS_CODE: <int>
//! INSTRUMENTATION_RESULT: <key>=<value>
//! INSTRUMENTATION_CODE: <int>
//! ```
//!
//! Untagged lines continue the value of the most recent key.
use super::bundle::{Bundle, BundleBuilder};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static INSTRUMENTATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*INSTRUMENTATION_([A-Z_]+): (.*)$").expect("valid instrumentation line regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Status,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitingLine,
    AccumulatingStatus,
    AccumulatingResult,
}

/// One `INSTRUMENTATION_STATUS_CODE` and the STATUS bundle it closed.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub code: i32,
    pub bundle: Bundle,
}

/// Terminal outcome of the run, available once the stream ends.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultEvent {
    pub code: Option<i32>,
    pub bundle: Bundle,
}

/// Push-based state machine: feed lines, collect status events as they close.
#[derive(Debug)]
pub struct InstrumentationParser {
    state: ParserState,
    status: BundleBuilder,
    result: BundleBuilder,
    continuation: Option<(Group, String)>,
    code: Option<i32>,
}

impl Default for InstrumentationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentationParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::AwaitingLine,
            status: BundleBuilder::default(),
            result: BundleBuilder::default(),
            continuation: None,
            code: None,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Consume one line; returns an event when the line closes a STATUS group.
    pub fn feed_line(&mut self, raw: &str) -> Option<StatusEvent> {
        let line = raw.trim_end_matches(['\r', '\n']);
        let Some(captures) = INSTRUMENTATION_LINE.captures(line) else {
            self.continue_value(line);
            return None;
        };
        let header = captures.get(1).map_or("", |m| m.as_str());
        let value = captures.get(2).map_or("", |m| m.as_str());
        self.continuation = None;

        match header {
            "STATUS" => {
                self.start_key(Group::Status, value);
                None
            }
            "RESULT" => {
                self.start_key(Group::Result, value);
                None
            }
            "STATUS_CODE" => {
                // A garbled code still closes the group it belongs to.
                let bundle = self.status.finish();
                self.state = ParserState::AwaitingLine;
                let code = parse_code(header, value)?;
                Some(StatusEvent { code, bundle })
            }
            "CODE" => {
                if let Some(code) = parse_code(header, value) {
                    self.code = Some(code);
                    self.state = ParserState::AccumulatingResult;
                }
                None
            }
            _ => {
                tracing::warn!(header, value, "unknown INSTRUMENTATION_ header");
                None
            }
        }
    }

    /// Close the stream and hand back the RESULT group.
    pub fn finish(mut self) -> ResultEvent {
        ResultEvent {
            code: self.code,
            bundle: self.result.finish(),
        }
    }

    fn start_key(&mut self, group: Group, value: &str) {
        let Some((key, first)) = value.split_once('=') else {
            tracing::warn!(?group, value, "instrumentation line without key=value, dropped");
            return;
        };
        match group {
            Group::Status => {
                self.status.start_key(key, first);
                self.state = ParserState::AccumulatingStatus;
            }
            Group::Result => {
                self.result.start_key(key, first);
                self.state = ParserState::AccumulatingResult;
            }
        }
        self.continuation = Some((group, key.to_string()));
    }

    fn continue_value(&mut self, line: &str) {
        match &self.continuation {
            Some((Group::Status, key)) => self.status.append(key, line),
            Some((Group::Result, key)) => self.result.append(key, line),
            None => tracing::debug!(line, "unrecognized instrumentation line, dropped"),
        }
    }
}

fn parse_code(header: &str, value: &str) -> Option<i32> {
    match value.trim().parse::<i32>() {
        Ok(code) => Some(code),
        Err(err) => {
            tracing::warn!(header, value, %err, "malformed instrumentation code, dropped");
            None
        }
    }
}

/// Pull-based view over a finite (or live) line source.
///
/// Status events are produced lazily by [`iter_status`](Self::iter_status);
/// the result is only available once that iterator has been drained.
pub struct InstrumentationStream<I> {
    lines: I,
    parser: Option<InstrumentationParser>,
    result: Option<ResultEvent>,
}

impl<I> InstrumentationStream<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    pub fn new<L>(lines: L) -> Self
    where
        L: IntoIterator<IntoIter = I>,
    {
        Self {
            lines: lines.into_iter(),
            parser: Some(InstrumentationParser::new()),
            result: None,
        }
    }

    pub fn iter_status(&mut self) -> StatusEvents<'_, I> {
        StatusEvents { stream: self }
    }

    /// Panics if the status iterator has not been exhausted yet.
    pub fn get_result(&self) -> &ResultEvent {
        match &self.result {
            Some(result) => result,
            None => panic!("instrumentation result requested before the status stream was exhausted"),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.result.is_some()
    }
}

pub struct StatusEvents<'a, I> {
    stream: &'a mut InstrumentationStream<I>,
}

impl<I> Iterator for StatusEvents<'_, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = StatusEvent;

    fn next(&mut self) -> Option<StatusEvent> {
        loop {
            let parser = self.stream.parser.as_mut()?;
            match self.stream.lines.next() {
                Some(line) => {
                    if let Some(event) = parser.feed_line(line.as_ref()) {
                        return Some(event);
                    }
                }
                None => {
                    let parser = self.stream.parser.take()?;
                    self.stream.result = Some(parser.finish());
                    return None;
                }
            }
        }
    }
}
