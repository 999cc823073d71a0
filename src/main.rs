use anyhow::{anyhow, Context, Result};
use build_harness::gtest::parse_gtest_list_tests;
use build_harness::instrumentation::{
    InstrumentationParser, ResultEvent, StatusEvent, TestResult, TestResultCollector, TestSummary,
};
use build_harness::stamp::{
    compute_fingerprint, has_stamp_suffix, run_if_stale, StampOutcome, STAMP_SUFFIX,
};
use build_harness::steps::{load_steps, run_command, run_step, BuildStep};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{
    Command, FingerprintArgs, GtestListArgs, InstrumentationArgs, RootArgs, RunIfStaleArgs,
    StepArgs,
};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_logging(args.verbose);

    match args.command {
        Command::RunIfStale(args) => cmd_run_if_stale(args),
        Command::Fingerprint(args) => cmd_fingerprint(args),
        Command::Step(args) => cmd_step(args),
        Command::Instrumentation(args) => cmd_instrumentation(args),
        Command::GtestList(args) => cmd_gtest_list(args),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::DEBUG.into())
            .parse_lossy("")
    } else {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy()
    };
    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn cmd_run_if_stale(args: RunIfStaleArgs) -> Result<()> {
    if !has_stamp_suffix(&args.record) {
        return Err(anyhow!(
            "record {} must end with {STAMP_SUFFIX}",
            args.record.display()
        ));
    }
    let mut strings = args.inputs.strings;
    strings.extend(args.command.iter().cloned());
    let outcome = run_if_stale(
        || run_command(&args.command, Path::new(".")),
        &args.record,
        &args.inputs.inputs,
        &strings,
        args.force,
    )?;
    if args.json {
        println!("{}", serde_json::to_string(&outcome).context("serialize outcome")?);
    } else {
        println!("{}", describe_outcome(&outcome));
    }
    Ok(())
}

fn describe_outcome(outcome: &StampOutcome) -> String {
    let verb = if outcome.ran { "ran" } else { "skipped" };
    format!("{verb} ({}) {}", outcome.reason.as_str(), outcome.fingerprint)
}

fn cmd_fingerprint(args: FingerprintArgs) -> Result<()> {
    let fingerprint = compute_fingerprint(&args.inputs.inputs, &args.inputs.strings)?;
    println!("{fingerprint}");
    Ok(())
}

fn cmd_step(args: StepArgs) -> Result<()> {
    let loaded = load_steps(&args.config)?;
    let selected: Vec<&BuildStep> = if args.steps.is_empty() {
        loaded.config.steps.iter().collect()
    } else {
        args.steps
            .iter()
            .map(|name| {
                loaded
                    .find(name)
                    .ok_or_else(|| anyhow!("no step named {name:?} in {}", args.config.display()))
            })
            .collect::<Result<_>>()?
    };
    for step in selected {
        let outcome = run_step(&loaded.base_dir, step, args.force)?;
        println!("{}: {}", step.name, describe_outcome(&outcome));
    }
    Ok(())
}

fn open_lines(file: Option<&Path>) -> Result<Box<dyn BufRead>> {
    Ok(match file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    })
}

/// Split on `\n` and decode lossily; device output carries stray bytes.
fn lossy_lines(reader: Box<dyn BufRead>) -> impl Iterator<Item = io::Result<String>> {
    reader
        .split(b'\n')
        .map(|line| line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

fn cmd_instrumentation(args: InstrumentationArgs) -> Result<()> {
    let reader = open_lines(args.file.as_deref())?;
    let mut parser = InstrumentationParser::new();
    let mut collector = TestResultCollector::new();
    let mut printed = 0;

    for line in lossy_lines(reader) {
        let line = line.context("read instrumentation output")?;
        let Some(event) = parser.feed_line(&line) else {
            continue;
        };
        if args.json {
            print_json_status(&event)?;
        }
        collector.observe(&event);
        for result in &collector.results()[printed..] {
            print_test_result(result, args.json)?;
        }
        printed = collector.results().len();
    }

    let result = parser.finish();
    let results = collector.finish(&result);
    for test in &results[printed..] {
        print_test_result(test, args.json)?;
    }
    let summary = TestSummary::from_results(&results);
    print_run_result(&result, &summary, args.json)?;

    if result.code.is_none() {
        return Err(anyhow!("instrumentation run did not report INSTRUMENTATION_CODE"));
    }
    if !summary.is_success() {
        return Err(anyhow!(
            "{} failed, {} crashed, {} unknown",
            summary.failed,
            summary.crashed,
            summary.unknown
        ));
    }
    Ok(())
}

fn print_json_status(event: &StatusEvent) -> Result<()> {
    let line = serde_json::json!({ "event": "status", "code": event.code, "bundle": event.bundle });
    println!("{}", serde_json::to_string(&line).context("serialize status event")?);
    Ok(())
}

fn print_test_result(result: &TestResult, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({ "event": "test", "result": result });
        println!("{}", serde_json::to_string(&line).context("serialize test result")?);
        return Ok(());
    }
    println!(
        "[{}] {}",
        result.result_type.as_str().to_uppercase(),
        result.name
    );
    if let Some(log) = &result.log {
        for line in log.lines() {
            println!("    {line}");
        }
    }
    Ok(())
}

fn print_run_result(result: &ResultEvent, summary: &TestSummary, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({ "event": "result", "result": result, "summary": summary });
        println!("{}", serde_json::to_string(&line).context("serialize run result")?);
        return Ok(());
    }
    if let Some(stream) = result.bundle.get("stream") {
        println!("{}", stream.trim());
    }
    let code = result
        .code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "missing".to_string());
    println!(
        "code={code} passed={} failed={} skipped={} crashed={} unknown={}",
        summary.passed, summary.failed, summary.skipped, summary.crashed, summary.unknown
    );
    Ok(())
}

fn cmd_gtest_list(args: GtestListArgs) -> Result<()> {
    let reader = open_lines(args.file.as_deref())?;
    let lines = lossy_lines(reader)
        .collect::<io::Result<Vec<_>>>()
        .context("read gtest listing")?;
    for name in parse_gtest_list_tests(&lines) {
        println!("{name}");
    }
    Ok(())
}
