//! CLI argument parsing for `bharness`.
//!
//! Every subcommand is a thin wrapper over a library operation so build
//! scripts and test runners can call the same logic from a shell.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "bharness",
    version,
    about = "Staleness-gated build steps and instrumentation output parsing",
    after_help = "Examples:\n  bharness run-if-stale --record out/lib.jar.sha256.stamp --input classes -- jar cf out/lib.jar -C classes .\n  bharness step --config steps.json --step dex\n  adb shell am instrument -r -w pkg/runner | bharness instrumentation\n  ./base_unittests --gtest_list_tests | bharness gtest-list",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Emit debug logs on stderr (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    RunIfStale(RunIfStaleArgs),
    Fingerprint(FingerprintArgs),
    Step(StepArgs),
    Instrumentation(InstrumentationArgs),
    GtestList(GtestListArgs),
}

/// Inputs that decide staleness.
#[derive(Parser, Debug)]
pub struct InputArgs {
    /// File or directory whose content is fingerprinted (repeatable, order-insensitive)
    #[arg(long = "input", value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// String folded into the fingerprint (repeatable, order-sensitive)
    #[arg(long = "string", value_name = "S", allow_hyphen_values = true)]
    pub strings: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Run a command only when its inputs changed since the last run")]
pub struct RunIfStaleArgs {
    /// Stamp record path (must end with .sha256.stamp)
    #[arg(long, value_name = "PATH")]
    pub record: PathBuf,

    #[command(flatten)]
    pub inputs: InputArgs,

    /// Run even when the stamp is up to date
    #[arg(long)]
    pub force: bool,

    /// Emit the outcome as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Command to run; its argv is appended to the fingerprinted strings
    #[arg(last = true, required = true, value_name = "CMD")]
    pub command: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Print the fingerprint of a set of inputs")]
pub struct FingerprintArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Run build steps declared in a steps file")]
pub struct StepArgs {
    /// Steps file (JSON, schema_version 1)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Step to run (repeatable); runs every step when omitted
    #[arg(long = "step", value_name = "NAME")]
    pub steps: Vec<String>,

    /// Run even when stamps are up to date
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Decode instrumentation status output from a file or stdin")]
pub struct InstrumentationArgs {
    /// Read from a file instead of stdin
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Emit one JSON object per line instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Flatten --gtest_list_tests output into test names")]
pub struct GtestListArgs {
    /// Read from a file instead of stdin
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}
