//! Named build steps gated by stamp records.
//!
//! A steps file declares, per step, the inputs that decide staleness and the
//! command that rebuilds the output. Paths are relative to the steps file.
use crate::stamp::{has_stamp_suffix, run_if_stale, StampOutcome, STAMP_SUFFIX};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

pub const STEPS_SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct StepsConfig {
    pub schema_version: u32,
    #[serde(default)]
    pub steps: Vec<BuildStep>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct BuildStep {
    pub name: String,
    /// Stamp record path; must end with `.sha256.stamp`.
    pub record: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Extra strings folded into the fingerprint ahead of the command argv.
    #[serde(default)]
    pub strings: Vec<String>,
    /// Shell-style command line, split with shell-words (no shell is spawned).
    pub command: String,
}

/// A steps file loaded from disk together with its base directory.
#[derive(Debug, Clone)]
pub struct LoadedSteps {
    pub base_dir: PathBuf,
    pub config: StepsConfig,
}

impl LoadedSteps {
    pub fn find(&self, name: &str) -> Option<&BuildStep> {
        self.config.steps.iter().find(|step| step.name == name)
    }
}

pub fn load_steps(path: &Path) -> Result<LoadedSteps> {
    let bytes = fs::read(path).with_context(|| format!("read steps {}", path.display()))?;
    let config: StepsConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse steps {}", path.display()))?;
    validate_steps(&config)?;
    let base_dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(LoadedSteps { base_dir, config })
}

pub fn validate_steps(config: &StepsConfig) -> Result<()> {
    if config.schema_version != STEPS_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported steps schema_version {}",
            config.schema_version
        ));
    }
    let mut seen = BTreeSet::new();
    for step in &config.steps {
        let name = step.name.trim();
        if name.is_empty() {
            return Err(anyhow!("step name must not be empty"));
        }
        if !seen.insert(name) {
            return Err(anyhow!("duplicate step name {name:?}"));
        }
        if !has_stamp_suffix(Path::new(&step.record)) {
            return Err(anyhow!(
                "step {name:?}: record {:?} must end with {STAMP_SUFFIX}",
                step.record
            ));
        }
        if step.command.trim().is_empty() {
            return Err(anyhow!("step {name:?}: command must not be empty"));
        }
    }
    Ok(())
}

/// Split a step command into argv.
pub fn command_argv(step: &BuildStep) -> Result<Vec<String>> {
    let argv = shell_words::split(&step.command)
        .with_context(|| format!("step {:?}: split command", step.name))?;
    if argv.is_empty() {
        return Err(anyhow!("step {:?}: command must not be empty", step.name));
    }
    Ok(argv)
}

/// Run one step if its inputs changed since the last successful run.
///
/// The fingerprint covers `strings` followed by the command argv, so editing
/// the command line also invalidates the stamp.
pub fn run_step(base_dir: &Path, step: &BuildStep, force: bool) -> Result<StampOutcome> {
    let argv = command_argv(step)?;
    let record = base_dir.join(&step.record);
    let inputs = step
        .inputs
        .iter()
        .map(|input| base_dir.join(input))
        .collect::<Vec<_>>();
    let mut strings = step.strings.clone();
    strings.extend(argv.iter().cloned());

    let outcome = run_if_stale(
        || run_command(&argv, base_dir),
        &record,
        &inputs,
        &strings,
        force,
    )
    .with_context(|| format!("step {:?}", step.name))?;
    if !outcome.ran {
        tracing::info!(step = %step.name, "step up to date");
    }
    Ok(outcome)
}

/// Run `argv` in `cwd`, failing on a non-zero exit.
pub fn run_command(argv: &[String], cwd: &Path) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("empty command"))?;
    let resolved = which::which_in(program, std::env::var_os("PATH"), cwd)
        .with_context(|| format!("resolve program {program}"))?;
    let start = Instant::now();
    let status = Command::new(&resolved)
        .args(args)
        .current_dir(cwd)
        .status()
        .with_context(|| format!("run {}", resolved.display()))?;
    tracing::info!(
        program = %resolved.display(),
        elapsed_ms = start.elapsed().as_millis(),
        "command complete"
    );
    if !status.success() {
        return Err(anyhow!("{program} failed: status {status}"));
    }
    Ok(())
}
