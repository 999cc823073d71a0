//! End-to-end checks for stamp-gated commands.

mod common;

use common::{stderr, stdout, Workspace};

#[cfg(unix)]
#[test]
fn run_if_stale_skips_until_inputs_change() {
    let ws = Workspace::new();
    ws.write("a.txt", "hello");
    let args = [
        "run-if-stale",
        "--record",
        "out.sha256.stamp",
        "--input",
        "a.txt",
        "--",
        "cp",
        "a.txt",
        "copy.txt",
    ];

    let first = ws.run(&args);
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    assert!(stdout(&first).starts_with("ran (no_record)"));
    assert_eq!(ws.read("copy.txt"), "hello");
    let d1 = ws.read("out.sha256.stamp");
    assert_eq!(d1.len(), 64);

    std::fs::remove_file(ws.path().join("copy.txt")).unwrap();
    let second = ws.run(&args);
    assert!(second.status.success());
    assert!(stdout(&second).starts_with("skipped (up_to_date)"));
    assert!(!ws.path().join("copy.txt").exists());

    ws.write("a.txt", "hello!");
    let third = ws.run(&args);
    assert!(third.status.success());
    assert!(stdout(&third).starts_with("ran (changed)"));
    assert_eq!(ws.read("copy.txt"), "hello!");
    assert_ne!(ws.read("out.sha256.stamp"), d1);
}

#[cfg(unix)]
#[test]
fn editing_the_command_line_invalidates_the_stamp() {
    let ws = Workspace::new();
    let base = ["run-if-stale", "--record", "flags.sha256.stamp", "--json", "--"];
    let run = |extra: &[&str]| {
        let args: Vec<&str> = base.iter().chain(extra).copied().collect();
        let output = ws.run(&args);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
        value["ran"].as_bool().unwrap()
    };
    assert!(run(&["true", "-a", "-b"]));
    assert!(!run(&["true", "-a", "-b"]));
    assert!(run(&["true", "-b", "-a"]));
}

#[test]
fn bad_record_suffix_is_rejected_without_running() {
    let ws = Workspace::new();
    let output = ws.run(&["run-if-stale", "--record", "out.stamp", "--", "touch", "ran"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains(".sha256.stamp"));
    assert!(!ws.path().join("ran").exists());
}

#[cfg(unix)]
#[test]
fn failing_command_fails_and_leaves_no_stamp() {
    let ws = Workspace::new();
    let output = ws.run(&["run-if-stale", "--record", "x.sha256.stamp", "--", "false"]);
    assert!(!output.status.success());
    assert!(!ws.path().join("x.sha256.stamp").exists());
}

#[test]
fn fingerprint_ignores_input_order_but_not_string_order() {
    let ws = Workspace::new();
    ws.write("a.txt", "a");
    ws.write("dir/b.txt", "b");
    let fp = |args: &[&str]| {
        let mut full = vec!["fingerprint"];
        full.extend_from_slice(args);
        let output = ws.run(&full);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        stdout(&output).trim().to_string()
    };
    let forward = fp(&["--input", "a.txt", "--input", "dir", "--string", "-x", "--string", "-y"]);
    let paths_swapped = fp(&["--input", "dir", "--input", "a.txt", "--string", "-x", "--string", "-y"]);
    let strings_swapped = fp(&["--input", "a.txt", "--input", "dir", "--string", "-y", "--string", "-x"]);
    assert_eq!(forward, paths_swapped);
    assert_ne!(forward, strings_swapped);

    let dotted = fp(&["--input", "./a.txt", "--input", "dir/", "--string", "-x", "--string", "-y"]);
    assert_eq!(forward, dotted);
}

#[test]
fn fingerprint_reports_missing_inputs() {
    let ws = Workspace::new();
    let output = ws.run(&["fingerprint", "--input", "nope.txt"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("nope.txt"));
}

#[cfg(unix)]
#[test]
fn steps_file_runs_selected_steps() {
    let ws = Workspace::new();
    ws.write("src/lib.txt", "v1");
    ws.write(
        "steps.json",
        r#"{
  "schema_version": 1,
  "steps": [
    {"name": "copy", "record": "gen/copy.sha256.stamp", "inputs": ["src"], "command": "cp src/lib.txt gen/lib.txt"},
    {"name": "mkdir", "record": "gen/mkdir.sha256.stamp", "command": "mkdir -p gen"}
  ]
}"#,
    );

    let mkdir = ws.run(&["step", "--config", "steps.json", "--step", "mkdir"]);
    assert!(mkdir.status.success(), "stderr: {}", stderr(&mkdir));
    assert!(stdout(&mkdir).starts_with("mkdir: ran"));

    let all = ws.run(&["step", "--config", "steps.json"]);
    assert!(all.status.success(), "stderr: {}", stderr(&all));
    let text = stdout(&all);
    assert!(text.contains("copy: ran"));
    assert!(text.contains("mkdir: skipped"));
    assert_eq!(ws.read("gen/lib.txt"), "v1");

    let missing = ws.run(&["step", "--config", "steps.json", "--step", "dex"]);
    assert!(!missing.status.success());
    assert!(stderr(&missing).contains("dex"));
}
