//! Parsing of `--gtest_list_tests` output.

/// Flatten gtest's two-level listing into `Case.Test` names.
///
/// Case lines start in column zero and end with `.`; test lines are indented
/// and may carry a trailing `# GetParam() = ...` comment.
pub fn parse_gtest_list_tests<I>(lines: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut tests = Vec::new();
    let mut current = String::new();
    for line in lines {
        let line = line.as_ref().trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(' ') {
            if let Some(case) = line.split_whitespace().next().filter(|t| t.ends_with('.')) {
                current = case.to_string();
            }
            continue;
        }
        if line.contains("YOU HAVE") {
            continue;
        }
        if let Some(test) = line.split_whitespace().next() {
            tests.push(format!("{current}{test}"));
        }
    }
    tests
}
