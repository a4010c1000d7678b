use crate::common::{Workspace, stderr, stdout};
use insta::assert_snapshot;

fn names(ws: &Workspace, args: &[&str]) -> String {
    let output = ws
        .repocheck()
        .args(["--all", "--no-colors"])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    stdout(&output)
        .lines()
        .map(|line| line.split(' ').next().unwrap_or_default().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_nested_repository_skipped_on_request() {
    let ws = Workspace::new();
    ws.repo("outer");
    ws.repo("outer/vendor/inner");

    assert_snapshot!(names(&ws, &[]), @r"
    outer
    inner
    ");
    assert_snapshot!(names(&ws, &["--no-nested-repos"]), @"outer");
}

#[test]
fn test_repositories_sorted_by_path_at_any_depth() {
    let ws = Workspace::new();
    ws.repo("b");
    ws.repo("a");
    ws.repo("group/deep/c");
    std::fs::create_dir_all(ws.path().join("empty/dir")).unwrap();

    assert_snapshot!(names(&ws, &[]), @r"
    a
    b
    c
    ");
}

#[test]
fn test_rel_paths() {
    let ws = Workspace::new();
    ws.repo("group/app");
    ws.repo("lib");

    assert_snapshot!(names(&ws, &["--rel-paths"]), @r"
    group/app
    lib
    ");
}

#[test]
fn test_search_root_is_repository() {
    let ws = Workspace::new();
    let repo = ws.repo("project");

    let output = ws
        .repocheck()
        .args(["--all", "--no-colors"])
        .arg(repo.root_path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    assert_snapshot!(stdout(&output), @"project 1}");
}

#[test]
fn test_overlapping_roots_list_repository_once() {
    let ws = Workspace::new();
    ws.repo("group/app");

    let output = ws
        .repocheck()
        .args(["--all", "--no-colors", "--rel-paths", ".", "group"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    // Named relative to the last root that reached it.
    assert_snapshot!(stdout(&output), @"app 1}");
}

#[test]
fn test_broken_repository_reported_and_run_continues() {
    let ws = Workspace::new();
    ws.repo("good");
    std::fs::create_dir_all(ws.path().join("broken/.git")).unwrap();

    let output = ws
        .repocheck()
        .args(["--all", "--no-colors"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "{stdout}");
    assert!(
        lines[0].starts_with("broken error: `git status --porcelain` exited with status 128"),
        "{stdout}"
    );
    assert_eq!(lines[1], "good 1}");
    assert!(stderr(&output).contains("WARN"), "{}", stderr(&output));
}

#[test]
fn test_broken_repository_aborts_in_strict_mode() {
    let ws = Workspace::new();
    ws.repo("good");
    std::fs::create_dir_all(ws.path().join("broken/.git")).unwrap();

    let output = ws.repocheck().args(["--all", "--strict"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "");
    assert!(stderr(&output).contains("error:"), "{}", stderr(&output));
    assert!(stderr(&output).contains("broken"), "{}", stderr(&output));
}

#[test]
fn test_missing_root_warns() {
    let ws = Workspace::new();
    ws.repo("good");

    let output = ws
        .repocheck()
        .args(["--all", "--no-colors", "missing", "good"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    assert_snapshot!(stdout(&output), @"good 1}");
    assert!(stderr(&output).contains("missing"), "{}", stderr(&output));

    let output = ws
        .repocheck()
        .args(["--strict", "missing", "good"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[cfg(unix)]
#[test]
fn test_follow_links() {
    let ws = Workspace::new();
    ws.repo("elsewhere/linked");
    std::fs::create_dir(ws.path().join("root")).unwrap();
    std::os::unix::fs::symlink(ws.path().join("elsewhere"), ws.path().join("root/link"))
        .unwrap();

    let output = ws
        .repocheck()
        .args(["--all", "--no-colors", "root"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "");

    let output = ws
        .repocheck()
        .args(["--all", "--no-colors", "--follow-links", "root"])
        .output()
        .unwrap();
    assert_snapshot!(stdout(&output), @"linked 1}");
}
