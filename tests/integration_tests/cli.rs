use crate::common::{Workspace, stderr, stdout};
use insta::assert_snapshot;

#[test]
fn test_legend() {
    let ws = Workspace::new();
    // Printed before any discovery, so a broken tree does not matter.
    std::fs::create_dir_all(ws.path().join("broken/.git")).unwrap();

    let output = ws.repocheck().args(["--legend", "--no-colors"]).output().unwrap();
    assert!(output.status.success(), "{output:?}");
    assert_snapshot!(stdout(&output), @r"
    Workspace symbols:
        *: modified, but uncommitted file
        ?: untracked file
    Branch symbols:
        =: local branch in sync with the remote
        >: local branch ahead of the remote
        <: local branch behind the remote
        #: local branch diverging from the remote
        }: local branch never pushed to the remote
        {: remote branch never fetched
    ");
}

#[test]
fn test_usage_error_exits_with_two() {
    let ws = Workspace::new();
    let output = ws.repocheck().arg("--no-such-flag").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--no-such-flag"));
}

#[test]
fn test_config_file_provides_defaults() {
    let ws = Workspace::new();
    let repo = ws.repo("repo");
    repo.add_remote("origin", &ws.bare("remote.git"));
    let config = ws.path().join("repocheck.toml");
    std::fs::write(&config, "all = true\nexpanded = true\ncolors = false\n").unwrap();

    let output = ws.repocheck().arg("--config").arg(&config).output().unwrap();
    assert!(output.status.success(), "{output:?}");
    assert_snapshot!(stdout(&output), @r"
    repo
        = main
    ");

    // Same file through the environment.
    let output = ws
        .repocheck()
        .env("REPOCHECK_CONFIG_PATH", &config)
        .output()
        .unwrap();
    assert_snapshot!(stdout(&output), @r"
    repo
        = main
    ");
}

#[test]
fn test_config_roots() {
    let ws = Workspace::new();
    ws.repo("nested/repo");
    let config = ws.path().join("repocheck.toml");
    std::fs::write(
        &config,
        format!("roots = [{:?}]\n", ws.path().join("nested").display().to_string()),
    )
    .unwrap();

    let output = ws
        .repocheck()
        .args(["--rel-paths", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    assert_snapshot!(stdout(&output), @"repo 1}");
}

#[test]
fn test_explicit_missing_config_is_an_error() {
    let ws = Workspace::new();
    let output = ws
        .repocheck()
        .args(["--config", "does-not-exist.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("failed to load config"));

    // An absent default location is fine.
    let output = ws.repocheck().output().unwrap();
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn test_environment_switches() {
    let ws = Workspace::new();
    let repo = ws.repo("repo");
    repo.add_remote("origin", &ws.bare("remote.git"));

    let output = ws.repocheck().env("REPOCHECK_ALL", "true").output().unwrap();
    assert_snapshot!(stdout(&output), @"repo 1=");
}

#[test]
fn test_verbose_traces_git_commands() {
    let ws = Workspace::new();
    ws.repo("repo");

    let output = ws.repocheck().arg("-vv").output().unwrap();
    assert!(output.status.success(), "{output:?}");
    let stderr = stderr(&output);
    assert!(stderr.contains("[repocheck-trace]"), "{stderr}");
    assert!(stderr.contains("git status --porcelain"), "{stderr}");
}

#[test]
fn test_legend_ignores_broken_config() {
    let ws = Workspace::new();
    let config = ws.path().join("config.toml");
    std::fs::write(&config, "expanded = \"sometimes\"\n").unwrap();

    let output = ws
        .repocheck()
        .env("REPOCHECK_ALL", "maybe")
        .args(["-L", "--no-colors"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).starts_with("Workspace symbols:"));

    let output = ws
        .repocheck()
        .arg("--config")
        .arg(&config)
        .arg("-L")
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).contains("Branch symbols:"));
}

#[test]
fn test_update_remotes_announced_in_path_order() {
    let ws = Workspace::new();
    for name in ["b", "a", "c"] {
        let repo = ws.repo(name);
        repo.add_remote("origin", &ws.bare(&format!("{name}.git")));
    }

    let output = ws.repocheck().args(["-u", "--no-colors"]).output().unwrap();
    assert!(output.status.success(), "{output:?}");
    let announced: Vec<String> = stderr(&output)
        .lines()
        .filter(|line| line.starts_with("Updating"))
        .map(str::to_string)
        .collect();
    assert_eq!(
        announced,
        [
            "Updating a remotes...",
            "Updating b remotes...",
            "Updating c remotes...",
        ]
    );
}

#[test]
fn test_update_remotes_announces_each_repository() {
    let ws = Workspace::new();
    let repo = ws.repo("repo");
    repo.add_remote("origin", &ws.bare("remote.git"));

    let output = ws.repocheck().args(["-u", "-a"]).output().unwrap();
    assert!(output.status.success(), "{output:?}");
    assert!(stderr(&output).contains("Updating repo remotes..."));
    assert_snapshot!(stdout(&output), @"repo 1=");
}
