//! Git backend: one `git` subprocess per query, output parsed as text.

use std::path::{Path, PathBuf};

use super::{Backend, FileChange, Head, PendingChanges, VcsError, WorkingCopy};
use crate::shell_exec::Cmd;

/// The Git [`Backend`]. Recognises directories containing a `.git` directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git;

impl Backend for Git {
    fn name(&self) -> &'static str {
        "git"
    }

    fn root_marker(&self) -> &'static str {
        ".git"
    }

    fn open(&self, root: &Path, context: &str) -> Box<dyn WorkingCopy> {
        Box::new(GitWorkingCopy::at(root, context))
    }
}

/// A git working copy rooted at `root`.
#[derive(Debug, Clone)]
pub struct GitWorkingCopy {
    root: PathBuf,
    context: String,
}

impl GitWorkingCopy {
    pub fn at(root: impl Into<PathBuf>, context: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            context: context.into(),
        }
    }

    fn cmd(&self, args: &[&str]) -> Cmd {
        Cmd::new("git")
            .args(args.iter().copied())
            .current_dir(&self.root)
            .context(&self.context)
            // Read-only queries must not contend for index.lock with the user's
            // own git processes.
            .env("GIT_OPTIONAL_LOCKS", "0")
    }

    /// Run a git command and return stdout, failing on a non-zero exit.
    pub fn run_command(&self, args: &[&str]) -> Result<String, VcsError> {
        let cmd = self.cmd(args);
        let command = cmd.display();
        let output = cmd
            .run()
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl WorkingCopy for GitWorkingCopy {
    fn update_remotes(&self) -> Result<(), VcsError> {
        match self.run_command(&["remote", "update"]) {
            Ok(_) => Ok(()),
            // Unreachable remotes leave stale tracking refs; the status is still
            // meaningful against what was fetched before.
            Err(err @ VcsError::CommandFailed { .. }) => {
                log::warn!("{}: {}", self.context, err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn pending_changes(&self) -> Result<PendingChanges, VcsError> {
        let stdout = self.run_command(&["status", "--porcelain"])?;
        parse_status(&stdout)
    }

    fn current_branch(&self) -> Result<Head, VcsError> {
        // symbolic-ref also works on an unborn branch, where rev-parse fails.
        let cmd = self.cmd(&["symbolic-ref", "--quiet", "--short", "HEAD"]);
        let command = cmd.display();
        let output = cmd.run().map_err(|source| VcsError::Spawn {
            command: command.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match output.status.code() {
            Some(0) => parse_current_branch(&stdout),
            // --quiet: exit 1 without a message means HEAD is not symbolic.
            Some(1) if output.stderr.is_empty() => Ok(Head::Detached),
            code => Err(VcsError::CommandFailed {
                command,
                code,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }

    fn local_branches(&self) -> Result<Vec<String>, VcsError> {
        // for-each-ref rather than `git branch`, which lists a
        // "(HEAD detached at ...)" pseudo-entry on a detached HEAD. lstrip=2
        // rather than refname:short, which prefixes "heads/" when a branch and a
        // remote share a name.
        let stdout = self.run_command(&[
            "for-each-ref",
            "--format=%(refname:lstrip=2)",
            "refs/heads/",
        ])?;
        Ok(parse_local_branches(&stdout))
    }

    fn remote_branches(&self) -> Result<Vec<(String, String)>, VcsError> {
        let args = [
            "for-each-ref",
            "--format=%(refname:lstrip=2)",
            "refs/remotes/",
        ];
        let stdout = self.run_command(&args)?;
        parse_remote_branches(&stdout).map_err(|line| {
            VcsError::parse(
                self.cmd(&args).display(),
                "remote branch without a remote name",
                &line,
            )
        })
    }

    // Full ref names: a tag sharing a branch's name would otherwise win.
    fn local_ref(&self, branch: &str) -> String {
        format!("refs/heads/{branch}")
    }

    fn remote_ref(&self, remote: &str, branch: &str) -> String {
        format!("refs/remotes/{remote}/{branch}")
    }

    fn commits_ahead(&self, reference: &str, base: &str) -> Result<usize, VcsError> {
        let range = format!("{base}..{reference}");
        let args = ["rev-list", "--count", range.as_str()];
        let stdout = self.run_command(&args)?;
        stdout.trim().parse().map_err(|_| {
            VcsError::parse(self.cmd(&args).display(), "not a commit count", stdout.trim())
        })
    }
}

/// Parse `git status --porcelain` output.
///
/// Each line is `XY PATH`: the status code occupies the first two columns and
/// the path starts at the fourth. Lines starting with `?` are untracked files;
/// everything else counts as uncommitted.
fn parse_status(output: &str) -> Result<PendingChanges, VcsError> {
    let mut changes = PendingChanges::default();

    for line in output.lines().filter(|l| !l.is_empty()) {
        let (Some(code), Some(path)) = (line.get(..2), line.get(3..)) else {
            return Err(VcsError::parse(
                "git status --porcelain",
                "status line too short",
                line,
            ));
        };
        if path.is_empty() {
            return Err(VcsError::parse(
                "git status --porcelain",
                "status line without a path",
                line,
            ));
        }

        let change = FileChange::new(code, path);
        if line.starts_with('?') {
            changes.untracked.push(change);
        } else {
            changes.uncommitted.push(change);
        }
    }

    Ok(changes)
}

fn parse_current_branch(output: &str) -> Result<Head, VcsError> {
    let branch = output.trim();
    if branch.is_empty() {
        return Err(VcsError::parse(
            "git symbolic-ref --quiet --short HEAD",
            "empty branch name",
            output,
        ));
    }
    Ok(Head::Branch(branch.to_string()))
}

fn parse_local_branches(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parse `remote/branch` lines, splitting on the first `/` only.
///
/// Returns the offending line on error.
fn parse_remote_branches(output: &str) -> Result<Vec<(String, String)>, String> {
    let mut branches = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((remote, branch)) = line.split_once('/') else {
            return Err(line.to_string());
        };
        if remote.is_empty() || branch.is_empty() {
            return Err(line.to_string());
        }
        // `origin/HEAD` is a symbolic alias for the remote's default branch.
        if branch == "HEAD" || branch.starts_with("HEAD ") {
            continue;
        }
        branches.push((remote.to_string(), branch.to_string()));
    }

    Ok(branches)
}
