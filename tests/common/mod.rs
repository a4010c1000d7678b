use std::path::{Path, PathBuf};
use std::process::Command;

use insta_cmd::get_cargo_bin;
use tempfile::TempDir;

/// Environment shared by every git and repocheck invocation in tests.
///
/// Set per command rather than process-wide so parallel tests cannot see each
/// other's settings.
fn isolate(cmd: &mut Command, ceiling: &Path) {
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_SYSTEM", "/dev/null")
        .env("GIT_CEILING_DIRECTORIES", ceiling)
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_AUTHOR_DATE", "2025-01-01T00:00:00Z")
        .env("GIT_COMMITTER_DATE", "2025-01-01T00:00:00Z")
        .env("LC_ALL", "C")
        .env("LANG", "C")
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .env_remove("GIT_INDEX_FILE")
        .env_remove("RUST_LOG")
        .env_remove("NO_COLOR");
}

/// A temporary directory tree holding any number of repositories.
pub struct Workspace {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // Canonicalize to resolve symlinks (important on macOS where /var is symlink to /private/var)
        let root = temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp path");
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Initialise a repository at `rel` with one commit on `main`.
    pub fn repo(&self, rel: &str) -> TestRepo {
        let root = self.root.join(rel);
        std::fs::create_dir_all(&root).expect("Failed to create repo directory");
        let repo = TestRepo {
            root,
            ceiling: self.root.clone(),
        };
        repo.git(&["init", "-b", "main"]);
        repo.commit("README.md", "initial");
        repo
    }

    /// A bare repository to push to, returned as a URL for `git remote add`.
    pub fn bare(&self, rel: &str) -> String {
        let path = self.root.join(rel);
        std::fs::create_dir_all(&path).expect("Failed to create bare directory");
        run_git(&path, &self.root, &["init", "--bare", "-b", "main"]);
        path.to_str().unwrap().to_string()
    }

    /// The repocheck binary, isolated from the user's git and repocheck config.
    pub fn repocheck(&self) -> Command {
        let mut cmd = Command::new(get_cargo_bin("repocheck"));
        isolate(&mut cmd, &self.root);
        for (key, _) in std::env::vars_os() {
            if key.to_string_lossy().starts_with("REPOCHECK_") {
                cmd.env_remove(key);
            }
        }
        cmd.env("REPOCHECK_CONFIG_PATH", self.root.join("no-config.toml"))
            .current_dir(&self.root);
        cmd
    }
}

pub struct TestRepo {
    root: PathBuf,
    ceiling: PathBuf,
}

impl TestRepo {
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Run git in the repository, panicking on failure.
    pub fn git(&self, args: &[&str]) -> String {
        run_git(&self.root, &self.ceiling, args)
    }

    pub fn write(&self, file: &str, contents: &str) {
        let path = self.root.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(path, contents).expect("Failed to write file");
    }

    /// Write `file` and commit it.
    pub fn commit(&self, file: &str, contents: &str) {
        self.write(file, contents);
        self.git(&["add", file]);
        self.git(&["commit", "-m", &format!("Update {file}")]);
    }

    /// Add `remote` and push `main` to it.
    pub fn add_remote(&self, name: &str, url: &str) {
        self.git(&["remote", "add", name, url]);
        self.git(&["push", "--quiet", name, "main"]);
    }

    pub fn detach_head(&self) {
        self.git(&["checkout", "--quiet", "--detach", "HEAD"]);
    }
}

fn run_git(dir: &Path, ceiling: &Path, args: &[&str]) -> String {
    let mut cmd = Command::new("git");
    isolate(&mut cmd, ceiling);
    let output = cmd
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute git");

    if !output.status.success() {
        panic!(
            "git {} failed:\nstdout: {}\nstderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stdout of a finished command.
pub fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
