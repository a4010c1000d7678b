//! Version-control backends.
//!
//! A [`Backend`] knows how to recognise a working copy (its root marker) and how
//! to open one. The opened [`WorkingCopy`] answers the handful of queries the
//! reconciliation in [`crate::repository`] needs. Backends are kept in a
//! [`Registry`], an ordered list consulted by the discovery walker: the first
//! backend whose marker is present claims the directory.

mod error;
pub mod git;

use std::path::Path;

use serde::Serialize;

pub use error::VcsError;
pub use git::Git;

/// One entry of a short-form status listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// Two-character status code as reported by the tool (e.g. ` M`, `??`).
    pub code: String,
    pub path: String,
}

impl FileChange {
    pub fn new(code: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            path: path.into(),
        }
    }
}

/// Workspace changes, already partitioned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub uncommitted: Vec<FileChange>,
    pub untracked: Vec<FileChange>,
}

/// What HEAD points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Head {
    Branch(String),
    /// Not on any named branch. Never equal to a branch name, so a detached
    /// checkout highlights no branch.
    Detached,
}

impl Head {
    pub fn branch(&self) -> Option<&str> {
        match self {
            Head::Branch(name) => Some(name),
            Head::Detached => None,
        }
    }

    pub fn is(&self, branch: &str) -> bool {
        self.branch() == Some(branch)
    }
}

/// Queries against one working copy.
///
/// Implementations run synchronously and block until the tool has finished.
pub trait WorkingCopy {
    /// Refresh remote-tracking metadata. May hit the network.
    fn update_remotes(&self) -> Result<(), VcsError>;

    /// Uncommitted and untracked files.
    fn pending_changes(&self) -> Result<PendingChanges, VcsError>;

    fn current_branch(&self) -> Result<Head, VcsError>;

    fn local_branches(&self) -> Result<Vec<String>, VcsError>;

    /// `(remote, branch)` pairs, excluding symbolic `HEAD` aliases.
    fn remote_branches(&self) -> Result<Vec<(String, String)>, VcsError>;

    /// Number of commits reachable from `reference` but not from `base`.
    fn commits_ahead(&self, reference: &str, base: &str) -> Result<usize, VcsError>;

    /// The ref naming the local `branch` in ahead/behind queries.
    fn local_ref(&self, branch: &str) -> String {
        branch.to_string()
    }

    /// The ref naming `branch` as last seen on `remote`.
    fn remote_ref(&self, remote: &str, branch: &str) -> String {
        format!("{remote}/{branch}")
    }
}

/// A version-control system that repocheck can discover.
pub trait Backend: Send + Sync {
    /// Short name used in reports and JSON output (e.g. `git`).
    fn name(&self) -> &'static str;

    /// Name of the metadata directory identifying a working-copy root.
    fn root_marker(&self) -> &'static str;

    fn is_root(&self, dir: &Path) -> bool {
        dir.join(self.root_marker()).is_dir()
    }

    /// Bind to the working copy at `root`. `context` labels logged commands.
    fn open(&self, root: &Path, context: &str) -> Box<dyn WorkingCopy>;
}

/// Ordered list of backends, tested in priority order.
pub struct Registry {
    backends: Vec<Box<dyn Backend>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    /// Append a backend with lower priority than those already registered.
    pub fn with(mut self, backend: impl Backend + 'static) -> Self {
        self.backends.push(Box::new(backend));
        self
    }

    /// The first backend whose root marker is present in `dir`.
    pub fn detect(&self, dir: &Path) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .map(|b| b.as_ref())
            .find(|b| b.is_root(dir))
    }

    /// Root markers of all registered backends.
    pub fn markers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.backends.iter().map(|b| b.root_marker())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::empty().with(Git)
    }
}
