//! Repository discovery.
//!
//! Walks each search root, asks the [`Registry`] whether a directory is a
//! working-copy root, and reconciles every match into a [`ResultSet`].
//!
//! The walk itself is sequential and only reads the filesystem. Reconciliation
//! runs afterwards on Rayon's pool: repositories share no state, and each
//! [`Repository`] is only inserted once it is complete.
//!
//! With `follow_links`, walkdir reports a symlink pointing at one of its own
//! ancestors as a loop error instead of recursing into it forever.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use color_print::cformat;
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use walkdir::WalkDir;

use crate::repository::Repository;
use crate::vcs::{Backend, Registry, VcsError};

/// What to do when a directory or repository cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Skip unreadable directories and report failing repositories as errors.
    #[default]
    Lenient,
    /// Abort on the first error without producing any result.
    Strict,
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub follow_links: bool,
    /// Look for repositories inside other repositories' working trees.
    pub nested_repos: bool,
    /// Name repositories by their path relative to the search root.
    pub rel_paths: bool,
    pub update_remotes: bool,
    pub failure_mode: FailureMode,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            follow_links: false,
            nested_repos: true,
            rel_paths: false,
            update_remotes: false,
            failure_mode: FailureMode::Lenient,
        }
    }
}

#[derive(Debug)]
pub enum DiscoveryError {
    /// A directory could not be read, or a symlink loop was found.
    Walk(walkdir::Error),
    /// A repository could not be reconciled.
    Repository { root: PathBuf, source: VcsError },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::Walk(err) => match err.path() {
                Some(path) if err.loop_ancestor().is_none() => {
                    write!(f, "cannot read {}: {}", path.display(), err)
                }
                _ => write!(f, "{err}"),
            },
            DiscoveryError::Repository { root, source } => {
                write!(f, "{}: {}", root.display(), source)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::Walk(err) => Some(err),
            DiscoveryError::Repository { source, .. } => Some(source),
        }
    }
}

/// A repository that was found but could not be reconciled.
#[derive(Debug, Serialize)]
pub struct FailedRepository {
    pub root: PathBuf,
    pub display_name: String,
    pub vcs: &'static str,
    #[serde(serialize_with = "serialize_display")]
    pub error: VcsError,
}

fn serialize_display<S: Serializer>(value: &VcsError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RepoEntry {
    Reconciled(Repository),
    Failed(FailedRepository),
}

impl RepoEntry {
    pub fn root(&self) -> &Path {
        match self {
            RepoEntry::Reconciled(repo) => repo.root(),
            RepoEntry::Failed(failed) => &failed.root,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            RepoEntry::Reconciled(repo) => repo.display_name(),
            RepoEntry::Failed(failed) => &failed.display_name,
        }
    }

    pub fn repository(&self) -> Option<&Repository> {
        match self {
            RepoEntry::Reconciled(repo) => Some(repo),
            RepoEntry::Failed(_) => None,
        }
    }
}

/// Discovered repositories keyed by absolute path.
#[derive(Debug, Default)]
pub struct ResultSet {
    repos: BTreeMap<PathBuf, RepoEntry>,
    warnings: Vec<DiscoveryError>,
}

impl ResultSet {
    /// Entries in absolute-path order.
    pub fn iter(&self) -> impl Iterator<Item = &RepoEntry> {
        self.repos.values()
    }

    pub fn get(&self, root: &Path) -> Option<&RepoEntry> {
        self.repos.get(root)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Directories skipped during a lenient walk.
    pub fn warnings(&self) -> &[DiscoveryError] {
        &self.warnings
    }

    pub fn failures(&self) -> usize {
        self.iter()
            .filter(|e| matches!(e, RepoEntry::Failed(_)))
            .count()
    }
}

/// A directory claimed by a backend, not yet reconciled.
struct Candidate<'r> {
    display_name: String,
    backend: &'r dyn Backend,
}

/// Find and reconcile every repository below `roots`.
pub fn discover(
    roots: &[PathBuf],
    options: &DiscoveryOptions,
    registry: &Registry,
) -> Result<ResultSet, DiscoveryError> {
    let mut warnings = Vec::new();
    let mut candidates: BTreeMap<PathBuf, Candidate<'_>> = BTreeMap::new();

    for search_root in roots {
        walk_root(search_root, options, registry, &mut candidates, &mut warnings)?;
    }
    log::debug!("found {} repositories", candidates.len());

    // Announced up front in path order; the updates themselves run in parallel.
    if options.update_remotes {
        for candidate in candidates.values() {
            anstream::eprintln!(
                "{}",
                cformat!("<cyan>Updating <bold>{}</> remotes...</>", candidate.display_name)
            );
        }
    }

    let reconciled: Vec<(PathBuf, Result<Repository, FailedRepository>)> = candidates
        .into_par_iter()
        .map(|(root, candidate)| {
            let result = reconcile(&root, candidate, options.update_remotes);
            (root, result)
        })
        .collect();

    let mut repos = BTreeMap::new();
    for (root, result) in reconciled {
        let entry = match result {
            Ok(repo) => RepoEntry::Reconciled(repo),
            Err(failed) if options.failure_mode == FailureMode::Strict => {
                return Err(DiscoveryError::Repository {
                    root: failed.root,
                    source: failed.error,
                });
            }
            Err(failed) => {
                log::warn!("{}: {}", failed.root.display(), failed.error);
                RepoEntry::Failed(failed)
            }
        };
        repos.insert(root, entry);
    }

    Ok(ResultSet { repos, warnings })
}

fn walk_root<'r>(
    search_root: &Path,
    options: &DiscoveryOptions,
    registry: &'r Registry,
    candidates: &mut BTreeMap<PathBuf, Candidate<'r>>,
    warnings: &mut Vec<DiscoveryError>,
) -> Result<(), DiscoveryError> {
    let mut walker = WalkDir::new(search_root)
        .follow_links(options.follow_links)
        .sort_by_file_name()
        .into_iter();

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) => {
                let err = DiscoveryError::Walk(err);
                if options.failure_mode == FailureMode::Strict {
                    return Err(err);
                }
                log::warn!("{err}");
                warnings.push(err);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }
        // Never walk into the metadata directories themselves.
        if registry.markers().any(|m| entry.file_name() == m) {
            walker.skip_current_dir();
            continue;
        }
        let Some(backend) = registry.detect(entry.path()) else {
            continue;
        };

        let root = absolute_path(entry.path());
        let display_name = if options.rel_paths {
            relative_display_name(search_root, entry.path())
        } else {
            display_name_for(&root)
        };
        log::debug!("{} repository at {}", backend.name(), root.display());
        // Same directory reached from two roots: the later root wins.
        candidates.insert(
            root,
            Candidate {
                display_name,
                backend,
            },
        );

        if !options.nested_repos {
            walker.skip_current_dir();
        }
    }

    Ok(())
}

fn reconcile(
    root: &Path,
    candidate: Candidate<'_>,
    update_remotes: bool,
) -> Result<Repository, FailedRepository> {
    let Candidate {
        display_name,
        backend,
    } = candidate;

    let working_copy = backend.open(root, &display_name);
    Repository::reconcile(
        root.to_path_buf(),
        display_name.clone(),
        backend.name(),
        working_copy.as_ref(),
        update_remotes,
    )
    .map_err(|error| FailedRepository {
        root: root.to_path_buf(),
        display_name,
        vcs: backend.name(),
        error,
    })
}

/// Canonical absolute path, falling back to a lexically absolute one.
fn absolute_path(path: &Path) -> PathBuf {
    dunce::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn display_name_for(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

/// Path of `dir` relative to `search_root`; the root as given when they match.
fn relative_display_name(search_root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(search_root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => search_root.display().to_string(),
    }
}
