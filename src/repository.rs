//! Reconciled status of one working copy.
//!
//! [`Repository::reconcile`] queries a [`WorkingCopy`] and pairs every local
//! branch with every remote that has a branch of the same name. Each
//! `(branch, remote)` pair, and each local branch without remotes, lands in
//! exactly one of six [`BranchState`]s:
//!
//! | Symbol | State        | Meaning                                       |
//! |--------|--------------|-----------------------------------------------|
//! | `=`    | `InSync`     | same commits locally and on the remote        |
//! | `>`    | `Ahead`      | local has commits the remote lacks            |
//! | `<`    | `Behind`     | remote has commits the local branch lacks     |
//! | `#`    | `Diverged`   | both sides have commits the other lacks       |
//! | `}`    | `NotPushed`  | local branch with no remote counterpart       |
//! | `{`    | `NotFetched` | remote branch with no local counterpart       |

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::vcs::{FileChange, Head, VcsError, WorkingCopy};

/// Commit counts between a local branch and its remote counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AheadBehind {
    /// Commits on the local branch missing from the remote.
    pub local_ahead: usize,
    /// Commits on the remote missing from the local branch.
    pub remote_ahead: usize,
}

impl AheadBehind {
    pub fn state(self) -> BranchState {
        match (self.local_ahead > 0, self.remote_ahead > 0) {
            (true, true) => BranchState::Diverged,
            (true, false) => BranchState::Ahead,
            (false, true) => BranchState::Behind,
            (false, false) => BranchState::InSync,
        }
    }
}

/// Status of a branch on one remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    /// The remote has the branch but no local branch of that name exists.
    Unknown,
    Computed(AheadBehind),
}

impl RemoteStatus {
    pub fn state(self) -> BranchState {
        match self {
            RemoteStatus::Unknown => BranchState::NotFetched,
            RemoteStatus::Computed(counts) => counts.state(),
        }
    }
}

/// Which remotes know a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchTracking {
    /// Local branch that no remote has.
    NotTracked,
    /// Remote name to status; never empty.
    Tracked(BTreeMap<String, RemoteStatus>),
}

/// The six classification outcomes, in legend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchState {
    InSync,
    Ahead,
    Behind,
    Diverged,
    NotPushed,
    NotFetched,
}

impl BranchState {
    pub const ALL: [BranchState; 6] = [
        BranchState::InSync,
        BranchState::Ahead,
        BranchState::Behind,
        BranchState::Diverged,
        BranchState::NotPushed,
        BranchState::NotFetched,
    ];

    pub fn symbol(self) -> char {
        match self {
            BranchState::InSync => '=',
            BranchState::Ahead => '>',
            BranchState::Behind => '<',
            BranchState::Diverged => '#',
            BranchState::NotPushed => '}',
            BranchState::NotFetched => '{',
        }
    }

    /// Whether the user has something to push, pull or merge.
    pub fn needs_action(self) -> bool {
        !matches!(self, BranchState::InSync | BranchState::NotFetched)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-state counters over all branches of a repository.
///
/// Derived from the final branch map in a single pass; never updated
/// incrementally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchStats {
    counts: [usize; 6],
}

impl BranchStats {
    pub fn from_branches(branches: &BTreeMap<String, BranchTracking>) -> Self {
        let mut stats = Self::default();
        for tracking in branches.values() {
            match tracking {
                BranchTracking::NotTracked => stats.bump(BranchState::NotPushed),
                BranchTracking::Tracked(remotes) => {
                    for status in remotes.values() {
                        stats.bump(status.state());
                    }
                }
            }
        }
        stats
    }

    fn bump(&mut self, state: BranchState) {
        self.counts[state.index()] += 1;
    }

    pub fn get(&self, state: BranchState) -> usize {
        self.counts[state.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn needs_action(&self) -> bool {
        BranchState::ALL
            .into_iter()
            .any(|state| state.needs_action() && self.get(state) > 0)
    }
}

impl Serialize for BranchStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BranchState::ALL.len()))?;
        for state in BranchState::ALL {
            map.serialize_entry(&state.symbol(), &self.get(state))?;
        }
        map.end()
    }
}

/// One discovered working copy, fully reconciled.
///
/// Built only by [`Repository::reconcile`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    root: PathBuf,
    display_name: String,
    vcs: &'static str,
    uncommitted: Vec<FileChange>,
    untracked: Vec<FileChange>,
    head: Head,
    remote_to_branches: BTreeMap<String, BTreeSet<String>>,
    branches: BTreeMap<String, BranchTracking>,
    stats: BranchStats,
}

impl Repository {
    /// Query `working_copy` and compute the full record.
    ///
    /// Any backend failure aborts the reconciliation; no partially filled
    /// record is ever returned.
    pub fn reconcile(
        root: PathBuf,
        display_name: String,
        vcs: &'static str,
        working_copy: &dyn WorkingCopy,
        update_remotes: bool,
    ) -> Result<Self, VcsError> {
        if update_remotes {
            working_copy.update_remotes()?;
        }

        let changes = working_copy.pending_changes()?;
        let head = working_copy.current_branch()?;

        let mut remote_to_branches: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut branches: BTreeMap<String, BranchTracking> = BTreeMap::new();

        for (remote, branch) in working_copy.remote_branches()? {
            remote_to_branches
                .entry(remote.clone())
                .or_default()
                .insert(branch.clone());
            let tracking = branches
                .entry(branch)
                .or_insert_with(|| BranchTracking::Tracked(BTreeMap::new()));
            if let BranchTracking::Tracked(remotes) = tracking {
                remotes.insert(remote, RemoteStatus::Unknown);
            }
        }

        for branch in working_copy.local_branches()? {
            match branches.get_mut(&branch) {
                None => {
                    branches.insert(branch, BranchTracking::NotTracked);
                }
                Some(BranchTracking::Tracked(remotes)) => {
                    for (remote, status) in remotes.iter_mut() {
                        let local_ref = working_copy.local_ref(&branch);
                        let remote_ref = working_copy.remote_ref(remote, &branch);
                        // Both directions: the histories may have diverged.
                        let local_ahead = working_copy.commits_ahead(&local_ref, &remote_ref)?;
                        let remote_ahead = working_copy.commits_ahead(&remote_ref, &local_ref)?;
                        *status = RemoteStatus::Computed(AheadBehind {
                            local_ahead,
                            remote_ahead,
                        });
                    }
                }
                // Listed twice by the backend.
                Some(BranchTracking::NotTracked) => {}
            }
        }

        let stats = BranchStats::from_branches(&branches);

        Ok(Self {
            root,
            display_name,
            vcs,
            uncommitted: changes.uncommitted,
            untracked: changes.untracked,
            head,
            remote_to_branches,
            branches,
            stats,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn vcs(&self) -> &'static str {
        self.vcs
    }

    pub fn uncommitted(&self) -> &[FileChange] {
        &self.uncommitted
    }

    pub fn untracked(&self) -> &[FileChange] {
        &self.untracked
    }

    pub fn head(&self) -> &Head {
        &self.head
    }

    pub fn remote_to_branches(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.remote_to_branches
    }

    /// Every local or remote branch, sorted by name.
    pub fn branches(&self) -> &BTreeMap<String, BranchTracking> {
        &self.branches
    }

    pub fn stats(&self) -> &BranchStats {
        &self.stats
    }

    /// Dirty workspace, or any branch to push, pull or merge.
    pub fn needs_action(&self) -> bool {
        !self.uncommitted.is_empty() || !self.untracked.is_empty() || self.stats.needs_action()
    }
}
