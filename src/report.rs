//! Rendering of discovered repositories.
//!
//! Styling follows the anstyle conventions used throughout: a style renders
//! its escape sequence with `{style}` and its reset with `{style:#}`. Whether
//! color is used at all is decided once, by choosing a [`Palette`], and never
//! changes afterwards. The caller prints through `anstream`, which further strips
//! escapes when stdout is not a terminal.

use std::fmt::Display;

use anstyle::{AnsiColor, Color, Style};

use crate::discovery::{FailedRepository, RepoEntry};
use crate::repository::{BranchState, BranchTracking, RemoteStatus, Repository};
use crate::vcs::Head;

const INDENT: &str = "    ";

/// The styles used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub red: Style,
    pub red_bold: Style,
    pub green: Style,
    pub green_bold: Style,
    pub cyan: Style,
    pub yellow: Style,
}

impl Palette {
    pub const fn colored() -> Self {
        const fn fg(color: AnsiColor) -> Style {
            Style::new().fg_color(Some(Color::Ansi(color)))
        }
        Self {
            red: fg(AnsiColor::Red),
            red_bold: fg(AnsiColor::Red).bold(),
            green: fg(AnsiColor::Green),
            green_bold: fg(AnsiColor::Green).bold(),
            cyan: fg(AnsiColor::Cyan),
            yellow: fg(AnsiColor::Yellow),
        }
    }

    /// Every style empty: renders no escape sequences at all.
    pub const fn plain() -> Self {
        Self {
            red: Style::new(),
            red_bold: Style::new(),
            green: Style::new(),
            green_bold: Style::new(),
            cyan: Style::new(),
            yellow: Style::new(),
        }
    }

    pub fn new(colors: bool) -> Self {
        if colors { Self::colored() } else { Self::plain() }
    }

    fn paint(style: Style, text: impl Display) -> String {
        format!("{style}{text}{style:#}")
    }

    /// Style for a branch symbol, as used in both report formats and the legend.
    fn state_style(&self, state: BranchState) -> Style {
        match state {
            BranchState::InSync | BranchState::NotFetched => self.green,
            BranchState::Behind => self.cyan,
            BranchState::Ahead | BranchState::Diverged | BranchState::NotPushed => self.red,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// One block per repository with every file and branch listed.
    pub expanded: bool,
    /// Include repositories and branches that need no action.
    pub all: bool,
}

pub struct Reporter {
    palette: Palette,
    options: ReportOptions,
}

impl Reporter {
    pub fn new(palette: Palette, options: ReportOptions) -> Self {
        Self { palette, options }
    }

    /// Report lines for `entries`, in the order given.
    pub fn render<'a>(&self, entries: impl IntoIterator<Item = &'a RepoEntry>) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in entries {
            match entry {
                RepoEntry::Reconciled(repo) if self.options.expanded => {
                    lines.extend(self.expanded(repo));
                }
                RepoEntry::Reconciled(repo) => lines.extend(self.short(repo)),
                RepoEntry::Failed(failed) => lines.push(self.failed(failed)),
            }
        }
        lines
    }

    fn failed(&self, failed: &FailedRepository) -> String {
        let p = &self.palette;
        format!(
            "{} {}",
            Palette::paint(p.red_bold, &failed.display_name),
            Palette::paint(p.red, format_args!("error: {}", failed.error))
        )
    }

    /// `name 2* 1? 3= 1>`: counts followed by their symbol.
    fn short(&self, repo: &Repository) -> Option<String> {
        let p = &self.palette;
        let all = self.options.all;
        let stats = repo.stats();
        let mut parts = Vec::new();

        if !repo.uncommitted().is_empty() {
            parts.push(Palette::paint(p.red, format!("{}*", repo.uncommitted().len())));
        }
        if !repo.untracked().is_empty() {
            parts.push(Palette::paint(p.cyan, format!("{}?", repo.untracked().len())));
        }

        let shown: &[BranchState] = if all {
            &[
                BranchState::InSync,
                BranchState::NotFetched,
                BranchState::Behind,
                BranchState::Ahead,
                BranchState::Diverged,
                BranchState::NotPushed,
            ]
        } else {
            &[
                BranchState::Behind,
                BranchState::Ahead,
                BranchState::Diverged,
                BranchState::NotPushed,
            ]
        };
        for &state in shown {
            let count = stats.get(state);
            if count > 0 {
                parts.push(Palette::paint(
                    p.state_style(state),
                    format!("{count}{}", state.symbol()),
                ));
            }
        }

        let action = repo.needs_action();
        if !all && !action {
            return None;
        }

        let name = if all && action {
            Palette::paint(p.red_bold, repo.display_name())
        } else {
            repo.display_name().to_string()
        };
        Some(if parts.is_empty() {
            name
        } else {
            format!("{name} {}", parts.join(" "))
        })
    }

    fn expanded(&self, repo: &Repository) -> Vec<String> {
        let p = &self.palette;
        let all = self.options.all;

        let mut workspace = Vec::new();
        for change in repo.uncommitted() {
            workspace.push(format!("{} {}", Palette::paint(p.red, &change.code), change.path));
        }
        for change in repo.untracked() {
            workspace.push(format!("{} {}", Palette::paint(p.cyan, &change.code), change.path));
        }

        // Remote names only disambiguate when there is more than one.
        let show_remote = repo.remote_to_branches().len() > 1;
        let mut branches = Vec::new();
        for (branch, tracking) in repo.branches() {
            let name = if repo.head().is(branch) {
                Palette::paint(p.green, branch)
            } else {
                branch.clone()
            };

            let remotes = match tracking {
                BranchTracking::NotTracked => {
                    branches.push(self.branch_line(BranchState::NotPushed, &name, None, None));
                    continue;
                }
                BranchTracking::Tracked(remotes) => remotes,
            };

            for (remote, status) in remotes {
                let state = status.state();
                if !state.needs_action() && !all {
                    continue;
                }
                let remote = show_remote.then_some(remote.as_str());
                let counts = match status {
                    RemoteStatus::Computed(c) => match state {
                        BranchState::Diverged => {
                            Some(format!("{}|{}", c.local_ahead, c.remote_ahead))
                        }
                        BranchState::Ahead => Some(c.local_ahead.to_string()),
                        BranchState::Behind => Some(c.remote_ahead.to_string()),
                        _ => None,
                    },
                    RemoteStatus::Unknown => None,
                };
                branches.push(self.branch_line(state, &name, remote, counts));
            }
        }

        let action = repo.needs_action();
        let header = if action {
            Palette::paint(p.red_bold, repo.display_name())
        } else if all {
            Palette::paint(p.green_bold, repo.display_name())
        } else {
            return Vec::new();
        };

        let mut lines = vec![header];
        if *repo.head() == Head::Detached {
            lines.push(format!("{INDENT}{}", Palette::paint(p.yellow, "(detached HEAD)")));
        }
        lines.extend(workspace.into_iter().map(|l| format!("{INDENT}{INDENT}{l}")));
        lines.extend(branches.into_iter().map(|l| format!("{INDENT}{l}")));
        lines
    }

    fn branch_line(
        &self,
        state: BranchState,
        name: &str,
        remote: Option<&str>,
        counts: Option<String>,
    ) -> String {
        let p = &self.palette;
        let mut line = format!(
            "{} {name}",
            Palette::paint(p.state_style(state), state.symbol())
        );
        if let Some(remote) = remote {
            line.push_str(&format!(" ({remote})"));
        }
        if let Some(counts) = counts {
            line.push_str(&format!(" {}", Palette::paint(p.yellow, counts)));
        }
        line
    }
}

/// The symbol legend printed by `--legend`.
pub fn legend(palette: &Palette) -> String {
    let sym = |state: BranchState| Palette::paint(palette.state_style(state), state.symbol());
    [
        "Workspace symbols:".to_string(),
        format!(
            "{INDENT}{}: modified, but uncommitted file",
            Palette::paint(palette.red, '*')
        ),
        format!("{INDENT}{}: untracked file", Palette::paint(palette.cyan, '?')),
        "Branch symbols:".to_string(),
        format!(
            "{INDENT}{}: local branch in sync with the remote",
            sym(BranchState::InSync)
        ),
        format!(
            "{INDENT}{}: local branch ahead of the remote",
            sym(BranchState::Ahead)
        ),
        format!(
            "{INDENT}{}: local branch behind the remote",
            sym(BranchState::Behind)
        ),
        format!(
            "{INDENT}{}: local branch diverging from the remote",
            sym(BranchState::Diverged)
        ),
        format!(
            "{INDENT}{}: local branch never pushed to the remote",
            sym(BranchState::NotPushed)
        ),
        format!("{INDENT}{}: remote branch never fetched", sym(BranchState::NotFetched)),
    ]
    .join("\n")
}

/// All entries as a pretty-printed JSON array.
pub fn render_json<'a>(
    entries: impl IntoIterator<Item = &'a RepoEntry>,
) -> serde_json::Result<String> {
    let entries: Vec<&RepoEntry> = entries.into_iter().collect();
    serde_json::to_string_pretty(&entries)
}
