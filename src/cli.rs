use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::UserConfig;
use crate::discovery::{DiscoveryOptions, FailureMode};
use crate::report::ReportOptions;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// Every repository as a JSON array
    Json,
}

/// Check the status of every repository under a set of root directories.
///
/// By default only repositories needing attention are listed: uncommitted or
/// untracked files, or branches to push, pull or merge.
#[derive(Debug, Parser)]
#[command(name = "repocheck", version, about, long_about)]
pub struct Cli {
    /// Root directories to search
    ///
    /// Defaults to `roots` from the config file, then to the current directory.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Run `git remote update` in each repository first (hits the network)
    #[arg(short = 'u', long)]
    pub update_remotes: bool,

    /// Also list repositories and branches that need no action
    #[arg(short, long)]
    pub all: bool,

    /// List every file and branch instead of counts
    #[arg(short, long)]
    pub expanded: bool,

    /// Name repositories by their path relative to the search root
    #[arg(short = 'p', long)]
    pub rel_paths: bool,

    /// Follow symbolic links while searching
    #[arg(short = 'l', long)]
    pub follow_links: bool,

    /// Do not look for repositories inside other repositories
    #[arg(short = 'n', long)]
    pub no_nested_repos: bool,

    /// Print the symbol legend and exit
    #[arg(short = 'L', long)]
    pub legend: bool,

    /// Never color the output
    #[arg(long)]
    pub no_colors: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Abort on the first unreadable directory or failing repository
    #[arg(long)]
    pub strict: bool,

    /// Verbose output (-v: info, -vv: debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// User config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Effective settings after layering the command line over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub roots: Vec<PathBuf>,
    pub discovery: DiscoveryOptions,
    pub report: ReportOptions,
    pub colors: bool,
    pub format: OutputFormat,
}

impl Cli {
    /// Command-line switches can only turn behavior on, except the `--no-*`
    /// switches which turn it off.
    pub fn settings(&self, config: &UserConfig) -> Settings {
        let roots = if !self.paths.is_empty() {
            self.paths.clone()
        } else if !config.roots.is_empty() {
            config.roots.clone()
        } else {
            vec![PathBuf::from(".")]
        };

        let failure_mode = if self.strict || config.strict {
            FailureMode::Strict
        } else {
            FailureMode::Lenient
        };

        Settings {
            roots,
            discovery: DiscoveryOptions {
                follow_links: self.follow_links || config.follow_links,
                nested_repos: config.nested_repos && !self.no_nested_repos,
                rel_paths: self.rel_paths || config.rel_paths,
                update_remotes: self.update_remotes || config.update_remotes,
                failure_mode,
            },
            report: ReportOptions {
                expanded: self.expanded || config.expanded,
                all: self.all || config.all,
            },
            colors: config.colors && !self.no_colors,
            format: self.format,
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    }
}
