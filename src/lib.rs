pub mod cli;
pub mod config;
pub mod discovery;
pub mod report;
pub mod repository;
pub mod shell_exec;
pub mod sync;
pub mod vcs;

pub use discovery::{DiscoveryOptions, FailureMode, RepoEntry, ResultSet, discover};
pub use repository::{BranchState, Repository};
