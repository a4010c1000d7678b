//! User configuration.
//!
//! An optional TOML file provides defaults for every command-line switch.
//! Values can be overridden per invocation through `REPOCHECK_*` environment
//! variables (`REPOCHECK_ALL=true`, `REPOCHECK_REL_PATHS=true`, ...).
//!
//! ```toml
//! roots = ["~/src", "~/work"]
//! expanded = true
//! nested-repos = false
//! colors = false
//! ```

use std::path::{Path, PathBuf};

use config::{Case, Config, ConfigError, Environment, File, FileFormat, Map};
use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};
use serde::Deserialize;

const ENV_PREFIX: &str = "REPOCHECK";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserConfig {
    /// Search roots used when none are given on the command line. A leading
    /// `~` is expanded.
    pub roots: Vec<PathBuf>,
    pub all: bool,
    pub expanded: bool,
    pub rel_paths: bool,
    pub follow_links: bool,
    pub nested_repos: bool,
    pub colors: bool,
    pub update_remotes: bool,
    pub strict: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            all: false,
            expanded: false,
            rel_paths: false,
            follow_links: false,
            nested_repos: true,
            colors: true,
            update_remotes: false,
            strict: false,
        }
    }
}

impl UserConfig {
    /// Load from `path` and the process environment.
    ///
    /// A missing file is only an error when `required` is set, i.e. when the
    /// user named it explicitly with `--config`.
    pub fn load(path: Option<&Path>, required: bool) -> Result<Self, ConfigError> {
        Self::load_with_env(path, required, None)
    }

    /// Like [`UserConfig::load`], reading overrides from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        required: bool,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            log::debug!("reading config from {}", path.display());
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(required),
            );
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .convert_case(Case::Kebab)
                    .source(env),
            )
            .build()?
            .try_deserialize()
            .map(Self::expand_roots)
    }

    fn expand_roots(mut self) -> Self {
        for root in &mut self.roots {
            let expanded = shellexpand::tilde(&root.to_string_lossy()).into_owned();
            *root = PathBuf::from(expanded);
        }
        self
    }
}

/// Location of the user config file.
///
/// Priority:
/// 1. `--config` on the command line
/// 2. `REPOCHECK_CONFIG_PATH`
/// 3. `<config dir>/repocheck/config.toml`
///
/// `choose_base_strategy` picks XDG locations on Linux and macOS (so
/// `~/.config` rather than `~/Library/Application Support`) and `%APPDATA%` on
/// Windows.
pub fn config_path(cli_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_override {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("REPOCHECK_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("repocheck").join("config.toml"))
}
