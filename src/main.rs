use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use color_print::cformat;

use repocheck::cli::{Cli, OutputFormat};
use repocheck::config::{UserConfig, config_path};
use repocheck::discovery::discover;
use repocheck::report::{Palette, Reporter, legend, render_json};
use repocheck::vcs::Registry;

fn main() -> ExitCode {
    // Usage errors exit with status 2 from here.
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            anstream::eprintln!("{}", cformat!("<red,bold>error:</> {err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    // Before the config is read: the legend never depends on it.
    if cli.legend {
        anstream::println!("{}", legend(&Palette::new(!cli.no_colors)));
        return Ok(ExitCode::SUCCESS);
    }

    let path = config_path(cli.config.as_deref());
    let config = UserConfig::load(path.as_deref(), cli.config.is_some()).with_context(|| {
        match &path {
            Some(path) => format!("failed to load config from {}", path.display()),
            None => "failed to load config".to_string(),
        }
    })?;
    let settings = cli.settings(&config);
    let palette = Palette::new(settings.colors);

    let results = discover(&settings.roots, &settings.discovery, &Registry::default())
        .context("aborted")?;
    log::info!(
        "{} repositories, {} failed, {} unreadable paths",
        results.len(),
        results.failures(),
        results.warnings().len()
    );

    match settings.format {
        OutputFormat::Text => {
            let reporter = Reporter::new(palette, settings.report);
            for line in reporter.render(results.iter()) {
                anstream::println!("{line}");
            }
        }
        OutputFormat::Json => {
            let json = render_json(results.iter()).context("failed to serialize results")?;
            anstream::println!("{json}");
        }
    }

    Ok(if results.failures() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
