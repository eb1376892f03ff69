mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::Path;
use std::process;

use cli_args::{Cli, Commands, IgnoreTogglesGroup, ProjectConfigOpts};
use llmctx_core::{AppError, Config, IgnoreSources};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::NoProjectRoot { .. }) => 2,
        Some(AppError::Scan(_)) => 2,
        Some(AppError::Ignore(_)) => 2,
        Some(AppError::FileWrite { .. }) => 3,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::XmlSerialize(_)) => 6,
        Some(AppError::TikToken(_)) => 8,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Generate(args) => {
                log::debug!("Executing 'generate' command...");
                commands::generate::handle_generate_command(args, quiet)?;
            }
            Commands::Stats(args) => {
                log::debug!("Executing 'stats' command...");
                commands::stats::handle_stats_command(args, quiet)?;
            }
            Commands::Prompts(args) => {
                log::debug!("Executing 'prompts' command...");
                commands::prompts::handle_prompts_command(&args)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args)?;
            }
        },
    }
    Ok(())
}

/// Loads the TOML config the project options point at, or the defaults.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config_file.as_ref(),
        project_opts.disable_config_file,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    log::trace!("Loaded config: {:?}", config);
    Ok(config)
}

/// Config ignore settings with the command line toggles applied on top.
pub fn ignore_sources_with_overrides(
    config: &Config,
    toggles: &IgnoreTogglesGroup,
) -> IgnoreSources {
    let mut sources = config.ignore_sources();
    if toggles.gitignore {
        sources.use_gitignore = true;
    }
    if toggles.no_gitignore {
        sources.use_gitignore = false;
    }
    if toggles.no_builtin_ignore {
        sources.enable_builtin = false;
    }
    sources.extra.extend(toggles.extra.iter().cloned());
    sources
}
