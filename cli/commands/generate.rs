use crate::cli_args::GenerateArgs;
use crate::output;
use crate::{ignore_sources_with_overrides, load_config_for_command};
use anyhow::{Context, Result};
use log;
use llmctx_core::{self as core, Config, GenerationOptions, OutputFormat, TargetLlm};
use std::path::{Path, PathBuf};

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.project_config)
        .context("Failed to load configuration")?;
    let options = merge_options_with_cli_overrides(config.generation_options(), &args)?;
    let mut ignore_sources = ignore_sources_with_overrides(&config, &args.ignore_toggles);
    log::debug!("Effective generation options: {:?}", options);

    let destination = if args.stdout {
        None
    } else {
        let save_dir = resolve_save_dir(&config, args.save.as_ref(), &project_root);
        let base = args
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| config.filename_base());
        let file_name = core::output_file_name(options.format, base);
        core::ignore_output_file(&mut ignore_sources, &project_root, &save_dir, &file_name);
        Some((save_dir, file_name))
    };

    let mut progress = |percent: u8, stage: &str| {
        log::info!("[{:>3}%] {}", percent, stage);
    };
    let generated = core::generate_with(
        &project_root,
        &options,
        &ignore_sources,
        &options,
        &mut progress,
    )
    .context("Failed to generate project context")?;

    if generated.files.is_empty() {
        log::warn!("No files matched; the document only contains the header.");
    }

    let Some((save_dir, file_name)) = destination else {
        return output::write_to_stdout(&generated.document);
    };
    let written = core::write_output(&save_dir, &file_name, &generated.document)?;

    if !quiet {
        let project_name = config.effective_project_name(&project_root);
        output::print_generation_summary(&generated, &written, &project_name);
    }
    Ok(())
}

fn merge_options_with_cli_overrides(
    mut options: GenerationOptions,
    args: &GenerateArgs,
) -> Result<GenerationOptions> {
    log::trace!("Applying generate command CLI overrides to options...");

    if let Some(format) = &args.format {
        options.format = format.parse::<OutputFormat>()?;
    }
    if args.no_timestamp {
        options.include_timestamp = false;
    }
    if !args.selection.select.is_empty() {
        options.selected_files = args.selection.select.clone();
    }

    let prompt = &args.prompt;
    if prompt.include_prompts {
        options.include_prompts = true;
    }
    if let Some(target) = &prompt.target {
        options.target_llm = target.parse::<TargetLlm>()?;
    }
    if prompt.max_tokens.is_some() {
        options.max_tokens = prompt.max_tokens;
    }
    if let Some(key) = &prompt.key {
        options.selected_prompt = Some(key.clone());
    }
    if let Some(text) = &prompt.instructions {
        options.user_prompt = Some(text.clone());
    }
    options.rules.extend(prompt.rules.iter().cloned());

    Ok(options)
}

fn resolve_save_dir(config: &Config, cli_save: Option<&PathBuf>, project_root: &Path) -> PathBuf {
    match cli_save {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => {
            log::trace!("Save directory provided via CLI: {}", dir.display());
            project_root.join(dir)
        }
        None => config.output_dir(project_root),
    }
}
