use crate::cli_args::StatsArgs;
use crate::output::{print_json, print_stats_table};
use crate::{ignore_sources_with_overrides, load_config_for_command};
use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use indexmap::IndexMap;
use log;
use llmctx_core::{self as core, Config, ContextStats, FileRecord, NoopProgress};
use serde::Serialize;
use tiktoken_rs::cl100k_base;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub total_files: usize,
    pub total_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_tokens: Option<usize>,
    pub total_size: usize,
    pub total_size_readable: String,
    pub categories: IndexMap<String, usize>,
    pub files: Vec<FileStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub path: String,
    pub category: String,
    pub priority: u8,
    pub tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_tokens: Option<usize>,
    pub size: usize,
    pub size_readable: String,
}

pub fn handle_stats_command(args: StatsArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.project_config)
        .context("Failed to load configuration for stats command")?;
    let ignore_sources = ignore_sources_with_overrides(&config, &args.ignore_toggles);

    log::debug!("Scanning files for stats...");
    let files = core::scan(
        &project_root,
        &ignore_sources,
        &args.selection.select,
        &mut NoopProgress,
    )
    .context("Failed to scan project files")?;

    if files.is_empty() && !quiet {
        println!("No files found to report on.");
        return Ok(());
    }

    let report = build_report(&files, args.exact)?;
    match args.format.as_deref() {
        Some("json") => print_json(&report),
        _ => print_stats_table(&report),
    }
}

fn readable(bytes: usize) -> String {
    Byte::from_u128(bytes as u128)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

pub fn build_report(files: &[FileRecord], exact: bool) -> Result<StatsReport> {
    let bpe = if exact {
        Some(cl100k_base().map_err(|e| anyhow::anyhow!(core::AppError::TikToken(e.to_string())))?)
    } else {
        None
    };

    let stats = ContextStats::from_files(files);
    let mut exact_total = 0usize;
    let file_stats: Vec<FileStats> = files
        .iter()
        .map(|file| {
            let exact_tokens = bpe
                .as_ref()
                .map(|bpe| bpe.encode_ordinary(&file.content).len());
            exact_total += exact_tokens.unwrap_or(0);
            FileStats {
                path: file.path.clone(),
                category: file.category.clone(),
                priority: file.priority,
                tokens: file.tokens,
                exact_tokens,
                size: file.size,
                size_readable: readable(file.size),
            }
        })
        .collect();

    Ok(StatsReport {
        total_files: stats.total_files,
        total_tokens: stats.total_tokens,
        exact_tokens: bpe.is_some().then_some(exact_total),
        total_size: stats.total_size,
        total_size_readable: readable(stats.total_size),
        categories: stats.categories,
        files: file_stats,
    })
}
