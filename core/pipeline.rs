use crate::config::{GenerationOptions, OutputFormat};
use crate::context::{self, ContextStats, FileRecord};
use crate::error::{AppError, Result};
use crate::ignore_rules::{self, IgnoreSources};
use crate::output_formats;
use crate::prompts;
use crate::walker::{self, WalkedFile};
use chrono::Utc;
use log;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Receives coarse progress updates: a percentage and a stage label.
pub trait ProgressSink {
    fn report(&mut self, percent: u8, stage: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(u8, &str),
{
    fn report(&mut self, percent: u8, stage: &str) {
        self(percent, stage)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&mut self, _percent: u8, _stage: &str) {}
}

/// Supplies the relative paths the user picked. Empty means everything.
pub trait SelectionProvider {
    fn selected_paths(&self) -> Vec<String>;
}

impl SelectionProvider for Vec<String> {
    fn selected_paths(&self) -> Vec<String> {
        self.clone()
    }
}

impl SelectionProvider for GenerationOptions {
    fn selected_paths(&self) -> Vec<String> {
        self.selected_files.clone()
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedContext {
    pub document: String,
    pub format: OutputFormat,
    pub stats: ContextStats,
    /// Ranked, in the order they appear in `document`.
    pub files: Vec<FileRecord>,
}

/// Runs a generation with the default ignore sources and the selection
/// carried in `options`.
pub fn generate(
    root: &Path,
    options: &GenerationOptions,
    progress: &mut dyn ProgressSink,
) -> Result<GeneratedContext> {
    generate_with(root, options, &IgnoreSources::default(), options, progress)
}

pub fn generate_with(
    root: &Path,
    options: &GenerationOptions,
    ignore_sources: &IgnoreSources,
    selection: &dyn SelectionProvider,
    progress: &mut dyn ProgressSink,
) -> Result<GeneratedContext> {
    let files = scan(root, ignore_sources, selection, progress)?;
    let stats = ContextStats::from_files(&files);

    progress.report(85, "Formatting output");
    let generated_at = options.include_timestamp.then(Utc::now);
    let rendered = output_formats::format_output(&files, &stats, root, options, generated_at)?;
    let document = match options.selected_prompt.as_deref() {
        Some(key) => prompts::compose(
            Some(key),
            &rendered,
            options.user_prompt.as_deref(),
            &options.rules,
        ),
        None => prompts::prepend_user_sections(
            &rendered,
            options.user_prompt.as_deref(),
            &options.rules,
        ),
    };

    progress.report(100, "Done");
    log::info!(
        "Generated {} context: {} files, ~{} tokens",
        options.format,
        stats.total_files,
        stats.total_tokens
    );
    Ok(GeneratedContext {
        document,
        format: options.format,
        stats,
        files,
    })
}

/// Walks, filters, classifies and ranks. Reports progress up to 70%.
pub fn scan(
    root: &Path,
    ignore_sources: &IgnoreSources,
    selection: &dyn SelectionProvider,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<FileRecord>> {
    progress.report(0, "Loading ignore rules");
    let matcher = ignore_rules::build_project_matcher(root, ignore_sources)?;
    log::debug!("Ignore matcher compiled with {} patterns", matcher.pattern_count());

    progress.report(10, "Scanning files");
    let walked = walker::walk(root, &matcher)?;
    let walked = filter_selection(walked, &selection.selected_paths());

    progress.report(50, "Classifying files");
    let records: Vec<FileRecord> = walked.into_iter().map(FileRecord::from_walked).collect();

    progress.report(70, "Ranking files");
    Ok(context::rank(records))
}

fn normalize_selection(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");
    while let Some(stripped) = path.strip_prefix("./") {
        path = stripped.to_string();
    }
    path.trim_matches('/').to_string()
}

/// Keeps files equal to a selected path or lying under a selected directory.
pub fn filter_selection(files: Vec<WalkedFile>, selected: &[String]) -> Vec<WalkedFile> {
    let selected: Vec<String> = selected.iter().map(|s| normalize_selection(s)).collect();
    if selected.is_empty() || selected.iter().any(|s| s.is_empty() || s == ".") {
        return files;
    }
    let before = files.len();
    let kept: Vec<WalkedFile> = files
        .into_iter()
        .filter(|file| {
            selected.iter().any(|s| {
                file.path == *s
                    || (file.path.starts_with(s.as_str())
                        && file.path.as_bytes().get(s.len()) == Some(&b'/'))
            })
        })
        .collect();
    log::debug!("Selection kept {} of {} files", kept.len(), before);
    kept
}

/// `<base>-<format>.<ext>`, or `<base>.txt` for the text format.
pub fn output_file_name(format: OutputFormat, base: &str) -> String {
    match format {
        OutputFormat::Text => format!("{}.{}", base, format.extension()),
        _ => format!("{}-{}.{}", base, format.as_str(), format.extension()),
    }
}

/// Adds an anchored pattern for an output file saved inside `root`, so the
/// next run does not pick it up. Files saved elsewhere need nothing.
pub fn ignore_output_file(
    sources: &mut IgnoreSources,
    root: &Path,
    dir: &Path,
    file_name: &str,
) {
    let Ok(relative_dir) = dir.strip_prefix(root) else {
        log::trace!("Output directory {} is outside the project", dir.display());
        return;
    };
    let mut segments = Vec::new();
    for component in relative_dir.components() {
        match component {
            Component::Normal(part) => segments.push(escape_glob(&part.to_string_lossy())),
            Component::CurDir => {}
            _ => return,
        }
    }
    segments.push(escape_glob(file_name));
    let pattern = format!("/{}", segments.join("/"));
    log::debug!("Ignoring own output via pattern {}", pattern);
    sources.extra.push(pattern);
}

fn escape_glob(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn write_output(dir: &Path, file_name: &str, document: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    fs::create_dir_all(dir).map_err(|e| AppError::FileWrite {
        path: dir.to_path_buf(),
        source: e,
    })?;
    fs::write(&path, document).map_err(|e| AppError::FileWrite {
        path: path.clone(),
        source: e,
    })?;
    log::info!("Context written to {}", path.display());
    Ok(path)
}
