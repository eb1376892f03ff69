use crate::config::{GenerationOptions, OutputFormat, TargetLlm};
use crate::context::{ContextStats, FileRecord};
use crate::error::{AppError, Result};
use crate::prompts::SUGGESTED_PROMPTS;
use crate::tree;
use chrono::{DateTime, SecondsFormat, Utc};
use log;
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;

const TEXT_RULE: &str = "================================================================";

/// Token budget check shown alongside prompt suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub target: TargetLlm,
    pub limit: String,
    pub threshold: usize,
    pub estimated_tokens: usize,
    pub within_budget: bool,
    pub message: String,
}

impl TokenUsage {
    pub fn new(estimated_tokens: usize, target: TargetLlm, max_tokens: Option<usize>) -> Self {
        let limit = target.limit_label(max_tokens);
        let threshold = target.token_threshold(max_tokens);
        let within_budget = estimated_tokens <= threshold;
        let message = if within_budget {
            format!(
                "Within budget: ~{} tokens fits the {} {} context window.",
                estimated_tokens,
                limit,
                target.display_name()
            )
        } else {
            format!(
                "Warning: ~{} tokens exceeds the usable {} budget ({} tokens). Consider selecting fewer files.",
                estimated_tokens,
                target.display_name(),
                threshold
            )
        };
        Self {
            target,
            limit,
            threshold,
            estimated_tokens,
            within_budget,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSuggestions {
    pub prompts: Vec<String>,
    pub token_usage: TokenUsage,
}

impl PromptSuggestions {
    pub fn new(stats: &ContextStats, options: &GenerationOptions) -> Self {
        Self {
            prompts: SUGGESTED_PROMPTS.iter().map(|p| p.to_string()).collect(),
            token_usage: TokenUsage::new(
                stats.total_tokens,
                options.target_llm,
                options.max_tokens,
            ),
        }
    }
}

/// Everything a renderer needs. Built once per run.
struct RenderInput<'a> {
    files: &'a [FileRecord],
    stats: &'a ContextStats,
    project_root: String,
    generated_at: Option<String>,
    tree: String,
    suggestions: Option<PromptSuggestions>,
}

/// Renders ranked `files` as one document in `options.format`.
///
/// The timestamp is only emitted when `generated_at` is given, so two runs
/// without one produce identical bytes.
pub fn format_output(
    files: &[FileRecord],
    stats: &ContextStats,
    project_root: &Path,
    options: &GenerationOptions,
    generated_at: Option<DateTime<Utc>>,
) -> Result<String> {
    let input = RenderInput {
        files,
        stats,
        project_root: project_root.display().to_string(),
        generated_at: generated_at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        tree: tree::render_paths(files.iter().map(|f| f.path.as_str())),
        suggestions: options
            .include_prompts
            .then(|| PromptSuggestions::new(stats, options)),
    };
    log::debug!(
        "Rendering {} files as {} (prompt suggestions: {})",
        files.len(),
        options.format,
        input.suggestions.is_some()
    );
    match options.format {
        OutputFormat::Xml => render_xml(&input),
        OutputFormat::Json => render_json(&input),
        OutputFormat::Markdown => Ok(render_markdown(&input)),
        OutputFormat::Text => Ok(render_text(&input)),
    }
}

// --- JSON ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument<'a> {
    metadata: JsonMetadata<'a>,
    project_tree: &'a str,
    files: &'a [FileRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_suggestions: Option<&'a PromptSuggestions>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_at: Option<&'a str>,
    project_root: &'a str,
    format: &'static str,
    stats: &'a ContextStats,
}

fn render_json(input: &RenderInput) -> Result<String> {
    let document = JsonDocument {
        metadata: JsonMetadata {
            generated_at: input.generated_at.as_deref(),
            project_root: &input.project_root,
            format: OutputFormat::Json.as_str(),
            stats: input.stats,
        },
        project_tree: &input.tree,
        files: input.files,
        prompt_suggestions: input.suggestions.as_ref(),
    };
    let mut json = serde_json::to_string_pretty(&document)?;
    json.push('\n');
    Ok(json)
}

// --- XML ---

fn xml_err(e: impl std::fmt::Display) -> AppError {
    AppError::XmlSerialize(e.to_string())
}

/// Characters allowed by the XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Replaces characters XML cannot carry with U+FFFD.
fn xml_safe(raw: &str) -> Cow<'_, str> {
    if raw.chars().all(is_xml_char) {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(
            raw.chars()
                .map(|c| if is_xml_char(c) { c } else { '\u{FFFD}' })
                .collect(),
        )
    }
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(xml_err)
    }

    fn start(&mut self, element: BytesStart<'_>) -> Result<()> {
        self.event(Event::Start(element))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, raw: &str) -> Result<()> {
        let safe = xml_safe(raw);
        self.event(Event::Text(BytesText::from_escaped(escape(safe.as_ref()))))
    }

    fn newline(&mut self) -> Result<()> {
        self.event(Event::Text(BytesText::from_escaped("\n")))
    }

    fn element(&mut self, name: &str, value: &str) -> Result<()> {
        self.start(BytesStart::new(name))?;
        self.text(value)?;
        self.end(name)?;
        self.newline()
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(xml_err)
    }
}

fn render_xml(input: &RenderInput) -> Result<String> {
    let mut out = XmlOut::new();
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.newline()?;
    out.start(BytesStart::new("projectContext"))?;
    out.newline()?;

    out.start(BytesStart::new("metadata"))?;
    out.newline()?;
    if let Some(generated_at) = &input.generated_at {
        out.element("generatedAt", generated_at)?;
    }
    out.element("projectRoot", &input.project_root)?;
    out.element("format", OutputFormat::Xml.as_str())?;
    out.element("totalFiles", &input.stats.total_files.to_string())?;
    out.element("totalTokens", &input.stats.total_tokens.to_string())?;
    out.element("totalSize", &input.stats.total_size.to_string())?;
    out.start(BytesStart::new("categories"))?;
    out.newline()?;
    for (name, count) in &input.stats.categories {
        let count = count.to_string();
        out.event(Event::Empty(
            BytesStart::new("category")
                .with_attributes([("name", name.as_str()), ("count", count.as_str())]),
        ))?;
        out.newline()?;
    }
    out.end("categories")?;
    out.newline()?;
    out.end("metadata")?;
    out.newline()?;

    out.start(BytesStart::new("projectTree"))?;
    out.newline()?;
    out.text(&input.tree)?;
    out.end("projectTree")?;
    out.newline()?;

    out.start(BytesStart::new("files"))?;
    out.newline()?;
    for file in input.files {
        if !file.content.chars().all(is_xml_char) {
            log::warn!(
                "{} contains characters not allowed in XML; replaced with U+FFFD",
                file.path
            );
        }
        let path = xml_safe(&file.path);
        let priority = file.priority.to_string();
        let tokens = file.tokens.to_string();
        let size = file.size.to_string();
        out.start(BytesStart::new("file").with_attributes([
            ("path", path.as_ref()),
            ("category", file.category.as_str()),
            ("priority", priority.as_str()),
            ("tokens", tokens.as_str()),
            ("size", size.as_str()),
        ]))?;
        out.text(&file.content)?;
        out.end("file")?;
        out.newline()?;
    }
    out.end("files")?;
    out.newline()?;

    if let Some(suggestions) = &input.suggestions {
        let usage = &suggestions.token_usage;
        let threshold = usage.threshold.to_string();
        let estimated = usage.estimated_tokens.to_string();
        out.start(BytesStart::new("promptSuggestions").with_attributes([
            ("target", usage.target.as_str()),
            ("limit", usage.limit.as_str()),
            ("threshold", threshold.as_str()),
            ("estimatedTokens", estimated.as_str()),
            ("withinBudget", if usage.within_budget { "true" } else { "false" }),
        ]))?;
        out.newline()?;
        for prompt in &suggestions.prompts {
            out.element("prompt", prompt)?;
        }
        out.element("message", &usage.message)?;
        out.end("promptSuggestions")?;
        out.newline()?;
    }

    out.end("projectContext")?;
    out.newline()?;
    out.finish()
}

// --- Markdown ---

fn render_markdown(input: &RenderInput) -> String {
    let mut md = String::from("# Project Context\n\n");
    if let Some(generated_at) = &input.generated_at {
        md.push_str(&format!("- **Generated:** {}\n", generated_at));
    }
    md.push_str(&format!("- **Root:** `{}`\n", input.project_root));
    md.push_str(&format!("- **Files:** {}\n", input.stats.total_files));
    md.push_str(&format!("- **Estimated tokens:** {}\n", input.stats.total_tokens));
    md.push_str(&format!(
        "- **Total size:** {:.2} KiB\n\n",
        input.stats.total_size_kib()
    ));

    md.push_str("## Project Structure\n\n```text\n");
    md.push_str(&input.tree);
    md.push_str("```\n\n## Files\n\n");

    for file in input.files {
        let fence = fence_for(&file.content);
        md.push_str(&format!("### {}\n\n", file.path));
        md.push_str(&format!(
            "_Category: {} | Priority: {} | Tokens: {}_\n\n",
            file.category, file.priority, file.tokens
        ));
        md.push_str(&fence);
        md.push_str(language_for_path(&file.path));
        md.push('\n');
        md.push_str(&file.content);
        if !file.content.ends_with('\n') {
            md.push('\n');
        }
        md.push_str(&fence);
        md.push_str("\n\n");
    }

    if let Some(suggestions) = &input.suggestions {
        md.push_str("## Prompt Suggestions\n\n");
        for prompt in &suggestions.prompts {
            md.push_str(&format!("- {}\n", prompt));
        }
        md.push('\n');
        push_token_usage_lines(&mut md, &suggestions.token_usage, "### Token Usage\n\n");
    }
    md
}

/// Backtick fence one longer than the longest backtick run in `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0usize;
    let mut run = 0usize;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Code-fence language tag for a path, `text` when unknown.
pub fn language_for_path(path: &str) -> &'static str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "js" | "mjs" | "cjs" => "js",
        "jsx" => "jsx",
        "ts" | "mts" | "cts" => "ts",
        "tsx" => "tsx",
        "py" => "py",
        "rs" => "rs",
        "go" => "go",
        "java" => "java",
        "kt" => "kt",
        "rb" => "rb",
        "php" => "php",
        "cs" => "cs",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "swift" => "swift",
        "vue" => "vue",
        "svelte" => "svelte",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "html" | "htm" => "html",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "md" | "mdx" => "md",
        "sh" | "bash" => "sh",
        "sql" => "sql",
        "graphql" | "gql" => "graphql",
        "prisma" => "prisma",
        _ => "text",
    }
}

// --- Plain text ---

fn render_text(input: &RenderInput) -> String {
    let mut txt = String::from("PROJECT CONTEXT\n");
    if let Some(generated_at) = &input.generated_at {
        txt.push_str(&format!("Generated: {}\n", generated_at));
    }
    txt.push_str(&format!("Root: {}\n", input.project_root));
    txt.push_str(&format!("Files: {}\n", input.stats.total_files));
    txt.push_str(&format!("Estimated tokens: {}\n", input.stats.total_tokens));
    txt.push_str(&format!(
        "Total size: {:.2} KiB\n\n",
        input.stats.total_size_kib()
    ));
    txt.push_str("PROJECT STRUCTURE\n");
    txt.push_str(&input.tree);

    for file in input.files {
        txt.push('\n');
        txt.push_str(TEXT_RULE);
        txt.push_str(&format!(
            "\nFile: {} ({}, priority {}, ~{} tokens)\n",
            file.path, file.category, file.priority, file.tokens
        ));
        txt.push_str(TEXT_RULE);
        txt.push('\n');
        txt.push_str(&file.content);
        if !file.content.ends_with('\n') {
            txt.push('\n');
        }
    }

    if let Some(suggestions) = &input.suggestions {
        txt.push('\n');
        txt.push_str(TEXT_RULE);
        txt.push_str("\nPROMPT SUGGESTIONS\n");
        txt.push_str(TEXT_RULE);
        txt.push('\n');
        for prompt in &suggestions.prompts {
            txt.push_str(&format!("- {}\n", prompt));
        }
        txt.push('\n');
        push_token_usage_lines(&mut txt, &suggestions.token_usage, "TOKEN USAGE\n");
    }
    txt
}

fn push_token_usage_lines(out: &mut String, usage: &TokenUsage, heading: &str) {
    out.push_str(heading);
    out.push_str(&format!(
        "- Target: {} ({})\n",
        usage.target.display_name(),
        usage.limit
    ));
    out.push_str(&format!("- Estimated tokens: {}\n", usage.estimated_tokens));
    out.push_str(&format!("- Usable threshold: {}\n", usage.threshold));
    out.push_str(&format!("- {}\n", usage.message));
}
