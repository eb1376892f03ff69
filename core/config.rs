use crate::error::{AppError, Result};
use crate::ignore_rules::{DEFAULT_IGNORE_FILENAME, IgnoreSources};
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_DIR: &str = ".llmctx";
pub const DEFAULT_CONFIG_FILENAME: &str = "llmctx.toml";
pub const DEFAULT_OUTPUT_BASENAME: &str = "llmctx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Xml,
    #[default]
    Markdown,
    Json,
    /// Historical plain-text layout, written to `<base>.txt`.
    Text,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Xml,
        OutputFormat::Markdown,
        OutputFormat::Json,
        OutputFormat::Text,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "xml" => Ok(OutputFormat::Xml),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" | "plain" => Ok(OutputFormat::Text),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown output format '{}'. Expected one of: xml, markdown, json, text.",
                other
            ))),
        }
    }
}

/// Model family used only to pick the token budget shown with prompt suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLlm {
    #[default]
    Claude,
    Gpt,
    Gemini,
    Custom,
}

pub const DEFAULT_CUSTOM_TOKEN_LIMIT: usize = 100_000;

impl TargetLlm {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetLlm::Claude => "claude",
            TargetLlm::Gpt => "gpt",
            TargetLlm::Gemini => "gemini",
            TargetLlm::Custom => "custom",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TargetLlm::Claude => "Claude",
            TargetLlm::Gpt => "GPT-4",
            TargetLlm::Gemini => "Gemini",
            TargetLlm::Custom => "Custom",
        }
    }

    /// Nominal context window, for display.
    pub fn limit_label(self, max_tokens: Option<usize>) -> String {
        match self {
            TargetLlm::Claude => "200K".to_string(),
            TargetLlm::Gpt => "128K".to_string(),
            TargetLlm::Gemini => "1M".to_string(),
            TargetLlm::Custom => max_tokens.unwrap_or(DEFAULT_CUSTOM_TOKEN_LIMIT).to_string(),
        }
    }

    /// Usable token count above which a warning is shown.
    pub fn token_threshold(self, max_tokens: Option<usize>) -> usize {
        match self {
            TargetLlm::Claude => 180_000,
            TargetLlm::Gpt => 120_000,
            TargetLlm::Gemini => 900_000,
            TargetLlm::Custom => max_tokens.unwrap_or(DEFAULT_CUSTOM_TOKEN_LIMIT),
        }
    }
}

impl fmt::Display for TargetLlm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLlm {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(TargetLlm::Claude),
            "gpt" => Ok(TargetLlm::Gpt),
            "gemini" => Ok(TargetLlm::Gemini),
            "custom" => Ok(TargetLlm::Custom),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown target LLM '{}'. Expected one of: claude, gpt, gemini, custom.",
                other
            ))),
        }
    }
}

/// Options for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub format: OutputFormat,
    pub include_prompts: bool,
    pub target_llm: TargetLlm,
    pub max_tokens: Option<usize>,
    pub include_timestamp: bool,
    /// Relative paths (files or directories). Empty means everything.
    pub selected_files: Vec<String>,
    pub user_prompt: Option<String>,
    pub rules: Vec<String>,
    pub selected_prompt: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_prompts: default_false(),
            target_llm: TargetLlm::default(),
            max_tokens: None,
            include_timestamp: default_true(),
            selected_files: Vec::new(),
            user_prompt: None,
            rules: Vec::new(),
            selected_prompt: None,
        }
    }
}

// --- TOML configuration file ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub ignore: IgnoreConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub save: SaveConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default)]
    pub project_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IgnoreConfig {
    #[serde(default = "default_true")]
    pub enable_builtin: bool,
    #[serde(default = "default_false")]
    pub use_gitignore: bool,
    #[serde(default = "default_override_file")]
    pub override_file: PathBuf,
    #[serde(default)]
    pub extra: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_false")]
    pub include_prompts: bool,
    #[serde(default)]
    pub target_llm: TargetLlm,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default = "default_true")]
    pub include_timestamp: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    #[serde(default)]
    pub selected: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SaveConfig {
    /// Relative to the project root unless absolute. Defaults to the root.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub filename_base: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_override_file() -> PathBuf {
    PathBuf::from(DEFAULT_IGNORE_FILENAME)
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            enable_builtin: default_true(),
            use_gitignore: default_false(),
            override_file: default_override_file(),
            extra: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_prompts: default_false(),
            target_llm: TargetLlm::default(),
            max_tokens: None,
            include_timestamp: default_true(),
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(|e| AppError::NoProjectRoot {
                path: PathBuf::from("."),
                reason: e.to_string(),
            })?,
        };

        let canonical = path_to_resolve
            .canonicalize()
            .map_err(|e| AppError::NoProjectRoot {
                path: path_to_resolve.clone(),
                reason: e.to_string(),
            })?;
        if !canonical.is_dir() {
            return Err(AppError::NoProjectRoot {
                path: canonical,
                reason: "not a directory".to_string(),
            });
        }
        Ok(canonical)
    }

    /// Resolves which config file to load, if any. An explicitly requested
    /// file that does not exist is an error; a missing default is not.
    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&PathBuf>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(requested) => {
                let expanded = PathBuf::from(
                    shellexpand::tilde(&requested.to_string_lossy()).as_ref(),
                );
                let path = if expanded.is_absolute() {
                    expanded
                } else {
                    project_root.join(expanded)
                };
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let default_path = project_root
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str::<Config>(content)?)
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            format: self.output.format,
            include_prompts: self.output.include_prompts,
            target_llm: self.output.target_llm,
            max_tokens: self.output.max_tokens,
            include_timestamp: self.output.include_timestamp,
            selected_files: Vec::new(),
            user_prompt: self.prompt.user_prompt.clone(),
            rules: self.prompt.rules.clone(),
            selected_prompt: self.prompt.selected.clone(),
        }
    }

    pub fn ignore_sources(&self) -> IgnoreSources {
        IgnoreSources {
            enable_builtin: self.ignore.enable_builtin,
            use_gitignore: self.ignore.use_gitignore,
            extra: self.ignore.extra.clone(),
            override_file: self.ignore.override_file.clone(),
        }
    }

    /// Configured project name, else the root directory's name.
    pub fn effective_project_name(&self, project_root: &Path) -> String {
        self.general
            .project_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(String::from)
            .or_else(|| {
                project_root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "project".to_string())
    }

    pub fn output_dir(&self, project_root: &Path) -> PathBuf {
        match &self.save.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_root.join(dir),
            None => project_root.to_path_buf(),
        }
    }

    pub fn filename_base(&self) -> &str {
        self.save
            .filename_base
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_OUTPUT_BASENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn format_names_and_extensions() {
        assert_eq!(OutputFormat::Xml.extension(), "xml");
        assert_eq!(OutputFormat::Json.extension(), "json");
        assert_eq!(OutputFormat::Markdown.extension(), "md");
        assert_eq!(OutputFormat::Text.extension(), "txt");
        assert_eq!("md".parse::<OutputFormat>().expect("md"), OutputFormat::Markdown);
        assert_eq!("XML".parse::<OutputFormat>().expect("xml"), OutputFormat::Xml);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn target_limits_differ_per_model() {
        assert_eq!(TargetLlm::Claude.limit_label(None), "200K");
        assert_eq!(TargetLlm::Claude.token_threshold(None), 180_000);
        assert_eq!(TargetLlm::Gpt.token_threshold(None), 120_000);
        assert_eq!(TargetLlm::Gemini.limit_label(None), "1M");
        assert_eq!(TargetLlm::Custom.token_threshold(Some(5_000)), 5_000);
        assert_eq!(TargetLlm::Custom.limit_label(Some(5_000)), "5000");
        assert_eq!(
            TargetLlm::Custom.token_threshold(None),
            DEFAULT_CUSTOM_TOKEN_LIMIT
        );
        assert!("llama".parse::<TargetLlm>().is_err());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert!(config.ignore.enable_builtin);
        assert_eq!(config.ignore.override_file, PathBuf::from(".llmctxignore"));
        assert_eq!(config.generation_options(), GenerationOptions::default());
        assert_eq!(config.effective_project_name(Path::new("/srv/shop")), "shop");
        assert_eq!(config.filename_base(), DEFAULT_OUTPUT_BASENAME);
    }

    #[test]
    fn toml_sections_map_to_options() {
        let config = Config::from_toml_str(
            r#"
            [general]
            project_name = "storefront"

            [ignore]
            use_gitignore = true
            extra = ["fixtures/"]

            [output]
            format = "json"
            include_prompts = true
            target_llm = "custom"
            max_tokens = 50000
            include_timestamp = false

            [prompt]
            selected = "security"
            user_prompt = "Focus on auth."
            rules = ["No new dependencies"]

            [save]
            output_dir = "out/context"
            filename_base = "ctx"
            "#,
        )
        .expect("parse");

        let options = config.generation_options();
        assert_eq!(options.format, OutputFormat::Json);
        assert!(options.include_prompts);
        assert_eq!(options.target_llm, TargetLlm::Custom);
        assert_eq!(options.max_tokens, Some(50_000));
        assert!(!options.include_timestamp);
        assert_eq!(options.selected_prompt.as_deref(), Some("security"));
        assert_eq!(options.rules, vec!["No new dependencies".to_string()]);
        assert!(config.ignore_sources().use_gitignore);
        assert_eq!(config.filename_base(), "ctx");
        assert_eq!(config.effective_project_name(Path::new("/p/web")), "storefront");
        assert_eq!(
            config.output_dir(Path::new("/p")),
            PathBuf::from("/p/out/context")
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::from_toml_str("[output]\ncolour = true\n").is_err());
        assert!(Config::from_toml_str("[output]\nformat = \"yaml\"\n").is_err());
    }

    #[test]
    fn resolve_config_path_prefers_explicit_then_default() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        assert_eq!(Config::resolve_config_path(root, None, false).expect("none"), None);

        let default_dir = root.join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&default_dir).expect("mkdir");
        fs::write(default_dir.join(DEFAULT_CONFIG_FILENAME), "").expect("write");
        assert_eq!(
            Config::resolve_config_path(root, None, false).expect("default"),
            Some(default_dir.join(DEFAULT_CONFIG_FILENAME))
        );
        assert_eq!(Config::resolve_config_path(root, None, true).expect("off"), None);

        let missing = PathBuf::from("missing.toml");
        assert!(Config::resolve_config_path(root, Some(&missing), false).is_err());
    }

    #[test]
    fn project_root_must_exist() {
        let tmp = TempDir::new().expect("tmp");
        let missing = tmp.path().join("missing");
        let err = Config::determine_project_root(Some(&missing)).expect_err("missing");
        assert!(matches!(err, AppError::NoProjectRoot { .. }));

        let found = Config::determine_project_root(Some(&tmp.path().to_path_buf()))
            .expect("existing root");
        assert!(found.is_absolute());
    }
}
