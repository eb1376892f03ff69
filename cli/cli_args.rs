use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the target project directory (default: $PROJECT_ROOT or current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .llmctx/llmctx.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config_file",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config_file: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "llmctx",
    author,
    version,
    about = "Bundle a project's source into a single LLM-ready context document.",
    long_about = "llmctx walks a project, skips dependencies, secrets and build output, ranks the \nremaining files by importance and renders them as XML, Markdown, JSON or text, \noptionally wrapped in a task prompt.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  llmctx generate -f xml\n  llmctx generate --select app --prompt bug-fix --stdout\n  llmctx stats --exact\n  llmctx prompts security",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Generate the context document and save or print it."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "s",
        about = "Show per-file classification, size and token statistics."
    )]
    Stats(StatsArgs),

    #[command(
        visible_alias = "p",
        about = "List prompt templates or show one in full."
    )]
    Prompts(PromptsArgs),

    #[command(about = "Generate shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["xml", "markdown", "md", "json", "text"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Omit the generation timestamp so repeated runs are byte-identical.",
        help_heading = "Output Formatting"
    )]
    pub no_timestamp: bool,

    #[arg(
        long,
        help = "Print the document to standard output instead of saving it.",
        help_heading = "Output Control",
        conflicts_with = "save"
    )]
    pub stdout: bool,

    #[arg(
        short = 's',
        long,
        value_name = "SAVE_DIR",
        help_heading = "Output Control",
        help = "Directory to save the document in (default: config or project root)."
    )]
    pub save: Option<PathBuf>,

    #[arg(
        long,
        value_name = "BASE",
        help_heading = "Output Control",
        help = "Base name of the output file [default: llmctx]."
    )]
    pub name: Option<String>,

    #[clap(flatten)]
    pub selection: SelectionGroup,
    #[clap(flatten)]
    pub prompt: PromptGroup,
    #[clap(flatten)]
    pub ignore_toggles: IgnoreTogglesGroup,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["table", "json"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Also count tokens with the cl100k_base tokenizer (slower).",
        help_heading = "Output Formatting"
    )]
    pub exact: bool,

    #[clap(flatten)]
    pub selection: SelectionGroup,
    #[clap(flatten)]
    pub ignore_toggles: IgnoreTogglesGroup,
}

#[derive(Args, Debug, Clone)]
pub struct PromptsArgs {
    #[arg(help = "Prompt key to show in full (omit to list all).")]
    pub key: Option<String>,

    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json"])]
    pub format: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh, powershell, elvish) [default: fish]"
    )]
    pub shell: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionGroup {
    #[arg(long = "select", value_name = "PATH", action = clap::ArgAction::Append, help = "Only include this file or directory (relative to the root). Repeatable.", help_heading = "Selection")]
    pub select: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PromptGroup {
    #[arg(
        short = 'p',
        long = "prompt",
        value_name = "KEY",
        help = "Wrap the document in a prompt template (see `llmctx prompts`).",
        help_heading = "Prompting"
    )]
    pub key: Option<String>,

    #[arg(
        short = 'i',
        long,
        value_name = "TEXT",
        help = "Additional instructions to place before the context.",
        help_heading = "Prompting"
    )]
    pub instructions: Option<String>,

    #[arg(short = 'r', long = "rule", value_name = "RULE", action = clap::ArgAction::Append, help = "Add a rule the model must follow. Repeatable.", help_heading = "Prompting")]
    pub rules: Vec<String>,

    #[arg(
        long = "prompts",
        help = "Append prompt suggestions and a token budget check.",
        help_heading = "Prompting"
    )]
    pub include_prompts: bool,

    #[arg(long, value_name = "LLM", value_parser = ["claude", "gpt", "gemini", "custom"], help = "Model family used for the token budget check.", help_heading = "Prompting")]
    pub target: Option<String>,

    #[arg(
        long,
        value_name = "N",
        help = "Token budget for --target custom [default: 100000].",
        help_heading = "Prompting"
    )]
    pub max_tokens: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct IgnoreTogglesGroup {
    #[arg(
        long,
        help = "Also apply the project's .gitignore patterns.",
        overrides_with = "no_gitignore",
        help_heading = "Ignore Rules"
    )]
    pub gitignore: bool,
    #[arg(
        long,
        help = "Do not apply .gitignore patterns [default].",
        overrides_with = "gitignore",
        help_heading = "Ignore Rules"
    )]
    pub no_gitignore: bool,

    #[arg(
        long,
        help = "Disable the built-in ignore patterns (node_modules, .env, lock files, ...).",
        help_heading = "Ignore Rules"
    )]
    pub no_builtin_ignore: bool,

    #[arg(long = "ignore", value_name = "PATTERN", action = clap::ArgAction::Append, help = "Add a gitignore-style exclude pattern. Repeatable.", help_heading = "Ignore Rules")]
    pub extra: Vec<String>,
}
