pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod ignore_rules;
pub mod output_formats;
pub mod pipeline;
pub mod prompts;
pub mod tokens;
pub mod tree;
pub mod walker;

pub use classify::{Classification, classify};
pub use config::{Config, GenerationOptions, OutputFormat, TargetLlm};
pub use context::{ContextStats, FileRecord};
pub use error::{AppError, Result};
pub use ignore_rules::{IgnoreMatcher, IgnoreSources, UserPatterns, build_project_matcher};
pub use output_formats::{TokenUsage, format_output};
pub use pipeline::{
    GeneratedContext, NoopProgress, ProgressSink, SelectionProvider, generate, generate_with,
    ignore_output_file, output_file_name, scan, write_output,
};
pub use prompts::{PromptKey, PromptTemplate};
pub use tokens::estimate_tokens;
