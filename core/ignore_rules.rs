use crate::error::Result;
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use indexmap::IndexMap;
use log;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_IGNORE_FILENAME: &str = ".llmctxignore";

/// Built-in patterns, grouped for readability. Groups keep file order.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct BuiltinIgnores {
    pub groups: IndexMap<String, Vec<String>>,
}

impl BuiltinIgnores {
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.groups.values().flatten().map(String::as_str)
    }
}

static BUILTIN_IGNORE_PATTERNS: Lazy<BuiltinIgnores> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/builtin_ignores.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/builtin_ignores.yaml")
});

pub fn get_builtin_ignore_patterns() -> &'static BuiltinIgnores {
    &BUILTIN_IGNORE_PATTERNS
}

pub fn default_patterns() -> Vec<String> {
    get_builtin_ignore_patterns()
        .patterns()
        .map(String::from)
        .collect()
}

/// Patterns supplied by the project or the user rather than embedded.
/// Lines that fail to compile are skipped with a warning.
#[derive(Debug, Clone)]
pub struct UserPatterns {
    origin: String,
    source: Option<PathBuf>,
    lines: Vec<String>,
}

impl UserPatterns {
    /// Lines of an ignore file; blanks and `#` comments are dropped.
    pub fn from_file(path: PathBuf, content: &str) -> Self {
        Self {
            origin: path.display().to_string(),
            lines: content
                .lines()
                .map(str::trim_end)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from)
                .collect(),
            source: Some(path),
        }
    }

    pub fn from_patterns(origin: &str, patterns: &[String]) -> Self {
        Self {
            origin: origin.to_string(),
            source: None,
            lines: patterns.to_vec(),
        }
    }
}

/// Compiled gitignore-style rule set. Later lines win, `!` re-includes.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    gitignore: Gitignore,
    pattern_count: usize,
}

impl IgnoreMatcher {
    /// Defaults plus the contents of the project's override file.
    pub fn compile(
        root: &Path,
        default_patterns: &[String],
        override_content: Option<&str>,
    ) -> Result<Self> {
        let layers: Vec<UserPatterns> = override_content
            .map(|content| UserPatterns::from_file(root.join(DEFAULT_IGNORE_FILENAME), content))
            .into_iter()
            .collect();
        Self::compile_layers(root, default_patterns, &layers)
    }

    /// Embedded defaults must compile; user layers are applied in order after them.
    pub fn compile_layers(
        root: &Path,
        default_patterns: &[String],
        layers: &[UserPatterns],
    ) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        let mut pattern_count = 0;

        for pattern in default_patterns {
            builder.add_line(None, pattern)?;
            pattern_count += 1;
        }

        for layer in layers {
            for line in &layer.lines {
                match builder.add_line(layer.source.clone(), line) {
                    Ok(_) => {
                        log::trace!("Added pattern from {}: {}", layer.origin, line);
                        pattern_count += 1;
                    }
                    Err(e) => {
                        log::warn!(
                            "Skipping invalid ignore pattern \"{}\" from {}: {}",
                            line,
                            layer.origin,
                            e
                        );
                    }
                }
            }
        }

        let gitignore = builder.build()?;
        log::debug!("Compiled ignore matcher with {} patterns", pattern_count);
        Ok(Self {
            gitignore,
            pattern_count,
        })
    }

    /// Whether `relative_path` (or one of its parent directories) is ignored.
    ///
    /// Parents are checked first: once a directory is excluded nothing below
    /// it can be re-included, same as git.
    pub fn is_excluded(&self, relative_path: &str, is_dir: bool) -> bool {
        let normalized = normalize_relative(relative_path);
        if normalized.is_empty() {
            return false;
        }
        let path = Path::new(&normalized);
        let mut parents: Vec<&Path> = path
            .ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        parents.reverse();
        for dir in parents {
            if let Match::Ignore(glob) = self.gitignore.matched(dir, true) {
                log::trace!(
                    "'{}' excluded via parent '{}' ({})",
                    normalized,
                    dir.display(),
                    glob.original()
                );
                return true;
            }
        }
        self.gitignore.matched(path, is_dir).is_ignore()
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }
}

fn normalize_relative(path: &str) -> String {
    let forward = path.replace('\\', "/");
    forward
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

/// Reads an optional ignore override file. A missing file is `None`;
/// a file that exists but cannot be read is logged and treated as `None`.
pub fn read_override_file(path: &Path) -> Option<String> {
    if !path.exists() {
        log::trace!("No ignore override file at {}", path.display());
        return None;
    }
    match fs::read_to_string(path) {
        Ok(content) => {
            log::debug!("Loaded ignore override file: {}", path.display());
            Some(content)
        }
        Err(e) => {
            log::warn!(
                "Failed to read ignore file '{}', using defaults only: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Settings controlling which pattern sources feed the matcher.
#[derive(Debug, Clone)]
pub struct IgnoreSources {
    pub enable_builtin: bool,
    pub use_gitignore: bool,
    pub extra: Vec<String>,
    pub override_file: PathBuf,
}

impl Default for IgnoreSources {
    fn default() -> Self {
        Self {
            enable_builtin: true,
            use_gitignore: false,
            extra: Vec::new(),
            override_file: PathBuf::from(DEFAULT_IGNORE_FILENAME),
        }
    }
}

/// Builds the matcher for a project: builtin patterns, then the project's
/// `.gitignore` (if enabled), then configured extras, then the override file.
pub fn build_project_matcher(root: &Path, sources: &IgnoreSources) -> Result<IgnoreMatcher> {
    let defaults: Vec<String> = if sources.enable_builtin {
        default_patterns()
    } else {
        log::debug!("Built-in ignore patterns disabled.");
        Vec::new()
    };

    let mut layers = Vec::new();
    if sources.use_gitignore {
        let gitignore_path = root.join(".gitignore");
        if let Some(content) = read_override_file(&gitignore_path) {
            layers.push(UserPatterns::from_file(gitignore_path, &content));
        }
    }
    if !sources.extra.is_empty() {
        layers.push(UserPatterns::from_patterns("extra patterns", &sources.extra));
    }

    let override_path = if sources.override_file.is_absolute() {
        sources.override_file.clone()
    } else {
        root.join(&sources.override_file)
    };
    if let Some(content) = read_override_file(&override_path) {
        layers.push(UserPatterns::from_file(override_path, &content));
    }

    IgnoreMatcher::compile_layers(root, &defaults, &layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn defaults_matcher(override_content: Option<&str>) -> IgnoreMatcher {
        IgnoreMatcher::compile(Path::new("/project"), &default_patterns(), override_content)
            .expect("compile matcher")
    }

    #[test]
    fn builtin_patterns_load_from_embedded_yaml() {
        let builtin = get_builtin_ignore_patterns();
        assert!(builtin.groups.contains_key("dependencies"));
        assert!(builtin.patterns().any(|p| p == "node_modules/"));
    }

    #[test]
    fn dependency_directories_and_their_contents_are_excluded() {
        let matcher = defaults_matcher(None);
        assert!(matcher.is_excluded("node_modules", true));
        assert!(matcher.is_excluded("node_modules/x/y.js", false));
        assert!(matcher.is_excluded("packages/web/node_modules/react/index.js", false));
        assert!(!matcher.is_excluded("src/node_modules_notes.md", false));
    }

    #[test]
    fn env_files_excluded_but_example_reincluded() {
        let matcher = defaults_matcher(None);
        assert!(matcher.is_excluded(".env", false));
        assert!(matcher.is_excluded(".env.local", false));
        assert!(!matcher.is_excluded(".env.example", false));
    }

    #[test]
    fn binary_lock_and_output_files_excluded() {
        let matcher = defaults_matcher(None);
        assert!(matcher.is_excluded("public/logo.png", false));
        assert!(matcher.is_excluded("fonts/Inter.woff2", false));
        assert!(matcher.is_excluded("package-lock.json", false));
        assert!(matcher.is_excluded("llmctx-markdown.md", false));
        assert!(matcher.is_excluded("llmctx.txt", false));
        assert!(!matcher.is_excluded("app/page.tsx", false));
        assert!(!matcher.is_excluded("README.md", false));
    }

    #[test]
    fn override_extends_defaults_with_later_wins_negation() {
        let matcher =
            defaults_matcher(Some("# local rules\n*.txt\n!keep.txt\n\n!public/logo.png\n"));
        assert!(matcher.is_excluded("notes.txt", false));
        assert!(!matcher.is_excluded("keep.txt", false));
        // Defaults remain active.
        assert!(matcher.is_excluded("node_modules/a.js", false));
        // A later negation re-includes a default exclusion.
        assert!(!matcher.is_excluded("public/logo.png", false));
    }

    #[test]
    fn negation_cannot_reinclude_file_under_excluded_directory() {
        let matcher = defaults_matcher(Some("!node_modules/keep.js"));
        assert!(matcher.is_excluded("node_modules/keep.js", false));
    }

    #[test]
    fn backslash_paths_are_normalized() {
        let matcher = defaults_matcher(Some("drafts/"));
        assert!(matcher.is_excluded("drafts\\post.md", false));
        assert!(matcher.is_excluded(".\\drafts\\post.md", false));
        assert!(!matcher.is_excluded("posts\\post.md", false));
    }

    #[test]
    fn invalid_override_lines_are_skipped() {
        let matcher = defaults_matcher(Some("[z-a\n*.bak\n"));
        assert!(matcher.is_excluded("old.bak", false));
    }

    #[test]
    fn project_matcher_reads_override_and_gitignore() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join(DEFAULT_IGNORE_FILENAME), "*.log\n").expect("write ignore");
        fs::write(tmp.path().join(".gitignore"), "secret/\n").expect("write gitignore");

        let sources = IgnoreSources {
            use_gitignore: true,
            extra: vec!["scratch/".to_string()],
            ..IgnoreSources::default()
        };
        let matcher = build_project_matcher(tmp.path(), &sources).expect("matcher");
        assert!(matcher.is_excluded("debug.log", false));
        assert!(!matcher.is_excluded("debug.txt", false));
        assert!(matcher.is_excluded("secret/key.pem", false));
        assert!(matcher.is_excluded("scratch/a.ts", false));
    }

    #[test]
    fn invalid_gitignore_and_extra_lines_are_skipped() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join(".gitignore"), "[z-a\n*.bak\n").expect("write gitignore");

        let sources = IgnoreSources {
            use_gitignore: true,
            extra: vec!["[q-b".to_string(), "drafts/".to_string()],
            ..IgnoreSources::default()
        };
        let matcher = build_project_matcher(tmp.path(), &sources).expect("matcher");
        assert!(matcher.is_excluded("old.bak", false));
        assert!(matcher.is_excluded("drafts/post.md", false));
        assert!(!matcher.is_excluded("src/main.ts", false));
    }

    #[test]
    fn builtin_patterns_can_be_disabled() {
        let tmp = TempDir::new().expect("tmp");
        let sources = IgnoreSources {
            enable_builtin: false,
            ..IgnoreSources::default()
        };
        let matcher = build_project_matcher(tmp.path(), &sources).expect("matcher");
        assert!(!matcher.is_excluded("node_modules/a.js", false));
        assert_eq!(matcher.pattern_count(), 0);
    }
}
