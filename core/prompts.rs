use crate::error::{AppError, Result};
use log;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptKey {
    BugFix,
    Refactor,
    Docs,
    #[default]
    Review,
    Performance,
    Security,
    Testing,
    Migration,
    Explain,
    Feature,
}

impl PromptKey {
    pub const ALL: [PromptKey; 10] = [
        PromptKey::BugFix,
        PromptKey::Refactor,
        PromptKey::Docs,
        PromptKey::Review,
        PromptKey::Performance,
        PromptKey::Security,
        PromptKey::Testing,
        PromptKey::Migration,
        PromptKey::Explain,
        PromptKey::Feature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromptKey::BugFix => "bug-fix",
            PromptKey::Refactor => "refactor",
            PromptKey::Docs => "docs",
            PromptKey::Review => "review",
            PromptKey::Performance => "performance",
            PromptKey::Security => "security",
            PromptKey::Testing => "testing",
            PromptKey::Migration => "migration",
            PromptKey::Explain => "explain",
            PromptKey::Feature => "feature",
        }
    }

    /// Unknown keys resolve to `Review`.
    pub fn resolve(key: Option<&str>) -> Self {
        match key {
            None => PromptKey::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("Unknown prompt key '{}', falling back to 'review'.", raw);
                PromptKey::default()
            }),
        }
    }

    pub fn template(self) -> &'static PromptTemplate {
        &PROMPT_LIBRARY[&self]
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        PromptKey::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized || key.as_str().replace('-', "") == normalized)
            .ok_or_else(|| AppError::InvalidArgument(format!("Unknown prompt key '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PromptTemplate {
    pub title: String,
    pub description: String,
    pub instructions: String,
    pub closing: String,
}

static PROMPT_LIBRARY: Lazy<HashMap<PromptKey, PromptTemplate>> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/prompts.yaml"));
    let raw: HashMap<String, PromptTemplate> =
        serde_yml::from_str(yaml_content).expect("Failed to parse embedded prompts.yaml");
    PromptKey::ALL
        .into_iter()
        .map(|key| {
            let template = raw
                .get(key.as_str())
                .cloned()
                .unwrap_or_else(|| panic!("prompts.yaml is missing the '{}' template", key));
            (key, template)
        })
        .collect()
});

/// Short lines appended to a document when prompt suggestions are requested.
pub const SUGGESTED_PROMPTS: &[&str] = &[
    "Give me a high-level overview of this project's architecture and main data flow.",
    "Review this codebase for bugs, edge cases and error-handling gaps.",
    "Suggest refactorings that would make the most important modules easier to maintain.",
    "Identify security issues, such as unvalidated input or leaked secrets.",
    "Propose tests for the parts of this codebase that are least covered.",
];

/// Wraps `document` in the template for `key` plus the user's own text and
/// rules. Unknown or missing keys use the review template.
///
/// Sections, in order: title and instructions, additional instructions,
/// rules, the codebase context, then the closing line.
pub fn compose(
    key: Option<&str>,
    document: &str,
    user_prompt: Option<&str>,
    rules: &[String],
) -> String {
    let key = PromptKey::resolve(key);
    let template = key.template();
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", template.title));
    out.push_str(template.instructions.trim_end());
    out.push_str("\n\n");
    push_user_sections(&mut out, user_prompt, rules);
    out.push_str("## Codebase Context\n\n");
    out.push_str(document);
    if !document.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(template.closing.trim());
    out.push('\n');
    log::debug!("Composed '{}' prompt around {} bytes of context", key, document.len());
    out
}

/// Prepends only the user's instructions and rules, with no template.
/// Returns the document unchanged when both are empty.
pub fn prepend_user_sections(
    document: &str,
    user_prompt: Option<&str>,
    rules: &[String],
) -> String {
    let mut out = String::new();
    push_user_sections(&mut out, user_prompt, rules);
    if out.is_empty() {
        return document.to_string();
    }
    out.push_str(document);
    out
}

fn push_user_sections(out: &mut String, user_prompt: Option<&str>, rules: &[String]) {
    if let Some(text) = user_prompt.map(str::trim).filter(|t| !t.is_empty()) {
        out.push_str("## Additional Instructions\n\n");
        out.push_str(text);
        out.push_str("\n\n");
    }
    let rules: Vec<&str> = rules
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    if !rules.is_empty() {
        out.push_str("## Rules\n\n");
        for rule in rules {
            out.push_str("- ");
            out.push_str(rule);
            out.push('\n');
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_has_a_template() {
        for key in PromptKey::ALL {
            let template = key.template();
            assert!(!template.title.is_empty(), "{} title", key);
            assert!(!template.instructions.trim().is_empty(), "{} instructions", key);
        }
    }

    #[test]
    fn keys_parse_in_several_spellings() {
        assert_eq!("bug-fix".parse::<PromptKey>().expect("dash"), PromptKey::BugFix);
        assert_eq!("bug_fix".parse::<PromptKey>().expect("underscore"), PromptKey::BugFix);
        assert_eq!("BUGFIX".parse::<PromptKey>().expect("joined"), PromptKey::BugFix);
        assert!("poetry".parse::<PromptKey>().is_err());
    }

    #[test]
    fn unknown_or_missing_key_resolves_to_review() {
        assert_eq!(PromptKey::resolve(None), PromptKey::Review);
        assert_eq!(PromptKey::resolve(Some("nonsense")), PromptKey::Review);
        assert_eq!(PromptKey::resolve(Some("security")), PromptKey::Security);
    }

    #[test]
    fn compose_orders_sections() {
        let rules = vec!["Keep it small".to_string(), "  ".to_string()];
        let out = compose(
            Some("security"),
            "<doc/>",
            Some("Check the login flow."),
            &rules,
        );
        let template = PromptKey::Security.template();
        let title = out.find(&format!("# {}", template.title)).expect("title");
        let extra = out.find("## Additional Instructions").expect("extra");
        let rules_at = out.find("## Rules").expect("rules");
        let context = out.find("## Codebase Context").expect("context");
        let doc = out.find("<doc/>").expect("doc");
        let closing = out.rfind(template.closing.trim()).expect("closing");
        assert!(title < extra && extra < rules_at && rules_at < context);
        assert!(context < doc && doc < closing);
        assert!(out.contains("- Keep it small\n"));
        assert!(!out.contains("- \n"));
    }

    #[test]
    fn compose_without_user_text_skips_those_sections() {
        let out = compose(Some("explain"), "body", None, &[]);
        assert!(!out.contains("## Additional Instructions"));
        assert!(!out.contains("## Rules"));
        assert!(out.contains("## Codebase Context\n\nbody\n"));
    }

    #[test]
    fn compose_without_key_uses_review() {
        let out = compose(None, "body", None, &[]);
        assert!(out.starts_with(&format!("# {}\n", PromptKey::Review.template().title)));
    }

    #[test]
    fn prepend_user_sections_is_identity_when_empty() {
        assert_eq!(prepend_user_sections("doc", None, &[]), "doc");
        assert_eq!(prepend_user_sections("doc", Some("   "), &[]), "doc");
        let out = prepend_user_sections("doc", Some("Be brief."), &["One".to_string()]);
        assert_eq!(
            out,
            "## Additional Instructions\n\nBe brief.\n\n## Rules\n\n- One\n\ndoc"
        );
    }
}
