//! Heuristic file classification.
//!
//! Files are ranked by an ordered rule table: the first rule whose predicate
//! matches decides the priority and category. Categories are `<group><n>_<Label>`
//! where the group letter runs from `A` (build config) to `H` (general files),
//! so sorting by category string keeps related files together.

use log;

const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "mdx"];
const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "sass", "less", "styl", "pcss"];
const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "mjs", "cjs", "vue", "svelte", "astro", "py", "rb", "go", "rs",
    "java", "kt", "swift", "php", "c", "h", "cpp", "hpp", "cs", "sh", "sql", "graphql", "gql",
    "html", "prisma",
];
const CONFIG_DATA_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml", "ini", "xml"];
const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "txt", "rst", "adoc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub priority: u8,
    pub category: &'static str,
}

pub const FALLBACK: Classification = Classification {
    priority: 10,
    category: "H4_Other",
};

/// Path and content facts the rule predicates look at.
#[derive(Debug, Clone)]
pub struct FileFacts<'a> {
    pub path: &'a str,
    pub file_name: &'a str,
    /// File name up to the first `.` (`page` for `page.tsx`).
    pub stem: &'a str,
    /// Lowercased last extension, empty when there is none.
    pub extension: String,
    /// Parent directory segments, outermost first.
    pub dirs: Vec<&'a str>,
    pub content: &'a str,
}

impl<'a> FileFacts<'a> {
    pub fn new(path: &'a str, content: &'a str) -> Self {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let file_name = segments.pop().unwrap_or("");
        let stem = match file_name.find('.') {
            Some(0) | None => file_name,
            Some(idx) => &file_name[..idx],
        };
        let extension = match file_name.rfind('.') {
            Some(idx) if idx > 0 => file_name[idx + 1..].to_lowercase(),
            _ => String::new(),
        };
        Self {
            path,
            file_name,
            stem,
            extension,
            dirs: segments,
            content,
        }
    }

    fn has_extension(&self, list: &[&str]) -> bool {
        list.contains(&self.extension.as_str())
    }

    fn is_script(&self) -> bool {
        self.has_extension(SCRIPT_EXTENSIONS)
    }

    fn is_style(&self) -> bool {
        self.has_extension(STYLE_EXTENSIONS)
    }

    /// Whether the file lives under `<name>/` or `src/<name>/`.
    fn under_root_dir(&self, name: &str) -> bool {
        match self.dirs.as_slice() {
            [first, ..] if *first == name => true,
            ["src", second, ..] => *second == name,
            _ => false,
        }
    }

    fn under_any_root_dir(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.under_root_dir(n))
    }

    /// Directories below the routing root (`app/` or `src/app/`).
    fn dirs_below(&self, name: &str) -> &[&'a str] {
        match self.dirs.as_slice() {
            [first, rest @ ..] if *first == name => rest,
            ["src", second, rest @ ..] if *second == name => rest,
            _ => &[],
        }
    }

    fn is_project_root_or_src(&self) -> bool {
        matches!(self.dirs.as_slice(), [] | ["src"])
    }
}

pub struct ClassifierRule {
    pub name: &'static str,
    pub priority: u8,
    pub category: &'static str,
    pub matches: fn(&FileFacts) -> bool,
}

impl ClassifierRule {
    pub fn classification(&self) -> Classification {
        Classification {
            priority: self.priority,
            category: self.category,
        }
    }
}

impl std::fmt::Debug for ClassifierRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierRule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("category", &self.category)
            .finish()
    }
}

// --- Predicates ---

fn is_next_config(f: &FileFacts) -> bool {
    matches!(
        f.file_name,
        "next.config.js" | "next.config.mjs" | "next.config.ts" | "next.config.cjs"
    )
}

fn is_package_manifest(f: &FileFacts) -> bool {
    f.file_name == "package.json"
}

fn is_ts_config(f: &FileFacts) -> bool {
    matches!(f.file_name, "tsconfig.json" | "jsconfig.json")
}

fn is_tailwind_config(f: &FileFacts) -> bool {
    f.file_name.starts_with("tailwind.config.")
}

fn is_postcss_config(f: &FileFacts) -> bool {
    f.file_name.starts_with("postcss.config.")
}

fn is_middleware(f: &FileFacts) -> bool {
    matches!(f.file_name, "middleware.ts" | "middleware.js") && f.is_project_root_or_src()
}

fn is_tooling_config(f: &FileFacts) -> bool {
    const PREFIXES: &[&str] = &[
        ".eslintrc",
        "eslint.config.",
        ".prettierrc",
        "prettier.config.",
        "vite.config.",
        "vitest.config.",
        "jest.config.",
        "playwright.config.",
        ".babelrc",
        "babel.config.",
    ];
    matches!(f.file_name, "components.json" | "vercel.json" | "turbo.json")
        || PREFIXES.iter().any(|p| f.file_name.starts_with(p))
}

fn app_file(f: &FileFacts, stem: &str) -> bool {
    f.under_root_dir("app") && f.is_script() && f.stem == stem
}

fn is_app_layout(f: &FileFacts) -> bool {
    app_file(f, "layout")
}

fn is_app_page(f: &FileFacts) -> bool {
    app_file(f, "page")
}

fn is_app_route_handler(f: &FileFacts) -> bool {
    app_file(f, "route")
}

fn is_app_template(f: &FileFacts) -> bool {
    app_file(f, "template")
}

fn is_app_global_error(f: &FileFacts) -> bool {
    app_file(f, "global-error")
}

fn is_app_error(f: &FileFacts) -> bool {
    app_file(f, "error")
}

fn is_app_not_found(f: &FileFacts) -> bool {
    app_file(f, "not-found")
}

fn is_app_loading(f: &FileFacts) -> bool {
    app_file(f, "loading")
}

fn is_app_other(f: &FileFacts) -> bool {
    f.under_root_dir("app") && f.is_script()
}

fn is_pages_app(f: &FileFacts) -> bool {
    f.under_root_dir("pages") && f.is_script() && f.stem == "_app"
}

fn is_pages_document(f: &FileFacts) -> bool {
    f.under_root_dir("pages") && f.is_script() && f.stem == "_document"
}

fn is_pages_error(f: &FileFacts) -> bool {
    f.under_root_dir("pages") && f.is_script() && matches!(f.stem, "_error" | "404" | "500")
}

fn is_pages_api(f: &FileFacts) -> bool {
    f.under_root_dir("pages") && f.is_script() && f.dirs_below("pages").first() == Some(&"api")
}

fn is_pages_other(f: &FileFacts) -> bool {
    f.under_root_dir("pages") && f.is_script()
}

fn has_client_directive(content: &str) -> bool {
    content.contains("\"use client\"") || content.contains("'use client'")
}

fn is_client_component(f: &FileFacts) -> bool {
    f.under_root_dir("components") && f.is_script() && has_client_directive(f.content)
}

fn is_server_component(f: &FileFacts) -> bool {
    f.under_root_dir("components") && f.is_script()
}

fn is_hook(f: &FileFacts) -> bool {
    if !f.is_script() {
        return false;
    }
    if f.under_root_dir("hooks") {
        return true;
    }
    // useThing.ts / use-thing.ts
    f.file_name
        .strip_prefix("use")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase() || c == '-')
}

fn is_lib_or_util(f: &FileFacts) -> bool {
    f.is_script() && f.under_any_root_dir(&["lib", "utils", "helpers"])
}

fn is_state(f: &FileFacts) -> bool {
    if f.is_style() {
        return false;
    }
    let lower = f.path.to_lowercase();
    f.under_any_root_dir(&["store", "stores", "state", "context", "contexts"])
        || lower.contains("redux")
        || lower.contains("zustand")
}

fn is_data_or_schema(f: &FileFacts) -> bool {
    if f.is_style() {
        return false;
    }
    f.under_any_root_dir(&["types", "models", "schemas", "prisma", "db", "data"])
        || f.file_name.to_lowercase().contains("schema")
}

fn is_global_style(f: &FileFacts) -> bool {
    f.is_style()
        && (f.file_name.to_lowercase().contains("global") || f.dirs.contains(&"styles"))
}

fn is_component_style(f: &FileFacts) -> bool {
    f.is_style()
}

fn is_source(f: &FileFacts) -> bool {
    f.has_extension(SOURCE_EXTENSIONS)
}

fn is_config_data(f: &FileFacts) -> bool {
    f.has_extension(CONFIG_DATA_EXTENSIONS) || f.file_name.to_lowercase().contains("config")
}

fn is_documentation(f: &FileFacts) -> bool {
    f.has_extension(DOC_EXTENSIONS)
}

macro_rules! rule {
    ($name:literal, $priority:literal, $category:literal, $pred:expr) => {
        ClassifierRule {
            name: $name,
            priority: $priority,
            category: $category,
            matches: $pred,
        }
    };
}

/// Ordered rule table. First match wins.
pub static RULES: &[ClassifierRule] = &[
    // A: framework and build configuration
    rule!("next-config", 100, "A1_Next_Config", is_next_config),
    rule!("package-manifest", 98, "A2_Package_Manifest", is_package_manifest),
    rule!("ts-config", 95, "A3_TS_Config", is_ts_config),
    rule!("tailwind-config", 92, "A4_Tailwind_Config", is_tailwind_config),
    rule!("postcss-config", 90, "A5_PostCSS_Config", is_postcss_config),
    rule!("middleware", 88, "A6_Middleware", is_middleware),
    rule!("tooling-config", 85, "A7_Tooling_Config", is_tooling_config),
    // B: app router
    rule!("app-layout", 82, "B1_App_Layout", is_app_layout),
    rule!("app-page", 75, "B2_App_Pages", is_app_page),
    rule!("app-route-handler", 72, "B3_App_Route_Handlers", is_app_route_handler),
    rule!("app-template", 70, "B4_App_Templates", is_app_template),
    rule!("app-global-error", 69, "B5_App_Error", is_app_global_error),
    rule!("app-error", 68, "B5_App_Error", is_app_error),
    rule!("app-not-found", 66, "B6_App_Not_Found", is_app_not_found),
    rule!("app-loading", 65, "B7_App_Loading", is_app_loading),
    rule!("app-other", 60, "B8_App_Other", is_app_other),
    // C: pages router
    rule!("pages-app", 78, "C1_Pages_App", is_pages_app),
    rule!("pages-document", 77, "C2_Pages_Document", is_pages_document),
    rule!("pages-error", 72, "C3_Pages_Error", is_pages_error),
    rule!("pages-api", 70, "C4_Pages_API", is_pages_api),
    rule!("pages-other", 68, "C5_Pages", is_pages_other),
    // D: components
    rule!("client-component", 50, "D2_Client_Components", is_client_component),
    rule!("server-component", 55, "D1_Server_Components", is_server_component),
    // E: reusable logic
    rule!("hook", 48, "E1_Hooks", is_hook),
    rule!("lib-util", 45, "E2_Lib_Utils", is_lib_or_util),
    // F: state and data
    rule!("state", 42, "F1_State", is_state),
    rule!("data-schema", 40, "F2_Data_Schema", is_data_or_schema),
    // G: styles
    rule!("global-style", 35, "G1_Global_Styles", is_global_style),
    rule!("component-style", 30, "G2_Component_Styles", is_component_style),
    // H: catch-alls
    rule!("source", 25, "H1_Source", is_source),
    rule!("config-data", 20, "H2_Config_Data", is_config_data),
    rule!("documentation", 15, "H3_Docs", is_documentation),
];

/// The first rule matching `path`/`content`, if any.
pub fn matching_rule(path: &str, content: &str) -> Option<&'static ClassifierRule> {
    let facts = FileFacts::new(path, content);
    RULES.iter().find(|rule| (rule.matches)(&facts))
}

pub fn classify(path: &str, content: &str) -> Classification {
    match matching_rule(path, content) {
        Some(rule) => {
            log::trace!(
                "Classified '{}' via rule '{}' -> {} ({})",
                path,
                rule.name,
                rule.category,
                rule.priority
            );
            rule.classification()
        }
        None => {
            log::trace!("No rule matched '{}', using fallback", path);
            FALLBACK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(path: &str) -> &'static str {
        classify(path, "").category
    }

    fn rule_for(path: &str, content: &str) -> &'static str {
        matching_rule(path, content).map_or("<fallback>", |r| r.name)
    }

    #[test]
    fn facts_split_path_parts() {
        let facts = FileFacts::new("src/app/blog/page.module.css", "");
        assert_eq!(facts.file_name, "page.module.css");
        assert_eq!(facts.stem, "page");
        assert_eq!(facts.extension, "css");
        assert_eq!(facts.dirs, vec!["src", "app", "blog"]);

        let dotfile = FileFacts::new(".eslintrc", "");
        assert_eq!(dotfile.stem, ".eslintrc");
        assert_eq!(dotfile.extension, "");
    }

    #[test]
    fn build_config_files_rank_highest() {
        assert_eq!(
            classify("next.config.js", ""),
            Classification {
                priority: 100,
                category: "A1_Next_Config"
            }
        );
        assert_eq!(classify("next.config.mjs", "").priority, 100);
        assert_eq!(category("package.json"), "A2_Package_Manifest");
        assert_eq!(category("tsconfig.json"), "A3_TS_Config");
        assert_eq!(category("tailwind.config.ts"), "A4_Tailwind_Config");
        assert_eq!(category("postcss.config.js"), "A5_PostCSS_Config");
        assert_eq!(category(".eslintrc.json"), "A7_Tooling_Config");
        assert_eq!(category("components.json"), "A7_Tooling_Config");
    }

    #[test]
    fn middleware_only_at_root_or_src() {
        assert_eq!(category("middleware.ts"), "A6_Middleware");
        assert_eq!(category("src/middleware.ts"), "A6_Middleware");
        assert_ne!(category("lib/middleware.ts"), "A6_Middleware");
    }

    #[test]
    fn app_router_conventions() {
        assert_eq!(classify("app/layout.tsx", "").priority, 82);
        assert_eq!(
            classify("app/page.tsx", ""),
            Classification {
                priority: 75,
                category: "B2_App_Pages"
            }
        );
        assert_eq!(category("src/app/dashboard/page.jsx"), "B2_App_Pages");
        assert_eq!(category("app/api/users/route.ts"), "B3_App_Route_Handlers");
        assert_eq!(category("app/template.tsx"), "B4_App_Templates");
        assert_eq!(classify("app/global-error.tsx", "").priority, 69);
        assert_eq!(classify("app/error.tsx", "").priority, 68);
        assert_eq!(category("app/not-found.tsx"), "B6_App_Not_Found");
        assert_eq!(category("app/loading.tsx"), "B7_App_Loading");
        assert_eq!(category("app/blog/utils.ts"), "B8_App_Other");
    }

    #[test]
    fn styles_inside_app_fall_through_to_style_rules() {
        assert_eq!(category("app/globals.css"), "G1_Global_Styles");
        assert_eq!(category("app/page.module.css"), "G2_Component_Styles");
    }

    #[test]
    fn pages_router_conventions() {
        assert_eq!(category("pages/_app.tsx"), "C1_Pages_App");
        assert_eq!(category("pages/_document.tsx"), "C2_Pages_Document");
        assert_eq!(category("pages/404.tsx"), "C3_Pages_Error");
        assert_eq!(category("src/pages/500.js"), "C3_Pages_Error");
        assert_eq!(category("pages/api/hello.ts"), "C4_Pages_API");
        assert_eq!(category("pages/blog/[slug].tsx"), "C5_Pages");
    }

    #[test]
    fn component_tier_depends_on_client_directive() {
        let client = classify("components/Button.tsx", "'use client'\nexport function Button() {}");
        assert_eq!(client.category, "D2_Client_Components");
        assert_eq!(client.priority, 50);

        let double_quoted = classify("src/components/Nav.tsx", "\"use client\";");
        assert_eq!(double_quoted.category, "D2_Client_Components");

        let server = classify("components/Card.tsx", "export function Card() {}");
        assert_eq!(server.category, "D1_Server_Components");
        assert_eq!(server.priority, 55);
    }

    #[test]
    fn reusable_logic_rules() {
        assert_eq!(rule_for("hooks/useAuth.ts", ""), "hook");
        assert_eq!(rule_for("src/features/useCart.ts", ""), "hook");
        assert_eq!(rule_for("shared/use-media.ts", ""), "hook");
        assert_ne!(rule_for("src/user.ts", ""), "hook");
        assert_eq!(rule_for("lib/db.ts", ""), "lib-util");
        assert_eq!(rule_for("src/utils/format.ts", ""), "lib-util");
    }

    #[test]
    fn state_and_data_rules() {
        assert_eq!(category("store/cart.ts"), "F1_State");
        assert_eq!(category("src/redux/slice.ts"), "F1_State");
        assert_eq!(category("types/index.ts"), "F2_Data_Schema");
        assert_eq!(category("prisma/schema.prisma"), "F2_Data_Schema");
        assert_eq!(category("validation/userSchema.ts"), "F2_Data_Schema");
    }

    #[test]
    fn style_rules() {
        assert_eq!(classify("styles/theme.scss", "").priority, 35);
        assert_eq!(classify("src/global.css", "").priority, 35);
        assert_eq!(classify("features/card.module.css", "").priority, 30);
    }

    #[test]
    fn catch_all_rules_and_fallback() {
        assert_eq!(category("scripts/seed.ts"), "H1_Source");
        assert_eq!(category("server/main.py"), "H1_Source");
        assert_eq!(category("config/settings.yaml"), "H2_Config_Data");
        assert_eq!(category(".editorconfig"), "H2_Config_Data");
        assert_eq!(
            classify("README.md", ""),
            Classification {
                priority: 15,
                category: "H3_Docs"
            }
        );
        assert_eq!(classify("LICENSE", ""), FALLBACK);
        assert_eq!(classify("Dockerfile", "").priority, 10);
    }

    #[test]
    fn first_matching_rule_wins() {
        // A hook under components/ is classified by the earlier component rule.
        assert_eq!(rule_for("components/useThing.ts", ""), "server-component");
        // package.json under data/ is still the manifest.
        assert_eq!(rule_for("data/package.json", ""), "package-manifest");
    }

    #[test]
    fn every_rule_priority_is_in_range() {
        for rule in RULES {
            assert!(rule.priority <= 100, "{} out of range", rule.name);
            assert!(rule.priority > FALLBACK.priority, "{} below fallback", rule.name);
        }
    }
}
