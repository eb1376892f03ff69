use crate::classify::{self, Classification};
use crate::tokens::estimate_tokens;
use crate::walker::WalkedFile;
use indexmap::IndexMap;
use log;
use serde::Serialize;
use std::cmp::Ordering;

/// One included file, classified and measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: String,
    pub category: String,
    pub priority: u8,
    pub tokens: usize,
    pub size: usize,
    pub content: String,
}

impl FileRecord {
    /// Builds a record; `tokens` and `size` are always derived from `content`.
    pub fn new(path: String, content: String, classification: Classification) -> Self {
        let tokens = estimate_tokens(&content);
        let size = content.len();
        Self {
            path,
            category: classification.category.to_string(),
            priority: classification.priority,
            tokens,
            size,
            content,
        }
    }

    pub fn from_walked(file: WalkedFile) -> Self {
        let classification = classify::classify(&file.path, &file.content);
        Self::new(file.path, file.content, classification)
    }
}

/// Ranking order: priority descending, category ascending, then path.
pub fn compare_records(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.path.cmp(&b.path))
}

pub fn rank(mut files: Vec<FileRecord>) -> Vec<FileRecord> {
    files.sort_by(compare_records);
    log::debug!("Ranked {} files", files.len());
    files
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextStats {
    pub total_files: usize,
    pub total_tokens: usize,
    pub total_size: usize,
    /// Category counts, in order of first appearance in the ranked list.
    pub categories: IndexMap<String, usize>,
}

impl ContextStats {
    pub fn from_files(files: &[FileRecord]) -> Self {
        files.iter().fold(Self::default(), |mut stats, file| {
            stats.total_files += 1;
            stats.total_tokens += file.tokens;
            stats.total_size += file.size;
            *stats.categories.entry(file.category.clone()).or_insert(0) += 1;
            stats
        })
    }

    pub fn total_size_kib(&self) -> f64 {
        self.total_size as f64 / 1024.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, priority: u8, category: &'static str, content: &str) -> FileRecord {
        FileRecord::new(
            path.to_string(),
            content.to_string(),
            Classification { priority, category },
        )
    }

    #[test]
    fn tokens_and_size_derive_from_content() {
        let r = record("a.md", 15, "H3_Docs", "héllo");
        assert_eq!(r.size, 6);
        assert_eq!(r.tokens, 2);
    }

    #[test]
    fn from_walked_classifies() {
        let r = FileRecord::from_walked(WalkedFile {
            path: "app/page.tsx".to_string(),
            content: "export default function Page() {}".to_string(),
        });
        assert_eq!(r.category, "B2_App_Pages");
        assert_eq!(r.priority, 75);
    }

    #[test]
    fn rank_orders_by_priority_then_category() {
        let ranked = rank(vec![
            record("z.md", 15, "H3_Docs", ""),
            record("b.ts", 25, "H1_Source", ""),
            record("c.css", 35, "G2_Other", ""),
            record("a.css", 35, "G1_Global_Styles", ""),
            record("next.config.js", 100, "A1_Next_Config", ""),
        ]);
        let order: Vec<&str> = ranked.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(order, vec!["next.config.js", "a.css", "c.css", "b.ts", "z.md"]);
    }

    #[test]
    fn rank_is_deterministic_regardless_of_input_order() {
        let files = vec![
            record("x.ts", 25, "H1_Source", ""),
            record("a.ts", 25, "H1_Source", ""),
            record("m.ts", 25, "H1_Source", ""),
        ];
        let mut reversed = files.clone();
        reversed.reverse();
        assert_eq!(rank(files), rank(reversed));
    }

    #[test]
    fn stats_reduce_ranked_files() {
        let files = rank(vec![
            record("a.ts", 25, "H1_Source", "abcd"),
            record("b.ts", 25, "H1_Source", "abcde"),
            record("README.md", 15, "H3_Docs", "é"),
        ]);
        let stats = ContextStats::from_files(&files);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_tokens, 1 + 2 + 1);
        assert_eq!(stats.total_size, 4 + 5 + 2);
        assert_eq!(stats.categories.get("H1_Source"), Some(&2));
        assert_eq!(stats.categories.get("H3_Docs"), Some(&1));
        let keys: Vec<&str> = stats.categories.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["H1_Source", "H3_Docs"]);
    }

    #[test]
    fn empty_stats() {
        let stats = ContextStats::from_files(&[]);
        assert_eq!(stats, ContextStats::default());
        assert_eq!(stats.total_size_kib(), 0.0);
    }
}
