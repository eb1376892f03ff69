use crate::error::{AppError, Result};
use crate::ignore_rules::IgnoreMatcher;
use log;
use std::fs;
use std::path::{Component, Path};
use walkdir::WalkDir;

/// A file that passed the ignore rules and decoded as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Forward-slash path relative to the walk root.
    pub path: String,
    pub content: String,
}

/// Depth-first walk of `root`, in file-name order.
///
/// Excluded directories are pruned before being entered. Files that cannot be
/// read or are not valid UTF-8 are dropped; only an unusable root is an error.
pub fn walk(root: &Path, matcher: &IgnoreMatcher) -> Result<Vec<WalkedFile>> {
    ensure_readable_root(root)?;
    log::info!("Walking project directory: {}", root.display());

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let Some(relative) = relative_path(root, entry.path()) else {
                log::warn!("Could not get relative path for: {}", entry.path().display());
                return false;
            };
            let is_dir = entry.file_type().is_dir();
            if matcher.is_excluded(&relative, is_dir) {
                log::trace!(
                    "Excluding {}: {}",
                    if is_dir { "directory" } else { "file" },
                    relative
                );
                false
            } else {
                true
            }
        });

    let mut files = Vec::new();
    let mut dropped = 0usize;
    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Error walking directory: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = relative_path(root, entry.path()) else {
            continue;
        };
        match read_text(entry.path()) {
            Some(content) => {
                log::trace!("Included: {}", relative);
                files.push(WalkedFile {
                    path: relative,
                    content,
                });
            }
            None => dropped += 1,
        }
    }

    log::info!(
        "Directory walk complete. {} files included, {} unreadable files dropped.",
        files.len(),
        dropped
    );
    Ok(files)
}

fn ensure_readable_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root).map_err(|e| AppError::NoProjectRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(AppError::NoProjectRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    fs::read_dir(root).map_err(|e| AppError::NoProjectRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Relative path with `/` separators regardless of platform.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(path, root)?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn read_text(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(content) => Some(content),
            Err(e) => {
                log::debug!("Skipping non-UTF-8 file: {} ({})", path.display(), e);
                None
            }
        },
        Err(e) => {
            log::debug!("Skipping unreadable file: {} ({})", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignore_rules::default_patterns;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    fn matcher(root: &Path, override_content: Option<&str>) -> IgnoreMatcher {
        IgnoreMatcher::compile(root, &default_patterns(), override_content).expect("matcher")
    }

    fn paths(files: &[WalkedFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn walks_depth_first_in_name_order() {
        let tmp = TempDir::new().expect("tmp");
        write(tmp.path(), "b.ts", b"b");
        write(tmp.path(), "a/z.ts", b"z");
        write(tmp.path(), "a/b/c.ts", b"c");

        let files = walk(tmp.path(), &matcher(tmp.path(), None)).expect("walk");
        assert_eq!(paths(&files), vec!["a/b/c.ts", "a/z.ts", "b.ts"]);
        assert_eq!(files[2].content, "b");
    }

    #[test]
    fn excluded_directories_are_not_descended() {
        let tmp = TempDir::new().expect("tmp");
        write(tmp.path(), "node_modules/x/y.js", b"module.exports = 1");
        write(tmp.path(), ".git/HEAD", b"ref: refs/heads/main");
        write(tmp.path(), "src/index.ts", b"export {}");

        let files = walk(tmp.path(), &matcher(tmp.path(), None)).expect("walk");
        assert_eq!(paths(&files), vec!["src/index.ts"]);
    }

    #[test]
    fn override_patterns_apply_to_walk() {
        let tmp = TempDir::new().expect("tmp");
        write(tmp.path(), "debug.log", b"log line");
        write(tmp.path(), "debug.txt", b"text");

        let files = walk(tmp.path(), &matcher(tmp.path(), Some("*.log"))).expect("walk");
        assert_eq!(paths(&files), vec!["debug.txt"]);
    }

    #[test]
    fn non_utf8_files_are_dropped_silently() {
        let tmp = TempDir::new().expect("tmp");
        write(tmp.path(), "blob.dat", &[0xff, 0xfe, 0x00, 0x80]);
        write(tmp.path(), "ok.md", "héllo".as_bytes());

        let files = walk(tmp.path(), &matcher(tmp.path(), None)).expect("walk");
        assert_eq!(paths(&files), vec!["ok.md"]);
        assert_eq!(files[0].content, "héllo");
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().expect("tmp");
        let missing = tmp.path().join("nope");
        let err = walk(&missing, &matcher(tmp.path(), None)).expect_err("missing root");
        assert!(matches!(err, AppError::NoProjectRoot { .. }));
    }

    #[test]
    fn file_root_is_an_error() {
        let tmp = TempDir::new().expect("tmp");
        write(tmp.path(), "file.ts", b"x");
        let err = walk(&tmp.path().join("file.ts"), &matcher(tmp.path(), None))
            .expect_err("file root");
        assert!(matches!(err, AppError::NoProjectRoot { .. }));
    }

    #[test]
    fn relative_path_uses_forward_slashes() {
        let root = Path::new("/project");
        let nested = root.join("a").join("b").join("c.ts");
        assert_eq!(relative_path(root, &nested).as_deref(), Some("a/b/c.ts"));
        assert_eq!(relative_path(root, root), None);
    }
}
