//! Local repository loader
//!
//! Reads a checked-out repository into `SourceFile`s for the CLI. Hidden
//! entries, dependency and build directories, non-UTF-8 files and files
//! larger than `MAX_FILE_BYTES` are skipped.

use sdk::errors::EngineError;
use sdk::types::SourceFile;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Largest file read from disk
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;

const IGNORED_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "vendor"];

fn is_ignored(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && IGNORED_DIRS.contains(&name.as_ref()))
}

/// Load every readable text file under `root`, sorted by path.
///
/// Paths are relative to `root` and use `/` separators.
pub fn load_directory(root: &Path) -> Result<Vec<SourceFile>, EngineError> {
    if !root.is_dir() {
        return Err(EngineError::InvalidRequest(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_ignored(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let too_large = entry
            .metadata()
            .map(|m| m.len() > MAX_FILE_BYTES)
            .unwrap_or(true);
        if too_large {
            skipped += 1;
            continue;
        }

        let content = match fs::read(path).map(String::from_utf8) {
            Ok(Ok(text)) => text,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let relative = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push(SourceFile::new(relative, content));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(
        "Loaded {} files from {} ({} skipped)",
        files.len(),
        root.display(),
        skipped
    );

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_text_files_and_skips_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("src/api")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();

        fs::write(root.join("src/api/users.ts"), "export {}").unwrap();
        fs::write(root.join("README.md"), "# Shop").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(root.join(".git/config"), "x").unwrap();
        fs::write(root.join(".env"), "SECRET=1").unwrap();
        fs::write(root.join("logo.png"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let files = load_directory(root).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/api/users.ts"]);
        assert_eq!(files[1].content, "export {}");
    }

    #[test]
    fn test_missing_directory() {
        let err = load_directory(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }
}
