//! Build-file discovery.
//!
//! Walks the root directory recursively and keeps every file whose
//! content opens with a stage-introduction directive. Discovery is
//! extension-blind and deterministic: results come back sorted by path
//! so diagnostics and output are reproducible run to run.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{PrebakeError, Result};
use crate::parser::is_build_file;

/// A discovered build file and its contents.
#[derive(Debug, Clone)]
pub struct BuildFile {
    pub path: PathBuf,
    pub content: String,
}

/// Discovers build files beneath `root`, sorted by path.
///
/// Symlinks are not followed and `.git` directories are pruned. Files
/// that are not valid UTF-8 are skipped; files that fail to read are a
/// fatal I/O error.
pub fn discover(root: &Path) -> Result<Vec<BuildFile>> {
    if !root.is_dir() {
        return Err(PrebakeError::InvalidRoot { path: root.to_path_buf() });
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

    for entry in walker.into_iter().filter_entry(|e| e.file_name() != ".git") {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            PrebakeError::Io { path, source }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path().to_path_buf();
        let bytes = std::fs::read(&path)
            .map_err(|source| PrebakeError::Io { path: path.clone(), source })?;
        let Ok(content) = String::from_utf8(bytes) else {
            debug!(path = %path.display(), "skipping non-UTF-8 file");
            continue;
        };

        if is_build_file(&content) {
            debug!(path = %path.display(), "discovered build file");
            files.push(BuildFile { path, content });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_sorted_and_extension_blind() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("b/Dockerfile"), "FROM alpine AS x\n").unwrap();
        fs::write(dir.path().join("a/build.containerfile"), "FROM alpine AS y\n").unwrap();
        fs::write(dir.path().join("a/readme.md"), "# not a build file\n").unwrap();

        let files = discover(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a/build.containerfile", "b/Dockerfile"]);
    }

    #[test]
    fn test_non_utf8_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blob.bin"), [0x46u8, 0x52, 0xff, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine AS x\n").unwrap();

        let files = discover(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_invalid_root() {
        let err = discover(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, PrebakeError::InvalidRoot { .. }));
    }
}
