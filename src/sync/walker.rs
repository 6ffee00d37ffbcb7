//! Media root enumeration.

use std::path::{Path, PathBuf};

use vidsync_common::paths::ExtensionFilter;
use vidsync_common::{Error, Result};
use walkdir::WalkDir;

/// List the media candidates under `root`, sorted by path.
///
/// An `Err` means the root itself is unavailable (missing, not a directory or
/// not listable). A listable root with no candidates is `Ok` and empty.
///
/// Symlinks are followed. Unreadable subdirectories are logged and skipped.
pub fn walk(root: &Path, recursive: bool, filter: &ExtensionFilter) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(root)?;
    if !meta.is_dir() {
        return Err(Error::invalid_input(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    // Surface permission problems on the root itself as unavailability.
    std::fs::read_dir(root)?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "Error walking directory");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && filter.matches(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// Name of `path` relative to `root`, using `/` as the separator.
///
/// For a flat root this is the bare file name.
pub fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("b.mp4"), b"b").unwrap();
        fs::write(root.join("a.MKV"), b"a").unwrap();
        fs::write(root.join("notes.txt"), b"t").unwrap();
        fs::write(root.join("c.mp4.part"), b"p").unwrap();
        fs::create_dir_all(root.join("season 1")).unwrap();
        fs::write(root.join("season 1/e01.webm"), b"e").unwrap();
        dir
    }

    #[test]
    fn test_recursive_walk_filters_and_sorts() {
        let dir = tree();
        let files = walk(dir.path(), true, &ExtensionFilter::default()).unwrap();
        let names: Vec<String> = files.iter().map(|p| relative_name(dir.path(), p)).collect();
        assert_eq!(names, vec!["a.MKV", "b.mp4", "season 1/e01.webm"]);
    }

    #[test]
    fn test_flat_walk_stays_at_depth_one() {
        let dir = tree();
        let files = walk(dir.path(), false, &ExtensionFilter::default()).unwrap();
        let names: Vec<String> = files.iter().map(|p| relative_name(dir.path(), p)).collect();
        assert_eq!(names, vec!["a.MKV", "b.mp4"]);
    }

    #[test]
    fn test_empty_root_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk(dir.path(), true, &ExtensionFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unavailable_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(walk(&missing, true, &ExtensionFilter::default()).is_err());

        let file = dir.path().join("file.mp4");
        fs::write(&file, b"x").unwrap();
        assert!(walk(&file, true, &ExtensionFilter::default()).is_err());
    }

    #[test]
    fn test_relative_name() {
        let root = Path::new("/media/movies");
        assert_eq!(relative_name(root, Path::new("/media/movies/a.mp4")), "a.mp4");
        assert_eq!(
            relative_name(root, Path::new("/media/movies/x/y/b.mkv")),
            "x/y/b.mkv"
        );
    }
}
