//! Path utilities for deciding which files are media candidates.
//!
//! The directory walker consults an [`ExtensionFilter`] for every regular file
//! it encounters. Matching is case-insensitive on the final extension.

use std::collections::BTreeSet;
use std::path::Path;

/// Default allow-list of video file extensions.
const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov", "flv", "wmv"];

/// Get the default list of video file extensions.
///
/// # Examples
///
/// ```
/// use vidsync_common::paths::default_video_extensions;
///
/// let extensions = default_video_extensions();
/// assert!(extensions.contains(&"mkv"));
/// assert!(extensions.contains(&"webm"));
/// ```
#[must_use]
pub fn default_video_extensions() -> &'static [&'static str] {
    DEFAULT_VIDEO_EXTENSIONS
}

/// A normalized, case-insensitive extension allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: BTreeSet<String>,
}

impl ExtensionFilter {
    /// Build a filter from configured extensions.
    ///
    /// Entries are lowercased and a leading dot is stripped, so `".MP4"` and
    /// `"mp4"` are equivalent. Empty entries are ignored.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    /// Check if a path has an allowed extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use vidsync_common::paths::ExtensionFilter;
    ///
    /// let filter = ExtensionFilter::default();
    /// assert!(filter.matches(Path::new("/videos/clip.MP4")));
    /// assert!(!filter.matches(Path::new("notes.txt")));
    /// ```
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Whether the filter would reject every file.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// The normalized extensions, sorted.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_EXTENSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let filter = ExtensionFilter::default();
        for ext in ["mp4", "mkv", "webm", "avi", "mov", "flv", "wmv"] {
            assert!(filter.matches(Path::new(&format!("movie.{ext}"))), "{ext}");
        }

        // Case insensitive
        assert!(filter.matches(Path::new("movie.MKV")));
        assert!(filter.matches(Path::new("movie.Mp4")));

        // Not video files
        assert!(!filter.matches(Path::new("subtitle.srt")));
        assert!(!filter.matches(Path::new("document.txt")));
        assert!(!filter.matches(Path::new("no_extension")));
        assert!(!filter.matches(Path::new("movie.mp4.part")));
    }

    #[test]
    fn test_normalization() {
        let filter = ExtensionFilter::new([".MP4", " mkv ", "", "."]);
        let exts: Vec<&str> = filter.extensions().collect();
        assert_eq!(exts, vec!["mkv", "mp4"]);
        assert!(filter.matches(Path::new("a.mp4")));
        assert!(!filter.matches(Path::new("a.avi")));
    }

    #[test]
    fn test_empty_filter() {
        let filter = ExtensionFilter::new(Vec::<String>::new());
        assert!(filter.is_empty());
        assert!(!filter.matches(Path::new("movie.mp4")));
    }

    #[test]
    fn test_edge_cases() {
        let filter = ExtensionFilter::default();
        assert!(!filter.matches(Path::new("")));
        assert!(filter.matches(Path::new(".hidden.mkv")));
        assert!(filter.matches(Path::new("movie.1080p.mkv")));
        // A bare dotfile has no extension
        assert!(!filter.matches(Path::new(".mp4")));
    }
}
