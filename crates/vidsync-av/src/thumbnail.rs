//! Thumbnail generation.
//!
//! Thumbnails are memoized by file name: a source maps to exactly one
//! `<stem>-<hash8>.jpg` in the output directory, and an existing file is
//! returned without running ffmpeg again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::tools::get_tool_path;
use crate::{Error, Result};

/// Produces a preview image for a media file.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Return the thumbnail for `source` in `output_dir`, creating it if it
    /// does not exist yet.
    ///
    /// `duration_secs` is the probed duration (`0.0` when unknown) and bounds
    /// the seek offset.
    async fn ensure_thumbnail(
        &self,
        source: &Path,
        output_dir: &Path,
        duration_secs: f64,
    ) -> Result<PathBuf>;
}

/// The memoized thumbnail file name for `source`.
///
/// The hash suffix comes from the absolute source path, so two `movie.mp4`
/// files in different directories get different thumbnails.
///
/// ```
/// use std::path::Path;
/// use vidsync_av::thumbnail::thumbnail_file_name;
///
/// let a = thumbnail_file_name(Path::new("/media/a/movie.mp4"));
/// let b = thumbnail_file_name(Path::new("/media/b/movie.mp4"));
/// assert!(a.starts_with("movie-") && a.ends_with(".jpg"));
/// assert_ne!(a, b);
/// ```
pub fn thumbnail_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "thumbnail".to_string());
    let digest = Sha256::digest(source.to_string_lossy().as_bytes());
    format!("{stem}-{}.jpg", &hex::encode(digest)[..8])
}

/// How far into the video the thumbnail frame is taken.
#[derive(Debug, Clone, PartialEq)]
pub enum OffsetStrategy {
    /// Always seek to the same offset.
    Fixed(Duration),
    /// A reproducible pseudo-random offset in `[1s, max)` per file stem.
    SeededRandom { seed: u64, max: Duration },
}

impl Default for OffsetStrategy {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(1))
    }
}

const MIN_RANDOM_OFFSET: f64 = 1.0;

impl OffsetStrategy {
    /// Offset in seconds for `source`, clamped to half of a known duration.
    pub fn offset_for(&self, source: &Path, duration_secs: f64) -> f64 {
        let offset = match self {
            Self::Fixed(d) => d.as_secs_f64(),
            Self::SeededRandom { seed, max } => {
                let max = max.as_secs_f64();
                if max <= MIN_RANDOM_OFFSET {
                    MIN_RANDOM_OFFSET
                } else {
                    let mut rng = rand::rngs::StdRng::seed_from_u64(seed ^ stem_seed(source));
                    rng.gen_range(MIN_RANDOM_OFFSET..max)
                }
            }
        };

        if duration_secs > 0.0 && offset > duration_secs / 2.0 {
            duration_secs / 2.0
        } else {
            offset
        }
    }
}

fn stem_seed(source: &Path) -> u64 {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    let digest = Sha256::digest(stem.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Thumbnail generator backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegThumbnailer {
    program: PathBuf,
    offset: OffsetStrategy,
    timeout: Duration,
}

impl FfmpegThumbnailer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            offset: OffsetStrategy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Locate ffmpeg, preferring `configured` over `PATH`.
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        Ok(Self::new(get_tool_path("ffmpeg", configured)?))
    }

    pub fn with_offset(mut self, offset: OffsetStrategy) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ThumbnailGenerator for FfmpegThumbnailer {
    async fn ensure_thumbnail(
        &self,
        source: &Path,
        output_dir: &Path,
        duration_secs: f64,
    ) -> Result<PathBuf> {
        let name = thumbnail_file_name(source);
        let target = output_dir.join(&name);
        if tokio::fs::try_exists(&target).await? {
            tracing::trace!(thumbnail = %target.display(), "Thumbnail already exists");
            return Ok(target);
        }

        if !source.exists() {
            return Err(Error::file_not_found(source));
        }
        tokio::fs::create_dir_all(output_dir).await?;

        // ffmpeg picks the encoder from the extension, so keep `.jpg` last.
        let partial = output_dir.join(format!(".{name}.partial.jpg"));
        let offset = self.offset.offset_for(source, duration_secs);

        let result = ToolCommand::new(self.program.clone())
            .args(["-y", "-v", "error", "-ss"])
            .arg(format!("{offset:.3}"))
            .arg("-i")
            .arg(source)
            .args(["-frames:v", "1"])
            .arg(&partial)
            .timeout(self.timeout)
            .execute()
            .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        if !tokio::fs::try_exists(&partial).await? {
            return Err(Error::tool_failed("ffmpeg", "exited successfully but wrote no image"));
        }
        tokio::fs::rename(&partial, &target).await?;

        tracing::debug!(
            file = %source.display(),
            thumbnail = %target.display(),
            offset_secs = offset,
            "Generated thumbnail"
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_deterministic() {
        let path = Path::new("/media/Holiday 2019.mkv");
        assert_eq!(thumbnail_file_name(path), thumbnail_file_name(path));
        let name = thumbnail_file_name(path);
        assert!(name.starts_with("Holiday 2019-"));
        assert_eq!(name.len(), "Holiday 2019-".len() + 8 + ".jpg".len());
    }

    #[test]
    fn test_fixed_offset_clamped_to_half_duration() {
        let strategy = OffsetStrategy::Fixed(Duration::from_secs(10));
        let path = Path::new("/m/a.mp4");
        assert_eq!(strategy.offset_for(path, 60.0), 10.0);
        assert_eq!(strategy.offset_for(path, 4.0), 2.0);
        // Unknown duration leaves the offset alone.
        assert_eq!(strategy.offset_for(path, 0.0), 10.0);
    }

    #[test]
    fn test_seeded_offset_is_reproducible() {
        let strategy = OffsetStrategy::SeededRandom {
            seed: 42,
            max: Duration::from_secs(180),
        };
        let a = Path::new("/m/a.mp4");
        let first = strategy.offset_for(a, 0.0);
        assert_eq!(first, strategy.offset_for(a, 0.0));
        assert!((1.0..180.0).contains(&first));

        let tiny = OffsetStrategy::SeededRandom {
            seed: 42,
            max: Duration::from_millis(500),
        };
        assert_eq!(tiny.offset_for(a, 0.0), 1.0);
    }

    #[tokio::test]
    async fn test_existing_thumbnail_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("movie.mp4");
        std::fs::write(&source, b"not really a video").unwrap();
        let thumbs = dir.path().join("thumbs");
        std::fs::create_dir(&thumbs).unwrap();
        let existing = thumbs.join(thumbnail_file_name(&source));
        std::fs::write(&existing, b"jpeg").unwrap();

        // The program does not exist, so any invocation would fail.
        let generator = FfmpegThumbnailer::new("/nonexistent/ffmpeg");
        let found = generator.ensure_thumbnail(&source, &thumbs, 10.0).await.unwrap();
        assert_eq!(found, existing);
    }

    #[tokio::test]
    async fn test_failed_run_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("movie.mp4");
        std::fs::write(&source, b"not really a video").unwrap();
        let thumbs = dir.path().join("thumbs");

        let generator = FfmpegThumbnailer::new("/nonexistent/ffmpeg");
        let result = generator.ensure_thumbnail(&source, &thumbs, 10.0).await;
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
        assert_eq!(std::fs::read_dir(&thumbs).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let generator = FfmpegThumbnailer::new("/nonexistent/ffmpeg");
        let result = generator
            .ensure_thumbnail(&dir.path().join("gone.mp4"), dir.path(), 0.0)
            .await;
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }
}
