//! Media metadata probing.
//!
//! [`MetadataProber`] is the seam the sync engine depends on;
//! [`FfprobeProber`] is the production implementation. Parsing of ffprobe's
//! JSON lives in [`parse_ffprobe_output`] so it can be tested without the
//! binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::tools::get_tool_path;
use crate::{Error, Result};

/// Technical metadata of one media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    /// Container duration in seconds, `0.0` when unknown.
    pub duration_secs: f64,
    /// Container format name as reported by the prober.
    pub format: String,
    /// Codec of the first video stream, empty if there is none.
    pub codec: String,
    /// Resolution of the first video stream. Both or neither are set.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A media file prober.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait MetadataProber: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Extract metadata from the file at `path`.
    async fn probe(&self, path: &Path) -> Result<ProbeInfo>;
}

/// Prober backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Locate ffprobe, preferring `configured` over `PATH`.
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        Ok(Self::new(get_tool_path("ffprobe", configured)?))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MetadataProber for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        let output = ToolCommand::new(self.program.clone())
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .timeout(self.timeout)
            .execute()
            .await?;

        parse_ffprobe_output(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    /// ffprobe prints a string; some wrappers emit a number.
    duration: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
}

/// Parse the JSON printed by `ffprobe -show_format -show_streams`.
///
/// Missing or unusable values fall back to neutral defaults. Only output
/// that is not a JSON object at all is an error.
///
/// ```
/// use vidsync_av::probe::parse_ffprobe_output;
///
/// let json = r#"{
///     "format": {"format_name": "matroska,webm", "duration": "63.5"},
///     "streams": [{"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720}]
/// }"#;
/// let info = parse_ffprobe_output(json).unwrap();
/// assert_eq!(info.duration_secs, 63.5);
/// assert_eq!(info.width, Some(1280));
/// ```
pub fn parse_ffprobe_output(json: &str) -> Result<ProbeInfo> {
    if json.trim().is_empty() {
        return Err(Error::parse_error("ffprobe", "empty output"));
    }
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let (format, duration_secs) = match output.format {
        Some(f) => (
            f.format_name.unwrap_or_default(),
            f.duration.as_ref().map(parse_duration).unwrap_or(0.0),
        ),
        None => (String::new(), 0.0),
    };

    let video = output
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let (codec, width, height) = match video {
        Some(stream) => {
            let dims = dimension(stream.width).zip(dimension(stream.height));
            (
                stream.codec_name.unwrap_or_default(),
                dims.map(|(w, _)| w),
                dims.map(|(_, h)| h),
            )
        }
        None => (String::new(), None, None),
    };

    Ok(ProbeInfo {
        duration_secs,
        format,
        codec,
        width,
        height,
    })
}

fn parse_duration(value: &serde_json::Value) -> f64 {
    let secs = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    secs.filter(|d| d.is_finite() && *d >= 0.0).unwrap_or(0.0)
}

fn dimension(value: Option<i64>) -> Option<u32> {
    value.filter(|v| *v > 0).and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_output() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "audio", "codec_name": "aac"},
                {"index": 1, "codec_type": "video", "codec_name": "hevc", "width": 3840, "height": 2160},
                {"index": 2, "codec_type": "video", "codec_name": "mjpeg", "width": 320, "height": 180}
            ],
            "format": {"filename": "a.mkv", "format_name": "matroska,webm", "duration": "5423.120000"}
        }"#;

        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.format, "matroska,webm");
        assert_eq!(info.codec, "hevc");
        assert_eq!(info.width, Some(3840));
        assert_eq!(info.height, Some(2160));
        assert!((info.duration_secs - 5423.12).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_duration() {
        let info = parse_ffprobe_output(r#"{"format": {"duration": 12.5}}"#).unwrap();
        assert_eq!(info.duration_secs, 12.5);
    }

    #[test]
    fn test_bad_durations_become_zero() {
        for raw in [r#""N/A""#, r#""-3.0""#, "null", "true"] {
            let json = format!(r#"{{"format": {{"format_name": "mp4", "duration": {raw}}}}}"#);
            let info = parse_ffprobe_output(&json).unwrap();
            assert_eq!(info.duration_secs, 0.0, "{raw}");
            assert_eq!(info.format, "mp4");
        }
    }

    #[test]
    fn test_no_video_stream() {
        let json = r#"{"format": {"format_name": "mp3"}, "streams": [{"codec_type": "audio"}]}"#;
        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.codec, "");
        assert_eq!(info.width, None);
        assert_eq!(info.height, None);
    }

    #[test]
    fn test_partial_resolution_is_dropped() {
        let json = r#"{"streams": [{"codec_type": "video", "codec_name": "vp9", "width": 640}]}"#;
        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.codec, "vp9");
        assert_eq!((info.width, info.height), (None, None));

        let json = r#"{"streams": [{"codec_type": "video", "width": 0, "height": 480}]}"#;
        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!((info.width, info.height), (None, None));
    }

    #[test]
    fn test_empty_object_is_defaults() {
        assert_eq!(parse_ffprobe_output("{}").unwrap(), ProbeInfo::default());
    }

    #[test]
    fn test_malformed_output() {
        assert!(matches!(parse_ffprobe_output(""), Err(Error::ParseError { .. })));
        assert!(matches!(parse_ffprobe_output("not json"), Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let prober = FfprobeProber::new("ffprobe");
        let result = prober.probe(Path::new("/nonexistent/movie.mkv")).await;
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let prober = FfprobeProber::new("/nonexistent/ffprobe");
        let result = prober.probe(file.path()).await;
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }
}
