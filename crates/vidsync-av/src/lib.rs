//! # vidsync-av
//!
//! External media tool plumbing for vidsync.
//!
//! - [`probe`]: technical metadata through `ffprobe`
//! - [`thumbnail`]: memoized preview frames through `ffmpeg`
//! - [`command`]: timed subprocess execution
//! - [`tools`]: tool detection and path resolution
//!
//! The sync engine only sees the [`MetadataProber`] and
//! [`ThumbnailGenerator`] traits, so tests can swap in doubles.
//!
//! ```no_run
//! use std::path::Path;
//! use vidsync_av::{FfprobeProber, MetadataProber};
//!
//! # async fn example() -> vidsync_av::Result<()> {
//! let prober = FfprobeProber::locate(None)?;
//! let info = prober.probe(Path::new("/path/to/video.mkv")).await?;
//! println!("{} ({:.1}s)", info.codec, info.duration_secs);
//! # Ok(())
//! # }
//! ```

pub mod command;
mod error;
pub mod probe;
pub mod thumbnail;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use probe::{FfprobeProber, MetadataProber, ProbeInfo};
pub use thumbnail::{thumbnail_file_name, FfmpegThumbnailer, OffsetStrategy, ThumbnailGenerator};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};
