//! Direct streaming with HTTP range requests.

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// A parsed `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// Inclusive start and end offsets.
    Satisfiable(u64, u64),
    /// Well-formed, but outside the file.
    Unsatisfiable,
}

/// Serve `path` with `Range` support.
///
/// - no or unparsable `Range`: 200 with the whole file
/// - satisfiable range: 206 with `Content-Range`
/// - unsatisfiable range: 416 with `Content-Range: bytes */<size>`
/// - file missing: 404
pub async fn serve_file(path: &Path, headers: &HeaderMap) -> Result<Response, StatusCode> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    if !metadata.is_file() {
        return Err(StatusCode::NOT_FOUND);
    }

    let file_size = metadata.len();

    let range = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| parse_range_header(s, file_size));

    let content_type = content_type_for(path);

    match range {
        Some(ByteRange::Satisfiable(start, end)) => {
            let length = end - start + 1;

            let mut file = File::open(path).await.map_err(|_| StatusCode::NOT_FOUND)?;

            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            let stream = ReaderStream::new(file.take(length));

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, length.to_string())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                )
                .header(header::ACCEPT_RANGES, "bytes")
                .body(Body::from_stream(stream))
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
        }
        Some(ByteRange::Unsatisfiable) => Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{}", file_size))
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::empty())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR),
        None => {
            let file = File::open(path).await.map_err(|_| StatusCode::NOT_FOUND)?;

            let stream = ReaderStream::new(file);

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, file_size.to_string())
                .header(header::ACCEPT_RANGES, "bytes")
                .body(Body::from_stream(stream))
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Parse an HTTP `Range` header against a file of `file_size` bytes.
///
/// Supports a single range in the forms `bytes=0-499`, `bytes=500-` and
/// `bytes=-500`. Returns `None` when the header should be ignored (malformed
/// or multi-range).
pub fn parse_range_header(header: &str, file_size: u64) -> Option<ByteRange> {
    let ranges = header.trim().strip_prefix("bytes=")?;
    if ranges.contains(',') {
        return None;
    }

    let (start, end) = ranges.split_once('-')?;
    let start = start.trim();
    let end = end.trim();

    match (start.is_empty(), end.is_empty()) {
        // bytes=-500 (last 500 bytes)
        (true, false) => {
            let suffix_len: u64 = end.parse().ok()?;
            if suffix_len == 0 || file_size == 0 {
                return Some(ByteRange::Unsatisfiable);
            }
            let start = file_size.saturating_sub(suffix_len);
            Some(ByteRange::Satisfiable(start, file_size - 1))
        }
        // bytes=500- (from 500 to end)
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            if start >= file_size {
                return Some(ByteRange::Unsatisfiable);
            }
            Some(ByteRange::Satisfiable(start, file_size - 1))
        }
        // bytes=0-499
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if start > end {
                return None;
            }
            if start >= file_size {
                return Some(ByteRange::Unsatisfiable);
            }
            Some(ByteRange::Satisfiable(start, end.min(file_size - 1)))
        }
        // bytes=- (invalid)
        (true, true) => None,
    }
}

/// Content type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}
