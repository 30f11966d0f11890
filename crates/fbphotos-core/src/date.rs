use chrono::Local;

use crate::manifest::{MediaRecord, Post};
use crate::MalformedArchiveError;

/// Embedded-metadata datetime layout: local time, no timezone suffix.
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Capture time in epoch seconds: the record's own timestamp when the export
/// recorded one, else the enclosing post's.
pub fn capture_epoch(record: &MediaRecord, post: &Post) -> i64 {
    record.creation_timestamp.unwrap_or(post.timestamp)
}

/// Format epoch seconds as the embedded-metadata datetime string.
pub fn format_datetime(epoch: i64) -> anyhow::Result<String> {
    let utc = chrono::DateTime::from_timestamp(epoch, 0)
        .ok_or_else(|| MalformedArchiveError(format!("timestamp out of range: {epoch}")))?;
    Ok(utc
        .with_timezone(&Local)
        .naive_local()
        .format(EXIF_DATETIME_FORMAT)
        .to_string())
}

/// Derive the datetime string for a record, falling back to the post.
pub fn derive_datetime(record: &MediaRecord, post: &Post) -> anyhow::Result<String> {
    format_datetime(capture_epoch(record, post))
}
