use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::manifest::MediaRecord;
use crate::MalformedArchiveError;

/// Album used for every recognized video file.
pub const VIDEO_ALBUM: &str = "Videos";
/// Album used when a title sanitizes down to nothing.
pub const DEFAULT_ALBUM: &str = "Misc";

/// Everything outside the path-safe whitelist gets stripped.
static ILLEGAL_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9 ._()-]").unwrap());

/// Check whether a uri points at a video file (by MIME type, plus `.mts`
/// which mime databases often miss).
pub fn is_video(uri: &str) -> bool {
    if uri.to_lowercase().ends_with(".mts") {
        return true;
    }
    mime_guess::from_path(uri)
        .first()
        .map_or(false, |mime| mime.type_() == mime_guess::mime::VIDEO)
}

/// Reduce a title to characters that are safe in a path component.
/// Idempotent: sanitizing an already-sanitized name is a no-op.
pub fn sanitize_album_name(title: &str) -> String {
    let normalized: String = title.nfc().collect();
    ILLEGAL_CHARS_RE.replace_all(&normalized, "").into_owned()
}

/// Derive the album folder name for a media record.
/// Videos always classify to [`VIDEO_ALBUM`]; any other record must carry a
/// title, and its absence means the archive is malformed.
pub fn classify_album(record: &MediaRecord) -> anyhow::Result<String> {
    if is_video(&record.uri) {
        return Ok(VIDEO_ALBUM.to_string());
    }

    let title = record.title.as_deref().ok_or_else(|| {
        MalformedArchiveError(format!("no title on media record: {}", record.uri))
    })?;

    let name = sanitize_album_name(title);
    if name.is_empty() {
        Ok(DEFAULT_ALBUM.to_string())
    } else {
        Ok(name)
    }
}
