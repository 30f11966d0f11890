use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// One post from the archive's manifest files. Unknown keys are ignored;
/// the export format carries far more than we read.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub timestamp: i64,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub data: Vec<AttachmentData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentData {
    #[serde(default)]
    pub media: Option<MediaRecord>,
}

/// A media file referenced by a post attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaRecord {
    /// Path of the media file, relative to the archive root.
    pub uri: String,
    /// Album title. Absent on some video records.
    #[serde(default)]
    pub title: Option<String>,
    /// Capture time in epoch seconds, when the export recorded one.
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
    #[serde(default)]
    pub media_metadata: Option<MediaMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaMetadata {
    #[serde(default)]
    pub photo_metadata: Option<UploadMetadata>,
    #[serde(default)]
    pub video_metadata: Option<UploadMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadMetadata {
    #[serde(default)]
    pub upload_ip: Option<String>,
}

impl MediaRecord {
    /// Upload IP in priority order: the photo metadata block first, then the
    /// video one. Empty strings count as absent.
    pub fn upload_ip(&self) -> Option<&str> {
        let meta = self.media_metadata.as_ref()?;
        meta.photo_metadata
            .as_ref()
            .and_then(|m| m.upload_ip.as_deref())
            .filter(|ip| !ip.is_empty())
            .or_else(|| {
                meta.video_metadata
                    .as_ref()
                    .and_then(|m| m.upload_ip.as_deref())
                    .filter(|ip| !ip.is_empty())
            })
    }
}

/// Load and concatenate every post manifest under `posts_dir`.
/// Each `.json` file holds a JSON array of posts; files are read in sorted
/// name order. Non-JSON files are skipped.
pub fn load_posts(posts_dir: &Path) -> anyhow::Result<Vec<Post>> {
    let mut json_files: Vec<_> = std::fs::read_dir(posts_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    json_files.sort();

    let mut posts = Vec::new();
    for path in &json_files {
        let file = File::open(path)?;
        let batch: Vec<Post> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid post manifest: {}", path.display()))?;
        log::debug!("{}: {} post(s)", path.display(), batch.len());
        posts.extend(batch);
    }
    Ok(posts)
}
