pub mod album;
pub mod date;
pub mod exif_write;
pub mod geocache;
pub mod geolocate;
pub mod gps;
pub mod manifest;
pub mod writer;

use std::cell::Cell;
use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use geolocate::{DbIpProvider, GeoProvider, LocationResolver};
use gps::GpsPosition;

/// Default file name for the durable geolocation cache.
pub const GEO_CACHE_FILENAME: &str = "geo_ip_cache.json";

/// Subdirectory of the archive root holding the post manifests.
const POSTS_DIR: &str = "posts";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Root of the extracted export.
    pub archive_dir: PathBuf,
    /// Output directory; album folders are created under it.
    pub output: PathBuf,
    /// Path of the durable geolocation cache.
    pub geo_cache: PathBuf,
    /// Process without any IP-based geolocation.
    #[serde(default)]
    pub skip_location: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessResult {
    pub posts_scanned: u64,
    pub media_found: u64,
    pub files_written: u64,
    pub metadata_embedded: u64,
    pub locations_resolved: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// The archive is structurally unusable: a required field or referenced file
/// is absent. Always fatal; processing stops where it is raised.
#[derive(Debug, Clone)]
pub struct MalformedArchiveError(pub String);

impl std::fmt::Display for MalformedArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed archive: {}", self.0)
    }
}

impl std::error::Error for MalformedArchiveError {}

/// Type alias for progress callback
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str);

/// Throttled progress reporter — emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback,
    last_emit: Cell<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback) -> Self {
        Self {
            inner,
            last_emit: Cell::new(Instant::now() - std::time::Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            if self.last_emit.get().elapsed().as_millis() < 200 {
                return;
            }
            self.last_emit.set(Instant::now());
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Run the full restore pipeline with the production geolocation provider.
pub fn process(
    options: &ProcessOptions,
    progress_callback: &ProgressCallback,
) -> anyhow::Result<ProcessResult> {
    let provider = DbIpProvider::new();
    process_with_provider(options, &provider, progress_callback)
}

/// Run the restore pipeline with an injected geolocation provider.
pub fn process_with_provider(
    options: &ProcessOptions,
    provider: &dyn GeoProvider,
    progress_callback: &ProgressCallback,
) -> anyhow::Result<ProcessResult> {
    let tp = ThrottledProgress::new(progress_callback);

    if !options.archive_dir.exists() {
        return Err(MalformedArchiveError(format!(
            "archive directory not found: {}",
            options.archive_dir.display()
        ))
        .into());
    }
    let posts_dir = options.archive_dir.join(POSTS_DIR);
    if !posts_dir.exists() {
        return Err(MalformedArchiveError(format!(
            "posts directory not found: {}",
            posts_dir.display()
        ))
        .into());
    }

    // Stage 1: decode the post manifests
    let posts = manifest::load_posts(&posts_dir)?;
    tp.report("scan", posts.len() as u64, posts.len() as u64, "Manifests decoded");

    let cache = geocache::GeoCache::load(&options.geo_cache)?;
    let mut resolver = LocationResolver::new(cache, provider);
    let mut output = writer::OutputWriter::new(&options.output)?;

    let mut result = ProcessResult {
        posts_scanned: posts.len() as u64,
        ..Default::default()
    };

    let records: Vec<(&manifest::Post, &manifest::MediaRecord)> = posts
        .iter()
        .flat_map(|post| {
            post.attachments.iter().flat_map(move |attachment| {
                attachment
                    .data
                    .iter()
                    .filter_map(move |data| data.media.as_ref().map(|media| (post, media)))
            })
        })
        .collect();
    let total = records.len() as u64;
    result.media_found = total;

    // Stage 2: restore each referenced file, strictly one record at a time
    for (i, (post, record)) in records.into_iter().enumerate() {
        tp.report("restore", i as u64, total, &record.uri);

        let album = album::classify_album(record)?;
        let datetime = date::derive_datetime(record, post)?;
        let location = if options.skip_location {
            None
        } else {
            resolver.resolve(record)
        };
        if location.is_some() {
            result.locations_resolved += 1;
        }

        let dest = output.place(&options.archive_dir, &record.uri, &album)?;
        result.files_written += 1;

        if exif_write::supports_metadata(&dest) {
            let position = location.map(|p| GpsPosition::from_decimal(p.latitude, p.longitude));
            exif_write::embed_metadata(&dest, &datetime, position.as_ref())?;
            result.metadata_embedded += 1;
        }

        // Mirror the capture time onto the copied file
        let epoch = date::capture_epoch(record, post);
        let ft = filetime::FileTime::from_unix_time(epoch, 0);
        if let Err(err) = filetime::set_file_mtime(&dest, ft) {
            let warning = format!("could not set mtime on {}: {err}", dest.display());
            log::warn!("{warning}");
            result.warnings.push(warning);
        }
    }
    tp.report("restore", total, total, "Done");

    log::info!(
        "restored {} of {} media file(s), {} with embedded metadata",
        result.files_written,
        result.media_found,
        result.metadata_embedded
    );
    Ok(result)
}
