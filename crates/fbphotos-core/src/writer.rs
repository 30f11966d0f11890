use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::MalformedArchiveError;

/// Places media files into `<output>/<album>/<basename>`, creating album
/// directories lazily on first use.
pub struct OutputWriter {
    output_dir: PathBuf,
    created_dirs: HashSet<PathBuf>,
}

impl OutputWriter {
    pub fn new(output_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            created_dirs: HashSet::new(),
        })
    }

    /// Copy the file referenced by `uri` into the album folder and return the
    /// destination path. A referenced file missing from the archive means the
    /// archive is malformed.
    pub fn place(&mut self, archive_dir: &Path, uri: &str, album: &str) -> anyhow::Result<PathBuf> {
        let source = archive_dir.join(uri);
        if !source.exists() {
            return Err(
                MalformedArchiveError(format!("media file missing from archive: {uri}")).into(),
            );
        }

        let album_dir = self.output_dir.join(album);
        if !self.created_dirs.contains(&album_dir) {
            fs::create_dir_all(&album_dir)?;
            self.created_dirs.insert(album_dir.clone());
        }

        let filename = Path::new(uri)
            .file_name()
            .ok_or_else(|| MalformedArchiveError(format!("media uri has no file name: {uri}")))?;
        let dest = album_dir.join(filename);
        log::debug!("copying {} to {}", source.display(), dest.display());
        fs::copy(&source, &dest)?;
        Ok(dest)
    }
}
