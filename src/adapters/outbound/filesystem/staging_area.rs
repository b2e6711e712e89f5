use crate::feed_sync::domain::FeedId;
use crate::shared::error::SyncError;
use crate::shared::SyncResult;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// StagingArea adapter for the working directory of downloaded feeds
///
/// Files here are scratch copies only: `nvdcve-{id}.xml.gz` exists while a
/// download is being unpacked, `nvdcve-{id}.xml` is left behind afterwards.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn compressed_path(&self, feed: FeedId) -> PathBuf {
        self.dir.join(format!("nvdcve-{}.xml.gz", feed))
    }

    pub fn document_path(&self, feed: FeedId) -> PathBuf {
        self.dir.join(format!("nvdcve-{}.xml", feed))
    }

    /// Stores a compressed download, unpacks it and returns the document bytes
    ///
    /// # Errors
    /// `SyncError::Fetch` when the working directory cannot be written,
    /// `SyncError::Decompress` when the payload is not valid gzip.
    pub fn unpack(&self, feed: FeedId, compressed: &[u8]) -> SyncResult<Vec<u8>> {
        let io_error = |action: &str, path: &Path, e: std::io::Error| SyncError::Fetch {
            feed: feed.to_string(),
            details: format!("Failed to {} {}: {}", action, path.display(), e),
        };

        fs::create_dir_all(&self.dir).map_err(|e| io_error("create", &self.dir, e))?;

        let gz_path = self.compressed_path(feed);
        fs::write(&gz_path, compressed).map_err(|e| io_error("write", &gz_path, e))?;

        let decoded = Self::decompress(&gz_path).map_err(|e| SyncError::Decompress {
            feed: feed.to_string(),
            details: e.to_string(),
        });
        // The archive is removed whether or not it could be unpacked
        let removed = fs::remove_file(&gz_path);
        let bytes = decoded?;
        removed.map_err(|e| io_error("remove", &gz_path, e))?;

        let xml_path = self.document_path(feed);
        fs::write(&xml_path, &bytes).map_err(|e| io_error("write", &xml_path, e))?;

        debug!(
            feed = %feed,
            compressed = compressed.len(),
            decompressed = bytes.len(),
            path = %xml_path.display(),
            "Unpacked feed"
        );
        Ok(bytes)
    }

    /// Reads back the document left by a previous `unpack`
    ///
    /// # Errors
    /// `SyncError::Fetch` when the document is missing or unreadable.
    pub fn load(&self, feed: FeedId) -> SyncResult<Vec<u8>> {
        let xml_path = self.document_path(feed);
        fs::read(&xml_path).map_err(|e| SyncError::Fetch {
            feed: feed.to_string(),
            details: format!("Failed to read staged {}: {}", xml_path.display(), e),
        })
    }

    fn decompress(path: &Path) -> std::io::Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(fs::File::open(path)?);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}
