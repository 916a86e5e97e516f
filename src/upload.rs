//! Upload flow: save the raw bytes, then transcode under the pool.
//!
//! ```text
//! content type ──▶ allow-list ──▶ save raw      (always, unbounded)
//!                                   │
//!                                   ▼
//!                             acquire pool slot (blocks)
//!                                   │
//!                                   ▼
//!                  decode ▶ resize ▶ lossy WebP ▶ `<name>.webp`
//!                                   │
//!                                   ▼
//!                          remove raw upload ─▶ release slot
//! ```
//!
//! The slot is released whatever happens. When the transcode or the removal
//! fails, the raw upload stays under its own name and keeps counting as an
//! image in its original format; the error goes back to the caller.
//!
//! Capacity is not checked here. A sixth upload succeeds and only
//! [`ImageStore::gather`] notices.

use crate::imaging::{BackendError, ImageBackend, transcode_image};
use crate::pool::TranscodePool;
use crate::store::{ImageStore, StoreError, list_entries};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Suffix appended to the logical name of a transcoded upload.
pub const TRANSCODED_SUFFIX: &str = ".webp";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Unsupported content type: {0:?}")]
    UnsupportedContentType(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Transcoding {name:?} failed: {source}")]
    Transcode {
        name: String,
        #[source]
        source: BackendError,
    },
}

/// Accepted upload content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Heic,
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ContentType {
    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Heic => "image/heic",
            ContentType::Png => "image/png",
            ContentType::Jpeg => "image/jpeg",
            ContentType::Gif => "image/gif",
            ContentType::WebP => "image/webp",
        }
    }

    /// Guess from a filename extension, for callers without a declared type.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "heic" => Some(ContentType::Heic),
            "png" => Some(ContentType::Png),
            "jpg" | "jpeg" => Some(ContentType::Jpeg),
            "gif" => Some(ContentType::Gif),
            "webp" => Some(ContentType::WebP),
            _ => None,
        }
    }
}

impl FromStr for ContentType {
    type Err = UploadError;

    fn from_str(mime: &str) -> Result<Self, Self::Err> {
        match mime {
            "image/heic" => Ok(ContentType::Heic),
            "image/png" => Ok(ContentType::Png),
            "image/jpeg" | "image/jpg" => Ok(ContentType::Jpeg),
            "image/gif" => Ok(ContentType::Gif),
            "image/webp" => Ok(ContentType::WebP),
            other => Err(UploadError::UnsupportedContentType(other.to_string())),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Outcome of retrying one leftover raw upload.
#[derive(Debug)]
pub struct Reprocessed {
    pub email: String,
    pub name: String,
    pub result: Result<PathBuf, UploadError>,
}

/// Runs uploads against a store, a shared pool and an image backend.
pub struct Uploader<B> {
    store: ImageStore,
    pool: Arc<TranscodePool>,
    backend: B,
}

impl<B: ImageBackend> Uploader<B> {
    pub fn new(store: ImageStore, pool: Arc<TranscodePool>, backend: B) -> Self {
        Self {
            store,
            pool,
            backend,
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn pool(&self) -> &TranscodePool {
        &self.pool
    }

    /// Validate, save and transcode one upload. Returns the transcoded path.
    ///
    /// Anything outside the allow-list is rejected before touching disk.
    pub fn upload(
        &self,
        email: &str,
        filename: &str,
        content_type: &str,
        contents: impl Read,
    ) -> Result<PathBuf, UploadError> {
        let content_type: ContentType = content_type.parse()?;
        self.store.save_upload(email, filename, contents)?;
        info!(email, filename, %content_type, "saved upload");
        self.transcode_saved(email, filename)
    }

    /// Transcode an already saved raw upload into `<filename>.webp` and
    /// remove the raw file. Blocks until a pool slot is free.
    pub fn transcode_saved(&self, email: &str, filename: &str) -> Result<PathBuf, UploadError> {
        let source = self.store.image_path(email, filename)?;
        let output = self
            .store
            .image_path(email, &format!("{filename}{TRANSCODED_SUFFIX}"))?;

        let _permit = self.pool.acquire();

        let params = transcode_image(&self.backend, &source, &output).map_err(|e| {
            warn!(email, filename, error = %e, "transcode failed, keeping raw upload");
            UploadError::Transcode {
                name: filename.to_string(),
                source: e,
            }
        })?;
        fs::remove_file(&source)?;

        info!(email, filename, width = params.width, height = params.height, "transcoded upload");
        Ok(output)
    }

    /// Retry every raw upload left behind by an earlier failed transcode.
    ///
    /// A raw upload is any available entry whose name does not end in
    /// `.webp`. Retries run in parallel but still take pool slots one each.
    pub fn reprocess_pending(&self) -> Result<Vec<Reprocessed>, StoreError> {
        let mut pending = Vec::new();
        for dir in self.store.user_dirs()? {
            let entries = match list_entries(&dir.path) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.encoded, error = %e, "couldn't open directory");
                    continue;
                }
            };
            pending.extend(
                entries
                    .into_iter()
                    .filter(|entry| !entry.ghosted && !entry.name.ends_with(TRANSCODED_SUFFIX))
                    .map(|entry| (dir.email.clone(), entry.name)),
            );
        }

        Ok(pending
            .into_par_iter()
            .map(|(email, name)| {
                let result = self.transcode_saved(&email, &name);
                Reprocessed {
                    email,
                    name,
                    result,
                }
            })
            .collect())
    }
}
