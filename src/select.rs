//! Random draw of one image that has not been consumed yet.
//!
//! Selection is two-level:
//!
//! 1. shuffle the user directories under the root;
//! 2. walk them in that order, shuffle each one's entries, and take the first
//!    entry that decodes and is not a ghost.
//!
//! The first directory with anything left wins, so every user with an
//! available image is equally likely to be picked no matter how many images
//! they hold. The result is *not* uniform over all images in the store.
//!
//! Nothing serialises draws. Two concurrent [`serve_and_consume`] calls can
//! both pick the same file before either ghosts it, in which case the image
//! is served twice and the slower ghosting fails with an IO error.

use crate::ghost::{self, GhostError, GhostStrategy};
use crate::store::{ImageStore, StoreError, list_entries};
use rand::Rng;
use rand::seq::SliceRandom;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("No available images found")]
    NotFound,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Ghosting failed: {0}")]
    Ghost(#[from] GhostError),
}

impl From<StoreError> for DrawError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io(e) => DrawError::Io(e),
            other => DrawError::Io(io::Error::other(other.to_string())),
        }
    }
}

/// A drawn, not yet consumed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    /// Encoded user directory name.
    pub dir: String,
    /// Encoded file name inside `dir`.
    pub file: String,
    /// Owner's email.
    pub email: String,
    /// Logical image name.
    pub name: String,
    pub path: PathBuf,
}

/// An image that was served and then ghosted.
#[derive(Debug, Clone)]
pub struct DrawnImage {
    pub draw: Draw,
    pub bytes: Vec<u8>,
    pub ghost_path: PathBuf,
}

/// Pick one available image anywhere in the store.
///
/// Unreadable user directories are logged and skipped. Fails with
/// [`DrawError::NotFound`] when no directory has an available image.
pub fn draw_one<R: Rng + ?Sized>(store: &ImageStore, rng: &mut R) -> Result<Draw, DrawError> {
    let mut dirs = store.user_dirs()?;
    dirs.shuffle(rng);

    for dir in dirs {
        let mut entries = match list_entries(&dir.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.encoded, error = %e, "couldn't open directory");
                continue;
            }
        };
        entries.shuffle(rng);

        if let Some(entry) = entries.into_iter().find(|entry| !entry.ghosted) {
            debug!(email = %dir.email, name = %entry.name, "drew image");
            return Ok(Draw {
                path: dir.path.join(&entry.encoded),
                dir: dir.encoded,
                file: entry.encoded,
                email: dir.email,
                name: entry.name,
            });
        }
    }

    Err(DrawError::NotFound)
}

/// Draw an image, read its bytes, then ghost it.
///
/// If ghosting fails after the read, the error is returned and the image
/// stays available; the caller decides whether the bytes were delivered.
pub fn serve_and_consume<R: Rng + ?Sized>(
    store: &ImageStore,
    rng: &mut R,
    strategy: GhostStrategy,
) -> Result<DrawnImage, DrawError> {
    let draw = draw_one(store, rng)?;
    let bytes = fs::read(&draw.path)?;
    let dir = store.root().join(&draw.dir);
    let ghost_path = ghost::ghost(&dir, &draw.file, strategy)?;
    Ok(DrawnImage {
        draw,
        bytes,
        ghost_path,
    })
}
