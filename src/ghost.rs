//! Soft delete for drawn images.
//!
//! A drawn image is *ghosted*: its logical name gains a `.ghost` suffix and it
//! is re-encoded under that name in the same directory. Ghosts stay on disk
//! forever. They still count toward a user's capacity but are never drawn
//! again.
//!
//! ```text
//! 8#cat.webp  ──ghost──▶  14#cat.webp.ghost
//! ```
//!
//! ## Strategies
//!
//! [`GhostStrategy::CopyThenDelete`] copies the bytes to the ghost name,
//! fsyncs the copy, then removes the original. A crash between the copy and
//! the removal leaves both files; [`ghost_state`] reports that as
//! [`GhostState::Interrupted`] and [`settle`] finishes the job.
//!
//! [`GhostStrategy::Rename`] is a single atomic rename with no such window.
//!
//! ## Suffix check
//!
//! [`is_ghost`] looks at the trailing bytes of a name and works on encoded
//! and decoded names alike: the suffix is ASCII and always sits after the
//! length marker.

use crate::codec::{self, DecodeError};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const GHOST_SUFFIX: &str = ".ghost";

#[derive(Error, Debug)]
pub enum GhostError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a barn name: {0}")]
    Decode(#[from] DecodeError),
}

/// How a file is moved to its ghost name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GhostStrategy {
    /// Copy, fsync, then remove the original.
    #[default]
    #[serde(rename = "copy")]
    CopyThenDelete,
    /// Atomic rename.
    Rename,
}

/// Where a logical image stands with respect to ghosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostState {
    /// Only the original exists.
    Available,
    /// Only the ghost exists.
    Ghosted,
    /// Both exist: a copy-then-delete stopped before the removal.
    Interrupted,
    /// Neither exists.
    Missing,
}

/// Whether a name (encoded or not) ends with the ghost suffix.
pub fn is_ghost(name: &str) -> bool {
    name.ends_with(GHOST_SUFFIX)
}

/// Ghost the file stored as `encoded_file` in `dir`. Returns the ghost's path.
pub fn ghost(dir: &Path, encoded_file: &str, strategy: GhostStrategy) -> Result<PathBuf, GhostError> {
    let raw = codec::decode(encoded_file)?;
    let original = dir.join(encoded_file);
    let ghost_path = dir.join(ghost_name(&raw));

    match strategy {
        GhostStrategy::CopyThenDelete => {
            let mut source = File::open(&original)?;
            let mut copy = File::create(&ghost_path)?;
            io::copy(&mut source, &mut copy)?;
            copy.sync_all()?;
            drop(source);
            fs::remove_file(&original)?;
        }
        GhostStrategy::Rename => fs::rename(&original, &ghost_path)?,
    }

    info!(dir = %dir.display(), name = %raw, "ghosted image");
    Ok(ghost_path)
}

/// Encoded ghost name for the logical name `raw`.
pub fn ghost_name(raw: &str) -> String {
    codec::encode(&format!("{raw}{GHOST_SUFFIX}"))
}

/// True when no valid entry in `dir` is still available. An empty or
/// unreadable directory is exhausted.
pub fn is_directory_exhausted(dir: &Path) -> bool {
    match crate::store::list_entries(dir) {
        Ok(entries) => entries.iter().all(|entry| entry.ghosted),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to check if directory is exhausted");
            true
        }
    }
}

/// Classify the logical image `raw` in `dir`.
pub fn ghost_state(dir: &Path, raw: &str) -> io::Result<GhostState> {
    let original = dir.join(codec::encode(raw)).try_exists()?;
    let ghosted = dir.join(ghost_name(raw)).try_exists()?;
    Ok(match (original, ghosted) {
        (true, false) => GhostState::Available,
        (false, true) => GhostState::Ghosted,
        (true, true) => GhostState::Interrupted,
        (false, false) => GhostState::Missing,
    })
}

/// Finish an interrupted ghosting of `raw` by ghosting the original again.
///
/// The earlier copy may be partial, so it is overwritten rather than trusted.
/// Any other state is returned untouched.
pub fn settle(dir: &Path, raw: &str, strategy: GhostStrategy) -> Result<GhostState, GhostError> {
    match ghost_state(dir, raw)? {
        GhostState::Interrupted => {
            warn!(dir = %dir.display(), name = %raw, "finishing interrupted ghosting");
            ghost(dir, &codec::encode(raw), strategy)?;
            Ok(GhostState::Ghosted)
        }
        state => Ok(state),
    }
}
