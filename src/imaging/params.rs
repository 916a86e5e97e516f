//! Parameter types for image operations.
//!
//! These structs describe *what* to do; the [`backend`](super::backend) does
//! the pixel work. Keeping them apart lets tests swap in a mock backend
//! without touching the upload flow.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    /// Fixed quality every upload is recompressed at.
    pub const TRANSCODE: Quality = Quality(25);

    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Everything one transcode needs: decode `source`, resize to
/// `width`×`height`, encode lossy WebP at `quality` into `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
