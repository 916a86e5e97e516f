//! High-level image operations.
//!
//! These combine the pure calculations with backend execution: identify the
//! source, plan the output size, hand the plan to the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::target_dimensions;
use super::params::{Quality, TranscodeParams};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Plan a transcode without executing it.
pub fn plan_transcode(source: &Path, output: &Path, original: (u32, u32)) -> TranscodeParams {
    let (width, height) = target_dimensions(original);
    TranscodeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        quality: Quality::TRANSCODE,
    }
}

/// Identify `source`, then recompress it into `output` under the resize
/// policy. Returns the plan that was executed.
pub fn transcode_image(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
) -> Result<TranscodeParams> {
    let dims = backend.identify(source)?;
    let params = plan_transcode(source, output, (dims.width, dims.height));
    backend.transcode(&params)?;
    Ok(params)
}
