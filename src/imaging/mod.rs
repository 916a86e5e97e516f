//! Image processing for the upload transcode step.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3 to the tier from [`target_dimensions`] |
//! | **Encode** | lossy WebP at [`Quality::TRANSCODE`] via libwebp |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{RESIZE_TIERS, target_dimensions};
pub use operations::{plan_transcode, transcode_image};
pub use params::{Quality, TranscodeParams};
pub use rust_backend::RustBackend;
