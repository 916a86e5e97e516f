//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the two operations the upload flow
//! needs: identify (read dimensions) and transcode (resize + lossy WebP).
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::TranscodeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve every upload thread at once.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Execute a transcode operation.
    fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::pool::tests::Gate;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock backend that records operations instead of touching pixels.
    ///
    /// `transcode` writes a small placeholder to the output path so the rest
    /// of the upload flow sees a real file. Uses Mutex (not RefCell) so it is
    /// Sync and can be shared across upload threads.
    #[derive(Default)]
    pub struct MockBackend {
        pub dimensions: Option<Dimensions>,
        pub fail_transcode: bool,
        pub gate: Option<std::sync::Arc<Gate>>,
        pub operations: Mutex<Vec<RecordedOp>>,
        pub active: AtomicUsize,
        pub peak: AtomicUsize,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Transcode {
            source: String,
            output: String,
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                dimensions: Some(Dimensions { width, height }),
                ..Self::default()
            }
        }

        pub fn failing(width: u32, height: u32) -> Self {
            Self {
                fail_transcode: true,
                ..Self::with_dimensions(width, height)
            }
        }

        pub fn gated(width: u32, height: u32, gate: std::sync::Arc<Gate>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::with_dimensions(width, height)
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            self.dimensions
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.wait();
            }
            self.operations.lock().unwrap().push(RecordedOp::Transcode {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail_transcode {
                return Err(BackendError::ProcessingFailed("mock failure".to_string()));
            }
            std::fs::write(&params.output, b"webp")?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(800, 600);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result, Dimensions { width: 800, height: 600 });

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_without_dimensions_fails_identify() {
        let backend = MockBackend::default();
        assert!(backend.identify(Path::new("/test/image.jpg")).is_err());
    }

    #[test]
    fn mock_transcode_writes_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("out.webp");
        let backend = MockBackend::with_dimensions(10, 10);

        backend
            .transcode(&TranscodeParams {
                source: "/source.jpg".into(),
                output: output.clone(),
                width: 10,
                height: 10,
                quality: Quality::TRANSCODE,
            })
            .unwrap();

        assert!(output.exists());
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Transcode { quality: 25, .. }
        ));
    }
}
