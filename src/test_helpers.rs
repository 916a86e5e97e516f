//! Shared test utilities: an isolated images root and quick ways to put
//! files in it.
//!
//! ```text
//! use crate::test_helpers::*;
//!
//! let (_tmp, store) = setup_store();
//! write_image(&store, "ada@example.com", "cat.webp");   // stored as 8#cat.webp
//! write_raw(&store, "ada@example.com", ".DS_Store");    // stored verbatim
//! ```

use crate::codec;
use crate::store::ImageStore;
use image::{ImageEncoder, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create a temp dir with an empty `images/` root and a store on it.
///
/// Keep the `TempDir` alive for as long as the store is used.
pub fn setup_store() -> (TempDir, ImageStore) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("images");
    fs::create_dir_all(&root).unwrap();
    (tmp, ImageStore::new(root))
}

/// Write a file named `encode(name)` in `email`'s directory. Its content is
/// `image:<name>`.
pub fn write_image(store: &ImageStore, email: &str, name: &str) {
    let dir = store.user_dir(email).unwrap();
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(codec::encode(name)), format!("image:{name}")).unwrap();
}

/// Write a file with the literal on-disk name `file_name` in `email`'s
/// directory, creating the directory if needed.
pub fn write_raw(store: &ImageStore, email: &str, file_name: &str) {
    let dir = store.user_dir(email).unwrap();
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file_name), b"raw").unwrap();
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}
