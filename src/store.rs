//! Per-user image directories on disk.
//!
//! ## Layout
//!
//! ```text
//! images/                              # store root
//! ├── 15#ada@example.com/              # one directory per approved user
//! │   ├── 13#sunset.jpg.webp           # transcoded upload
//! │   ├── 8#cat.heic                   # raw upload whose transcode failed
//! │   └── 19#dawn.jpg.webp.ghost       # consumed by a draw, kept on disk
//! ├── 15#bob@example.com/
//! └── .DS_Store                        # not a barn name: ignored
//! ```
//!
//! Every name under the root is produced by [`codec::encode`]. Entries that do
//! not decode are never an error; they are simply not images.
//!
//! The filesystem is the only source of truth. Nothing here caches a listing:
//! every call reads the directory again.
//!
//! ## Capacity
//!
//! A user directory holds at most [`MAX_IMAGES_PER_USER`] valid entries,
//! ghosts included. Uploads do not check this. [`ImageStore::gather`] does,
//! and refuses the *whole* directory once the limit is exceeded, so a single
//! stray sixth file hides all five legitimate ones until it is removed.

use crate::approval::ApprovalPolicy;
use crate::codec;
use crate::fingerprint;
use crate::ghost;
use crate::user::{AuthUser, ImageSet, MAX_IMAGES_PER_USER};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("User {0} is not approved")]
    Unauthorized(String),
    #[error("Found {found} images, more than the {max} allowed")]
    CapacityExceeded { found: usize, max: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Name {0:?} cannot be used as a path segment")]
    UnsafeName(String),
    #[error("Internal inconsistency: {0}")]
    Invariant(String),
}

/// A valid entry in a user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Name as stored on disk (`<count>#<name>`).
    pub encoded: String,
    /// Decoded logical filename.
    pub name: String,
    /// Consumed by a draw; excluded from draws and availability counts.
    pub ghosted: bool,
}

/// A user directory directly under the store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDir {
    pub encoded: String,
    pub email: String,
    pub path: PathBuf,
}

/// Handle on an images root directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `email`'s images. The directory may not exist.
    pub fn user_dir(&self, email: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(segment(email)?))
    }

    /// Path of `email`'s image stored under the logical `name`.
    pub fn image_path(&self, email: &str, name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.user_dir(email)?.join(segment(name)?))
    }

    /// Valid entries in `email`'s directory, in listing order.
    pub fn list(&self, email: &str) -> Result<Vec<ImageEntry>, StoreError> {
        Ok(list_entries(&self.user_dir(email)?)?)
    }

    /// Scan `email`'s directory into an [`AuthUser`] snapshot.
    ///
    /// Fails closed: an unapproved user gets [`StoreError::Unauthorized`]
    /// without the directory being read. More than [`MAX_IMAGES_PER_USER`]
    /// valid entries fails the whole scan.
    pub fn gather(
        &self,
        email: &str,
        approval: &dyn ApprovalPolicy,
    ) -> Result<AuthUser, StoreError> {
        if !approval.is_approved(email) {
            return Err(StoreError::Unauthorized(email.to_string()));
        }

        let encoded: Vec<String> = read_names(&self.user_dir(email)?)?
            .into_iter()
            .filter(|name| codec::is_barn_name(name))
            .collect();

        if encoded.len() > MAX_IMAGES_PER_USER {
            return Err(StoreError::CapacityExceeded {
                found: encoded.len(),
                max: MAX_IMAGES_PER_USER,
            });
        }

        let mut images = ImageSet::new();
        for name in encoded {
            let decoded = codec::decode(&name).map_err(|e| {
                StoreError::Invariant(format!("{name:?} passed the filter but failed to decode: {e}"))
            })?;
            images
                .push(decoded)
                .map_err(|full| StoreError::Invariant(format!("image set full at {:?}", full.0)))?;
        }

        Ok(AuthUser::with_images(email, images))
    }

    /// Like [`gather`](Self::gather), but a failed scan yields a user with no
    /// images instead of an error. The failure is logged.
    pub fn auth_user(&self, email: &str, approval: &dyn ApprovalPolicy) -> AuthUser {
        self.gather(email, approval).unwrap_or_else(|e| {
            warn!(email, error = %e, "couldn't gather images");
            AuthUser::new(email)
        })
    }

    /// Create `email`'s directory. Succeeds if it already exists.
    pub fn create(&self, email: &str) -> Result<PathBuf, StoreError> {
        let dir = self.user_dir(email)?;
        create_private_dir(&dir)?;
        info!(email, dir = %dir.display(), "created user directory");
        Ok(dir)
    }

    /// Remove `email`'s directory and everything in it, ghosts included.
    /// Succeeds if it does not exist.
    pub fn delete(&self, email: &str) -> Result<(), StoreError> {
        let dir = self.user_dir(email)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!(email, dir = %dir.display(), "deleted user directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write raw upload bytes under `filename`, creating the user directory
    /// if needed. An existing file of the same name is overwritten.
    pub fn save_upload(
        &self,
        email: &str,
        filename: &str,
        mut contents: impl Read,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.user_dir(email)?;
        create_private_dir(&dir)?;
        let path = dir.join(segment(filename)?);
        let mut file = File::create(&path)?;
        let bytes = io::copy(&mut contents, &mut file)?;
        debug!(email, filename, bytes, "saved raw upload");
        Ok(path)
    }

    /// Permanently remove one of `email`'s images by logical name.
    pub fn remove_image(&self, email: &str, name: &str) -> Result<(), StoreError> {
        fs::remove_file(self.image_path(email, name)?)?;
        Ok(())
    }

    /// Change-detection hash of `email`'s directory; `0` means nothing to
    /// report. See [`fingerprint::fingerprint`].
    pub fn fingerprint(&self, email: &str) -> u32 {
        match self.user_dir(email) {
            Ok(dir) => fingerprint::fingerprint(&dir),
            Err(_) => 0,
        }
    }

    /// Whether `email` has no un-ghosted image left.
    pub fn is_exhausted(&self, email: &str) -> bool {
        match self.user_dir(email) {
            Ok(dir) => ghost::is_directory_exhausted(&dir),
            Err(_) => true,
        }
    }

    /// User directories under the root, in listing order. Loose files and
    /// names that do not decode are skipped.
    pub fn user_dirs(&self) -> Result<Vec<UserDir>, StoreError> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(encoded) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Ok(email) = codec::decode(&encoded) {
                dirs.push(UserDir {
                    path: entry.path(),
                    encoded,
                    email,
                });
            }
        }
        Ok(dirs)
    }
}

/// Encode `raw` and make sure the result is a single, plain path segment.
pub fn segment(raw: &str) -> Result<String, StoreError> {
    let encoded = codec::encode(raw);
    if encoded.contains(['/', '\\', '\0']) {
        return Err(StoreError::UnsafeName(raw.to_string()));
    }
    Ok(encoded)
}

/// Names of all entries in `dir` that are valid UTF-8, in listing order.
pub(crate) fn read_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        if let Some(name) = entry?.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Valid image entries in `dir`, in listing order. Subdirectories are not
/// images and are skipped along with anything that does not decode.
pub fn list_entries(dir: &Path) -> io::Result<Vec<ImageEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let Some(encoded) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if let Ok(name) = codec::decode(&encoded) {
            entries.push(ImageEntry {
                ghosted: ghost::is_ghost(&encoded),
                encoded,
                name,
            });
        }
    }
    Ok(entries)
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovedUsers;
    use crate::test_helpers::{setup_store, write_image, write_raw};

    const ADA: &str = "ada@example.com";

    fn approve_all(_: &str) -> bool {
        true
    }

    #[test]
    fn user_dir_is_encoded_email() {
        let store = ImageStore::new("images");
        assert_eq!(
            store.user_dir(ADA).unwrap(),
            Path::new("images").join("15#ada@example.com")
        );
    }

    #[test]
    fn names_with_separators_are_rejected() {
        let store = ImageStore::new("images");
        assert!(matches!(
            store.image_path(ADA, "../../etc/passwd"),
            Err(StoreError::UnsafeName(_))
        ));
    }

    #[test]
    fn list_skips_non_barn_entries() {
        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp");
        write_raw(&store, ADA, ".DS_Store");
        write_raw(&store, ADA, "5#ab");
        fs::create_dir(store.user_dir(ADA).unwrap().join("3#sub")).unwrap();

        let entries = store.list(ADA).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.webp");
        assert_eq!(entries[0].encoded, "6#a.webp");
        assert!(!entries[0].ghosted);
    }

    #[test]
    fn list_flags_ghosts() {
        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp.ghost");

        let entries = store.list(ADA).unwrap();
        assert!(entries[0].ghosted);
    }

    #[test]
    fn gather_requires_approval() {
        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp");

        let users = ApprovedUsers::new();
        assert!(matches!(
            store.gather(ADA, &users),
            Err(StoreError::Unauthorized(email)) if email == ADA
        ));
    }

    #[test]
    fn gather_returns_decoded_names() {
        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp");
        write_image(&store, ADA, "b.webp.ghost");
        write_raw(&store, ADA, "notes.txt");

        let user = store.gather(ADA, &approve_all).unwrap();
        assert_eq!(user.email(), ADA);
        assert_eq!(user.images.len(), 2);
        assert!(user.images.contains("a.webp"));
        assert!(user.images.contains("b.webp.ghost"));
    }

    #[test]
    fn gather_allows_exactly_max() {
        let (_tmp, store) = setup_store();
        for i in 0..MAX_IMAGES_PER_USER {
            write_image(&store, ADA, &format!("{i}.webp"));
        }
        let user = store.gather(ADA, &approve_all).unwrap();
        assert_eq!(user.images.len(), MAX_IMAGES_PER_USER);
    }

    #[test]
    fn gather_over_capacity_fails_entirely() {
        let (_tmp, store) = setup_store();
        for i in 0..=MAX_IMAGES_PER_USER {
            write_image(&store, ADA, &format!("{i}.webp"));
        }
        assert!(matches!(
            store.gather(ADA, &approve_all),
            Err(StoreError::CapacityExceeded { found: 6, max: 5 })
        ));
    }

    #[test]
    fn gather_missing_dir_is_io_error() {
        let (_tmp, store) = setup_store();
        assert!(matches!(
            store.gather(ADA, &approve_all),
            Err(StoreError::Io(_))
        ));
    }

    #[test]
    fn auth_user_swallows_scan_failures() {
        let (_tmp, store) = setup_store();
        let user = store.auth_user(ADA, &approve_all);
        assert_eq!(user.email(), ADA);
        assert!(user.images.is_empty());
    }

    #[test]
    fn create_and_delete_are_idempotent() {
        let (_tmp, store) = setup_store();
        let dir = store.create(ADA).unwrap();
        store.create(ADA).unwrap();
        assert!(dir.is_dir());

        write_image(&store, ADA, "a.webp");
        store.delete(ADA).unwrap();
        assert!(!dir.exists());
        store.delete(ADA).unwrap();
    }

    #[test]
    fn save_upload_overwrites_same_name() {
        let (_tmp, store) = setup_store();
        store.save_upload(ADA, "a.jpg", &b"first"[..]).unwrap();
        let path = store.save_upload(ADA, "a.jpg", &b"second"[..]).unwrap();

        assert_eq!(path, store.image_path(ADA, "a.jpg").unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(store.list(ADA).unwrap().len(), 1);
    }

    #[test]
    fn remove_image_by_logical_name() {
        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp");
        store.remove_image(ADA, "a.webp").unwrap();
        assert!(store.list(ADA).unwrap().is_empty());
        assert!(store.remove_image(ADA, "a.webp").is_err());
    }

    #[test]
    fn user_dirs_skips_loose_files_and_bad_names() {
        let (tmp, store) = setup_store();
        store.create(ADA).unwrap();
        fs::create_dir(tmp.path().join("images/.cache")).unwrap();
        fs::write(tmp.path().join("images/3#abc"), b"").unwrap();

        let dirs = store.user_dirs().unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].email, ADA);
        assert_eq!(dirs[0].encoded, "15#ada@example.com");
    }
}
