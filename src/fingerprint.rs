//! Cheap change detection for a user directory.
//!
//! Clients poll a fingerprint instead of re-listing their images. The value
//! is a 32-bit FNV-1a hash over the concatenated on-disk (still encoded)
//! names of every barn entry, in whatever order the filesystem lists them.
//! Two calls on an unmodified directory agree; nothing more is promised.
//! The value is not portable between filesystems and says nothing about
//! ordering under concurrent writes.
//!
//! `0` means "nothing to report": the directory is missing, unreadable, or
//! holds no valid entries. A real hash landing on zero is indistinguishable
//! and accepted.

use crate::codec;
use crate::store::read_names;
use std::path::Path;
use tracing::debug;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Fingerprint the barn entries of `dir`. Returns `0` when there is nothing
/// to hash.
pub fn fingerprint(dir: &Path) -> u32 {
    let names = match read_names(dir) {
        Ok(names) => names,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "fingerprint: directory unreadable");
            return 0;
        }
    };

    let joined: String = names
        .into_iter()
        .filter(|name| codec::is_barn_name(name))
        .collect();

    if joined.is_empty() {
        return 0;
    }
    fnv1a32(joined.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{setup_store, write_image, write_raw};
    use std::fs;

    const ADA: &str = "ada@example.com";

    #[test]
    fn fnv1a32_reference_values() {
        assert_eq!(fnv1a32(b""), 0x811c9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn missing_directory_is_zero() {
        let (tmp, _store) = setup_store();
        assert_eq!(fingerprint(&tmp.path().join("nope")), 0);
    }

    #[test]
    fn file_instead_of_directory_is_zero() {
        let (tmp, _store) = setup_store();
        let file = tmp.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert_eq!(fingerprint(&file), 0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_zero() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp");
        let dir = store.user_dir(ADA).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores permission bits; only assert when the read really fails
        let readable = fs::read_dir(&dir).is_ok();
        let value = fingerprint(&dir);
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700)).unwrap();
        if !readable {
            assert_eq!(value, 0);
        }
    }

    #[test]
    fn only_invalid_entries_is_zero() {
        let (_tmp, store) = setup_store();
        write_raw(&store, ADA, ".DS_Store");
        write_raw(&store, ADA, "9#short");
        assert_eq!(fingerprint(&store.user_dir(ADA).unwrap()), 0);
    }

    #[test]
    fn single_entry_hashes_encoded_name() {
        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp");
        write_raw(&store, ADA, "ignored.tmp");
        assert_eq!(
            fingerprint(&store.user_dir(ADA).unwrap()),
            fnv1a32(b"6#a.webp")
        );
    }

    #[test]
    fn stable_for_unmodified_directory() {
        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp");
        write_image(&store, ADA, "b.webp");
        write_image(&store, ADA, "c.webp.ghost");

        let dir = store.user_dir(ADA).unwrap();
        let first = fingerprint(&dir);
        assert_ne!(first, 0);
        assert_eq!(fingerprint(&dir), first);
    }

    #[test]
    fn changes_when_an_image_is_added() {
        let (_tmp, store) = setup_store();
        write_image(&store, ADA, "a.webp");
        let before = store.fingerprint(ADA);

        write_image(&store, ADA, "b.webp");
        assert_ne!(store.fingerprint(ADA), before);
    }
}
