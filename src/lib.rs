//! # Image Barn
//!
//! A per-user image store with draw-once semantics. Approved users upload up
//! to five images each; uploads are shrunk to lossy WebP; a random draw serves
//! one image from anyone's collection and then *ghosts* it so it is never
//! drawn again.
//!
//! The filesystem is the only database:
//!
//! ```text
//! images/
//! ├── 15#ada@example.com/          # <len>#<email>
//! │   ├── 13#sunset.jpg.webp       # <len>#<filename>
//! │   └── 19#dawn.jpg.webp.ghost   # drawn and consumed
//! └── 15#bob@example.com/
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`codec`] | Length-prefixed `<count>#<name>` path segments |
//! | [`user`] | `AuthUser` snapshot and its bounded `ImageSet` |
//! | [`approval`] | Approval predicate and the JSON-backed `ApprovedUsers` registry |
//! | [`store`] | User directories: list, gather, create, delete, save, remove |
//! | [`fingerprint`] | FNV-1a change detector over a directory's names |
//! | [`ghost`] | Marking drawn images consumed, and reading that state back |
//! | [`select`] | Random two-level draw and serve-then-ghost |
//! | [`pool`] | Counting semaphore bounding concurrent transcodes |
//! | [`imaging`] | Backend trait, resize policy, and the `image` + `webp` backend |
//! | [`upload`] | Content-type allow-list and the save → transcode → replace flow |
//! | [`config`] | `imagebarn.toml` loading, env overrides, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## No Index
//!
//! Nothing caches a listing. Every operation reads the directory again, so
//! external tools can add or remove files and the store simply sees the new
//! state. Entries that do not decode as `<count>#<name>` are ignored rather
//! than reported, which keeps `.DS_Store` and editor droppings harmless.
//!
//! ## Ghosts Stay On Disk
//!
//! A drawn image is renamed (or copied) to `<name>.ghost` instead of being
//! deleted. Ghosts still count towards the per-user limit and change the
//! directory fingerprint, but are never drawn again.
//!
//! ## Bounded Transcoding
//!
//! Decoding a phone photo is expensive. All uploads share one
//! [`pool::TranscodePool`]; its width comes from `transcode.workers` or the
//! `IMAGE_WORKERS` environment variable.

pub mod approval;
pub mod codec;
pub mod config;
pub mod fingerprint;
pub mod ghost;
pub mod imaging;
pub mod output;
pub mod pool;
pub mod select;
pub mod store;
pub mod upload;
pub mod user;

#[cfg(test)]
pub(crate) mod test_helpers;
