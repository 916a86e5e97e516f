//! Length-prefixed name encoding for everything that touches the filesystem.
//!
//! Emails and upload filenames are user-supplied strings, so they never reach
//! a path directly. Each one is stored as `<count>#<text>`, where `count` is
//! the number of Unicode scalar values in `text`:
//!
//! - `""` → `0#`
//! - `"#"` → `1##`
//! - `"cat.jpg"` → `7#cat.jpg`
//!
//! A directory entry is a *barn name* exactly when [`decode`] accepts it.
//! There is no separate syntactic check; listings filter with [`is_barn_name`]
//! and silently skip everything else (dotfiles, stray uploads, editor swap
//! files).
//!
//! Decoding reads at most `count` characters after the marker. Anything past
//! that is dropped, including further `#` characters, so `3#abcd` decodes to
//! `abc`.

use thiserror::Error;

/// Separator between the declared length and the stored text.
pub const MARKER: char = '#';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed name header: {0}")]
    Format(String),
    #[error("Length mismatch: expected {expected} characters, but got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Encode a raw string as `<char count>#<raw>`. Never fails.
pub fn encode(raw: &str) -> String {
    format!("{}{}{}", raw.chars().count(), MARKER, raw)
}

/// Decode a barn name back to the raw string it was built from.
///
/// Fails with [`DecodeError::Format`] when the marker is missing or the prefix
/// is not a non-negative integer, and with [`DecodeError::LengthMismatch`]
/// when fewer characters follow the marker than were declared.
pub fn decode(encoded: &str) -> Result<String, DecodeError> {
    let (marker_idx, declared) = parse_header(encoded)?;
    let text = &encoded[marker_idx + MARKER.len_utf8()..];

    let end = match text.char_indices().nth(declared) {
        Some((byte_idx, _)) => byte_idx,
        None => {
            let actual = text.chars().count();
            if actual < declared {
                return Err(DecodeError::LengthMismatch {
                    expected: declared,
                    actual,
                });
            }
            text.len()
        }
    };

    Ok(text[..end].to_string())
}

/// Whether `name` follows the encoding, i.e. whether [`decode`] would succeed.
pub fn is_barn_name(name: &str) -> bool {
    decode(name).is_ok()
}

/// Returns the byte index of the marker and the declared character count.
fn parse_header(encoded: &str) -> Result<(usize, usize), DecodeError> {
    let marker_idx = encoded
        .find(MARKER)
        .ok_or_else(|| DecodeError::Format(format!("no '{MARKER}' marker in {encoded:?}")))?;

    let prefix = &encoded[..marker_idx];
    let declared = prefix.parse::<usize>().map_err(|e| {
        DecodeError::Format(format!("could not read length {prefix:?} as an integer: {e}"))
    })?;

    Ok((marker_idx, declared))
}
