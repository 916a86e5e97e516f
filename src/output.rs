//! CLI output formatting.
//!
//! Output leads with what a thing *is* (owner, logical image name) and keeps
//! on-disk encoded names as indented context lines:
//!
//! ```text
//! ada@example.com (3 images, 1 ghost)
//! 001 sunset.jpg.webp
//!     Stored: 15#sunset.jpg.webp
//! 002 IMG_1.heic (raw)
//!     Stored: 10#IMG_1.heic
//! 003 dawn.jpg.webp (ghost)
//!     Stored: 19#dawn.jpg.webp.ghost
//! ```
//!
//! Each `format_*` function returns `Vec<String>` and is pure; the `print_*`
//! wrappers write to stdout.

use crate::ghost::GHOST_SUFFIX;
use crate::select::DrawnImage;
use crate::store::ImageEntry;
use crate::upload::{Reprocessed, TRANSCODED_SUFFIX};
use crate::user::AuthUser;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// One listing line: index, logical name (ghost suffix stripped), status.
fn entry_line(index: usize, entry: &ImageEntry) -> String {
    let (name, status) = if entry.ghosted {
        (
            entry.name.strip_suffix(GHOST_SUFFIX).unwrap_or(&entry.name),
            Some("ghost"),
        )
    } else if entry.name.ends_with(TRANSCODED_SUFFIX) {
        (entry.name.as_str(), None)
    } else {
        (entry.name.as_str(), Some("raw"))
    };
    match status {
        Some(s) => format!("{} {} ({})", format_index(index), name, s),
        None => format!("{} {}", format_index(index), name),
    }
}

/// Format a user's directory listing.
pub fn format_listing(email: &str, entries: &[ImageEntry]) -> Vec<String> {
    let ghosts = entries.iter().filter(|e| e.ghosted).count();
    let mut header = format!("{} ({}", email, plural(entries.len(), "image"));
    if ghosts > 0 {
        header.push_str(&format!(", {}", plural(ghosts, "ghost")));
    }
    header.push(')');

    let mut lines = vec![header];
    for (i, entry) in entries.iter().enumerate() {
        lines.push(entry_line(i + 1, entry));
        lines.push(format!("{}Stored: {}", indent(1), entry.encoded));
    }
    lines
}

/// Format a gathered snapshot.
pub fn format_user(user: &AuthUser) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        user.email(),
        plural(user.images.len(), "image")
    )];
    for (i, name) in user.images.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), name));
    }
    lines
}

/// Format the result of a draw.
pub fn format_draw(drawn: &DrawnImage) -> Vec<String> {
    vec![
        format!("Drew {} from {}", drawn.draw.name, drawn.draw.email),
        format!("{}Bytes: {}", indent(1), drawn.bytes.len()),
        format!("{}Ghost: {}", indent(1), drawn.ghost_path.display()),
    ]
}

/// Format a fingerprint, spelling out the "nothing to report" value.
pub fn format_fingerprint(email: &str, value: u32) -> String {
    if value == 0 {
        format!("{email}: no images")
    } else {
        format!("{email}: {value}")
    }
}

/// Format the outcome of a reprocess run.
pub fn format_reprocess(results: &[Reprocessed]) -> Vec<String> {
    let mut lines = Vec::new();
    for r in results {
        match &r.result {
            Ok(_) => lines.push(format!("{} {}: converted", r.email, r.name)),
            Err(e) => {
                lines.push(format!("{} {}: failed", r.email, r.name));
                lines.push(format!("{}{}", indent(1), e));
            }
        }
    }
    let ok = results.iter().filter(|r| r.result.is_ok()).count();
    lines.push(format!(
        "Reprocessed {}, {} failed",
        plural(ok, "upload"),
        results.len() - ok
    ));
    lines
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
