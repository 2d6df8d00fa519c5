//! hashline — hash-anchored line editing.
//!
//! Lets an automated agent edit a text file without re-reading it first: every
//! line the agent observes is tagged with a short content hash, and edits cite
//! that hash back. An edit whose cited hash no longer matches the current line
//! is rejected, so a file that changed since it was observed is never silently
//! corrupted.
//!
//! The engine is a pure function of `(current content, edit batch)`: no state
//! survives a call, and a batch either applies completely or fails before any
//! of it is applied.

mod autocorrect;
mod batch;
mod engine;
mod hash;
mod normalize;
mod parse;

pub use engine::{apply_hashline_edits, ApplyReport, HashlineEdit, TextOrLines};
pub use hash::{annotate_lines, format_line_ref, line_hash, ALPHABET};
pub use parse::{parse_line_ref, validate_line_ref, validate_line_refs, LineRef};

use thiserror::Error;

/// Everything that can go wrong while validating or applying an edit batch.
///
/// All variants are detected before any part of the batch takes effect; a
/// failing batch never partially applies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashlineError {
    #[error("invalid line reference {reference:?}: expected \"N\" or \"N#HH\"")]
    InvalidLineRefFormat { reference: String },

    #[error("line {line} is out of range: file has {len} line(s)")]
    LineOutOfRange { line: usize, len: usize },

    /// The cited hash no longer matches current content: the file changed
    /// since it was observed. The caller should re-read and resubmit.
    #[error("stale reference {line}#{cited}: line {line} now hashes to {actual}")]
    StaleLineReference {
        line: usize,
        cited: String,
        actual: String,
    },

    #[error("invalid range: start line {start} is past end line {end}")]
    InvalidRange { start: usize, end: usize },

    #[error(
        "edit {first} (lines {first_start}-{first_end}) overlaps edit {second} \
         (lines {second_start}-{second_end})"
    )]
    OverlappingRangeEdits {
        first: usize,
        first_start: usize,
        first_end: usize,
        second: usize,
        second_start: usize,
        second_end: usize,
    },

    #[error("edit {index} has no text to insert")]
    EmptyInsertText { index: usize },
}
