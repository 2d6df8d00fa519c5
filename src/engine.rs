use serde::{Deserialize, Serialize};

use crate::autocorrect::autocorrect_replacement;
use crate::batch::{prepare_batch, PreparedEdit, PreparedOp};
use crate::normalize::{
    is_empty_payload, restore_first_indent, split_text_lines, strip_boundary_echo,
    strip_leading_echo, strip_trailing_echo,
};
use crate::HashlineError;

/// One edit in a batch, as submitted by the host tool call.
///
/// `pos` and `end` are line-reference strings (`N` or `N#HH`). For `replace`,
/// a missing `end` means a single-line replace at `pos`. For `append` and
/// `prepend`, a missing `pos` means whole-file append/prepend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum HashlineEdit {
    Replace {
        pos: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<String>,
        lines: TextOrLines,
    },
    Append {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pos: Option<String>,
        lines: TextOrLines,
    },
    Prepend {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pos: Option<String>,
        lines: TextOrLines,
    },
}

/// Replacement or insertion text: a single string (split on newlines) or an
/// already-split sequence of lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextOrLines {
    Text(String),
    Lines(Vec<String>),
}

impl TextOrLines {
    /// Normalize to lines. Strings split on `\n` with any `\r` stripped, so
    /// generator line-ending quirks do not leak into file content.
    pub fn to_lines(&self) -> Vec<String> {
        match self {
            TextOrLines::Text(s) => s
                .split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect(),
            TextOrLines::Lines(v) => v.clone(),
        }
    }
}

/// Outcome of applying a batch: the full new content plus bookkeeping on
/// edits that were silently collapsed rather than applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// New file content, lines joined with `\n`; no trailing newline added.
    pub content: String,
    /// Edits whose result was byte-identical to the pre-edit state.
    pub noop_edits: usize,
    /// Duplicate submissions dropped during preprocessing.
    pub deduplicated_edits: usize,
}

/// Apply a batch of hash-anchored edits to `content`.
///
/// Pure function of `(content, edits)`: every reference is validated against
/// the pre-edit snapshot before anything is applied, and any failure aborts
/// the whole batch. Edits are applied bottom-up so earlier applications never
/// shift the line numbers later ones resolve against.
pub fn apply_hashline_edits(
    content: &str,
    edits: &[HashlineEdit],
) -> Result<ApplyReport, HashlineError> {
    let snapshot = split_text_lines(content);
    let (prepared, deduplicated_edits) = prepare_batch(&snapshot, edits)?;

    let mut lines = snapshot;
    let mut noop_edits = 0usize;
    for edit in &prepared {
        if !apply_edit(&mut lines, edit)? {
            noop_edits += 1;
        }
    }

    Ok(ApplyReport {
        content: lines.join("\n"),
        noop_edits,
        deduplicated_edits,
    })
}

/// Apply one edit, returning whether it changed the buffer. A candidate that
/// is element-wise identical to the current buffer is discarded as a no-op.
fn apply_edit(buffer: &mut Vec<String>, edit: &PreparedEdit) -> Result<bool, HashlineError> {
    // An earlier shrinking edit can consume the line a later, lower-anchored
    // edit is anchored at (a point edit inside a replaced span). Such an edit
    // has nothing left to act on; absorb it as a no-op instead of indexing
    // past the buffer.
    if last_touched_line(edit).is_some_and(|line| line > buffer.len()) {
        return Ok(false);
    }

    let candidate = match &edit.op {
        PreparedOp::ReplaceLine { pos } => {
            let idx = pos.line - 1;
            replace_span(buffer, idx, idx, edit.lines.clone())
        }
        PreparedOp::ReplaceRange { pos, end } => {
            if pos.line > end.line {
                return Err(HashlineError::InvalidRange {
                    start: pos.line,
                    end: end.line,
                });
            }
            let (start, stop) = (pos.line - 1, end.line - 1);
            let before = start.checked_sub(1).map(|i| buffer[i].as_str());
            let after = buffer.get(stop + 1).map(String::as_str);
            let payload = strip_boundary_echo(before, after, edit.lines.clone());
            replace_span(buffer, start, stop, payload)
        }
        PreparedOp::InsertAfter { pos } => {
            let idx = pos.line - 1;
            let payload = strip_leading_echo(&buffer[idx], edit.lines.clone());
            insert_at(buffer, idx + 1, payload, edit.batch_index)?
        }
        PreparedOp::InsertBefore { pos } => {
            let idx = pos.line - 1;
            let payload = strip_trailing_echo(&buffer[idx], edit.lines.clone());
            insert_at(buffer, idx, payload, edit.batch_index)?
        }
        PreparedOp::AppendFile => whole_file_insert(buffer, true, edit)?,
        PreparedOp::PrependFile => whole_file_insert(buffer, false, edit)?,
    };

    if candidate == *buffer {
        Ok(false)
    } else {
        *buffer = candidate;
        Ok(true)
    }
}

/// Highest line an edit needs to exist in the current buffer; `None` for
/// whole-file operations, which are position-independent.
fn last_touched_line(edit: &PreparedEdit) -> Option<usize> {
    match &edit.op {
        PreparedOp::ReplaceLine { pos }
        | PreparedOp::InsertAfter { pos }
        | PreparedOp::InsertBefore { pos } => Some(pos.line),
        PreparedOp::ReplaceRange { end, .. } => Some(end.line),
        PreparedOp::AppendFile | PreparedOp::PrependFile => None,
    }
}

/// Replace `buffer[start..=stop]` with an autocorrected payload.
fn replace_span(
    buffer: &[String],
    start: usize,
    stop: usize,
    payload: Vec<String>,
) -> Vec<String> {
    let mut replacement = autocorrect_replacement(&buffer[start..=stop], payload);
    restore_first_indent(&buffer[start], &mut replacement);
    let mut out = buffer.to_vec();
    out.splice(start..=stop, replacement);
    out
}

fn insert_at(
    buffer: &[String],
    at: usize,
    payload: Vec<String>,
    batch_index: usize,
) -> Result<Vec<String>, HashlineError> {
    if is_empty_payload(&payload) {
        return Err(HashlineError::EmptyInsertText { index: batch_index });
    }
    let mut out = buffer.to_vec();
    out.splice(at..at, payload);
    Ok(out)
}

/// Whole-file append/prepend. The sentinel single-empty-line state (an empty
/// file) is replaced outright so it does not survive as a spurious blank line.
fn whole_file_insert(
    buffer: &[String],
    at_end: bool,
    edit: &PreparedEdit,
) -> Result<Vec<String>, HashlineError> {
    if is_empty_payload(&edit.lines) {
        return Err(HashlineError::EmptyInsertText {
            index: edit.batch_index,
        });
    }
    if buffer.len() == 1 && buffer[0].is_empty() {
        return Ok(edit.lines.clone());
    }
    let at = if at_end { buffer.len() } else { 0 };
    let mut out = buffer.to_vec();
    out.splice(at..at, edit.lines.iter().cloned());
    Ok(out)
}
