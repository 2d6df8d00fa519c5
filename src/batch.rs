//! Edit batch preprocessing: deduplication, reference collection and
//! validation, overlap detection, and numbering-stable apply ordering.

use std::collections::HashSet;

use crate::engine::HashlineEdit;
use crate::parse::{parse_line_ref, validate_line_refs, LineRef};
use crate::HashlineError;

/// One surviving edit with its references parsed and its payload normalized
/// to lines, ready for the applier.
#[derive(Debug, Clone)]
pub(crate) struct PreparedEdit {
    /// 1-based position in the submitted batch, kept for error reporting.
    pub batch_index: usize,
    pub op: PreparedOp,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum PreparedOp {
    ReplaceLine { pos: LineRef },
    ReplaceRange { pos: LineRef, end: LineRef },
    InsertAfter { pos: LineRef },
    InsertBefore { pos: LineRef },
    AppendFile,
    PrependFile,
}

impl PreparedEdit {
    fn refs(&self) -> impl Iterator<Item = &LineRef> {
        use PreparedOp::*;
        let (a, b) = match &self.op {
            ReplaceRange { pos, end } => (Some(pos), Some(end)),
            ReplaceLine { pos } | InsertAfter { pos } | InsertBefore { pos } => (Some(pos), None),
            AppendFile | PrependFile => (None, None),
        };
        a.into_iter().chain(b)
    }

    /// The line this edit is anchored at for ordering purposes. Whole-file
    /// append sits at the bottom of the file, whole-file prepend at the top.
    fn anchor_line(&self) -> usize {
        use PreparedOp::*;
        match &self.op {
            ReplaceLine { pos } => pos.line,
            ReplaceRange { end, .. } => end.line,
            InsertAfter { pos } => pos.line,
            InsertBefore { pos } => pos.line,
            AppendFile => usize::MAX,
            PrependFile => 0,
        }
    }

    /// Replace-type edits at an anchor line execute before insertions there.
    fn op_rank(&self) -> u8 {
        use PreparedOp::*;
        match &self.op {
            ReplaceLine { .. } | ReplaceRange { .. } => 0,
            InsertAfter { .. } | AppendFile => 1,
            InsertBefore { .. } | PrependFile => 2,
        }
    }
}

/// Preprocess a submitted batch against the pre-edit snapshot.
///
/// Returns the surviving edits in apply order (descending anchor line, so
/// applying one edit never shifts the lines a later edit still resolves
/// against) plus the number of dropped duplicates. All references are
/// validated here, against the snapshot only; nothing is validated against
/// intermediate states.
pub(crate) fn prepare_batch(
    snapshot: &[String],
    edits: &[HashlineEdit],
) -> Result<(Vec<PreparedEdit>, usize), HashlineError> {
    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(edits.len());
    let mut deduplicated = 0usize;

    for (i, edit) in edits.iter().enumerate() {
        if !seen.insert(dedup_key(edit)) {
            deduplicated += 1;
            continue;
        }
        prepared.push(prepare_edit(i + 1, edit)?);
    }

    validate_line_refs(snapshot, prepared.iter().flat_map(PreparedEdit::refs))?;
    check_range_overlaps(&prepared)?;

    prepared.sort_by(|a, b| {
        b.anchor_line()
            .cmp(&a.anchor_line())
            .then(a.op_rank().cmp(&b.op_rank()))
            .then(a.batch_index.cmp(&b.batch_index))
    });

    Ok((prepared, deduplicated))
}

/// Normalized identity of an edit: operation, anchors, and payload with
/// line-ending differences collapsed, so a string and its split-line form
/// deduplicate against each other. Anchors stay `Option` so an absent
/// reference never collapses with a present-but-empty one, which must still
/// reach the parser and fail there.
fn dedup_key(edit: &HashlineEdit) -> (u8, Option<String>, Option<String>, String) {
    match edit {
        HashlineEdit::Replace { pos, end, lines } => (
            0,
            Some(pos.clone()),
            end.clone(),
            lines.to_lines().join("\n"),
        ),
        HashlineEdit::Append { pos, lines } => (1, pos.clone(), None, lines.to_lines().join("\n")),
        HashlineEdit::Prepend { pos, lines } => (2, pos.clone(), None, lines.to_lines().join("\n")),
    }
}

fn prepare_edit(batch_index: usize, edit: &HashlineEdit) -> Result<PreparedEdit, HashlineError> {
    let (op, lines) = match edit {
        HashlineEdit::Replace { pos, end, lines } => {
            let pos = parse_line_ref(pos)?;
            let op = match end {
                Some(end) => PreparedOp::ReplaceRange {
                    pos,
                    end: parse_line_ref(end)?,
                },
                None => PreparedOp::ReplaceLine { pos },
            };
            (op, lines.to_lines())
        }
        HashlineEdit::Append { pos, lines } => {
            let op = match pos {
                Some(p) => PreparedOp::InsertAfter {
                    pos: parse_line_ref(p)?,
                },
                None => PreparedOp::AppendFile,
            };
            (op, lines.to_lines())
        }
        HashlineEdit::Prepend { pos, lines } => {
            let op = match pos {
                Some(p) => PreparedOp::InsertBefore {
                    pos: parse_line_ref(p)?,
                },
                None => PreparedOp::PrependFile,
            };
            (op, lines.to_lines())
        }
    };
    Ok(PreparedEdit {
        batch_index,
        op,
        lines,
    })
}

/// Only ranged replaces participate: build inclusive intervals, sort, and
/// reject any pair that touches or overlaps. Point replaces and insertions
/// never conflict by this check.
fn check_range_overlaps(prepared: &[PreparedEdit]) -> Result<(), HashlineError> {
    let mut intervals: Vec<(usize, usize, usize)> = Vec::new();
    for p in prepared {
        if let PreparedOp::ReplaceRange { pos, end } = &p.op {
            if pos.line > end.line {
                return Err(HashlineError::InvalidRange {
                    start: pos.line,
                    end: end.line,
                });
            }
            intervals.push((pos.line, end.line, p.batch_index));
        }
    }
    intervals.sort_unstable();
    for w in intervals.windows(2) {
        let (prev, next) = (w[0], w[1]);
        if next.0 <= prev.1 {
            return Err(HashlineError::OverlappingRangeEdits {
                first: prev.2,
                first_start: prev.0,
                first_end: prev.1,
                second: next.2,
                second_start: next.0,
                second_end: next.1,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TextOrLines;
    use crate::hash::format_line_ref;

    fn snapshot(content: &[&str]) -> Vec<String> {
        content.iter().map(|s| s.to_string()).collect()
    }

    fn replace(pos: &str, end: Option<&str>, text: &str) -> HashlineEdit {
        HashlineEdit::Replace {
            pos: pos.to_string(),
            end: end.map(|s| s.to_string()),
            lines: TextOrLines::Text(text.to_string()),
        }
    }

    #[test]
    fn duplicate_edits_collapse_to_first() {
        let snap = snapshot(&["a", "b", "c"]);
        let e = replace("2", None, "B");
        let (prepared, deduplicated) = prepare_batch(&snap, &[e.clone(), e]).unwrap();
        assert_eq!(prepared.len(), 1);
        assert_eq!(deduplicated, 1);
        assert_eq!(prepared[0].batch_index, 1);
    }

    #[test]
    fn string_and_split_payloads_deduplicate() {
        let snap = snapshot(&["a", "b", "c"]);
        let as_text = replace("2", None, "x\ny");
        let as_lines = HashlineEdit::Replace {
            pos: "2".to_string(),
            end: None,
            lines: TextOrLines::Lines(vec!["x".to_string(), "y".to_string()]),
        };
        let (prepared, deduplicated) = prepare_batch(&snap, &[as_text, as_lines]).unwrap();
        assert_eq!(prepared.len(), 1);
        assert_eq!(deduplicated, 1);
    }

    #[test]
    fn empty_reference_is_not_mistaken_for_whole_file_insert() {
        let snap = snapshot(&["a"]);
        let batch = vec![
            HashlineEdit::Append {
                pos: None,
                lines: TextOrLines::Text("x".to_string()),
            },
            HashlineEdit::Append {
                pos: Some(String::new()),
                lines: TextOrLines::Text("x".to_string()),
            },
        ];
        let err = prepare_batch(&snap, &batch).unwrap_err();
        assert_eq!(
            err,
            HashlineError::InvalidLineRefFormat {
                reference: String::new(),
            }
        );
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let snap = snapshot(&["a", "b", "c", "d", "e"]);
        let err = prepare_batch(
            &snap,
            &[replace("2", Some("4"), "x"), replace("3", Some("5"), "y")],
        )
        .unwrap_err();
        assert_eq!(
            err,
            HashlineError::OverlappingRangeEdits {
                first: 1,
                first_start: 2,
                first_end: 4,
                second: 2,
                second_start: 3,
                second_end: 5,
            }
        );
    }

    #[test]
    fn touching_ranges_are_rejected() {
        let snap = snapshot(&["a", "b", "c", "d"]);
        let err = prepare_batch(
            &snap,
            &[replace("1", Some("2"), "x"), replace("2", Some("3"), "y")],
        )
        .unwrap_err();
        assert!(matches!(err, HashlineError::OverlappingRangeEdits { .. }));
    }

    #[test]
    fn adjacent_ranges_are_allowed() {
        let snap = snapshot(&["a", "b", "c", "d", "e"]);
        let (prepared, _) = prepare_batch(
            &snap,
            &[replace("2", Some("3"), "x"), replace("4", Some("5"), "y")],
        )
        .unwrap();
        assert_eq!(prepared.len(), 2);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let snap = snapshot(&["a", "b", "c"]);
        let err = prepare_batch(&snap, &[replace("3", Some("1"), "x")]).unwrap_err();
        assert_eq!(err, HashlineError::InvalidRange { start: 3, end: 1 });
    }

    #[test]
    fn references_validated_against_snapshot() {
        let snap = snapshot(&["a", "b"]);
        let stale_ref = {
            let actual = crate::line_hash(1, "a");
            let code = if actual == "ZZ" { "PP" } else { "ZZ" };
            format!("1#{code}")
        };
        let err = prepare_batch(&snap, &[replace(&stale_ref, None, "x")]).unwrap_err();
        assert!(matches!(err, HashlineError::StaleLineReference { line: 1, .. }));

        let good = format_line_ref(1, "a");
        assert!(prepare_batch(&snap, &[replace(&good, None, "x")]).is_ok());
    }

    #[test]
    fn apply_order_is_bottom_up_with_op_precedence() {
        let snap = snapshot(&["a", "b", "c", "d"]);
        let batch = vec![
            HashlineEdit::Prepend {
                pos: None,
                lines: TextOrLines::Text("top".to_string()),
            },
            HashlineEdit::Append {
                pos: Some("2".to_string()),
                lines: TextOrLines::Text("after-2".to_string()),
            },
            replace("2", None, "B"),
            HashlineEdit::Append {
                pos: None,
                lines: TextOrLines::Text("bottom".to_string()),
            },
            replace("4", None, "D"),
        ];
        let (prepared, _) = prepare_batch(&snap, &batch).unwrap();
        let order: Vec<usize> = prepared.iter().map(|p| p.batch_index).collect();
        // Whole-file append first (bottom), then line 4, then the two edits
        // at line 2 with replace before insert, then whole-file prepend (top).
        assert_eq!(order, vec![4, 5, 3, 2, 1]);
    }
}
