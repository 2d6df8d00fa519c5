//! Heuristic repair of replacement text whose line segmentation does not
//! match the text it replaces.
//!
//! Text generators routinely merge wrapped lines into one, echo old wrapped
//! segments verbatim, or drop indentation. Each pass here transforms the
//! replacement only on unambiguous evidence and otherwise returns it
//! unchanged; the passes compose in a fixed order.

use std::collections::HashMap;

use crate::normalize::leading_whitespace;

/// Tokens a generator may drop when merging continuation lines; a segment
/// that fails to locate verbatim is retried without its trailing token.
const CONTINUATION_TOKENS: [&str; 8] = ["&&", "||", ",", "+", ".", "(", ":", "="];

/// Maximum replacement span length considered a stale wrap of one original line.
const MAX_WRAP_SPAN: usize = 10;

/// Run the full repair pipeline on a replacement for the given original lines.
pub(crate) fn autocorrect_replacement(original: &[String], replacement: Vec<String>) -> Vec<String> {
    let expanded = expand_merged_line(original, replacement);
    let restored = restore_stale_wraps(original, expanded);
    inherit_indentation(original, restored)
}

/// Re-split a replacement that collapsed a multi-line original into a single
/// line, by locating each trimmed original segment in order inside the
/// merged text. Falls back to `"; "` boundaries when locating fails.
fn expand_merged_line(original: &[String], replacement: Vec<String>) -> Vec<String> {
    if replacement.len() != 1 || original.len() < 2 {
        return replacement;
    }
    let merged = &replacement[0];

    if let Some(pieces) = split_at_segments(merged, original) {
        return pieces;
    }

    // Fallback: statement-per-line code merged with "; ".
    let pieces: Vec<&str> = merged.split("; ").collect();
    if pieces.len() == original.len() {
        let last = pieces.len() - 1;
        return pieces
            .iter()
            .enumerate()
            .map(|(i, p)| if i < last { format!("{p};") } else { p.to_string() })
            .collect();
    }

    replacement
}

fn split_at_segments(merged: &str, original: &[String]) -> Option<Vec<String>> {
    let mut starts = Vec::with_capacity(original.len());
    let mut cursor = 0usize;
    for line in original {
        let segment = line.trim();
        if segment.is_empty() {
            return None;
        }
        let (at, len) = find_from(merged, segment, cursor).or_else(|| {
            strip_continuation(segment).and_then(|s| find_from(merged, s, cursor))
        })?;
        starts.push(at);
        cursor = at + len;
    }
    // Anything before the first segment must be pure indentation.
    if !merged[..starts[0]].trim().is_empty() {
        return None;
    }
    let mut pieces = Vec::with_capacity(starts.len());
    for (i, &s) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(merged.len());
        pieces.push(merged[s..end].trim_end().to_string());
    }
    Some(pieces)
}

fn find_from(haystack: &str, needle: &str, from: usize) -> Option<(usize, usize)> {
    haystack[from..]
        .find(needle)
        .map(|i| (from + i, needle.len()))
}

fn strip_continuation(segment: &str) -> Option<&str> {
    for tok in CONTINUATION_TOKENS {
        if let Some(stripped) = segment.strip_suffix(tok) {
            let stripped = stripped.trim_end();
            if !stripped.is_empty() {
                return Some(stripped);
            }
        }
    }
    None
}

fn canonical(line: &str) -> String {
    line.split_whitespace().collect()
}

/// Collapse contiguous replacement spans that are a re-wrapped copy of
/// exactly one original line back to that original line.
///
/// Only fires when the evidence is unambiguous: the original line's
/// whitespace-insensitive form is unique among the originals, and exactly
/// one replacement span produces it. Matches are applied last-to-first so
/// earlier span indices stay valid.
fn restore_stale_wraps(original: &[String], mut replacement: Vec<String>) -> Vec<String> {
    if replacement.len() < 2 {
        return replacement;
    }

    let mut occurrences: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, line) in original.iter().enumerate() {
        let c = canonical(line);
        if !c.is_empty() {
            occurrences.entry(c).or_default().push(i);
        }
    }
    let unique: HashMap<String, usize> = occurrences
        .into_iter()
        .filter(|(_, idxs)| idxs.len() == 1)
        .map(|(c, idxs)| (c, idxs[0]))
        .collect();
    if unique.is_empty() {
        return replacement;
    }

    // (span start, span length, canonical form)
    let mut candidates: Vec<(usize, usize, String)> = Vec::new();
    for start in 0..replacement.len() {
        let mut canon = canonical(&replacement[start]);
        let max_end = (start + MAX_WRAP_SPAN).min(replacement.len());
        for end in (start + 1)..max_end {
            canon.push_str(&canonical(&replacement[end]));
            if unique.contains_key(&canon) {
                candidates.push((start, end - start + 1, canon.clone()));
            }
        }
    }

    // A canonical form reachable from more than one span is ambiguous.
    let mut span_count: HashMap<String, usize> = HashMap::new();
    for (_, _, c) in &candidates {
        *span_count.entry(c.clone()).or_insert(0) += 1;
    }
    let mut kept: Vec<(usize, usize, String)> = candidates
        .into_iter()
        .filter(|(_, _, c)| span_count[c] == 1)
        .collect();
    kept.sort_by_key(|&(start, _, _)| start);

    let mut limit = replacement.len();
    for (start, len, canon) in kept.into_iter().rev() {
        if start + len > limit {
            continue;
        }
        let line = original[unique[&canon]].clone();
        replacement.splice(start..start + len, std::iter::once(line));
        limit = start;
    }
    replacement
}

/// For 1:1 replacements, copy each original line's indentation onto a
/// changed replacement line that arrived with none of its own.
fn inherit_indentation(original: &[String], mut replacement: Vec<String>) -> Vec<String> {
    if replacement.len() != original.len() {
        return replacement;
    }
    for (line, orig) in replacement.iter_mut().zip(original) {
        if line.is_empty() || line.starts_with(char::is_whitespace) || *line == *orig {
            continue;
        }
        let indent = leading_whitespace(orig);
        if !indent.is_empty() {
            *line = format!("{indent}{line}");
        }
    }
    replacement
}
