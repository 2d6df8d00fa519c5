//! Line-splitting and text-shape helpers shared by the applier.

/// Split file content into lines on `\n`, preserving a trailing empty
/// segment so that joining with `\n` reproduces the input byte-for-byte.
/// The empty file splits to `[""]`, the sentinel single-empty-line state.
pub(crate) fn split_text_lines(content: &str) -> Vec<String> {
    content.split('\n').map(|l| l.to_string()).collect()
}

/// Leading whitespace of a line.
pub(crate) fn leading_whitespace(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}

/// Copy the original line's indentation onto the first replacement line when
/// that line changed but arrived with no indentation of its own.
pub(crate) fn restore_first_indent(original: &str, lines: &mut [String]) {
    let Some(first) = lines.first_mut() else {
        return;
    };
    if first.is_empty() || first.starts_with(char::is_whitespace) || first.as_str() == original {
        return;
    }
    let indent = leading_whitespace(original);
    if !indent.is_empty() {
        *first = format!("{indent}{first}");
    }
}

fn echoes(candidate: &str, anchor: &str) -> bool {
    let t = candidate.trim();
    !t.is_empty() && t == anchor.trim()
}

/// Drop a first insertion line that merely repeats the anchor it is being
/// inserted after.
pub(crate) fn strip_leading_echo(anchor: &str, mut lines: Vec<String>) -> Vec<String> {
    if lines.first().is_some_and(|l| echoes(l, anchor)) {
        lines.remove(0);
    }
    lines
}

/// Drop a last insertion line that merely repeats the anchor it is being
/// inserted before.
pub(crate) fn strip_trailing_echo(anchor: &str, mut lines: Vec<String>) -> Vec<String> {
    if lines.last().is_some_and(|l| echoes(l, anchor)) {
        lines.pop();
    }
    lines
}

/// Drop replacement lines that echo the lines immediately outside a replaced
/// range (the line before the start, the line after the end).
pub(crate) fn strip_boundary_echo(
    before: Option<&str>,
    after: Option<&str>,
    mut lines: Vec<String>,
) -> Vec<String> {
    if let Some(b) = before {
        if lines.first().is_some_and(|l| echoes(l, b)) {
            lines.remove(0);
        }
    }
    if let Some(a) = after {
        if lines.last().is_some_and(|l| echoes(l, a)) {
            lines.pop();
        }
    }
    lines
}

/// An insertion payload that carries no text: no lines at all, or the single
/// empty line produced by splitting the empty string.
pub(crate) fn is_empty_payload(lines: &[String]) -> bool {
    lines.is_empty() || (lines.len() == 1 && lines[0].is_empty())
}
