use crate::normalize::split_text_lines;

/// The 16-symbol alphabet used for line hash codes.
///
/// Chosen so that codes are visually distinct from hex digits and ordinary
/// identifiers; the same alphabet must be used by anything that annotates
/// file content for an agent, since stale-reference checks recompute hashes
/// from current content rather than storing them.
pub const ALPHABET: &str = "ZPMQVRWSNKTXJBYH";

const FNV_OFFSET: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 16777619;

/// Compute the 2-character hash code for a `(line number, line content)` pair.
///
/// FNV-1a (32-bit) over the UTF-8 content bytes (excluding the line ending),
/// mixed with the 1-based line number, folded to 8 bits and encoded as two
/// symbols from [`ALPHABET`]. Pure and stable: the same pair always yields
/// the same code.
///
/// The code space is 256 values, so two distinct pairs can collide and
/// silently defeat the staleness check. This is an accepted limitation of
/// the compact format, not a failure mode the engine detects.
pub fn line_hash(line_no: usize, content: &str) -> String {
    let mut h = FNV_OFFSET;
    for b in content.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h ^= line_no as u32;
    h = h.wrapping_mul(FNV_PRIME);

    let folded = ((h ^ (h >> 8) ^ (h >> 16) ^ (h >> 24)) & 0xff) as usize;
    let symbols = ALPHABET.as_bytes();
    let mut out = String::with_capacity(2);
    out.push(symbols[folded >> 4] as char);
    out.push(symbols[folded & 0xf] as char);
    out
}

/// Format a line reference as `N#HH` for the given content at that line.
pub fn format_line_ref(line_no: usize, content: &str) -> String {
    format!("{line_no}#{}", line_hash(line_no, content))
}

/// Render content in the annotated `{n}#{hh}|{content}` format, one entry per
/// physical line. This is the format an agent reads hashes from and cites
/// back in edit batches.
pub fn annotate_lines(content: &str) -> String {
    split_text_lines(content)
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}#{}|{}", i + 1, line_hash(i + 1, line), line))
        .collect::<Vec<_>>()
        .join("\n")
}
