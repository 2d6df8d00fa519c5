use std::sync::OnceLock;

use regex::Regex;

use crate::hash::{line_hash, ALPHABET};
use crate::HashlineError;

/// A parsed line reference: a 1-based line number, optionally anchored to a
/// specific version of that line by a 2-character content hash.
///
/// References without a hash pass validation on line-number bounds alone,
/// forfeiting the staleness guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRef {
    pub line: usize,
    pub hash: Option<String>,
}

static LINE_REF_RE: OnceLock<Regex> = OnceLock::new();

fn line_ref_re() -> &'static Regex {
    // The hash alphabet contains no regex metacharacters, so it can be
    // spliced into the character class as-is.
    LINE_REF_RE.get_or_init(|| {
        Regex::new(&format!(r"^([0-9]+)(?:#([{ALPHABET}]{{2}}))?$"))
            .expect("line reference pattern")
    })
}

/// Parse a reference of the form `N` or `N#HH`.
///
/// Any other shape (empty string, whitespace, lowercase or non-alphabet hash
/// symbols, wrong hash length) is rejected.
pub fn parse_line_ref(reference: &str) -> Result<LineRef, HashlineError> {
    let invalid = || HashlineError::InvalidLineRefFormat {
        reference: reference.to_string(),
    };
    let caps = line_ref_re().captures(reference).ok_or_else(invalid)?;
    let line: usize = caps[1].parse().map_err(|_| invalid())?;
    Ok(LineRef {
        line,
        hash: caps.get(2).map(|m| m.as_str().to_string()),
    })
}

/// Check a parsed reference against the current file lines.
///
/// Bounds are checked first; if the reference cites a hash, the hash of the
/// current content at that line is recomputed and compared.
pub fn validate_line_ref(lines: &[String], reference: &LineRef) -> Result<(), HashlineError> {
    if reference.line < 1 || reference.line > lines.len() {
        return Err(HashlineError::LineOutOfRange {
            line: reference.line,
            len: lines.len(),
        });
    }
    if let Some(cited) = &reference.hash {
        let actual = line_hash(reference.line, &lines[reference.line - 1]);
        if *cited != actual {
            return Err(HashlineError::StaleLineReference {
                line: reference.line,
                cited: cited.clone(),
                actual,
            });
        }
    }
    Ok(())
}

/// Validate every reference in a batch against the same pre-edit snapshot,
/// failing on the first violation.
pub fn validate_line_refs<'a>(
    lines: &[String],
    refs: impl IntoIterator<Item = &'a LineRef>,
) -> Result<(), HashlineError> {
    for r in refs {
        validate_line_ref(lines, r)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::format_line_ref;

    fn lines(content: &[&str]) -> Vec<String> {
        content.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_bare_line_number() {
        let r = parse_line_ref("42").unwrap();
        assert_eq!(r, LineRef { line: 42, hash: None });
    }

    #[test]
    fn parse_hashed_reference() {
        let r = parse_line_ref("7#QK").unwrap();
        assert_eq!(r.line, 7);
        assert_eq!(r.hash.as_deref(), Some("QK"));
    }

    #[test]
    fn every_alphabet_symbol_parses_in_a_hash() {
        for c in ALPHABET.chars() {
            let r = parse_line_ref(&format!("1#{c}{c}")).unwrap();
            assert_eq!(r.hash.as_deref(), Some(format!("{c}{c}").as_str()));
        }
    }

    #[test]
    fn parse_rejects_malformed_shapes() {
        for bad in ["", " 3", "3 ", "3#", "3#Q", "3#QKX", "3#qk", "3#AA", "#QK", "3.5", "-1"] {
            let err = parse_line_ref(bad).unwrap_err();
            assert!(
                matches!(err, HashlineError::InvalidLineRefFormat { .. }),
                "{bad:?} -> {err:?}"
            );
        }
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let ls = lines(&["a", "b"]);
        let err = validate_line_ref(&ls, &parse_line_ref("3").unwrap()).unwrap_err();
        assert_eq!(err, HashlineError::LineOutOfRange { line: 3, len: 2 });
        let err = validate_line_ref(&ls, &parse_line_ref("0").unwrap()).unwrap_err();
        assert_eq!(err, HashlineError::LineOutOfRange { line: 0, len: 2 });
    }

    #[test]
    fn validate_accepts_current_hash() {
        let ls = lines(&["alpha", "beta"]);
        let r = parse_line_ref(&format_line_ref(2, "beta")).unwrap();
        assert!(validate_line_ref(&ls, &r).is_ok());
    }

    #[test]
    fn validate_rejects_stale_hash() {
        let ls = lines(&["alpha", "beta"]);
        // Pick a code guaranteed to differ from the current one.
        let actual = line_hash(2, "beta");
        let stale = if actual == "ZZ" { "PP" } else { "ZZ" };
        let r = parse_line_ref(&format!("2#{stale}")).unwrap();
        let err = validate_line_ref(&ls, &r).unwrap_err();
        assert!(matches!(err, HashlineError::StaleLineReference { line: 2, .. }));
    }

    #[test]
    fn validate_hashless_passes_on_bounds_alone() {
        let ls = lines(&["alpha"]);
        assert!(validate_line_ref(&ls, &parse_line_ref("1").unwrap()).is_ok());
    }

    #[test]
    fn validate_refs_reports_first_failure() {
        let ls = lines(&["a", "b"]);
        let good = parse_line_ref("1").unwrap();
        let bad = parse_line_ref("9").unwrap();
        let err = validate_line_refs(&ls, [&good, &bad, &good]).unwrap_err();
        assert_eq!(err, HashlineError::LineOutOfRange { line: 9, len: 2 });
    }
}
