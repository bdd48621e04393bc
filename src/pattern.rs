//! Precompiled placeholder and value recognizers.
//!
//! All patterns are compiled once at first use and shared for the life of the
//! process, so the per-query cost is a scan, never a compilation.
//!
//! ```text
//! SELECT * FROM users WHERE id = :user_id::uuid AND age > :min_age
//!                                ─────┬───┬────           ───┬────
//!                                     │   └── cast suffix (preserved)
//!                                     └── named placeholder
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// Named placeholder: `:identifier`, where the identifier starts with a letter
/// or underscore.
pub static NAMED_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[A-Za-z_][A-Za-z0-9_]*").unwrap());

/// Explicit type cast suffix: `::typename`. Matched so casts are copied
/// through untouched instead of being misread as placeholders.
pub static CAST: Lazy<Regex> = Lazy::new(|| Regex::new(r"::[A-Za-z_][A-Za-z0-9_]*").unwrap());

/// Positional placeholder in the target style: `$1`, `$2`, ...
pub static POSITIONAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([0-9]+)").unwrap());

/// Canonical 8-4-4-4-12 hexadecimal UUID layout, case-insensitive, anchored.
pub static UUID_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

/// Combined scanner used by the translator: a cast suffix (no capture) or a
/// named placeholder (capture 1 holds the bare name). Alternation order makes
/// `::` win over `:`, so `tbl.col::uuid` never yields a placeholder.
pub static SCAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"::[A-Za-z_][A-Za-z0-9_]*|:([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Whether the query text already uses the target positional style.
pub fn is_positional(query: &str) -> bool {
    POSITIONAL.is_match(query)
}

/// Whether the query text contains any named placeholder (casts excluded).
pub fn has_named_params(query: &str) -> bool {
    SCAN.captures_iter(query).any(|c| c.get(1).is_some())
}

/// Whether a string has the canonical UUID layout. A match is a candidate for
/// strict parsing, not a guarantee of validity.
pub fn is_uuid_shaped(s: &str) -> bool {
    UUID_SHAPE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_param_matches() {
        assert!(NAMED_PARAM.is_match("WHERE id = :id"));
        assert!(NAMED_PARAM.is_match(":_private"));
        assert!(!NAMED_PARAM.is_match("WHERE id = $1"));
        assert!(!NAMED_PARAM.is_match(":1abc"));
    }

    #[test]
    fn test_cast_is_not_a_placeholder() {
        let caps: Vec<_> = SCAN
            .captures_iter("SELECT col::text FROM t WHERE id = :id::uuid")
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect();
        assert_eq!(caps, vec!["id"]);
    }

    #[test]
    fn test_positional_detection() {
        assert!(is_positional("SELECT * FROM t WHERE a = $1"));
        assert!(!is_positional("SELECT * FROM t WHERE a = :a"));
    }

    #[test]
    fn test_uuid_shape() {
        assert!(is_uuid_shaped("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_uuid_shaped("550E8400-E29B-41D4-A716-446655440000"));
        assert!(!is_uuid_shaped("550e8400-xyzb-41d4-a716-zzzz55440000"));
        assert!(!is_uuid_shaped("550e8400e29b41d4a716446655440000"));
        assert!(!is_uuid_shaped("not a uuid"));
        // Anchored: no match inside a longer string.
        assert!(!is_uuid_shaped("x550e8400-e29b-41d4-a716-446655440000"));
    }
}
