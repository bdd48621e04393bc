//! Named-placeholder to positional-placeholder rewriting.
//!
//! Converts query text in the source style (`:name`, optionally suffixed with
//! a `::typename` cast) into the target positional style (`$1`, `$2`, ...),
//! recording the occurrence order of placeholder names so values can be bound
//! per call.
//!
//! ```text
//! SELECT * FROM t WHERE a = :x AND b = :x AND c = :y::uuid
//!                           ─┬─         ─┬─        ─┬─
//!                            $1          $2         $3::uuid
//! names: ["x", "x", "y"]
//! ```
//!
//! The scan is regex-based and does not understand string literals or
//! comments; placeholder-shaped text inside either will be rewritten. This
//! limitation is inherent to the design and deliberately not papered over.

use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::error::{BridgeError, BridgeResult};
use crate::pattern;
use crate::value::Value;

/// The cacheable product of rewriting one query text: the positional SQL and
/// the occurrence-ordered placeholder names. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    sql: String,
    names: Vec<String>,
}

impl Rewritten {
    /// The query text in the target positional style.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in occurrence order, one entry per marker. Repeated
    /// names appear once per occurrence.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of positional markers in the rewritten text.
    pub fn param_count(&self) -> usize {
        self.names.len()
    }

    /// Resolve this query's placeholder names against a bindings mapping,
    /// producing the ordered value list the driver expects.
    ///
    /// Fails with [`BridgeError::MissingBinding`] on the first name that has
    /// no entry; nothing is executed in that case.
    pub fn bind(&self, bindings: &Bindings) -> BridgeResult<Vec<Value>> {
        self.names
            .iter()
            .map(|name| {
                bindings
                    .get(name)
                    .cloned()
                    .ok_or_else(|| BridgeError::missing(name.clone()))
            })
            .collect()
    }
}

/// A mapping from placeholder name to value, as supplied by the caller.
///
/// Positional callers are supported by keying values with their 1-based
/// position rendered in decimal, matching the `$N` markers of an
/// already-positional query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    map: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered value list: the i-th value is keyed `"i"`
    /// (1-based), the key form used by positional queries.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let map = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), v.into()))
            .collect();
        Self { map }
    }

    /// Add a named binding, builder-style.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.map.insert(name.into(), value.into());
        self
    }

    /// Add a named binding in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.map.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Rewrite query text from the named style into the positional style.
///
/// Deterministic: the same input always produces the same output text and the
/// same name ordering. Text already in positional form is returned unchanged,
/// with names derived from its `$N` markers in numeric order.
pub fn rewrite(query: &str) -> BridgeResult<Rewritten> {
    if pattern::is_positional(query) {
        if pattern::has_named_params(query) {
            // Renumbering the named markers would collide with the existing
            // positional ones, so mixed-style text is rejected outright. The
            // position comes from the scanner's placeholder capture so a cast
            // suffix earlier in the text cannot be mistaken for the culprit.
            let pos = pattern::SCAN
                .captures_iter(query)
                .find_map(|c| c.get(1).map(|m| m.start() - 1))
                .unwrap_or(0);
            return Err(BridgeError::translation(
                pos,
                "query mixes named and positional placeholders",
            ));
        }
        return Ok(Rewritten {
            sql: query.to_string(),
            names: positional_names(query),
        });
    }

    let mut sql = String::with_capacity(query.len());
    let mut names = Vec::new();
    let mut last = 0;

    for caps in pattern::SCAN.captures_iter(query) {
        let whole = caps.get(0).unwrap();
        sql.push_str(&query[last..whole.start()]);

        match caps.get(1) {
            // Named placeholder: emit the next positional marker.
            Some(name) => {
                names.push(name.as_str().to_string());
                sql.push('$');
                sql.push_str(&names.len().to_string());
            }
            // Cast suffix: copy through verbatim.
            None => sql.push_str(whole.as_str()),
        }

        last = whole.end();
    }
    sql.push_str(&query[last..]);

    Ok(Rewritten { sql, names })
}

/// Distinct `$N` markers of a positional query, as decimal strings in
/// ascending numeric order. This is the declaration order of its values.
fn positional_names(query: &str) -> Vec<String> {
    let positions: BTreeSet<usize> = pattern::POSITIONAL
        .captures_iter(query)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    positions.into_iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_placeholder() {
        let r = rewrite("SELECT * FROM t WHERE id = :id").unwrap();
        assert_eq!(r.sql(), "SELECT * FROM t WHERE id = $1");
        assert_eq!(r.names(), ["id"]);
    }

    #[test]
    fn test_repeated_placeholder_gets_two_markers() {
        let r = rewrite("SELECT * FROM t WHERE a = :x AND b = :x").unwrap();
        assert_eq!(r.sql(), "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(r.names(), ["x", "x"]);

        let bindings = Bindings::new().bind("x", 5i64);
        let values = r.bind(&bindings).unwrap();
        assert_eq!(values, vec![Value::Int(5), Value::Int(5)]);
    }

    #[test]
    fn test_cast_preserved() {
        let r = rewrite("SELECT * FROM t WHERE id = :id::uuid").unwrap();
        assert_eq!(r.sql(), "SELECT * FROM t WHERE id = $1::uuid");
        assert_eq!(r.names(), ["id"]);
    }

    #[test]
    fn test_column_cast_untouched() {
        let r = rewrite("SELECT created_at::date FROM t WHERE id = :id").unwrap();
        assert_eq!(r.sql(), "SELECT created_at::date FROM t WHERE id = $1");
        assert_eq!(r.names(), ["id"]);
    }

    #[test]
    fn test_already_positional_is_noop() {
        let sql = "SELECT * FROM t WHERE a = $1 AND b = $2";
        let r = rewrite(sql).unwrap();
        assert_eq!(r.sql(), sql);
        assert_eq!(r.names(), ["1", "2"]);
    }

    #[test]
    fn test_no_placeholders() {
        let r = rewrite("SELECT 1").unwrap();
        assert_eq!(r.sql(), "SELECT 1");
        assert!(r.names().is_empty());
    }

    #[test]
    fn test_missing_binding() {
        let r = rewrite("SELECT * FROM t WHERE a = :x").unwrap();
        let err = r.bind(&Bindings::new()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::BridgeError::MissingBinding { ref name } if name == "x"
        ));
    }

    #[test]
    fn test_idempotent_rewrite() {
        let sql = "UPDATE t SET a = :a, b = :b WHERE id = :id";
        let first = rewrite(sql).unwrap();
        let second = rewrite(sql).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_positional_bindings() {
        let r = rewrite("SELECT * FROM t WHERE a = $1 AND b = $2").unwrap();
        let values = r.bind(&Bindings::positional([1i64, 2i64])).unwrap();
        assert_eq!(values, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_mixed_styles_rejected() {
        let err = rewrite("SELECT * FROM t WHERE a = $1 AND b = :x").unwrap_err();
        assert!(matches!(
            err,
            crate::error::BridgeError::Translation { .. }
        ));
    }

    #[test]
    fn test_mixed_style_error_position_skips_casts() {
        // The cast's ":uuid" tail must not be reported as the offender.
        let query = "SELECT a::uuid FROM t WHERE b = $1 AND c = :x";
        let err = rewrite(query).unwrap_err();
        let crate::error::BridgeError::Translation { position, .. } = err else {
            panic!("expected a translation error");
        };
        assert_eq!(position, query.find(":x").unwrap());
    }

    #[test]
    fn test_marker_numbering_is_sequential() {
        let r = rewrite("INSERT INTO t (a, b, c) VALUES (:a, :b, :c)").unwrap();
        assert_eq!(r.sql(), "INSERT INTO t (a, b, c) VALUES ($1, $2, $3)");
        assert_eq!(r.param_count(), 3);
    }
}
