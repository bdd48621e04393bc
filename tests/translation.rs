//! End-to-end properties of the translation pipeline, no database required.

use pretty_assertions::assert_eq;

use pgbridge::prelude::*;
use pgbridge::rewrite;

#[test]
fn repeated_placeholder_duplicates_value() {
    let r = rewrite("SELECT * FROM t WHERE a = :x AND b = :x").unwrap();
    assert_eq!(r.sql(), "SELECT * FROM t WHERE a = $1 AND b = $2");

    let values = r.bind(&Bindings::new().bind("x", 5i64)).unwrap();
    assert_eq!(values, vec![Value::Int(5), Value::Int(5)]);
}

#[test]
fn markers_numbered_sequentially_in_occurrence_order() {
    let r = rewrite("UPDATE t SET a = :a, b = :b WHERE id = :id AND a <> :a").unwrap();
    assert_eq!(r.sql(), "UPDATE t SET a = $1, b = $2 WHERE id = $3 AND a <> $4");
    assert_eq!(r.names(), ["a", "b", "id", "a"]);

    let values = r
        .bind(
            &Bindings::new()
                .bind("a", "left")
                .bind("b", "right")
                .bind("id", 9i64),
        )
        .unwrap();
    assert_eq!(values.len(), r.param_count());
    assert_eq!(values[0], values[3]);
}

#[test]
fn positional_query_is_byte_identical() {
    let sql = "SELECT * FROM t WHERE a = $1 AND b = $2 ORDER BY c";
    let r = rewrite(sql).unwrap();
    assert_eq!(r.sql(), sql);
}

#[test]
fn cast_suffix_survives_rewriting() {
    let r = rewrite("SELECT * FROM t WHERE id = :id::uuid AND tag = :tag::text").unwrap();
    assert_eq!(r.sql(), "SELECT * FROM t WHERE id = $1::uuid AND tag = $2::text");
    assert_eq!(r.names(), ["id", "tag"]);
}

#[test]
fn missing_binding_is_a_binding_error() {
    let r = rewrite("SELECT * FROM t WHERE a = :x").unwrap();
    let err = r.bind(&Bindings::new().bind("y", 1i64)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Binding);
    assert_eq!(err.to_string(), "No binding supplied for placeholder ':x'");
}

#[test]
fn uuid_shaped_binding_coerces() {
    let coerced = Value::Text("550e8400-e29b-41d4-a716-446655440000".into()).coerce();
    let Value::Uuid(uuid) = coerced else {
        panic!("expected a UUID");
    };
    assert_eq!(uuid.to_string(), "550e8400-e29b-41d4-a716-446655440000");

    let lookalike = Value::Text("550e8400-xyzb-41d4-a716-zzzz55440000".into());
    assert_eq!(lookalike.clone().coerce(), lookalike);
}

#[test]
fn cold_and_warm_translation_agree() {
    let cache = QueryCache::new(8);
    let sql = "SELECT * FROM t WHERE org = :org AND active = :active";

    let cold = match cache.get(sql) {
        Some(hit) => hit,
        None => {
            let entry = std::sync::Arc::new(rewrite(sql).unwrap());
            cache.put(sql, std::sync::Arc::clone(&entry));
            entry
        }
    };
    let warm = cache.get(sql).expect("second lookup must hit");
    assert_eq!(cold.sql(), warm.sql());
    assert_eq!(cold.names(), warm.names());
}

#[test]
fn placeholder_names_follow_identifier_rules() {
    let r = rewrite("SELECT :_a, :a1, :A_b FROM t").unwrap();
    assert_eq!(r.names(), ["_a", "a1", "A_b"]);
    // ":2fast" is not an identifier, so the colon is left alone.
    let r = rewrite("SELECT ':2fast' FROM t WHERE x = :x").unwrap();
    assert_eq!(r.sql(), "SELECT ':2fast' FROM t WHERE x = $1");
}
