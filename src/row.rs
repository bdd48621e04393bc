//! Result-set materialization.
//!
//! Converts the driver's row representation into the caller-facing shape in a
//! single pass, decoding each cell straight into a [`Value`]. Column metadata
//! is captured once per result set and shared by every row.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::value::Value;

/// Name and reported type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
}

/// One materialized row: decoded cells plus a handle to the shared column
/// metadata for by-name access.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<ColumnInfo>>,
    values: Vec<Value>,
}

impl Row {
    /// Cell by position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Cell by column name (first match wins on duplicate names).
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        self.values.get(index)
    }

    /// All cells in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A fully materialized query result, iterable row by row.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    columns: Arc<Vec<ColumnInfo>>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Materialize the driver's rows. Each driver row is visited exactly once
    /// and decoded directly into its final shape.
    pub fn from_rows(pg_rows: &[PgRow]) -> Self {
        let columns: Arc<Vec<ColumnInfo>> = Arc::new(
            pg_rows
                .first()
                .map(|row| {
                    row.columns()
                        .iter()
                        .map(|c| ColumnInfo {
                            name: c.name().to_string(),
                            type_name: c.type_info().name().to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        );

        let rows = pg_rows
            .iter()
            .map(|pg_row| Row {
                columns: Arc::clone(&columns),
                values: decode_row(pg_row),
            })
            .collect();

        Self { columns, rows }
    }

    /// Column metadata, DBAPI-description style.
    pub fn description(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Number of materialized rows.
    pub fn rowcount(&self) -> usize {
        self.rows.len()
    }

    /// The first row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Decode every cell of one driver row, dispatching on the reported Postgres
/// type name. Unknown types fall back to their text rendering.
fn decode_row(row: &PgRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let is_null = row
                .try_get_raw(i)
                .map(|v| v.is_null())
                .unwrap_or(true);
            if is_null {
                return Value::Null;
            }
            decode_cell(row, i, column.type_info().name())
        })
        .collect()
}

fn decode_cell(row: &PgRow, i: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row
            .try_get::<bool, _>(i)
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INT2" => row
            .try_get::<i16, _>(i)
            .map(|v| Value::Int(i64::from(v)))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<i32, _>(i)
            .map(|v| Value::Int(i64::from(v)))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<i64, _>(i)
            .map(Value::Int)
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<f32, _>(i)
            .map(|v| Value::Float(f64::from(v)))
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<f64, _>(i)
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(i)
            .map(Value::Uuid)
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .map(|v| Value::Timestamp(v.and_utc()))
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(i)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        "BYTEA" => row
            .try_get::<Vec<u8>, _>(i)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<serde_json::Value, _>(i)
            .map(Value::Json)
            .unwrap_or(Value::Null),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<String, _>(i)
            .map(Value::Text)
            .unwrap_or(Value::Null),
        other => row
            .try_get::<String, _>(i)
            .map(Value::Text)
            .unwrap_or_else(|_| Value::Text(format!("<{other}>"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        let columns = Arc::new(vec![
            ColumnInfo {
                name: "id".into(),
                type_name: "INT8".into(),
            },
            ColumnInfo {
                name: "email".into(),
                type_name: "TEXT".into(),
            },
        ]);
        let rows = vec![
            Row {
                columns: Arc::clone(&columns),
                values: vec![Value::Int(1), Value::Text("a@example.com".into())],
            },
            Row {
                columns: Arc::clone(&columns),
                values: vec![Value::Int(2), Value::Null],
            },
        ];
        ResultSet { columns, rows }
    }

    #[test]
    fn test_row_access() {
        let rs = sample();
        assert_eq!(rs.rowcount(), 2);
        let first = rs.first().unwrap();
        assert_eq!(first.get(0), Some(&Value::Int(1)));
        assert_eq!(
            first.get_named("email"),
            Some(&Value::Text("a@example.com".into()))
        );
        assert_eq!(first.get_named("missing"), None);
    }

    #[test]
    fn test_description() {
        let rs = sample();
        let names: Vec<_> = rs.description().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "email"]);
    }

    #[test]
    fn test_iteration() {
        let rs = sample();
        let ids: Vec<_> = rs.iter().filter_map(|r| r.get(0).cloned()).collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_empty_result() {
        let rs = ResultSet::from_rows(&[]);
        assert!(rs.is_empty());
        assert!(rs.description().is_empty());
    }
}
