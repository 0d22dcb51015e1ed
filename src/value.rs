//! Parameter values and result records.
//!
//! Statements take an ordered list of [`SqlValue`]s matching their
//! placeholders and yield rows as generic [`Record`]s.

use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Column, Row, TypeInfo, ValueRef};
use std::collections::HashMap;

/// A result row: column name to JSON value.
pub type Record = HashMap<String, serde_json::Value>;

/// Dynamic value type for statement parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Type a raw command-line literal: integer, float, boolean, `null`,
    /// anything else is text.
    pub fn parse_literal(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            SqlValue::Int(n)
        } else if let Ok(f) = raw.parse::<f64>() {
            SqlValue::Float(f)
        } else {
            match raw {
                "true" => SqlValue::Bool(true),
                "false" => SqlValue::Bool(false),
                "null" | "NULL" => SqlValue::Null,
                _ => SqlValue::Text(raw.to_string()),
            }
        }
    }
}

/// Build a parameter list from heterogeneous values.
///
/// ```
/// use sqlfns::{params, SqlValue};
///
/// let p = params!["1", "John", 18, None::<i64>];
/// assert_eq!(p[2], SqlValue::Int(18));
/// assert_eq!(p[3], SqlValue::Null);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::SqlValue::from($value)),+]
    };
}

/// Bind every parameter, in order, onto a query.
pub(crate) fn bind_params<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

/// Convert an AnyRow to a Record.
pub(crate) fn row_to_record(row: &AnyRow) -> Record {
    let mut map = HashMap::new();

    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();

        let is_null = row.try_get_raw(i).map(|v| v.is_null()).unwrap_or(true);
        if is_null {
            map.insert(name, serde_json::Value::Null);
            continue;
        }

        let value = match column.type_info().name() {
            "BOOL" | "BOOLEAN" => row
                .try_get::<bool, _>(i)
                .map(serde_json::Value::Bool)
                .unwrap_or(serde_json::Value::Null),
            "INT2" | "INT4" | "INT8" | "INTEGER" | "BIGINT" | "SMALLINT" => row
                .try_get::<i64, _>(i)
                .map(|v| serde_json::Value::Number(v.into()))
                .unwrap_or(serde_json::Value::Null),
            "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE" => row
                .try_get::<f64, _>(i)
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            _ => decode_untyped(row, i),
        };

        map.insert(name, value);
    }

    map
}

// Column types the driver reports loosely (e.g. SQLite expressions).
fn decode_untyped(row: &AnyRow, i: usize) -> serde_json::Value {
    if let Ok(s) = row.try_get::<String, _>(i) {
        return serde_json::Value::String(s);
    }
    if let Ok(n) = row.try_get::<i64, _>(i) {
        return serde_json::Value::Number(n.into());
    }
    if let Some(n) = row
        .try_get::<f64, _>(i)
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return serde_json::Value::Number(n);
    }
    row.try_get::<bool, _>(i)
        .map(serde_json::Value::Bool)
        .unwrap_or(serde_json::Value::Null)
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}
