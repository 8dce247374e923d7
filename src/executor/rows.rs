//! Conversions between JSON values and sqlx arguments/rows.

use serde_json::{Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::query::Query;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Column, Database, Encode, Row, Type};

/// Build a query for `sql` with every value bound in order.
///
/// Integers bind as `i64`, other numbers as `f64`, arrays and objects as JSON.
/// Integers beyond `i64` bind as their decimal text so no digits are lost.
pub(crate) fn bind_values<'q, DB>(
    sql: &'q str,
    values: Vec<Value>,
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
    Json<Value>: Encode<'q, DB> + Type<DB>,
{
    values
        .into_iter()
        .fold(sqlx::query::<DB>(sql), |query, value| match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None if n.is_u64() => query.bind(n.to_string()),
                None => match n.as_f64() {
                    Some(f) => query.bind(f),
                    None => query.bind(n.to_string()),
                },
            },
            Value::String(s) => query.bind(s),
            other => query.bind(Json(other)),
        })
}

// Tries each type in order and keeps the first one the column decodes as.
macro_rules! decode_column {
    ($row:expr, $index:expr; $($ty:ty),+ $(,)?) => {{
        let mut decoded: Option<Value> = None;
        $(
            if decoded.is_none() {
                if let Ok(value) = $row.try_get::<Option<$ty>, _>($index) {
                    decoded = Some(
                        value
                            .map(|v| serde_json::to_value(v).unwrap_or(Value::Null))
                            .unwrap_or(Value::Null),
                    );
                }
            }
        )+
        decoded.unwrap_or_else(|| {
            tracing::trace!(column = $index, "Column type has no JSON mapping");
            Value::Null
        })
    }};
}

pub(crate) fn pg_row(row: &PgRow) -> Value {
    let object: Map<String, Value> = row
        .columns()
        .iter()
        .map(|column| {
            let i = column.ordinal();
            let value = decode_column!(row, i; bool, i16, i32, i64, f32, f64, String, Value, Vec<u8>);
            (column.name().to_string(), value)
        })
        .collect();
    Value::Object(object)
}

pub(crate) fn mysql_row(row: &MySqlRow) -> Value {
    let object: Map<String, Value> = row
        .columns()
        .iter()
        .map(|column| {
            let i = column.ordinal();
            let value = decode_column!(row, i; i64, u64, f64, f32, String, Value, Vec<u8>);
            (column.name().to_string(), value)
        })
        .collect();
    Value::Object(object)
}

pub(crate) fn sqlite_row(row: &SqliteRow) -> Value {
    let object: Map<String, Value> = row
        .columns()
        .iter()
        .map(|column| {
            let i = column.ordinal();
            let value = decode_column!(row, i; i64, f64, String, Vec<u8>);
            (column.name().to_string(), value)
        })
        .collect();
    Value::Object(object)
}

pub(crate) fn column_names<R: Row>(row: &R) -> Vec<Value> {
    row.columns()
        .iter()
        .map(|column| Value::String(column.name().to_string()))
        .collect()
}
