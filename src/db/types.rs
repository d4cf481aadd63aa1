//! Row decoding.
//!
//! Rows are turned into JSON maps in select order so the renderer does not
//! need to know which engine produced them. Each column is classified once
//! from its declared type name, then read with the decoder for that class.
//!
//! A value that is not NULL but fails its typed decode falls back to a
//! best-effort rendering instead of silently turning into NULL.

use crate::models::Flavor;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// How a column's values are read and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Text,
    Binary,
    Json,
    Uuid,
    Unknown,
}

/// Classify a declared column type.
///
/// Modifiers such as `(10, 2)` or `UNSIGNED` are ignored; only the base name
/// counts. SQLite's NUMERIC affinity stores REAL or INTEGER values, so it is
/// read as a float there and as exact text on PostgreSQL.
pub fn categorize_type(type_name: &str, flavor: Flavor) -> TypeCategory {
    let lower = type_name.to_ascii_lowercase();
    let base = lower
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default();

    match base {
        "numeric" | "decimal" => match flavor {
            Flavor::Sqlite => TypeCategory::Float,
            Flavor::Postgres => TypeCategory::Decimal,
        },
        "bool" | "boolean" => TypeCategory::Boolean,
        "real" | "float" | "float4" | "float8" | "double" => TypeCategory::Float,
        "date" | "datetime" | "time" | "timetz" | "timestamp" | "timestamptz" => {
            TypeCategory::Temporal
        }
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "bytea" | "blob" | "binary" | "varbinary" => TypeCategory::Binary,
        "text" | "name" | "clob" | "citext" => TypeCategory::Text,
        "interval" | "point" => TypeCategory::Unknown,
        _ if base.contains("int") || base.ends_with("serial") => TypeCategory::Integer,
        _ if base.contains("char") => TypeCategory::Text,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Raw NUMERIC value as text, preserving the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Render a blob. UTF-8 content is shown as text when `as_text` is set;
/// anything else is base64.
pub fn decode_binary_value(bytes: &[u8], as_text: bool) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    let text = if as_text {
        std::str::from_utf8(bytes).ok().map(str::to_owned)
    } else {
        None
    };
    JsonValue::String(text.unwrap_or_else(|| STANDARD.encode(bytes)))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Rows that can be flattened into a JSON map keyed by column name.
pub trait RowToJson {
    fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue>;
    fn column_names(&self) -> Vec<String>;
}

impl RowToJson for PgRow {
    fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, Flavor::Postgres);
                let value = postgres::decode_column(self, idx, type_name, category, decode_binary);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

impl RowToJson for SqliteRow {
    fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, Flavor::Sqlite);
                let value = sqlite::decode_column(self, idx, type_name, category, decode_binary);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

// =============================================================================
// Flavor-Specific Decoders
// =============================================================================

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
        decode_binary: bool,
    ) -> JsonValue {
        let is_null = row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true);
        if is_null {
            return JsonValue::Null;
        }

        let value = match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx),
            TypeCategory::Binary => decode_binary_col(row, idx, decode_binary),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Uuid => decode_uuid(row, idx),
            TypeCategory::Text | TypeCategory::Unknown => decode_text(row, idx),
        };

        value.unwrap_or_else(|| {
            tracing::debug!(column = idx, type_name, "Undecodable PostgreSQL value");
            JsonValue::String(format!("<{}>", type_name.to_lowercase()))
        })
    }

    fn decode_decimal(row: &PgRow, idx: usize) -> Option<JsonValue> {
        row.try_get::<RawDecimal, _>(idx)
            .ok()
            .map(|v| JsonValue::String(v.0))
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Option<JsonValue> {
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Some(JsonValue::Number(v.into()));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(JsonValue::Number(v.into()));
        }
        row.try_get::<i64, _>(idx)
            .ok()
            .map(|v| JsonValue::Number(v.into()))
    }

    fn decode_boolean(row: &PgRow, idx: usize) -> Option<JsonValue> {
        row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool)
    }

    fn decode_float(row: &PgRow, idx: usize) -> Option<JsonValue> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(float_value(v));
        }
        row.try_get::<f32, _>(idx)
            .ok()
            .map(|v| float_value(v as f64))
    }

    fn decode_temporal(row: &PgRow, idx: usize) -> Option<JsonValue> {
        if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
            return Some(JsonValue::String(v.to_rfc3339()));
        }
        if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
            return Some(JsonValue::String(v.to_string()));
        }
        if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
            return Some(JsonValue::String(v.to_string()));
        }
        row.try_get::<NaiveTime, _>(idx)
            .ok()
            .map(|v| JsonValue::String(v.to_string()))
    }

    fn decode_binary_col(row: &PgRow, idx: usize, decode_binary: bool) -> Option<JsonValue> {
        row.try_get::<Vec<u8>, _>(idx)
            .ok()
            .map(|v| decode_binary_value(&v, decode_binary))
    }

    fn decode_json(row: &PgRow, idx: usize) -> Option<JsonValue> {
        row.try_get::<JsonValue, _>(idx).ok()
    }

    fn decode_uuid(row: &PgRow, idx: usize) -> Option<JsonValue> {
        row.try_get::<uuid::Uuid, _>(idx)
            .ok()
            .map(|v| JsonValue::String(v.to_string()))
    }

    fn decode_text(row: &PgRow, idx: usize) -> Option<JsonValue> {
        row.try_get::<String, _>(idx).ok().map(JsonValue::String)
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
        decode_binary: bool,
    ) -> JsonValue {
        let is_null = row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true);
        if is_null {
            return JsonValue::Null;
        }

        let value = match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float | TypeCategory::Decimal => decode_float(row, idx),
            TypeCategory::Binary => decode_binary_col(row, idx, decode_binary),
            _ => decode_text(row, idx, type_name),
        };

        // Column types are only affinities in SQLite; fall back on the storage class.
        value
            .or_else(|| decode_integer(row, idx))
            .or_else(|| decode_float(row, idx))
            .or_else(|| decode_text(row, idx, type_name))
            .or_else(|| decode_binary_col(row, idx, decode_binary))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_integer(row: &SqliteRow, idx: usize) -> Option<JsonValue> {
        row.try_get::<i64, _>(idx)
            .ok()
            .map(|v| JsonValue::Number(v.into()))
    }

    fn decode_boolean(row: &SqliteRow, idx: usize) -> Option<JsonValue> {
        row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool)
    }

    fn decode_float(row: &SqliteRow, idx: usize) -> Option<JsonValue> {
        row.try_get::<f64, _>(idx).ok().map(float_value)
    }

    fn decode_binary_col(row: &SqliteRow, idx: usize, decode_binary: bool) -> Option<JsonValue> {
        row.try_get::<Vec<u8>, _>(idx)
            .ok()
            .map(|v| decode_binary_value(&v, decode_binary))
    }

    fn decode_text(row: &SqliteRow, idx: usize, type_name: &str) -> Option<JsonValue> {
        let v = row.try_get::<String, _>(idx).ok()?;
        if type_name.to_lowercase().contains("json") {
            if let Ok(json) = serde_json::from_str::<JsonValue>(&v) {
                return Some(json);
            }
        }
        Some(JsonValue::String(v))
    }
}
