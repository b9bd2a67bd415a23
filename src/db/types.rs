//! MySQL column decoding to JSON.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column's MySQL type name
//! 2. A per-category decoder extracts the value
//!
//! Statements without parameters run over the text protocol and statements
//! with parameters over the binary protocol; `sqlx` decoders accept both, so
//! the same row may arrive either way.

use crate::models::ColumnMetadata;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
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
}

/// Classify a MySQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Spatial types are binary WKB; check first since "point" contains "int"
    if matches!(
        lower.as_str(),
        "geometry"
            | "point"
            | "linestring"
            | "polygon"
            | "multipoint"
            | "multilinestring"
            | "multipolygon"
            | "geometrycollection"
    ) {
        return TypeCategory::Binary;
    }

    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if matches!(lower.as_str(), "date" | "time" | "datetime" | "timestamp") {
        return TypeCategory::Temporal;
    }

    if lower == "json" {
        return TypeCategory::Json;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bit" {
        return TypeCategory::Binary;
    }

    // varchar, char, text, enum, set, year...
    TypeCategory::Text
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Raw DECIMAL value as the server formatted it.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Decode binary data to JSON value.
///
/// Valid UTF-8 is returned as text when `decode_binary` is set; everything
/// else is base64 encoded.
pub fn decode_binary_value(bytes: &[u8], decode_binary: bool) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    if decode_binary {
        match std::str::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s.to_string()),
            Err(_) => JsonValue::String(STANDARD.encode(bytes)),
        }
    } else {
        JsonValue::String(STANDARD.encode(bytes))
    }
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
    fn to_json_map_with_options(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue>;
    fn get_column_metadata(&self) -> Vec<ColumnMetadata>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.to_json_map_with_options(false)
    }

    fn to_json_map_with_options(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                let value = decode_column(self, idx, category, decode_binary);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn get_column_metadata(&self) -> Vec<ColumnMetadata> {
        self.columns()
            .iter()
            .map(|col| ColumnMetadata::new(col.name(), col.type_info().name()))
            .collect()
    }
}

fn decode_column(
    row: &MySqlRow,
    idx: usize,
    category: TypeCategory,
    decode_binary: bool,
) -> JsonValue {
    match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Temporal => decode_temporal(row, idx),
        TypeCategory::Binary => decode_binary_col(row, idx, decode_binary),
        TypeCategory::Json => decode_json(row, idx),
        TypeCategory::Text => decode_text(row, idx),
    }
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.0),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL: {:?}", e);
            JsonValue::Null
        }
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
    }
    // BIGINT UNSIGNED does not fit i64
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
    }
    decode_text(row, idx)
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get::<Option<bool>, _>(idx)
        .ok()
        .flatten()
        .map(JsonValue::Bool)
        .unwrap_or(JsonValue::Null)
}

fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return float_value(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
        return float_value(v as f64);
    }
    JsonValue::Null
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn decode_temporal(row: &MySqlRow, idx: usize) -> JsonValue {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return v
            .map(|v| JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return v
            .map(|v| JsonValue::String(v.format("%Y-%m-%d").to_string()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
        return v
            .map(|v| JsonValue::String(v.format("%H:%M:%S%.f").to_string()))
            .unwrap_or(JsonValue::Null);
    }
    // Zero dates and TIME values outside 0..24h have no chrono form
    decode_text(row, idx)
}

fn decode_binary_col(row: &MySqlRow, idx: usize, decode_binary: bool) -> JsonValue {
    row.try_get::<Option<Vec<u8>>, _>(idx)
        .ok()
        .flatten()
        .map(|v| decode_binary_value(&v, decode_binary))
        .unwrap_or(JsonValue::Null)
}

fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<JsonValue>, _>(idx) {
        return v.unwrap_or(JsonValue::Null);
    }
    decode_text(row, idx)
}

fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
    }
    // Last resort for types String refuses (YEAR, zero dates): raw bytes.
    row.try_get_unchecked::<Option<Vec<u8>>, _>(idx)
        .ok()
        .flatten()
        .map(|v| decode_binary_value(&v, true))
        .unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("MEDIUMINT"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_decimal_and_float() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
        assert_eq!(categorize_type("FLOAT"), TypeCategory::Float);
    }

    #[test]
    fn test_categorize_type_boolean() {
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("DATETIME"), TypeCategory::Temporal);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Temporal);
        assert_eq!(categorize_type("DATE"), TypeCategory::Temporal);
        assert_eq!(categorize_type("TIME"), TypeCategory::Temporal);
        assert_eq!(categorize_type("YEAR"), TypeCategory::Text);
    }

    #[test]
    fn test_categorize_spatial_as_binary() {
        assert_eq!(categorize_type("POINT"), TypeCategory::Binary);
        assert_eq!(categorize_type("GEOMETRY"), TypeCategory::Binary);
    }

    #[test]
    fn test_categorize_binary_json_text() {
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("LONGBLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("JSON"), TypeCategory::Json);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("ENUM"), TypeCategory::Text);
    }

    #[test]
    fn test_decode_binary_value_with_valid_utf8() {
        let bytes = b"hello world";
        let result = decode_binary_value(bytes, true);
        assert_eq!(result, JsonValue::String("hello world".to_string()));

        let result = decode_binary_value(bytes, false);
        assert_eq!(result, JsonValue::String("aGVsbG8gd29ybGQ=".to_string()));
    }

    #[test]
    fn test_decode_binary_value_with_invalid_utf8() {
        let bytes: &[u8] = &[0xFF, 0xFE, 0x00, 0x01];
        let result = decode_binary_value(bytes, true);
        assert_eq!(result, JsonValue::String("//4AAQ==".to_string()));
    }

    #[test]
    fn test_float_value_non_finite_falls_back_to_string() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
    }
}
