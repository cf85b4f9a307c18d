//! Mapping SQL Server column values to JSON.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tiberius::{Column, ColumnType, Row};
use uuid::Uuid;

/// Type mapper for converting SQL Server values to JSON values.
pub struct TypeMapper;

impl TypeMapper {
    /// Extract a column as JSON.
    ///
    /// NULL and unsupported types become `null`. Decimals are rendered as
    /// strings to keep their precision; binary data is base64.
    pub fn extract_column(row: &Row, idx: usize) -> Value {
        let Some(col) = row.columns().get(idx) else {
            return Value::Null;
        };

        match col.column_type() {
            ColumnType::Int1 => Self::get::<u8>(row, idx).map_or(Value::Null, |v| json!(v)),
            ColumnType::Int2 => Self::get::<i16>(row, idx).map_or(Value::Null, |v| json!(v)),
            ColumnType::Int4 => Self::get::<i32>(row, idx).map_or(Value::Null, |v| json!(v)),
            ColumnType::Int8 => Self::get::<i64>(row, idx).map_or(Value::Null, |v| json!(v)),
            ColumnType::Bit | ColumnType::Bitn => {
                Self::get::<bool>(row, idx).map_or(Value::Null, Value::Bool)
            }
            ColumnType::Guid => {
                Self::get::<Uuid>(row, idx).map_or(Value::Null, |v| json!(v.to_string()))
            }
            ColumnType::DatetimeOffsetn => Self::get::<DateTime<Utc>>(row, idx)
                .map_or(Value::Null, |v| json!(v.to_rfc3339())),
            _ => Self::cascade(row, idx),
        }
    }

    fn get<'a, T>(row: &'a Row, idx: usize) -> Option<T>
    where
        T: tiberius::FromSql<'a>,
    {
        row.try_get::<T, _>(idx).ok().flatten()
    }

    /// Try each supported Rust type in order of likelihood.
    fn cascade(row: &Row, idx: usize) -> Value {
        if let Some(v) = Self::get::<&str>(row, idx) {
            return json!(v);
        }
        if let Some(v) = Self::get::<i32>(row, idx) {
            return json!(v);
        }
        if let Some(v) = Self::get::<i64>(row, idx) {
            return json!(v);
        }
        if let Some(v) = Self::get::<i16>(row, idx) {
            return json!(v);
        }
        if let Some(v) = Self::get::<u8>(row, idx) {
            return json!(v);
        }
        if let Some(v) = Self::get::<bool>(row, idx) {
            return Value::Bool(v);
        }
        if let Some(v) = Self::get::<f64>(row, idx) {
            return json!(v);
        }
        if let Some(v) = Self::get::<f32>(row, idx) {
            return json!(v);
        }
        if let Some(v) = Self::get::<Decimal>(row, idx) {
            return json!(v.to_string());
        }
        if let Some(v) = Self::get::<NaiveDateTime>(row, idx) {
            return json!(v.to_string());
        }
        if let Some(v) = Self::get::<NaiveDate>(row, idx) {
            return json!(v.to_string());
        }
        if let Some(v) = Self::get::<NaiveTime>(row, idx) {
            return json!(v.to_string());
        }
        if let Some(v) = Self::get::<&[u8]>(row, idx) {
            return json!(BASE64.encode(v));
        }
        Value::Null
    }

    /// Get the SQL type name for a column.
    pub fn sql_type_name(col: &Column) -> &'static str {
        match col.column_type() {
            ColumnType::Null => "NULL",
            ColumnType::Int1 => "TINYINT",
            ColumnType::Int2 => "SMALLINT",
            ColumnType::Int4 | ColumnType::Intn => "INT",
            ColumnType::Int8 => "BIGINT",
            ColumnType::Float4 => "REAL",
            ColumnType::Float8 | ColumnType::Floatn => "FLOAT",
            ColumnType::Money | ColumnType::Money4 => "MONEY",
            ColumnType::Datetime | ColumnType::Datetime4 | ColumnType::Datetimen => "DATETIME",
            ColumnType::Datetime2 => "DATETIME2",
            ColumnType::DatetimeOffsetn => "DATETIMEOFFSET",
            ColumnType::Daten => "DATE",
            ColumnType::Timen => "TIME",
            ColumnType::Bit | ColumnType::Bitn => "BIT",
            ColumnType::Guid => "UNIQUEIDENTIFIER",
            ColumnType::Decimaln | ColumnType::Numericn => "DECIMAL",
            ColumnType::BigVarChar | ColumnType::BigChar | ColumnType::Text => "VARCHAR",
            ColumnType::NVarchar | ColumnType::NChar | ColumnType::NText => "NVARCHAR",
            ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => "VARBINARY",
            ColumnType::Xml => "XML",
            _ => "UNKNOWN",
        }
    }
}
