//! Query results and their JSON rendering.

use crate::database::types::TypeMapper;
use crate::error::ServerError;
use futures_util::stream::TryStreamExt;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tiberius::{QueryItem, QueryStream};

/// A single row of query results, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    values: Vec<(String, Value)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn push(&mut self, column: String, value: Value) {
        self.values.push((column, value));
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Information about a result column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// SQL type name.
    pub sql_type: String,
}

/// Result of a query execution.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Columns of the first result set.
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<ResultRow>,
    /// Execution time in milliseconds.
    pub execution_time_ms: u64,
    /// Whether rows beyond the row cap were dropped.
    pub truncated: bool,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms: 0,
            truncated: false,
        }
    }

    /// Drain a query stream, keeping the first result set up to `max_rows`.
    ///
    /// The stream is always consumed to the end so the connection is ready
    /// for the next statement.
    pub async fn collect(
        mut stream: QueryStream<'_>,
        max_rows: usize,
        start: Instant,
    ) -> Result<Self, ServerError> {
        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut rows: Vec<ResultRow> = Vec::new();
        let mut first_set: Option<usize> = None;
        let mut truncated = false;

        while let Some(item) = stream.try_next().await? {
            match item {
                QueryItem::Metadata(meta) => {
                    if first_set.is_some() {
                        continue;
                    }
                    first_set = Some(meta.result_index());
                    columns = meta
                        .columns()
                        .iter()
                        .map(|col| ColumnInfo {
                            name: col.name().to_string(),
                            sql_type: TypeMapper::sql_type_name(col).to_string(),
                        })
                        .collect();
                }
                QueryItem::Row(row) => {
                    if Some(row.result_index()) != first_set {
                        continue;
                    }
                    if rows.len() >= max_rows {
                        truncated = true;
                        continue;
                    }

                    let mut result_row = ResultRow::new();
                    for (idx, col) in columns.iter().enumerate() {
                        result_row.push(col.name.clone(), TypeMapper::extract_column(&row, idx));
                    }
                    rows.push(result_row);
                }
            }
        }

        Ok(Self {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
            truncated,
        })
    }

    /// Rows as a pretty-printed JSON array, with a note when truncated.
    pub fn to_json_text(&self) -> Result<String, ServerError> {
        let mut text = serde_json::to_string_pretty(&self.rows)
            .map_err(|e| ServerError::internal(format!("Failed to serialize rows: {}", e)))?;
        if self.truncated {
            text.push_str(&format!(
                "\n\n(truncated to the first {} rows)",
                self.rows.len()
            ));
        }
        Ok(text)
    }
}

/// Truncate a string for logging purposes.
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
