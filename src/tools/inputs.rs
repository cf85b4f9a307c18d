//! Tool input types with JSON Schema generation.
//!
//! Deserializing the call arguments into these types is the schema check:
//! a missing required field or a wrongly typed value is rejected before any
//! handler runs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input for the `query` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// The SQL query to execute.
    #[schemars(description = "SQL query to run. Runs inside a transaction that is always rolled back.")]
    pub sql: String,
}

/// Input for the `search` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchInput {
    #[schemars(description = "Text to search for in file names and contents")]
    pub query: String,
}

/// Input for the `list_sheets` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListSheetsInput {
    #[schemars(description = "Spreadsheet id or sharing URL")]
    pub spreadsheet_id: String,
}

/// Input for the `read_sheet` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadSheetInput {
    #[schemars(description = "Spreadsheet id or sharing URL")]
    pub spreadsheet_id: String,

    /// Sheet to read; the whole grid is read when no range is given.
    #[serde(default)]
    #[schemars(description = "Sheet (tab) name. Without a range, the whole sheet is read.")]
    pub sheet_name: Option<String>,

    #[serde(default)]
    #[schemars(description = "A1 range such as A1:C10 or Sheet1!A1:C10 (default: A1:Z1000 of the first sheet)")]
    pub range: Option<String>,
}

/// Input for the `edit_sheet` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditSheetInput {
    #[schemars(description = "Spreadsheet id or sharing URL")]
    pub spreadsheet_id: String,

    #[schemars(description = "A1 range to write, such as Sheet1!A1:B2")]
    pub range: String,

    /// Rows of cell values. Strings are parsed as if typed by a user.
    #[schemars(description = "Rows of cell values, e.g. [[\"Name\", \"Total\"], [\"a\", \"=SUM(B3:B9)\"]]")]
    pub values: Vec<Vec<Value>>,
}

/// Input for the `format_sheet` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormatSheetInput {
    #[schemars(description = "Spreadsheet id or sharing URL")]
    pub spreadsheet_id: String,

    #[schemars(description = "A1 range to format, such as Sheet1!A1:C1")]
    pub range: String,

    pub formatting: FormatSpec,
}

/// Style attributes to apply uniformly to a range. Omitted attributes are
/// left untouched. Unknown attributes are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormatSpec {
    #[serde(default)]
    #[schemars(description = "Fill color as #rrggbb")]
    pub background_color: Option<String>,

    #[serde(default)]
    #[schemars(description = "Text color as #rrggbb")]
    pub text_color: Option<String>,

    #[serde(default)]
    #[schemars(description = "Font size in points")]
    pub font_size: Option<u32>,

    #[serde(default)]
    pub bold: Option<bool>,

    #[serde(default)]
    pub italic: Option<bool>,

    #[serde(default)]
    #[schemars(description = "LEFT, CENTER or RIGHT")]
    pub horizontal_alignment: Option<String>,

    #[serde(default)]
    #[schemars(description = "TOP, MIDDLE or BOTTOM")]
    pub vertical_alignment: Option<String>,
}
