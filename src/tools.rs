//! MCP tools.
//!
//! The tool set is fixed per backend:
//!
//! - SQL: `query`
//! - Drive: `search`, `list_sheets`, `read_sheet`, `edit_sheet`, `format_sheet`
//!
//! A call is parsed into [`ToolCall`] first. An unknown name or arguments
//! that do not fit the tool's input type fail the request as a protocol
//! error. Once parsed, every failure is reported inside the tool result with
//! `isError` set, so the caller sees a readable diagnostic.

pub mod inputs;

pub use inputs::*;

use crate::constants::SEARCH_PAGE_SIZE;
use crate::database::SqlCatalog;
use crate::drive::api::full_text_query;
use crate::drive::format::{repeat_cell_request, translate};
use crate::drive::range::{locate_range, quote_sheet_name, resolve_read_range};
use crate::drive::reference::extract_file_id;
use crate::drive::{verify, DriveApi};
use crate::error::ServerError;
use crate::state::{Backend, BackendKind};
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SQL_TOOLS: &[&str] = &["query"];
const DRIVE_TOOLS: &[&str] = &[
    "search",
    "list_sheets",
    "read_sheet",
    "edit_sheet",
    "format_sheet",
];

/// Names of the tools served by a backend.
pub fn tool_names(kind: BackendKind) -> &'static [&'static str] {
    match kind {
        BackendKind::Sql => SQL_TOOLS,
        BackendKind::Drive => DRIVE_TOOLS,
    }
}

/// A parsed, schema-checked tool call.
#[derive(Debug, Clone)]
pub enum ToolCall {
    Query(QueryInput),
    Search(SearchInput),
    ListSheets(ListSheetsInput),
    ReadSheet(ReadSheetInput),
    EditSheet(EditSheetInput),
    FormatSheet(FormatSheetInput),
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ServerError> {
    serde_json::from_value(arguments).map_err(|e| ServerError::invalid_arguments(tool, e.to_string()))
}

impl ToolCall {
    /// Resolve `name` against the backend's registry and check the arguments.
    pub fn parse(
        kind: BackendKind,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<Self, ServerError> {
        if !tool_names(kind).contains(&name) {
            return Err(ServerError::UnknownTool(name.to_string()));
        }

        let args = Value::Object(arguments.unwrap_or_default());
        Ok(match name {
            "query" => ToolCall::Query(parse_args(name, args)?),
            "search" => ToolCall::Search(parse_args(name, args)?),
            "list_sheets" => ToolCall::ListSheets(parse_args(name, args)?),
            "read_sheet" => ToolCall::ReadSheet(parse_args(name, args)?),
            "edit_sheet" => ToolCall::EditSheet(parse_args(name, args)?),
            "format_sheet" => ToolCall::FormatSheet(parse_args(name, args)?),
            _ => return Err(ServerError::UnknownTool(name.to_string())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Query(_) => "query",
            ToolCall::Search(_) => "search",
            ToolCall::ListSheets(_) => "list_sheets",
            ToolCall::ReadSheet(_) => "read_sheet",
            ToolCall::EditSheet(_) => "edit_sheet",
            ToolCall::FormatSheet(_) => "format_sheet",
        }
    }
}

fn schema_for<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema) {
        Ok(Value::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

/// Descriptors for the backend's tools.
pub fn tool_descriptors(kind: BackendKind) -> Vec<Tool> {
    match kind {
        BackendKind::Sql => vec![Tool::new(
            "query",
            "Run a read-only SQL query. The statement executes inside a transaction \
             that is always rolled back, and rows are returned as JSON.",
            schema_for::<QueryInput>(),
        )],
        BackendKind::Drive => vec![
            Tool::new(
                "search",
                "Search Google Drive for files whose name or content matches the text.",
                schema_for::<SearchInput>(),
            ),
            Tool::new(
                "list_sheets",
                "List the sheets of a spreadsheet with their ids and grid sizes.",
                schema_for::<ListSheetsInput>(),
            ),
            Tool::new(
                "read_sheet",
                "Read cell values from a spreadsheet. Give a sheet name, an A1 range, or both.",
                schema_for::<ReadSheetInput>(),
            ),
            Tool::new(
                "edit_sheet",
                "Write cell values into an A1 range. Values are interpreted as if typed \
                 into the sheet, so formulas work. Requires edit access.",
                schema_for::<EditSheetInput>(),
            ),
            Tool::new(
                "format_sheet",
                "Apply one uniform style (colors, font size, bold, italic, alignment) to an \
                 A1 range. Attributes left out are not changed. Requires edit access.",
                schema_for::<FormatSheetInput>(),
            ),
        ],
    }
}

/// Parse and run a tool call.
///
/// `Err` is reserved for protocol faults; everything after parsing ends up
/// in the returned result.
pub async fn call_tool(
    backend: &Backend,
    name: &str,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, ServerError> {
    let call = ToolCall::parse(backend.kind(), name, arguments)?;
    info!(tool = call.name(), "Calling tool");

    let outcome = match (call, backend) {
        (ToolCall::Query(input), Backend::Sql { catalog, .. }) => {
            run_query(catalog.as_ref(), input).await
        }
        (ToolCall::Search(input), Backend::Drive { api, .. }) => search(api.as_ref(), input).await,
        (ToolCall::ListSheets(input), Backend::Drive { api, .. }) => {
            list_sheets(api.as_ref(), input).await
        }
        (ToolCall::ReadSheet(input), Backend::Drive { api, .. }) => {
            read_sheet(api.as_ref(), input).await
        }
        (ToolCall::EditSheet(input), Backend::Drive { api, .. }) => {
            edit_sheet(api.as_ref(), input).await
        }
        (ToolCall::FormatSheet(input), Backend::Drive { api, .. }) => {
            format_sheet(api.as_ref(), input).await
        }
        (call, _) => return Err(ServerError::UnknownTool(call.name().to_string())),
    };

    Ok(match outcome {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            warn!(tool = name, "Tool failed: {}", e);
            CallToolResult::error(vec![Content::text(e.to_user_message())])
        }
    })
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, ServerError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ServerError::internal(format!("Failed to serialize result: {}", e)))
}

// =============================================================================
// SQL
// =============================================================================

async fn run_query(catalog: &dyn SqlCatalog, input: QueryInput) -> Result<String, ServerError> {
    if input.sql.trim().is_empty() {
        return Err(ServerError::invalid_arguments("query", "sql must not be empty"));
    }
    let result = catalog.query_read_only(&input.sql).await?;
    result.to_json_text()
}

// =============================================================================
// Drive
// =============================================================================

async fn search(api: &dyn DriveApi, input: SearchInput) -> Result<String, ServerError> {
    let list = api
        .list_files(SEARCH_PAGE_SIZE, None, Some(&full_text_query(&input.query)))
        .await?;

    let mut text = format!("Found {} files:", list.files.len());
    for file in &list.files {
        text.push_str(&format!("\n{} ({})", file.name, file.mime_type));
    }
    Ok(text)
}

async fn list_sheets(api: &dyn DriveApi, input: ListSheetsInput) -> Result<String, ServerError> {
    let id = extract_file_id(&input.spreadsheet_id)?;
    verify(api, &id, false).await?;

    let sheets = api.sheet_properties(&id).await?;
    let summary: Vec<Value> = sheets
        .iter()
        .map(|s| {
            json!({
                "title": s.title,
                "sheetId": s.sheet_id,
                "rowCount": s.grid_properties.row_count,
                "columnCount": s.grid_properties.column_count,
            })
        })
        .collect();
    to_pretty_json(&summary)
}

async fn read_sheet(api: &dyn DriveApi, input: ReadSheetInput) -> Result<String, ServerError> {
    let id = extract_file_id(&input.spreadsheet_id)?;
    verify(api, &id, false).await?;

    // Grid sizes only matter when a whole sheet is requested.
    let sheets = if input.sheet_name.is_some() && input.range.is_none() {
        api.sheet_properties(&id).await?
    } else {
        Vec::new()
    };
    let range = resolve_read_range(input.sheet_name.as_deref(), input.range.as_deref(), &sheets)?;
    debug!(spreadsheet = %id, range = %range, "Reading values");

    let values = api.get_values(&id, &range).await?;
    to_pretty_json(&json!({
        "range": values.range.unwrap_or(range),
        "values": values.values,
    }))
}

async fn edit_sheet(api: &dyn DriveApi, input: EditSheetInput) -> Result<String, ServerError> {
    let id = extract_file_id(&input.spreadsheet_id)?;
    if input.values.is_empty() {
        return Err(ServerError::invalid_arguments(
            "edit_sheet",
            "values must contain at least one row",
        ));
    }
    verify(api, &id, true).await?;

    let response = api.update_values(&id, &input.range, input.values).await?;
    Ok(format!(
        "Updated {} cells in {} ({} rows x {} columns)",
        response.updated_cells,
        response.updated_range.as_deref().unwrap_or(&input.range),
        response.updated_rows,
        response.updated_columns
    ))
}

async fn format_sheet(api: &dyn DriveApi, input: FormatSheetInput) -> Result<String, ServerError> {
    let id = extract_file_id(&input.spreadsheet_id)?;
    let format = translate(&input.formatting)?;
    verify(api, &id, true).await?;

    let sheets = api.sheet_properties(&id).await?;
    let (sheet, cells) = locate_range(&input.range, &sheets)?;
    let body = repeat_cell_request(&cells.to_grid_range(sheet.sheet_id), &format);
    api.batch_update(&id, body).await?;

    let mask = format.field_mask();
    Ok(format!(
        "Applied {} to {}!{} ({} cells)",
        mask.fields().join(", "),
        quote_sheet_name(&sheet.title),
        cells.cells_a1(),
        cells.cell_count()
    ))
}
