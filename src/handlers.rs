//! ServerHandler implementation.
//!
//! This module implements the rmcp `ServerHandler` trait which defines how
//! the server responds to MCP protocol requests.

use crate::pagination::Cursor;
use crate::resources::{list_resources, read_resource};
use crate::server::McpServer;
use crate::state::{Backend, BackendKind};
use crate::tools::{call_tool, tool_descriptors};
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
    ReadResourceRequestParam, ReadResourceResult, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ErrorData;
use tracing::{debug, info};

impl ServerHandler for McpServer {
    /// Server identification - called during initialization handshake.
    fn get_info(&self) -> ServerInfo {
        info!("MCP client requesting server info");

        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,

            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),

            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some(server_title(self.kind()).to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },

            instructions: Some(build_instructions(self.backend())),
        }
    }

    /// List one page of resources.
    async fn list_resources(
        &self,
        request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let cursor = request
            .and_then(|r| r.cursor)
            .and_then(Cursor::from_token);
        debug!(cursor = ?cursor, "Listing resources");

        let page = list_resources(self.backend(), cursor.as_ref()).await?;

        Ok(ListResourcesResult {
            resources: page.items,
            next_cursor: page.next_cursor.map(Cursor::into_token),
            meta: None,
        })
    }

    /// No parameterized resources are offered.
    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult {
            resource_templates: Vec::new(),
            next_cursor: None,
            meta: None,
        })
    }

    /// Read a specific resource.
    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        debug!(uri = %request.uri, "Reading resource");
        read_resource(self.backend(), &request.uri)
            .await
            .map_err(ErrorData::from)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(tool_descriptors(
            self.kind(),
        )))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        call_tool(self.backend(), &request.name, request.arguments)
            .await
            .map_err(ErrorData::from)
    }
}

fn server_title(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Sql => "MSSQL MCP Server",
        BackendKind::Drive => "Google Drive MCP Server",
    }
}

/// Build server instructions for the active backend.
fn build_instructions(backend: &Backend) -> String {
    let mut instructions = String::new();

    match backend {
        Backend::Sql { target, .. } => {
            instructions.push_str("# MSSQL MCP Server\n\n");
            instructions.push_str(&format!("**Connected to:** `{}`\n\n", target));
            instructions.push_str("### Resources\n");
            instructions.push_str("- One resource per table, read as its column names and types\n\n");
            instructions.push_str("### Tools\n");
            instructions.push_str("- `query`: run SQL inside a transaction that is always rolled back\n");
            instructions.push_str("- Changes made by a query are never kept\n");
        }
        Backend::Drive { .. } => {
            instructions.push_str("# Google Drive MCP Server\n\n");
            instructions.push_str("### Resources\n");
            instructions.push_str("- One resource per Drive file\n");
            instructions.push_str("- Docs read as Markdown, Sheets as CSV, Slides as plain text\n\n");
            instructions.push_str("### Tools\n");
            instructions.push_str("- `search`: find files by name or content\n");
            instructions.push_str("- `list_sheets`, `read_sheet`: inspect a spreadsheet\n");
            instructions.push_str("- `edit_sheet`, `format_sheet`: change cell values and styles\n\n");
            instructions.push_str("Spreadsheets may be given as a raw id or a sharing URL.\n");
        }
    }

    instructions
}
