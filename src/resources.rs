//! Resource registry.
//!
//! Lists the objects of the active backend as MCP resources and reads them
//! back by URI.
//!
//! - SQL: one `<base>/<table>/schema` resource per table in the configured
//!   schema, read as a JSON array of `{column_name, data_type}`.
//! - Drive: one `gdrive:///<fileId>` resource per file, read as text when the
//!   (possibly exported) content is textual and as a base64 blob otherwise.

use crate::drive::export::{is_textual, read_file};
use crate::error::ServerError;
use crate::pagination::{Cursor, Page};
use crate::state::Backend;
use crate::uri::{ResourceAddress, ResourceView};
use base64::Engine;
use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use tracing::debug;

const SCHEMA_MIME_TYPE: &str = "application/json";

/// List one page of resources, continuing from `cursor`.
pub async fn list_resources(
    backend: &Backend,
    cursor: Option<&Cursor>,
) -> Result<Page<Resource>, ServerError> {
    match backend {
        Backend::Sql { catalog, codec, .. } => {
            let page = catalog.list_tables(cursor).await?;
            debug!(count = page.items.len(), "Listed tables");
            page.try_map(|table| {
                let uri = codec.encode(&ResourceAddress::new(table.as_str(), ResourceView::Schema))?;
                Ok(create_resource(
                    &uri,
                    &format!("\"{}\" database schema", table),
                    SCHEMA_MIME_TYPE,
                ))
            })
        }
        Backend::Drive { api, page_size } => {
            let list = api
                .list_files(*page_size, cursor.map(Cursor::as_token), None)
                .await?;
            debug!(count = list.files.len(), "Listed files");
            let next = list.next_page_token.and_then(Cursor::from_token);
            let codec = backend.codec();
            Page::new(list.files, next).try_map(|file| {
                let uri = codec.encode(&ResourceAddress::new(file.id, ResourceView::Content))?;
                Ok(create_resource(&uri, &file.name, &file.mime_type))
            })
        }
    }
}

/// Read the resource addressed by `uri`.
pub async fn read_resource(backend: &Backend, uri: &str) -> Result<ReadResourceResult, ServerError> {
    let address = backend.codec().decode(uri)?;

    let contents = match backend {
        Backend::Sql { catalog, .. } => {
            let columns = catalog.table_columns(&address.object).await?;
            let text = serde_json::to_string_pretty(&columns)
                .map_err(|e| ServerError::internal(format!("Failed to serialize columns: {e}")))?;
            text_contents(uri, SCHEMA_MIME_TYPE, text)
        }
        Backend::Drive { api, .. } => {
            let content = read_file(api.as_ref(), &address.object).await?;
            debug!(
                file_id = %address.object,
                mime_type = %content.mime_type,
                bytes = content.bytes.len(),
                "Read file content"
            );
            file_contents(uri, content.mime_type, content.bytes)
        }
    };

    Ok(ReadResourceResult {
        contents: vec![contents],
    })
}

fn create_resource(uri: &str, name: &str, mime_type: &str) -> Resource {
    let mut resource = RawResource::new(uri, name);
    resource.mime_type = Some(mime_type.to_string());
    resource.no_annotation()
}

fn text_contents(uri: &str, mime_type: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(mime_type.to_string()),
        text,
        meta: None,
    }
}

/// Text when the type is textual and the bytes are valid UTF-8, else a blob.
fn file_contents(uri: &str, mime_type: String, bytes: Vec<u8>) -> ResourceContents {
    let bytes = if is_textual(&mime_type) {
        match String::from_utf8(bytes) {
            Ok(text) => return text_contents(uri, &mime_type, text),
            Err(e) => {
                debug!(uri, "Textual content is not valid UTF-8, returning a blob");
                e.into_bytes()
            }
        }
    } else {
        bytes
    };

    ResourceContents::BlobResourceContents {
        uri: uri.to_string(),
        mime_type: Some(mime_type),
        blob: base64::engine::general_purpose::STANDARD.encode(bytes),
        meta: None,
    }
}
