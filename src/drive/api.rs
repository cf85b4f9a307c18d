//! Drive and Sheets REST client.
//!
//! [`DriveApi`] is the seam the rest of the server talks to; [`HttpDriveApi`]
//! is the production implementation over `reqwest`. Every request carries a
//! bearer token from [`TokenSource`]. Non-2xx responses become
//! `ServerError::Backend` with the HTTP status and Google's error message.

use crate::config::DriveConfig;
use crate::constants::{DRIVE_API_BASE, SHEETS_API_BASE};
use crate::drive::auth::TokenSource;
use crate::drive::types::{
    About, DriveFile, FileAccess, FileList, SheetProperties, Spreadsheet, UpdateValuesResponse,
    ValueRange,
};
use crate::error::ServerError;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

/// Operations the server needs from Drive and Sheets.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// One page of `files.list`, optionally filtered by a Drive query.
    async fn list_files(
        &self,
        page_size: u32,
        page_token: Option<&str>,
        query: Option<&str>,
    ) -> Result<FileList, ServerError>;

    /// Name and MIME type of a single file.
    async fn file_metadata(&self, file_id: &str) -> Result<DriveFile, ServerError>;

    /// Capabilities and sharing list of a file.
    async fn file_access(&self, file_id: &str) -> Result<FileAccess, ServerError>;

    /// Email address of the authenticated account.
    async fn current_user_email(&self) -> Result<String, ServerError>;

    /// Raw bytes of a non-Google file.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>, ServerError>;

    /// A Google Workspace file converted to `mime_type`.
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, ServerError>;

    /// Properties of every sheet in a spreadsheet.
    async fn sheet_properties(
        &self,
        spreadsheet_id: &str,
    ) -> Result<Vec<SheetProperties>, ServerError>;

    async fn get_values(&self, spreadsheet_id: &str, range: &str)
        -> Result<ValueRange, ServerError>;

    /// Write values with `USER_ENTERED` input semantics.
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<UpdateValuesResponse, ServerError>;

    /// Send a `batchUpdate` body as-is.
    async fn batch_update(&self, spreadsheet_id: &str, body: Value) -> Result<(), ServerError>;
}

/// Drive query matching files whose content or metadata contains `text`.
pub fn full_text_query(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!("fullText contains '{}'", escaped)
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

/// `reqwest`-backed implementation.
pub struct HttpDriveApi {
    client: reqwest::Client,
    tokens: TokenSource,
    drive_base: String,
    sheets_base: String,
}

impl HttpDriveApi {
    /// Build the client and check that credentials are usable.
    pub async fn connect(config: &DriveConfig) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ServerError::config(format!("Failed to build HTTP client: {}", e)))?;

        let tokens = TokenSource::from_config(config, client.clone());
        tokens.validate().await?;

        Ok(Self {
            client,
            tokens,
            drive_base: DRIVE_API_BASE.to_string(),
            sheets_base: SHEETS_API_BASE.to_string(),
        })
    }

    fn endpoint(&self, base: &str, segments: &[&str]) -> Result<Url, ServerError> {
        let mut url = Url::parse(base)
            .map_err(|e| ServerError::internal(format!("Bad API base '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ServerError::internal(format!("API base '{}' cannot have a path", base)))?
            .extend(segments);
        Ok(url)
    }

    fn drive(&self, segments: &[&str]) -> Result<Url, ServerError> {
        self.endpoint(&self.drive_base, segments)
    }

    fn sheets(&self, segments: &[&str]) -> Result<Url, ServerError> {
        self.endpoint(&self.sheets_base, segments)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<reqwest::Response, ServerError> {
        let token = self.tokens.access_token().await?;
        debug!("{}", action);

        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        warn!(status = status.as_u16(), "{} failed: {}", action, message);
        Err(ServerError::backend_with_status(
            format!("{} failed ({}): {}", action, status, message),
            status.as_u16(),
        ))
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, ServerError> {
        let text = self.send(request, action).await?.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            error!("{} returned unparseable JSON: {}", action, e);
            ServerError::backend(format!("Unexpected response from {}: {}", action, e))
        })
    }
}

#[async_trait]
impl DriveApi for HttpDriveApi {
    async fn list_files(
        &self,
        page_size: u32,
        page_token: Option<&str>,
        query: Option<&str>,
    ) -> Result<FileList, ServerError> {
        let mut params = vec![
            ("pageSize", page_size.to_string()),
            ("fields", "nextPageToken, files(id, name, mimeType)".to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }

        let request = self.client.get(self.drive(&["files"])?).query(&params);
        self.json(request, "files.list").await
    }

    async fn file_metadata(&self, file_id: &str) -> Result<DriveFile, ServerError> {
        let request = self
            .client
            .get(self.drive(&["files", file_id])?)
            .query(&[("fields", "id, name, mimeType")]);
        self.json(request, "files.get").await
    }

    async fn file_access(&self, file_id: &str) -> Result<FileAccess, ServerError> {
        let request = self
            .client
            .get(self.drive(&["files", file_id])?)
            .query(&[("fields", "capabilities, permissions(type, role)")]);
        self.json(request, "files.get").await
    }

    async fn current_user_email(&self) -> Result<String, ServerError> {
        let request = self
            .client
            .get(self.drive(&["about"])?)
            .query(&[("fields", "user(emailAddress)")]);
        let about: About = self.json(request, "about.get").await?;
        about
            .user
            .email_address
            .ok_or_else(|| ServerError::backend("about.get returned no email address"))
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, ServerError> {
        let request = self
            .client
            .get(self.drive(&["files", file_id])?)
            .query(&[("alt", "media")]);
        let bytes = self.send(request, "files.get media").await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, ServerError> {
        let request = self
            .client
            .get(self.drive(&["files", file_id, "export"])?)
            .query(&[("mimeType", mime_type)]);
        let bytes = self.send(request, "files.export").await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn sheet_properties(
        &self,
        spreadsheet_id: &str,
    ) -> Result<Vec<SheetProperties>, ServerError> {
        let request = self
            .client
            .get(self.sheets(&["spreadsheets", spreadsheet_id])?)
            .query(&[("fields", "sheets.properties")]);
        let spreadsheet: Spreadsheet = self.json(request, "spreadsheets.get").await?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .collect())
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<ValueRange, ServerError> {
        let request = self
            .client
            .get(self.sheets(&["spreadsheets", spreadsheet_id, "values", range])?);
        self.json(request, "values.get").await
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<UpdateValuesResponse, ServerError> {
        let request = self
            .client
            .put(self.sheets(&["spreadsheets", spreadsheet_id, "values", range])?)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "range": range, "values": values }));
        self.json(request, "values.update").await
    }

    async fn batch_update(&self, spreadsheet_id: &str, body: Value) -> Result<(), ServerError> {
        let segment = format!("{}:batchUpdate", spreadsheet_id);
        let request = self
            .client
            .post(self.sheets(&["spreadsheets", &segment])?)
            .json(&body);
        self.send(request, "spreadsheets.batchUpdate").await?;
        Ok(())
    }
}

/// In-memory Drive used by unit tests across the crate.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct MockDrive {
        pub files: Vec<DriveFile>,
        pub access: HashMap<String, FileAccess>,
        pub content: HashMap<String, Vec<u8>>,
        pub sheets: HashMap<String, Vec<SheetProperties>>,
        pub values: HashMap<String, Vec<Vec<Value>>>,
        pub email: String,
        /// Every mutating or value call, rendered as a line.
        pub calls: Mutex<Vec<String>>,
        pub about_calls: AtomicUsize,
    }

    impl Default for MockDrive {
        fn default() -> Self {
            Self {
                files: Vec::new(),
                access: HashMap::new(),
                content: HashMap::new(),
                sheets: HashMap::new(),
                values: HashMap::new(),
                email: "me@example.com".to_string(),
                calls: Mutex::new(Vec::new()),
                about_calls: AtomicUsize::new(0),
            }
        }
    }

    impl MockDrive {
        pub fn with_file(mut self, id: &str, name: &str, mime_type: &str) -> Self {
            self.files.push(DriveFile {
                id: id.into(),
                name: name.into(),
                mime_type: mime_type.into(),
            });
            self
        }

        pub fn with_access(mut self, id: &str, access: FileAccess) -> Self {
            self.access.insert(id.into(), access);
            self
        }

        pub fn with_content(mut self, id: &str, bytes: &[u8]) -> Self {
            self.content.insert(id.into(), bytes.to_vec());
            self
        }

        pub fn with_sheets(mut self, id: &str, sheets: Vec<SheetProperties>) -> Self {
            self.sheets.insert(id.into(), sheets);
            self
        }

        pub fn with_values(mut self, range: &str, values: Vec<Vec<Value>>) -> Self {
            self.values.insert(range.into(), values);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, line: String) {
            self.calls.lock().unwrap().push(line);
        }

        fn not_found(id: &str) -> ServerError {
            ServerError::backend_with_status(format!("File not found: {id}"), 404)
        }
    }

    #[async_trait]
    impl DriveApi for MockDrive {
        async fn list_files(
            &self,
            page_size: u32,
            page_token: Option<&str>,
            query: Option<&str>,
        ) -> Result<FileList, ServerError> {
            if let Some(q) = query {
                self.record(format!("list q={q}"));
            }
            let start = page_token
                .and_then(|t| t.strip_prefix("page-"))
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(0);
            let end = (start + page_size as usize).min(self.files.len());
            Ok(FileList {
                files: self.files[start.min(end)..end].to_vec(),
                next_page_token: (end < self.files.len()).then(|| format!("page-{end}")),
            })
        }

        async fn file_metadata(&self, file_id: &str) -> Result<DriveFile, ServerError> {
            self.files
                .iter()
                .find(|f| f.id == file_id)
                .cloned()
                .ok_or_else(|| Self::not_found(file_id))
        }

        async fn file_access(&self, file_id: &str) -> Result<FileAccess, ServerError> {
            self.access
                .get(file_id)
                .cloned()
                .ok_or_else(|| Self::not_found(file_id))
        }

        async fn current_user_email(&self) -> Result<String, ServerError> {
            self.about_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.email.clone())
        }

        async fn download(&self, file_id: &str) -> Result<Vec<u8>, ServerError> {
            self.record(format!("download {file_id}"));
            self.content
                .get(file_id)
                .cloned()
                .ok_or_else(|| Self::not_found(file_id))
        }

        async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, ServerError> {
            self.record(format!("export {file_id} {mime_type}"));
            self.content
                .get(file_id)
                .cloned()
                .ok_or_else(|| Self::not_found(file_id))
        }

        async fn sheet_properties(
            &self,
            spreadsheet_id: &str,
        ) -> Result<Vec<SheetProperties>, ServerError> {
            self.sheets
                .get(spreadsheet_id)
                .cloned()
                .ok_or_else(|| Self::not_found(spreadsheet_id))
        }

        async fn get_values(
            &self,
            spreadsheet_id: &str,
            range: &str,
        ) -> Result<ValueRange, ServerError> {
            self.record(format!("get {spreadsheet_id} {range}"));
            Ok(ValueRange {
                range: Some(range.to_string()),
                values: self.values.get(range).cloned().unwrap_or_default(),
            })
        }

        async fn update_values(
            &self,
            spreadsheet_id: &str,
            range: &str,
            values: Vec<Vec<Value>>,
        ) -> Result<UpdateValuesResponse, ServerError> {
            self.record(format!("update {spreadsheet_id} {range}"));
            let rows = values.len() as u32;
            let columns = values.iter().map(Vec::len).max().unwrap_or(0) as u32;
            Ok(UpdateValuesResponse {
                updated_range: Some(range.to_string()),
                updated_rows: rows,
                updated_columns: columns,
                updated_cells: values.iter().map(Vec::len).sum::<usize>() as u32,
            })
        }

        async fn batch_update(&self, spreadsheet_id: &str, body: Value) -> Result<(), ServerError> {
            self.record(format!("batch {spreadsheet_id} {body}"));
            Ok(())
        }
    }
}
