//! Drive v3 and Sheets v4 wire types.
//!
//! Only the fields this server reads are modeled. Google omits zero-valued
//! fields from JSON (a first sheet's `sheetId` of 0, for example), so numeric
//! fields default.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Drive
// =============================================================================

/// A file as returned by `files.list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

/// `files.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// Capability flags for the calling identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_download: bool,
    #[serde(default)]
    pub can_comment: bool,
}

/// One sharing entry on a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// `user`, `group`, `domain` or `anyone`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// `files.get?fields=capabilities,permissions` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileAccess {
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Absent when the caller may not see the sharing list.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// `about?fields=user(emailAddress)` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct About {
    #[serde(default)]
    pub user: AboutUser,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutUser {
    pub email_address: Option<String>,
}

/// Downloaded or exported file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// Sheets
// =============================================================================

/// `spreadsheets.get?fields=sheets.properties` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Spreadsheet {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub grid_properties: GridProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
}

/// `values.get` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    /// Omitted entirely when the range is empty.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

/// `values.update` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: u32,
    #[serde(default)]
    pub updated_columns: u32,
    #[serde(default)]
    pub updated_cells: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sheet_id_defaults_to_zero() {
        let json = r#"{"sheets":[
            {"properties":{"title":"Sheet1","gridProperties":{"rowCount":1000,"columnCount":26}}},
            {"properties":{"sheetId":42,"title":"Empty","gridProperties":{"columnCount":26}}}
        ]}"#;
        let parsed: Spreadsheet = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sheets[0].properties.sheet_id, 0);
        assert_eq!(parsed.sheets[1].properties.sheet_id, 42);
        assert_eq!(parsed.sheets[1].properties.grid_properties.row_count, 0);
    }

    #[test]
    fn test_access_without_permissions() {
        let parsed: FileAccess =
            serde_json::from_str(r#"{"capabilities":{"canEdit":true}}"#).unwrap();
        assert!(parsed.capabilities.can_edit);
        assert!(!parsed.capabilities.can_download);
        assert!(parsed.permissions.is_empty());
    }
}
