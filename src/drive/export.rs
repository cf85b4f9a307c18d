//! Fetching file content for resource reads.
//!
//! Google Workspace files have no bytes of their own and must be exported;
//! everything else is downloaded as-is.

use crate::drive::api::DriveApi;
use crate::drive::types::FileContent;
use crate::error::ServerError;
use tracing::debug;

const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps";

/// Export format for a Google Workspace MIME type, `None` for regular files.
pub fn export_mime_type(mime_type: &str) -> Option<&'static str> {
    if !mime_type.starts_with(GOOGLE_APPS_PREFIX) {
        return None;
    }
    Some(match mime_type {
        "application/vnd.google-apps.document" => "text/markdown",
        "application/vnd.google-apps.spreadsheet" => "text/csv",
        "application/vnd.google-apps.presentation" => "text/plain",
        "application/vnd.google-apps.drawing" => "image/png",
        _ => "text/plain",
    })
}

/// Whether content of this type is returned as text rather than a blob.
pub fn is_textual(mime_type: &str) -> bool {
    mime_type.starts_with("text/") || mime_type == "application/json"
}

/// Read a file's content, exporting Workspace documents.
pub async fn read_file<A>(api: &A, file_id: &str) -> Result<FileContent, ServerError>
where
    A: DriveApi + ?Sized,
{
    let file = api.file_metadata(file_id).await?;

    match export_mime_type(&file.mime_type) {
        Some(target) => {
            debug!(file_id, from = %file.mime_type, to = target, "Exporting file");
            Ok(FileContent {
                mime_type: target.to_string(),
                bytes: api.export(file_id, target).await?,
            })
        }
        None => Ok(FileContent {
            bytes: api.download(file_id).await?,
            mime_type: file.mime_type,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::api::mock::MockDrive;

    #[test]
    fn test_export_mapping() {
        assert_eq!(
            export_mime_type("application/vnd.google-apps.document"),
            Some("text/markdown")
        );
        assert_eq!(
            export_mime_type("application/vnd.google-apps.spreadsheet"),
            Some("text/csv")
        );
        assert_eq!(
            export_mime_type("application/vnd.google-apps.drawing"),
            Some("image/png")
        );
        assert_eq!(
            export_mime_type("application/vnd.google-apps.form"),
            Some("text/plain")
        );
        assert_eq!(export_mime_type("application/pdf"), None);
    }

    #[test]
    fn test_textual_types() {
        assert!(is_textual("text/csv"));
        assert!(is_textual("application/json"));
        assert!(!is_textual("image/png"));
        assert!(!is_textual("application/pdf"));
    }

    #[tokio::test]
    async fn test_read_exports_docs_and_downloads_others() {
        let drive = MockDrive::default()
            .with_file("doc", "Notes", "application/vnd.google-apps.document")
            .with_file("pdf", "Report", "application/pdf")
            .with_content("doc", b"# Notes")
            .with_content("pdf", b"%PDF-1.7");

        let doc = read_file(&drive, "doc").await.unwrap();
        assert_eq!(doc.mime_type, "text/markdown");
        assert_eq!(doc.bytes, b"# Notes");

        let pdf = read_file(&drive, "pdf").await.unwrap();
        assert_eq!(pdf.mime_type, "application/pdf");

        assert_eq!(
            drive.calls(),
            vec!["export doc text/markdown".to_string(), "download pdf".to_string()]
        );
    }
}
