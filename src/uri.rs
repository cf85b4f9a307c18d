//! Resource URI encoding and decoding.
//!
//! ## URI Scheme
//!
//! - `mssql://host:port/database/{table}/schema` - column list of a table
//! - `gdrive:///{fileId}` - contents of a Drive file
//!
//! Table names are percent-encoded so any name survives a round trip.
//! Host and database come from configuration and never carry credentials.

use crate::constants::{GDRIVE_URI_PREFIX, SCHEMA_VIEW};
use crate::error::ServerError;
use std::fmt;

/// Which projection of an object a resource URI addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceView {
    /// Column names and types of a table.
    Schema,
    /// The object's own content; the object type decides the representation.
    Content,
}

impl fmt::Display for ResourceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceView::Schema => write!(f, "{}", SCHEMA_VIEW),
            ResourceView::Content => write!(f, "content"),
        }
    }
}

/// A decoded resource address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
    /// Backend-native identifier (table name or file id).
    pub object: String,
    /// Requested view.
    pub view: ResourceView,
}

impl ResourceAddress {
    pub fn new(object: impl Into<String>, view: ResourceView) -> Self {
        Self {
            object: object.into(),
            view,
        }
    }
}

/// Encoder/decoder for one backend's resource URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriCodec {
    /// `<base>/<table>/schema`, where base is `mssql://host:port/database`.
    Table { base: String },
    /// `gdrive:///<fileId>`.
    Drive,
}

impl UriCodec {
    /// Codec for table URIs under the given base.
    pub fn table(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self::Table {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Encode an address into a URI.
    pub fn encode(&self, address: &ResourceAddress) -> Result<String, ServerError> {
        if address.object.is_empty() {
            return Err(ServerError::invalid_uri(
                "",
                "object identifier must not be empty",
            ));
        }

        match (self, address.view) {
            (UriCodec::Table { base }, ResourceView::Schema) => Ok(format!(
                "{}/{}/{}",
                base,
                urlencoding::encode(&address.object),
                SCHEMA_VIEW
            )),
            (UriCodec::Drive, ResourceView::Content) => {
                Ok(format!("{}{}", GDRIVE_URI_PREFIX, address.object))
            }
            (_, view) => Err(ServerError::invalid_uri(
                address.object.clone(),
                format!("view '{}' is not addressable by this backend", view),
            )),
        }
    }

    /// Decode a URI into an address.
    pub fn decode(&self, uri: &str) -> Result<ResourceAddress, ServerError> {
        match self {
            UriCodec::Table { base } => {
                let rest = uri
                    .strip_prefix(base.as_str())
                    .and_then(|r| r.strip_prefix('/'))
                    .ok_or_else(|| {
                        ServerError::invalid_uri(uri, format!("URI must start with '{}/'", base))
                    })?;

                let (table, view) = rest.rsplit_once('/').ok_or_else(|| {
                    ServerError::invalid_uri(uri, "expected '<table>/schema' after the base")
                })?;

                if view != SCHEMA_VIEW {
                    return Err(ServerError::invalid_uri(
                        uri,
                        format!("trailing segment must be '{}', got '{}'", SCHEMA_VIEW, view),
                    ));
                }

                if table.is_empty() || table.contains('/') {
                    return Err(ServerError::invalid_uri(uri, "malformed table segment"));
                }

                let table = urlencoding::decode(table)
                    .map_err(|e| ServerError::invalid_uri(uri, format!("bad encoding: {}", e)))?;

                Ok(ResourceAddress::new(table.into_owned(), ResourceView::Schema))
            }
            UriCodec::Drive => {
                let file_id = uri.strip_prefix(GDRIVE_URI_PREFIX).ok_or_else(|| {
                    ServerError::invalid_uri(
                        uri,
                        format!("URI must start with '{}'", GDRIVE_URI_PREFIX),
                    )
                })?;

                if file_id.is_empty() || file_id.contains('/') {
                    return Err(ServerError::invalid_uri(uri, "malformed file id"));
                }

                Ok(ResourceAddress::new(file_id, ResourceView::Content))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_codec() -> UriCodec {
        UriCodec::table("mssql://db.internal:1433/sales")
    }

    #[test]
    fn test_table_round_trip() {
        let codec = table_codec();
        for name in ["users", "Order Details", "weird/name", "percent%sign", "ünïcode"] {
            let address = ResourceAddress::new(name, ResourceView::Schema);
            let uri = codec.encode(&address).unwrap();
            assert!(uri.starts_with("mssql://db.internal:1433/sales/"));
            assert!(uri.ends_with("/schema"));
            assert_eq!(codec.decode(&uri).unwrap(), address);
        }
    }

    #[test]
    fn test_table_uri_shape() {
        let uri = table_codec()
            .encode(&ResourceAddress::new("users", ResourceView::Schema))
            .unwrap();
        assert_eq!(uri, "mssql://db.internal:1433/sales/users/schema");
    }

    #[test]
    fn test_drive_round_trip() {
        let address = ResourceAddress::new("1AbC_d-Ef", ResourceView::Content);
        let uri = UriCodec::Drive.encode(&address).unwrap();
        assert_eq!(uri, "gdrive:///1AbC_d-Ef");
        assert_eq!(UriCodec::Drive.decode(&uri).unwrap(), address);
    }

    #[test]
    fn test_wrong_view_segment_rejected() {
        let err = table_codec()
            .decode("mssql://db.internal:1433/sales/users/data")
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidResourceUri { .. }));
        assert!(err.to_string().contains("schema"));
    }

    #[test]
    fn test_unrecognized_prefix_rejected() {
        let codec = table_codec();
        assert!(codec.decode("postgres://db/sales/users/schema").is_err());
        assert!(codec.decode("mssql://other:1433/sales/users/schema").is_err());
        assert!(UriCodec::Drive.decode("gdrive://abc").is_err());
        assert!(UriCodec::Drive.decode("gdrive:///").is_err());
    }

    #[test]
    fn test_view_not_supported_by_scheme() {
        let err = UriCodec::Drive
            .encode(&ResourceAddress::new("abc", ResourceView::Schema))
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidResourceUri { .. }));

        let err = table_codec()
            .encode(&ResourceAddress::new("users", ResourceView::Content))
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidResourceUri { .. }));
    }
}
