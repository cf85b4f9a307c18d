//! Capability checks against the calling identity.
//!
//! Decisions are computed per request from fresh metadata and never cached.
//! The identity email is only looked up when a denial needs a diagnostic.

use crate::drive::api::DriveApi;
use crate::drive::types::FileAccess;
use crate::error::ServerError;
use tracing::{debug, warn};

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub readable: bool,
    pub editable: bool,
    /// Short explanation, for logs.
    pub reason: String,
}

impl AccessDecision {
    /// Derive the decision from file metadata.
    pub fn from_metadata(access: &FileAccess) -> Self {
        let caps = &access.capabilities;
        let shared = access
            .permissions
            .iter()
            .find(|p| p.kind == "anyone" || p.kind == "domain");

        let editable = caps.can_edit;
        let readable = shared.is_some() || caps.can_edit || caps.can_download || caps.can_comment;

        let reason = if editable {
            "account can edit".to_string()
        } else if let Some(p) = shared {
            format!("shared with {}", p.kind)
        } else if readable {
            "account has view capabilities".to_string()
        } else {
            "no capabilities and not publicly shared".to_string()
        };

        Self {
            readable,
            editable,
            reason,
        }
    }

    fn allows(&self, require_edit: bool) -> bool {
        if require_edit {
            self.editable
        } else {
            self.readable
        }
    }
}

/// Check that the current identity may read (or edit) a file.
pub async fn verify<A>(
    api: &A,
    file_id: &str,
    require_edit: bool,
) -> Result<AccessDecision, ServerError>
where
    A: DriveApi + ?Sized,
{
    let access = match api.file_access(file_id).await {
        Ok(access) => access,
        Err(ServerError::Backend {
            status: Some(403 | 404),
            ..
        }) => {
            return Err(ServerError::NotFoundOrForbidden {
                file_id: file_id.to_string(),
                identity: current_identity(api).await,
            })
        }
        Err(e) => return Err(e),
    };

    let decision = AccessDecision::from_metadata(&access);
    debug!(
        file_id,
        require_edit,
        readable = decision.readable,
        editable = decision.editable,
        reason = %decision.reason,
        "Access check"
    );

    if decision.allows(require_edit) {
        return Ok(decision);
    }

    Err(ServerError::AccessDenied {
        require_edit,
        identity: current_identity(api).await,
    })
}

/// Email of the signed-in account, for denial diagnostics only.
async fn current_identity<A>(api: &A) -> String
where
    A: DriveApi + ?Sized,
{
    match api.current_user_email().await {
        Ok(email) => email,
        Err(e) => {
            warn!("Could not look up the current account: {}", e);
            "(unknown account)".to_string()
        }
    }
}
