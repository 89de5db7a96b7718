use serde::{Deserialize, Serialize};

use crate::types::RevisionRef;
use crate::{Error, Result};

/// Preview authorization supplied by the caller for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSession {
    pub active: bool,
    pub revision_ref: Option<String>,
}

impl PreviewSession {
    pub fn published() -> Self {
        Self::default()
    }

    pub fn draft(revision_ref: impl Into<String>) -> Self {
        Self {
            active: true,
            revision_ref: Some(revision_ref.into()),
        }
    }
}

/// Picks the revision every repository query of this request must read.
///
/// An active session without a usable ref is an error rather than a silent
/// fall back to published content.
pub fn resolve_revision(session: &PreviewSession) -> Result<RevisionRef> {
    if !session.active {
        return Ok(RevisionRef::Published);
    }

    match session.revision_ref.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => Ok(RevisionRef::Draft(token.to_string())),
        Some(_) => Err(Error::PreviewResolution("preview token is blank".to_string())),
        None => Err(Error::PreviewResolution(
            "preview requested without a preview token".to_string(),
        )),
    }
}
