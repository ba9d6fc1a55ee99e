//! Document rendering port
//!
//! Rendering is a collaborator outside the transactional core. A failure here
//! never rolls back an issuance; the caller marks the render status instead.

use crate::errors::VerityError;
use crate::types::{Department, Issuance, Letter};
use async_trait::async_trait;

/// Everything a renderer needs to produce the issued document
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Letter as issued
    pub letter: Letter,
    /// Issuance being rendered
    pub issuance: Issuance,
    /// Department shown on the letterhead
    pub department: Option<Department>,
    /// URL encoded in the verification QR code
    pub verification_url: String,
}

/// Rendered output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// MIME type of `bytes`
    pub media_type: String,
    /// Document bytes
    pub bytes: Vec<u8>,
}

/// Renderer failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("render failed: {reason}")]
pub struct RenderError {
    /// Reason reported by the renderer
    pub reason: String,
}

impl RenderError {
    /// Create a render error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<RenderError> for VerityError {
    fn from(err: RenderError) -> Self {
        VerityError::rendering(err.reason)
    }
}

/// Produces the printable document for an issuance
#[async_trait]
pub trait RenderEffects: Send + Sync {
    /// Render one issued letter
    async fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, RenderError>;
}
