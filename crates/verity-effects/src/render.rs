//! Plain-text document renderer

use async_trait::async_trait;
use verity_core::effects::{RenderEffects, RenderError, RenderRequest, RenderedDocument};

/// Renders an issued letter as UTF-8 text
///
/// The footer carries the fingerprint and the verification link so a paper
/// copy can be checked by either key.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    /// Create a text renderer
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RenderEffects for TextRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, RenderError> {
        if request.letter.content.trim().is_empty() {
            return Err(RenderError::new("letter has no content"));
        }
        let letter = &request.letter;
        let issuance = &request.issuance;
        let department = request
            .department
            .as_ref()
            .map_or(letter.department_id.as_str(), |d| d.name.as_str());

        let body = format!(
            "{context} / {department}\n\
             Ref. No. {number}\n\
             Date: {date}\n\n\
             {content}\n\n\
             Hash: {fingerprint}\n\
             Verify: {url}\n",
            context = letter.context,
            number = issuance.letter_number,
            date = issuance.issued_at.format("%Y-%m-%d"),
            content = letter.content,
            fingerprint = issuance.fingerprint,
            url = request.verification_url,
        );

        Ok(RenderedDocument {
            media_type: "text/plain; charset=utf-8".to_string(),
            bytes: body.into_bytes(),
        })
    }
}
