//! Randomness for identifiers and verification tokens

use crate::types::{AcknowledgementId, IssuanceId, PrintRequestId, VerificationToken};
use async_trait::async_trait;
use uuid::Uuid;

/// Random identifier generation
///
/// Verification tokens must be unguessable; handlers backed by a seeded
/// generator are for tests only.
#[async_trait]
pub trait RandomEffects: Send + Sync {
    /// Fresh random UUID
    async fn random_uuid(&self) -> Uuid;

    /// Fresh verification token
    async fn verification_token(&self) -> VerificationToken {
        VerificationToken::from_uuid(self.random_uuid().await)
    }

    /// Fresh issuance id
    async fn issuance_id(&self) -> IssuanceId {
        IssuanceId::from_uuid(self.random_uuid().await)
    }

    /// Fresh reprint request id
    async fn print_request_id(&self) -> PrintRequestId {
        PrintRequestId::from_uuid(self.random_uuid().await)
    }

    /// Fresh acknowledgement id
    async fn acknowledgement_id(&self) -> AcknowledgementId {
        AcknowledgementId::from_uuid(self.random_uuid().await)
    }
}
