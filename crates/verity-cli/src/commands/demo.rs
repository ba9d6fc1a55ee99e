//! End-to-end scenario against the in-memory effect system

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use verity_core::{Actor, Channel, Department, DepartmentId, IssuingContext, Role, VerityConfig};
use verity_effects::VerityEffectSystem;
use verity_workflow::{LetterService, NewLetter};

/// Create, approve, issue, verify, revoke and verify again, printing each verdict
pub async fn run(config: VerityConfig) -> Result<()> {
    let effects = Arc::new(VerityEffectSystem::in_memory());
    effects
        .store()
        .insert_department(Department {
            id: DepartmentId::new("dept-demo"),
            name: "Demo Department".to_string(),
            context: IssuingContext::Company,
        })
        .await;

    let access_key = config.verify_access_key.clone();
    let service = LetterService::new(effects, config)?;

    let author = Actor::new("demo-author", [Role::User]);
    let approver = Actor::new("demo-approver", [Role::Approver]);
    let issuer = Actor::new("demo-issuer", [Role::Issuer]);
    let admin = Actor::new("demo-admin", [Role::Admin]);

    let letter = service
        .create_letter(
            &author,
            NewLetter {
                context: IssuingContext::Company,
                department_id: DepartmentId::new("dept-demo"),
                tag_ids: json!(["employment", "reference"]),
                content: "To whom it may concern: this confirms employment.".to_string(),
                committee_id: None,
            },
        )
        .await?;
    info!(letter_id = %letter.id, "demo letter drafted");

    service.approve(&approver, &letter.id, None).await?;
    let outcome = service.issue(&issuer, &letter.id, Channel::Email).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "issued": outcome.receipt,
            "verification_url": outcome.verification_url,
            "render_status": outcome.render_status,
        }))?
    );

    let key = outcome.receipt.fingerprint.to_hex();
    let verdict = service.verify(access_key.as_deref(), &key).await?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    service
        .revoke(&admin, &letter.id, Some("demo revocation".to_string()))
        .await?;
    let verdict = service.verify(access_key.as_deref(), &key).await?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    Ok(())
}
