//! services/web/src/web/invitations.rs
//!
//! The invitation issuer: drains a cohort's pending invitees, mints one
//! response record and token per invitee, and hands the batch to the
//! asynchronous mail delivery task.

use crate::error::ApiError;
use crate::web::state::AppState;
use std::sync::Arc;
use survey_core::domain::InvitationMail;
use survey_core::ports::PortError;
use tracing::{error, info};

/// Issues invitations for one (survey, group) cohort.
///
/// The queue drain is a single atomic statement, so a concurrent call
/// for the same cohort issues nothing. Invitees start at the first
/// content page; the intro is part of the invitation mail. Delivery is
/// handed off to a spawned task and never awaited: a record and token
/// count as issued the moment they are created, and a failed batch is a
/// lost invitation the operator has to re-queue.
pub async fn issue_invitations(
    state: Arc<AppState>,
    survey_id: i64,
    group: &str,
) -> Result<usize, ApiError> {
    let emails = state.store.take_pending_invitees(survey_id, group).await?;
    if emails.is_empty() {
        return Ok(0);
    }

    let survey = state
        .store
        .find_survey_by_id(survey_id)
        .await?
        .ok_or_else(|| PortError::NotFound(format!("Survey {}", survey_id)))?;
    let def = state.definitions.load(&survey.file).await?;
    let subject = def
        .email_subject
        .clone()
        .unwrap_or_else(|| def.title.clone());

    let mut batch = Vec::with_capacity(emails.len());
    for addr in emails {
        let issued = state.sessions.issue(survey_id, group, 0).await?;
        batch.push(InvitationMail {
            to: addr,
            subject: subject.clone(),
            url: format!("{}/page/{}", state.config.base_url, issued.token),
        });
    }

    let count = batch.len();
    info!(survey = %survey.name, group, count, "Issued invitation batch");

    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_batch(batch).await {
            error!("Invitation delivery failed: {}", e);
        }
    });

    Ok(count)
}
