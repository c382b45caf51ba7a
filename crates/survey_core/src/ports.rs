//! crates/survey_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or mail
//! gateways.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::definition::SurveyDefinition;
use crate::domain::{
    AnswerRow, CodeSnippet, InvitationMail, IssuedSession, PendingCohort, SessionHandle,
    SurveyInfo,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for the survey catalog, response records, answers, and
/// the pending-invitee queue.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    // --- Catalog ---
    async fn list_surveys(&self) -> PortResult<Vec<SurveyInfo>>;

    async fn find_survey_by_name(&self, name: &str) -> PortResult<Option<SurveyInfo>>;

    async fn find_survey_by_id(&self, survey_id: i64) -> PortResult<Option<SurveyInfo>>;

    /// The survey a response record belongs to.
    async fn survey_for_response(&self, response_id: i64) -> PortResult<Option<SurveyInfo>>;

    // --- Answers ---
    /// Appends every answer of one accepted page submission in a single
    /// transaction. Never updates or deletes existing rows.
    async fn append_page_answers(
        &self,
        response_id: i64,
        answers: &[(String, String)],
    ) -> PortResult<()>;

    /// All answer rows for a record, in insertion order.
    async fn answers_for(&self, response_id: i64) -> PortResult<Vec<AnswerRow>>;

    // --- Invitee queue ---
    /// Atomically drains the pending invitees of one (survey, group)
    /// cohort. Concurrent calls for the same cohort cannot both receive
    /// the same invitee.
    async fn take_pending_invitees(&self, survey_id: i64, group: &str)
        -> PortResult<Vec<String>>;

    async fn pending_cohorts(&self) -> PortResult<Vec<PendingCohort>>;
}

/// The token/session resolver: maps opaque tokens to (response record,
/// page index) and advances them.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Creates a new response record for (survey, group) and a fresh
    /// token bound to `initial_page`, atomically.
    async fn issue(&self, survey_id: i64, group: &str, initial_page: i32)
        -> PortResult<IssuedSession>;

    /// Pure lookup, plus a touch of the session's last-used time for
    /// the retention sweep.
    async fn find(&self, token: &str) -> PortResult<Option<SessionHandle>>;

    /// Atomically steps the page index from `from_page` to
    /// `from_page + 1`. Returns false if the session was not at
    /// `from_page`, which is how a duplicate concurrent submit is
    /// detected and rejected.
    async fn advance(&self, token: &str, from_page: i32) -> PortResult<bool>;

    /// Removes sessions untouched since `cutoff`. Run out-of-band, not
    /// on the request path. Returns the number removed.
    async fn clean(&self, cutoff: DateTime<Utc>) -> PortResult<u64>;
}

/// Loads and validates survey definition documents.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn load(&self, file: &str) -> PortResult<Arc<SurveyDefinition>>;
}

/// Resolves a page's code listing reference to its source text and
/// syntax-highlighting identifiers.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    async fn load(&self, file: &str) -> PortResult<CodeSnippet>;
}

/// Asynchronous invitation delivery. Fire-and-forget by contract: no
/// per-message confirmation flows back into the core.
#[async_trait]
pub trait MailDelivery: Send + Sync {
    async fn send_batch(&self, batch: Vec<InvitationMail>) -> PortResult<()>;
}
