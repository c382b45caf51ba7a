//! crates/survey_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

/// One row of the survey catalog. `file` names the definition document
/// the loader resolves it from.
#[derive(Debug, Clone)]
pub struct SurveyInfo {
    pub id: i64,
    pub name: String,
    pub file: String,
}

/// One respondent's attempt at one survey. Immutable once created;
/// the core never deletes these.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub id: i64,
    pub survey_id: i64,
    pub group: String,
    pub created_at: DateTime<Utc>,
}

/// One encoded answer for one question within a response record.
/// Rows are append-only; repeat submissions accumulate.
#[derive(Debug, Clone)]
pub struct AnswerRow {
    pub question: String,
    pub reply: String,
}

/// Where a session currently sits in the page flow.
///
/// The session table stores the raw index: -1 for the intro, 0..N-1 for
/// the content pages, and anything >= N for the completed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePosition {
    Intro,
    Content(usize),
    Done,
}

impl PagePosition {
    /// Interprets a stored page index against a survey with `page_count`
    /// content pages.
    pub fn from_index(index: i32, page_count: usize) -> Self {
        if index < 0 {
            PagePosition::Intro
        } else if (index as usize) < page_count {
            PagePosition::Content(index as usize)
        } else {
            PagePosition::Done
        }
    }

    /// The raw index this position is stored as.
    pub fn index(&self, page_count: usize) -> i32 {
        match self {
            PagePosition::Intro => -1,
            PagePosition::Content(p) => *p as i32,
            PagePosition::Done => page_count as i32,
        }
    }
}

/// A resolved session token: which response record it is bound to and
/// the raw page index it currently points at.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub response_id: i64,
    pub page: i32,
}

/// The result of minting a new session: the opaque token plus the
/// response record it anchors.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub response_id: i64,
}

/// A (survey, group) pair that still has invitees queued for delivery.
#[derive(Debug, Clone)]
pub struct PendingCohort {
    pub survey_id: i64,
    pub survey_name: String,
    pub group: String,
}

/// One outbound invitation, ready for the delivery collaborator.
#[derive(Debug, Clone)]
pub struct InvitationMail {
    pub to: String,
    pub subject: String,
    pub url: String,
}

/// A code listing attached to a survey page, with the identifiers the
/// front end needs for syntax highlighting.
#[derive(Debug, Clone)]
pub struct CodeSnippet {
    pub source: String,
    pub brush: String,
    pub script: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_maps_raw_indices() {
        assert_eq!(PagePosition::from_index(-1, 3), PagePosition::Intro);
        assert_eq!(PagePosition::from_index(0, 3), PagePosition::Content(0));
        assert_eq!(PagePosition::from_index(2, 3), PagePosition::Content(2));
        assert_eq!(PagePosition::from_index(3, 3), PagePosition::Done);
        assert_eq!(PagePosition::from_index(7, 3), PagePosition::Done);
    }

    #[test]
    fn position_round_trips_through_index() {
        for raw in [-1, 0, 1, 2, 3] {
            let pos = PagePosition::from_index(raw, 3);
            assert_eq!(PagePosition::from_index(pos.index(3), 3), pos);
        }
    }
}
