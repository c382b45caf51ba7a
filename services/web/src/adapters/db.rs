//! services/web/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SurveyStore` and `SessionResolver` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use survey_core::domain::{
    AnswerRow, IssuedSession, PendingCohort, SessionHandle, SurveyInfo,
};
use survey_core::ports::{PortError, PortResult, SessionResolver, SurveyStore};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SurveyStore` and
/// `SessionResolver` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SurveyRecord {
    id: i64,
    name: String,
    file: String,
}
impl SurveyRecord {
    fn to_domain(self) -> SurveyInfo {
        SurveyInfo {
            id: self.id,
            name: self.name,
            file: self.file,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    response_id: i64,
    page: i32,
}
impl SessionRecord {
    fn to_domain(self) -> SessionHandle {
        SessionHandle {
            response_id: self.response_id,
            page: self.page,
        }
    }
}

#[derive(FromRow)]
struct AnswerRecord {
    question: String,
    reply: String,
}
impl AnswerRecord {
    fn to_domain(self) -> AnswerRow {
        AnswerRow {
            question: self.question,
            reply: self.reply,
        }
    }
}

#[derive(FromRow)]
struct CohortRecord {
    survey_id: i64,
    survey_name: String,
    group_tag: String,
}
impl CohortRecord {
    fn to_domain(self) -> PendingCohort {
        PendingCohort {
            survey_id: self.survey_id,
            survey_name: self.survey_name,
            group: self.group_tag,
        }
    }
}

//=========================================================================================
// `SurveyStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SurveyStore for DbAdapter {
    async fn list_surveys(&self) -> PortResult<Vec<SurveyInfo>> {
        let records = sqlx::query_as::<_, SurveyRecord>(
            "SELECT id, name, file FROM surveys ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_survey_by_name(&self, name: &str) -> PortResult<Option<SurveyInfo>> {
        let record = sqlx::query_as::<_, SurveyRecord>(
            "SELECT id, name, file FROM surveys WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn find_survey_by_id(&self, survey_id: i64) -> PortResult<Option<SurveyInfo>> {
        let record = sqlx::query_as::<_, SurveyRecord>(
            "SELECT id, name, file FROM surveys WHERE id = $1",
        )
        .bind(survey_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn survey_for_response(&self, response_id: i64) -> PortResult<Option<SurveyInfo>> {
        let record = sqlx::query_as::<_, SurveyRecord>(
            "SELECT s.id, s.name, s.file FROM surveys s \
             INNER JOIN responses r ON r.survey_id = s.id WHERE r.id = $1",
        )
        .bind(response_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn append_page_answers(
        &self,
        response_id: i64,
        answers: &[(String, String)],
    ) -> PortResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        for (question, reply) in answers {
            sqlx::query("INSERT INTO answers (response_id, question, reply) VALUES ($1, $2, $3)")
                .bind(response_id)
                .bind(question)
                .bind(reply)
                .execute(&mut *tx)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn answers_for(&self, response_id: i64) -> PortResult<Vec<AnswerRow>> {
        let records = sqlx::query_as::<_, AnswerRecord>(
            "SELECT question, reply FROM answers WHERE response_id = $1 ORDER BY id ASC",
        )
        .bind(response_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn take_pending_invitees(
        &self,
        survey_id: i64,
        group: &str,
    ) -> PortResult<Vec<String>> {
        // A single statement, so concurrent issuance calls for the same
        // cohort cannot both receive an invitee.
        let emails: Vec<(String,)> = sqlx::query_as(
            "DELETE FROM pending_invitees WHERE survey_id = $1 AND group_tag = $2 \
             RETURNING email",
        )
        .bind(survey_id)
        .bind(group)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(emails.into_iter().map(|(email,)| email).collect())
    }

    async fn pending_cohorts(&self) -> PortResult<Vec<PendingCohort>> {
        let records = sqlx::query_as::<_, CohortRecord>(
            "SELECT DISTINCT p.survey_id, s.name AS survey_name, p.group_tag \
             FROM pending_invitees p INNER JOIN surveys s ON p.survey_id = s.id \
             ORDER BY s.name, p.group_tag",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `SessionResolver` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionResolver for DbAdapter {
    async fn issue(
        &self,
        survey_id: i64,
        group: &str,
        initial_page: i32,
    ) -> PortResult<IssuedSession> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let (response_id,): (i64,) = sqlx::query_as(
            "INSERT INTO responses (survey_id, group_tag) VALUES ($1, $2) RETURNING id",
        )
        .bind(survey_id)
        .bind(group)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let token = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO sessions (token, response_id, page) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(response_id)
            .bind(initial_page)
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(IssuedSession { token, response_id })
    }

    async fn find(&self, token: &str) -> PortResult<Option<SessionHandle>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "UPDATE sessions SET last_used = now() WHERE token = $1 \
             RETURNING response_id, page",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn advance(&self, token: &str, from_page: i32) -> PortResult<bool> {
        // Compare-and-set: a concurrent duplicate submit finds the page
        // already moved and affects zero rows.
        let result = sqlx::query(
            "UPDATE sessions SET page = page + 1, last_used = now() \
             WHERE token = $1 AND page = $2",
        )
        .bind(token)
        .bind(from_page)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn clean(&self, cutoff: DateTime<Utc>) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE last_used < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
