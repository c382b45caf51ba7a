//! services/web/src/web/fakes.rs
//!
//! In-memory port implementations backing the handler and invitation
//! issuer tests. Each fake keeps just enough state to observe the
//! property under test: the session map honors the compare-and-set
//! advance contract, the store drains its invitee queue atomically, and
//! the mailer records every batch it is handed.

use crate::config::Config;
use crate::web::state::AppState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use survey_core::definition::SurveyDefinition;
use survey_core::domain::{
    AnswerRow, CodeSnippet, InvitationMail, IssuedSession, PendingCohort, SessionHandle,
    SurveyInfo,
};
use survey_core::ports::{
    DefinitionSource, MailDelivery, PortError, PortResult, SessionResolver, SnippetStore,
    SurveyStore,
};
use tokio::sync::Notify;

/// A two-page definition with one options question per page; the first
/// question carries a free-text sentinel key and a reference answer.
pub(crate) fn two_page_definition() -> Arc<SurveyDefinition> {
    let mut def: SurveyDefinition = serde_json::from_value(serde_json::json!({
        "title": "Trial run",
        "open": true,
        "pages": [
            { "title": "First", "content": ["q_pick"] },
            { "title": "Second", "content": ["q_more"] }
        ],
        "questions": {
            "q_pick": {
                "type": "options",
                "caption": "Pick one",
                "keys": ["A", "B:"],
                "options": ["Alpha", "Other"],
                "correct": "A"
            },
            "q_more": {
                "type": "options",
                "caption": "Pick again",
                "keys": ["A", "B"],
                "options": ["Alpha", "Beta"]
            }
        }
    }))
    .expect("fixture definition deserializes");
    def.validate().expect("fixture definition validates");
    Arc::new(def)
}

/// Wires every fake into an `AppState` over one survey (id 1) described
/// by `def`, returning the concrete fakes alongside for inspection.
pub(crate) fn test_state(
    def: Arc<SurveyDefinition>,
) -> (
    Arc<AppState>,
    Arc<MemoryStore>,
    Arc<MemorySessions>,
    Arc<RecordingMailer>,
) {
    let store = Arc::new(MemoryStore::new(SurveyInfo {
        id: 1,
        name: "trial".to_string(),
        file: "trial.json".to_string(),
    }));
    let sessions = Arc::new(MemorySessions::default());
    let mailer = Arc::new(RecordingMailer::default());

    let state = Arc::new(AppState {
        store: store.clone(),
        sessions: sessions.clone(),
        definitions: Arc::new(FixedDefinitions { def }),
        snippets: Arc::new(NoSnippets),
        mailer: mailer.clone(),
        config: Arc::new(Config {
            bind_address: "127.0.0.1:0".parse().expect("test bind address"),
            database_url: String::new(),
            log_level: tracing::Level::INFO,
            config_dir: PathBuf::from("."),
            base_url: "http://test".to_string(),
            mail_gateway_url: None,
            session_retention_days: 30,
        }),
    });

    (state, store, sessions, mailer)
}

/// A single-survey store with an append-only answer log and one invitee
/// queue. `take_pending_invitees` empties the queue in one step and
/// counts how often it was asked to.
pub(crate) struct MemoryStore {
    survey: SurveyInfo,
    answers: Mutex<Vec<(i64, String, String)>>,
    invitees: Mutex<Vec<String>>,
    drains: AtomicUsize,
}

impl MemoryStore {
    fn new(survey: SurveyInfo) -> Self {
        Self {
            survey,
            answers: Mutex::new(Vec::new()),
            invitees: Mutex::new(Vec::new()),
            drains: AtomicUsize::new(0),
        }
    }

    pub(crate) fn queue_invitees(&self, emails: &[&str]) {
        self.invitees
            .lock()
            .unwrap()
            .extend(emails.iter().map(|e| e.to_string()));
    }

    pub(crate) fn answer_count(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    pub(crate) fn drain_calls(&self) -> usize {
        self.drains.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn list_surveys(&self) -> PortResult<Vec<SurveyInfo>> {
        Ok(vec![self.survey.clone()])
    }

    async fn find_survey_by_name(&self, name: &str) -> PortResult<Option<SurveyInfo>> {
        Ok((name == self.survey.name).then(|| self.survey.clone()))
    }

    async fn find_survey_by_id(&self, survey_id: i64) -> PortResult<Option<SurveyInfo>> {
        Ok((survey_id == self.survey.id).then(|| self.survey.clone()))
    }

    async fn survey_for_response(&self, _response_id: i64) -> PortResult<Option<SurveyInfo>> {
        Ok(Some(self.survey.clone()))
    }

    async fn append_page_answers(
        &self,
        response_id: i64,
        answers: &[(String, String)],
    ) -> PortResult<()> {
        let mut log = self.answers.lock().unwrap();
        for (question, reply) in answers {
            log.push((response_id, question.clone(), reply.clone()));
        }
        Ok(())
    }

    async fn answers_for(&self, response_id: i64) -> PortResult<Vec<AnswerRow>> {
        Ok(self
            .answers
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _, _)| *id == response_id)
            .map(|(_, question, reply)| AnswerRow {
                question: question.clone(),
                reply: reply.clone(),
            })
            .collect())
    }

    async fn take_pending_invitees(
        &self,
        survey_id: i64,
        _group: &str,
    ) -> PortResult<Vec<String>> {
        self.drains.fetch_add(1, Ordering::SeqCst);
        if survey_id != self.survey.id {
            return Ok(Vec::new());
        }
        Ok(std::mem::take(&mut *self.invitees.lock().unwrap()))
    }

    async fn pending_cohorts(&self) -> PortResult<Vec<PendingCohort>> {
        Ok(Vec::new())
    }
}

/// A session map with the same atomicity contract as the database
/// adapter: `advance` moves the page only when it still matches
/// `from_page`.
#[derive(Default)]
pub(crate) struct MemorySessions {
    pages: Mutex<HashMap<String, (i64, i32)>>,
    minted: AtomicUsize,
}

impl MemorySessions {
    pub(crate) fn seed(&self, token: &str, response_id: i64, page: i32) {
        self.pages
            .lock()
            .unwrap()
            .insert(token.to_string(), (response_id, page));
    }

    pub(crate) fn page_of(&self, token: &str) -> Option<i32> {
        self.pages.lock().unwrap().get(token).map(|(_, page)| *page)
    }

    pub(crate) fn issued(&self) -> usize {
        self.minted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionResolver for MemorySessions {
    async fn issue(
        &self,
        _survey_id: i64,
        _group: &str,
        initial_page: i32,
    ) -> PortResult<IssuedSession> {
        let n = self.minted.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("tok-{n}");
        self.pages
            .lock()
            .unwrap()
            .insert(token.clone(), (n as i64, initial_page));
        Ok(IssuedSession {
            token,
            response_id: n as i64,
        })
    }

    async fn find(&self, token: &str) -> PortResult<Option<SessionHandle>> {
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(token)
            .map(|(response_id, page)| SessionHandle {
                response_id: *response_id,
                page: *page,
            }))
    }

    async fn advance(&self, token: &str, from_page: i32) -> PortResult<bool> {
        let mut pages = self.pages.lock().unwrap();
        match pages.get_mut(token) {
            Some((_, page)) if *page == from_page => {
                *page += 1;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PortError::NotFound(format!("Session {}", token))),
        }
    }

    async fn clean(&self, _cutoff: DateTime<Utc>) -> PortResult<u64> {
        Ok(0)
    }
}

/// Serves the same validated definition for every file name.
pub(crate) struct FixedDefinitions {
    def: Arc<SurveyDefinition>,
}

#[async_trait]
impl DefinitionSource for FixedDefinitions {
    async fn load(&self, _file: &str) -> PortResult<Arc<SurveyDefinition>> {
        Ok(self.def.clone())
    }
}

pub(crate) struct NoSnippets;

#[async_trait]
impl SnippetStore for NoSnippets {
    async fn load(&self, file: &str) -> PortResult<CodeSnippet> {
        Err(PortError::NotFound(format!("Snippet {}", file)))
    }
}

/// Records every delivered batch and signals `delivered` so tests can
/// await the spawned hand-off task.
#[derive(Default)]
pub(crate) struct RecordingMailer {
    pub(crate) batches: Mutex<Vec<Vec<InvitationMail>>>,
    pub(crate) delivered: Notify,
}

#[async_trait]
impl MailDelivery for RecordingMailer {
    async fn send_batch(&self, batch: Vec<InvitationMail>) -> PortResult<()> {
        self.batches.lock().unwrap().push(batch);
        self.delivered.notify_one();
        Ok(())
    }
}
