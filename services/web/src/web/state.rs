//! services/web/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use survey_core::ports::{
    DefinitionSource, MailDelivery, SessionResolver, SnippetStore, SurveyStore,
};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SurveyStore>,
    pub sessions: Arc<dyn SessionResolver>,
    pub definitions: Arc<dyn DefinitionSource>,
    pub snippets: Arc<dyn SnippetStore>,
    pub mailer: Arc<dyn MailDelivery>,
    pub config: Arc<Config>,
}
