//! services/web/src/web/views.rs
//!
//! Typed response payloads for every view the service renders. HTML
//! templating is an external collaborator; these are the structured
//! view models it consumes.

use serde::Serialize;
use survey_core::definition::{Question, QuestionKind, SurveyDefinition, ValueType};
use survey_core::domain::CodeSnippet;
use survey_core::summary::PageSummary;
use utoipa::ToSchema;

/// The wire tag for a question kind, as the definition documents spell it.
pub fn kind_tag(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::PlainText => "plain-text",
        QuestionKind::Options => "options",
        QuestionKind::OptionsList => "options-list",
        QuestionKind::OptionsMulti => "options-multi",
        QuestionKind::Value => "value",
        QuestionKind::Type => "type",
    }
}

/// A user-visible error condition.
#[derive(Serialize, ToSchema)]
pub struct ErrorView {
    pub message: String,
}

/// One entry of the survey listing.
#[derive(Serialize, ToSchema)]
pub struct SurveyListEntry {
    pub id: i64,
    pub name: String,
    pub title: String,
}

/// The intro view shown before a survey is entered.
#[derive(Serialize, ToSchema)]
pub struct IntroView {
    pub survey: String,
    pub title: String,
    pub pages: usize,
}

/// One question as presented on a content page.
#[derive(Serialize, ToSchema)]
pub struct QuestionView {
    pub id: String,
    pub kind: &'static str,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl QuestionView {
    pub fn new(id: &str, question: &Question) -> Self {
        Self {
            id: id.to_string(),
            kind: kind_tag(question.kind),
            caption: question.caption.clone(),
            keys: question.keys.clone(),
            options: question.options.clone(),
        }
    }
}

/// One selectable value type, in presentation order.
#[derive(Serialize, ToSchema)]
pub struct ValueTypeView {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Sorts the definition's value types by their presentation sort key.
pub fn value_type_views(def: &SurveyDefinition) -> Vec<ValueTypeView> {
    let mut types: Vec<(&String, &ValueType)> = def.value_types.iter().collect();
    types.sort_by_key(|(_, vt)| vt.key);
    types
        .into_iter()
        .map(|(id, vt)| ValueTypeView {
            id: id.clone(),
            name: vt.name.clone(),
            format: vt.format.clone(),
        })
        .collect()
}

/// A resolved code listing with its highlighter identifiers.
#[derive(Serialize, ToSchema)]
pub struct CodeView {
    pub source: String,
    pub brush: String,
    pub script: String,
}

impl From<CodeSnippet> for CodeView {
    fn from(snippet: CodeSnippet) -> Self {
        Self {
            source: snippet.source,
            brush: snippet.brush,
            script: snippet.script,
        }
    }
}

/// One content page of a survey, ready to render.
#[derive(Serialize, ToSchema)]
pub struct PageView {
    pub survey_title: String,
    pub title: String,
    /// 1-based page number.
    pub page: usize,
    pub pages: usize,
    pub questions: Vec<QuestionView>,
    pub value_types: Vec<ValueTypeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeView>,
}

/// One graded question of the completion summary, decoded for display.
#[derive(Serialize, ToSchema)]
pub struct AnswerSummaryView {
    pub caption: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub correct: bool,
}

/// One page of the completion summary.
#[derive(Serialize, ToSchema)]
pub struct PageSummaryView {
    pub page: usize,
    pub title: String,
    pub content: Vec<AnswerSummaryView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeView>,
}

impl PageSummaryView {
    pub fn new(summary: PageSummary, code: Option<CodeView>) -> Self {
        Self {
            page: summary.page,
            title: summary.title,
            content: summary
                .entries
                .into_iter()
                .map(|e| AnswerSummaryView {
                    caption: e.caption,
                    answer: e.student,
                    reference: e.reference,
                    correct: e.correct,
                })
                .collect(),
            code,
        }
    }
}

/// Grading results on the completion view. `display` is `"score"` while
/// reference answers are withheld and `"summary"` once released.
#[derive(Serialize, ToSchema)]
pub struct ScoreView {
    pub display: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_correct: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageSummaryView>,
}

/// The completion view.
#[derive(Serialize, ToSchema)]
pub struct DoneView {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreView>,
}

/// One cohort awaiting invitations on the manage view.
#[derive(Serialize, ToSchema)]
pub struct CohortView {
    pub survey_id: i64,
    pub survey: String,
    pub group: String,
}

/// The manage view: every cohort with queued invitees.
#[derive(Serialize, ToSchema)]
pub struct ManageView {
    pub cohorts: Vec<CohortView>,
}
