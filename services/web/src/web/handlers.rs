//! services/web/src/web/handlers.rs
//!
//! Contains the Axum handlers for the survey flow and the master
//! definition for the OpenAPI specification.

use crate::web::invitations::issue_invitations;
use crate::web::state::AppState;
use crate::web::views::{
    value_type_views, CodeView, CohortView, DoneView, ErrorView, IntroView, ManageView,
    PageSummaryView, PageView, QuestionView, ScoreView, SurveyListEntry,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use survey_core::definition::{ResultDisplay, SurveyDefinition};
use survey_core::domain::PagePosition;
use survey_core::flow::{accept_submission, SubmitError};
use survey_core::grading::{grade, latest_answers, render_score_text, score};
use survey_core::summary::summarize;
use survey_core::codec::FormValues;
use tracing::{error, warn};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_handler,
        enter_view_handler,
        page_view_handler,
        manage_view_handler,
    ),
    components(
        schemas(
            SurveyListEntry,
            IntroView,
            PageView,
            DoneView,
            ManageView,
            ErrorView,
            crate::web::views::QuestionView,
            crate::web::views::ValueTypeView,
            crate::web::views::CodeView,
            crate::web::views::ScoreView,
            crate::web::views::PageSummaryView,
            crate::web::views::AnswerSummaryView,
            crate::web::views::CohortView,
        )
    ),
    tags(
        (name = "Survey API", description = "Token-addressed survey sessions, answers, and grading.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Renders a user-visible error condition as a typed payload.
fn error_view(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorView { message: message.to_string() })).into_response()
}

/// Extracts the per-survey session token from the browser cookie, if any.
fn session_cookie(headers: &HeaderMap, survey_id: i64) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    let name = format!("survey_{}=", survey_id);
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix(name.as_str()))
        .map(|s| s.to_string())
}

async fn load_definition(state: &AppState, file: &str) -> Result<Arc<SurveyDefinition>, Response> {
    state.definitions.load(file).await.map_err(|e| {
        error!("Failed to load survey definition '{}': {}", file, e);
        error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!")
    })
}

//=========================================================================================
// Entry and Listing Handlers
//=========================================================================================

/// GET / - service entry payload.
pub async fn index_handler() -> Response {
    Json(serde_json::json!({
        "service": "survey",
        "surveys": "/list/",
    }))
    .into_response()
}

/// List all known surveys with their definition titles.
#[utoipa::path(
    get,
    path = "/list/",
    responses(
        (status = 200, description = "Known surveys", body = [SurveyListEntry]),
        (status = 500, description = "Internal server error", body = ErrorView)
    )
)]
pub async fn list_handler(State(state): State<Arc<AppState>>) -> Response {
    let surveys = match state.store.list_surveys().await {
        Ok(surveys) => surveys,
        Err(e) => {
            error!("Failed to list surveys: {}", e);
            return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
        }
    };

    let mut available = Vec::with_capacity(surveys.len());
    for survey in surveys {
        match state.definitions.load(&survey.file).await {
            Ok(def) => available.push(SurveyListEntry {
                id: survey.id,
                name: survey.name,
                title: def.title.clone(),
            }),
            Err(e) => {
                // A broken definition hides the survey from the listing
                // but must not take the listing down.
                warn!("Skipping survey '{}': {}", survey.name, e);
            }
        }
    }

    Json(available).into_response()
}

/// Enter a survey by name.
///
/// A browser that already holds a session for this survey is redirected
/// to its page; a closed survey yields an empty body and no token.
#[utoipa::path(
    get,
    path = "/enter/{name}",
    params(("name" = String, Path, description = "Survey name")),
    responses(
        (status = 200, description = "Intro view, or empty when closed", body = IntroView),
        (status = 303, description = "Existing session; redirect to its page"),
        (status = 404, description = "Unknown survey", body = ErrorView)
    )
)]
pub async fn enter_view_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    enter(state, &name, "-", headers, FormValues::default()).await
}

pub async fn enter_group_view_handler(
    State(state): State<Arc<AppState>>,
    Path((name, group)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    enter(state, &name, &group, headers, FormValues::default()).await
}

pub async fn enter_submit_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    enter(state, &name, "-", headers, FormValues::new(fields)).await
}

pub async fn enter_group_submit_handler(
    State(state): State<Arc<AppState>>,
    Path((name, group)): Path<(String, String)>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    enter(state, &name, &group, headers, FormValues::new(fields)).await
}

async fn enter(
    state: Arc<AppState>,
    name: &str,
    group: &str,
    headers: HeaderMap,
    form: FormValues,
) -> Response {
    // 1. Resolve the survey by name.
    let survey = match state.store.find_survey_by_name(name).await {
        Ok(Some(survey)) => survey,
        Ok(None) => return error_view(StatusCode::NOT_FOUND, "Incorrect URL"),
        Err(e) => {
            error!("Failed to resolve survey '{}': {}", name, e);
            return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
        }
    };

    // 2. A browser session already bound to this survey goes straight
    //    to its current page; position is monotonic under re-navigation.
    if let Some(token) = session_cookie(&headers, survey.id) {
        return Redirect::to(&format!("/page/{}", token)).into_response();
    }

    let def = match load_definition(&state, &survey.file).await {
        Ok(def) => def,
        Err(response) => return response,
    };

    // 3. A closed survey admits nobody and issues nothing.
    if !def.open {
        return StatusCode::OK.into_response();
    }

    // 4. A "next" submission mints the session at the first content page
    //    and binds it to the browser.
    if form.contains("next") {
        let issued = match state.sessions.issue(survey.id, group, 0).await {
            Ok(issued) => issued,
            Err(e) => {
                error!("Failed to issue session for '{}': {}", name, e);
                return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
            }
        };

        let cookie = format!(
            "survey_{}={}; HttpOnly; SameSite=Lax; Path=/",
            survey.id, issued.token
        );
        let mut response = Redirect::to(&format!("/page/{}", issued.token)).into_response();
        if let Ok(value) = cookie.parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        return response;
    }

    Json(IntroView {
        survey: survey.name,
        title: def.title.clone(),
        pages: def.page_count(),
    })
    .into_response()
}

//=========================================================================================
// Page Flow Handlers
//=========================================================================================

/// Render the page a session token currently points at.
#[utoipa::path(
    get,
    path = "/page/{token}",
    params(("token" = String, Path, description = "Opaque session token")),
    responses(
        (status = 200, description = "Intro, content page, or completion view", body = PageView),
        (status = 404, description = "No active session", body = ErrorView),
        (status = 500, description = "Definition unavailable", body = ErrorView)
    )
)]
pub async fn page_view_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Response {
    page(state, &token, FormValues::default()).await
}

pub async fn page_submit_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    page(state, &token, FormValues::new(fields)).await
}

async fn page(state: Arc<AppState>, token: &str, form: FormValues) -> Response {
    // 1. Resolve the token to its response record and page index.
    let handle = match state.sessions.find(token).await {
        Ok(Some(handle)) => handle,
        Ok(None) => return error_view(StatusCode::NOT_FOUND, "No survey is active!"),
        Err(e) => {
            error!("Failed to resolve token: {}", e);
            return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
        }
    };

    // 2. Load the survey definition the record belongs to.
    let survey = match state.store.survey_for_response(handle.response_id).await {
        Ok(Some(survey)) => survey,
        Ok(None) => {
            error!("Response record {} has no survey", handle.response_id);
            return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
        }
        Err(e) => {
            error!("Failed to resolve response record: {}", e);
            return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
        }
    };
    let def = match load_definition(&state, &survey.file).await {
        Ok(def) => def,
        Err(response) => return response,
    };

    // 3. Dispatch on the session's position in the flow.
    match PagePosition::from_index(handle.page, def.page_count()) {
        PagePosition::Done => render_done(&state, &def, handle.response_id).await,
        PagePosition::Intro => {
            if form.contains("next") {
                // An in-flight session outlives survey closure, but the
                // intro of a closed survey no longer admits anyone.
                if !def.open {
                    return StatusCode::OK.into_response();
                }
                if let Err(e) = state.sessions.advance(token, handle.page).await {
                    error!("Failed to advance session: {}", e);
                    return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
                }
                return Redirect::to(&format!("/page/{}", token)).into_response();
            }
            Json(IntroView {
                survey: survey.name,
                title: def.title.clone(),
                pages: def.page_count(),
            })
            .into_response()
        }
        PagePosition::Content(p) => {
            if form.contains("next") {
                submit_page(&state, &def, token, handle.response_id, p, &form).await
            } else {
                render_page(&state, &def, p).await
            }
        }
    }
}

/// Accepts one page submission: validate completely, append every
/// answer in one transaction, then advance the token by one step.
async fn submit_page(
    state: &AppState,
    def: &SurveyDefinition,
    token: &str,
    response_id: i64,
    page_index: usize,
    form: &FormValues,
) -> Response {
    let answers = match accept_submission(def, page_index, form) {
        Ok(answers) => answers,
        Err(SubmitError::MissingAnswer(_)) => {
            return error_view(StatusCode::UNPROCESSABLE_ENTITY, "Missing answer!");
        }
        Err(e) => {
            // Nothing has been written yet; the submission simply fails.
            error!("Rejected submission for record {}: {}", response_id, e);
            return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
        }
    };

    if let Err(e) = state.store.append_page_answers(response_id, &answers).await {
        error!("Failed to persist answers for record {}: {}", response_id, e);
        return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
    }

    // Compare-and-set against the submitted page: a duplicate concurrent
    // submit loses the race, advances nothing, and just redirects.
    match state.sessions.advance(token, page_index as i32).await {
        Ok(_) => Redirect::to(&format!("/page/{}", token)).into_response(),
        Err(e) => {
            error!("Failed to advance session: {}", e);
            error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!")
        }
    }
}

/// Renders one content page with its questions, value types, and
/// optional code listing.
async fn render_page(state: &AppState, def: &SurveyDefinition, page_index: usize) -> Response {
    let page = &def.pages[page_index];

    let questions = page
        .content
        .iter()
        .filter_map(|qid| def.questions.get(qid).map(|q| QuestionView::new(qid, q)))
        .collect();

    let code = match &page.code {
        Some(file) => match state.snippets.load(file).await {
            Ok(snippet) => Some(CodeView::from(snippet)),
            Err(e) => {
                warn!("Failed to load snippet '{}': {}", file, e);
                None
            }
        },
        None => None,
    };

    Json(PageView {
        survey_title: def.title.clone(),
        title: page.title.clone(),
        page: page_index + 1,
        pages: def.page_count(),
        questions,
        value_types: value_type_views(def),
        code,
    })
    .into_response()
}

/// Renders the completion view, applying the results policy's release
/// gate fresh on every view.
async fn render_done(state: &AppState, def: &SurveyDefinition, response_id: i64) -> Response {
    let Some(policy) = &def.results else {
        return Json(DoneView { title: def.title.clone(), score: None }).into_response();
    };

    let rows = match state.store.answers_for(response_id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to load answers for record {}: {}", response_id, e);
            return error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!");
        }
    };
    let graded = grade(&def.questions, &latest_answers(&rows));
    let text = render_score_text(&policy.text, score(&graded), graded.len());

    let score_view = match policy.effective_display(Utc::now().naive_utc()) {
        ResultDisplay::Score => ScoreView {
            display: "score",
            text,
            show_correct: None,
            scripts: Vec::new(),
            pages: Vec::new(),
        },
        ResultDisplay::Summary => {
            let mut scripts = BTreeSet::new();
            let mut pages = Vec::new();
            for summary in summarize(def, &graded, policy.show_correct) {
                let code = match &summary.code {
                    Some(file) => match state.snippets.load(file).await {
                        Ok(snippet) => {
                            scripts.insert(snippet.script.clone());
                            Some(CodeView::from(snippet))
                        }
                        Err(e) => {
                            warn!("Failed to load snippet '{}': {}", file, e);
                            None
                        }
                    },
                    None => None,
                };
                pages.push(PageSummaryView::new(summary, code));
            }
            ScoreView {
                display: "summary",
                text,
                show_correct: Some(policy.show_correct),
                scripts: scripts.into_iter().collect(),
                pages,
            }
        }
    };

    Json(DoneView {
        title: def.title.clone(),
        score: Some(score_view),
    })
    .into_response()
}

//=========================================================================================
// Manage Handlers
//=========================================================================================

/// List every cohort with invitees still queued for delivery.
#[utoipa::path(
    get,
    path = "/manage",
    responses(
        (status = 200, description = "Pending cohorts", body = ManageView),
        (status = 500, description = "Internal server error", body = ErrorView)
    )
)]
pub async fn manage_view_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.pending_cohorts().await {
        Ok(cohorts) => Json(ManageView {
            cohorts: cohorts
                .into_iter()
                .map(|c| CohortView {
                    survey_id: c.survey_id,
                    survey: c.survey_name,
                    group: c.group,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => {
            error!("Failed to list pending cohorts: {}", e);
            error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!")
        }
    }
}

pub async fn manage_submit_handler(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let form = FormValues::new(fields);
    let (Some(survey), Some(group)) = (form.first("survey"), form.first("group")) else {
        // Without a cohort selection this is just the listing again.
        return manage_view_handler(State(state)).await;
    };

    let Ok(survey_id) = survey.trim().parse::<i64>() else {
        return error_view(StatusCode::UNPROCESSABLE_ENTITY, "Invalid survey id");
    };
    let group = group.trim().to_string();

    match issue_invitations(state, survey_id, &group).await {
        Ok(_) => Redirect::to("/manage").into_response(),
        Err(e) => {
            error!("Failed to issue invitations: {}", e);
            error_view(StatusCode::INTERNAL_SERVER_ERROR, "Internal error!")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::fakes::{test_state, two_page_definition};

    fn submitted(pairs: &[(&str, &str)]) -> FormValues {
        FormValues::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn duplicate_submit_advances_the_page_once() {
        let def = two_page_definition();
        let (state, store, sessions, _) = test_state(def.clone());
        sessions.seed("tok", 1, 0);

        let form = submitted(&[("next", "Next"), ("q_pick", "0")]);
        let first = page(state.clone(), "tok", form.clone()).await;
        assert_eq!(first.status(), StatusCode::SEE_OTHER);
        assert_eq!(sessions.page_of("tok"), Some(1));
        assert_eq!(store.answer_count(), 1);

        // A concurrent duplicate also read the session at page 0. Its
        // answers still append, but the compare-and-set finds the page
        // already moved and steps nothing.
        let second = submit_page(&state, &def, "tok", 1, 0, &form).await;
        assert_eq!(second.status(), StatusCode::SEE_OTHER);
        assert_eq!(sessions.page_of("tok"), Some(1));
        assert_eq!(store.answer_count(), 2);
    }

    #[tokio::test]
    async fn incomplete_submission_moves_nothing() {
        let (state, store, sessions, _) = test_state(two_page_definition());
        sessions.seed("tok", 1, 0);

        let response = page(state, "tok", submitted(&[("next", "Next")])).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(sessions.page_of("tok"), Some(0));
        assert_eq!(store.answer_count(), 0);
    }

    #[tokio::test]
    async fn intro_session_steps_into_the_first_content_page() {
        let (state, _, sessions, _) = test_state(two_page_definition());
        sessions.seed("tok", 1, -1);

        let shown = page(state.clone(), "tok", FormValues::default()).await;
        assert_eq!(shown.status(), StatusCode::OK);
        assert_eq!(sessions.page_of("tok"), Some(-1));

        let advanced = page(state, "tok", submitted(&[("next", "Next")])).await;
        assert_eq!(advanced.status(), StatusCode::SEE_OTHER);
        assert_eq!(sessions.page_of("tok"), Some(0));
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let (state, _, _, _) = test_state(two_page_definition());
        let response = page(state, "missing", FormValues::default()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
