//! crates/survey_core/src/flow.rs
//!
//! The page-advance decision core. Pure: the handlers feed it the
//! current position and the posted form, and it decides whether the
//! submission is complete and what the encoded answers are. Persistence
//! and the actual token advance stay behind the ports.

use crate::codec::{self, CodecError, FormValues};
use crate::definition::{QuestionKind, SurveyDefinition};

/// Why a page submission was rejected. A rejected submission persists
/// nothing: validation runs to completion before any answer is encoded.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Missing answer for question '{0}'")]
    MissingAnswer(String),
    #[error("Page references unknown question '{0}'")]
    UnknownQuestion(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Validates and encodes one page submission.
///
/// Every non-`plain-text` question on the page must have a posted
/// value; the first one missing rejects the whole submission before
/// anything is encoded. On success, returns the `(question id, encoded
/// answer)` pairs in page content order, ready to append in one
/// transaction.
pub fn accept_submission(
    def: &SurveyDefinition,
    page_index: usize,
    form: &FormValues,
) -> Result<Vec<(String, String)>, SubmitError> {
    let page = &def.pages[page_index];

    // Completeness first, so a missing answer late on the page cannot
    // leave earlier answers half-applied.
    for qid in &page.content {
        let question = def
            .questions
            .get(qid)
            .ok_or_else(|| SubmitError::UnknownQuestion(qid.clone()))?;
        if question.kind == QuestionKind::PlainText {
            continue;
        }
        if !form.contains(qid) {
            return Err(SubmitError::MissingAnswer(qid.clone()));
        }
    }

    let mut answers = Vec::new();
    for qid in &page.content {
        let question = &def.questions[qid];
        if let Some(encoded) = codec::encode_answer(def, qid, question, form)? {
            answers.push((qid.clone(), encoded));
        }
    }
    Ok(answers)
}
