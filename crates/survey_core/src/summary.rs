//! crates/survey_core/src/summary.rs
//!
//! Builds the per-page completion summary from graded answers: decoded
//! student/reference pairs in definition page order, plus the snippet
//! references the presentation layer resolves to source text.

use crate::codec;
use crate::definition::SurveyDefinition;
use crate::grading::{compare, GradedAnswers};

/// One graded question in the summary, decoded for display. The
/// reference answer is withheld when the results policy says so.
#[derive(Debug, Clone)]
pub struct QuestionSummary {
    pub caption: String,
    pub student: String,
    pub reference: Option<String>,
    pub correct: bool,
}

/// One page of the completion summary. Only pages with at least one
/// graded, answered question appear.
#[derive(Debug, Clone)]
pub struct PageSummary {
    /// 1-based page number as shown to the respondent.
    pub page: usize,
    pub title: String,
    pub entries: Vec<QuestionSummary>,
    /// Snippet file reference from the page definition, if any.
    pub code: Option<String>,
}

/// Walks the definition's pages in order and emits a summary entry for
/// every page that has graded answers.
pub fn summarize(
    def: &SurveyDefinition,
    graded: &GradedAnswers,
    show_correct: bool,
) -> Vec<PageSummary> {
    let mut result = Vec::new();
    for (pageno, page) in def.pages.iter().enumerate() {
        let mut entries = Vec::new();
        for qid in &page.content {
            let Some((student, reference)) = graded.get(qid) else {
                continue;
            };
            // Validated definitions cannot reference unknown questions.
            let Some(question) = def.questions.get(qid) else {
                continue;
            };
            entries.push(QuestionSummary {
                caption: question.caption.clone(),
                student: codec::decode_answer(def, question, student),
                reference: show_correct
                    .then(|| codec::decode_answer(def, question, reference)),
                correct: compare(student, reference),
            });
        }

        if !entries.is_empty() {
            result.push(PageSummary {
                page: pageno + 1,
                title: page.title.clone(),
                entries,
                code: page.code.clone(),
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::tests::sample_definition;
    use crate::grading::grade;
    use std::collections::HashMap;

    fn graded_sample() -> (crate::definition::SurveyDefinition, GradedAnswers) {
        let def = sample_definition();
        let answers = HashMap::from([
            ("q_pick".to_string(), "B:hi".to_string()),
            ("q_len".to_string(), "cm:12".to_string()),
        ]);
        let graded = grade(&def.questions, &answers);
        (def, graded)
    }

    #[test]
    fn pages_without_graded_answers_are_omitted() {
        let def = sample_definition();
        let answers = HashMap::from([("q_len".to_string(), "cm:12".to_string())]);
        let graded = grade(&def.questions, &answers);

        let pages = summarize(&def, &graded, true);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page, 2);
        assert_eq!(pages[0].title, "Measurements");
        assert!(pages[0].code.is_none());
    }

    #[test]
    fn entries_are_decoded_and_marked() {
        let (def, graded) = graded_sample();
        let pages = summarize(&def, &graded, true);
        assert_eq!(pages.len(), 2);

        let first = &pages[0];
        assert_eq!(first.code.as_deref(), Some("loop.py"));
        assert_eq!(first.entries.len(), 1);
        assert_eq!(first.entries[0].student, "Other hi");
        assert_eq!(first.entries[0].reference.as_deref(), Some("Alpha"));
        assert!(!first.entries[0].correct);

        let second = &pages[1];
        assert_eq!(second.entries[0].student, "12 cm");
        assert!(second.entries[0].correct);
    }

    #[test]
    fn reference_answers_are_withheld_without_show_correct() {
        let (def, graded) = graded_sample();
        let pages = summarize(&def, &graded, false);
        assert!(pages
            .iter()
            .flat_map(|p| &p.entries)
            .all(|e| e.reference.is_none()));
    }
}
