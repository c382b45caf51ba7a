//! crates/survey_core/src/grading.rs
//!
//! Compares encoded student answers against reference answers and
//! computes the aggregate score.

use crate::definition::Question;
use crate::domain::AnswerRow;
use std::collections::HashMap;

/// A (student, reference) pair for one graded question, still in the
/// encoded storage form.
pub type GradedAnswers = HashMap<String, (String, String)>;

/// The sole equality notion used for grading: equal after removing all
/// whitespace. Case-sensitive and order-sensitive otherwise.
pub fn compare(student: &str, reference: &str) -> bool {
    let strip = |s: &str| s.split_whitespace().collect::<String>();
    strip(student) == strip(reference)
}

/// Collapses the append-only answer rows to the latest reply per
/// question. Earlier rows for a resubmitted question are retained in
/// storage but the most recent one wins for grading and display.
pub fn latest_answers(rows: &[AnswerRow]) -> HashMap<String, String> {
    let mut latest = HashMap::new();
    for row in rows {
        latest.insert(row.question.clone(), row.reply.clone());
    }
    latest
}

/// Restricts to questions that are both answered and declare a
/// reference answer, pairing the encoded student and reference forms.
pub fn grade(
    questions: &HashMap<String, Question>,
    answers: &HashMap<String, String>,
) -> GradedAnswers {
    let mut result = HashMap::new();
    for (id, question) in questions {
        if let (Some(student), Some(reference)) = (answers.get(id), &question.correct) {
            result.insert(id.clone(), (student.clone(), reference.clone()));
        }
    }
    result
}

/// Count of graded pairs that pass [`compare`].
pub fn score(graded: &GradedAnswers) -> usize {
    graded
        .values()
        .filter(|(student, reference)| compare(student, reference))
        .count()
}

/// Fills the `{score}` and `{max}` placeholders of a results text
/// template.
pub fn render_score_text(template: &str, score: usize, max: usize) -> String {
    template
        .replace("{score}", &score.to_string())
        .replace("{max}", &max.to_string())
}
