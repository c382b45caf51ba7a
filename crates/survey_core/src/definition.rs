//! crates/survey_core/src/definition.rs
//!
//! The typed schema for a survey definition document.
//!
//! Definitions are deserialized from JSON and then passed through
//! [`SurveyDefinition::validate`] exactly once, at load time. Anything a
//! request handler could trip over mid-flight (dangling question ids,
//! uncompilable sanitization patterns, unparseable release dates) is
//! rejected here instead.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

/// A validation failure in a survey definition document.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Page {page} references unknown question '{question}'")]
    UnknownQuestion { page: usize, question: String },
    #[error("Question '{0}' has mismatched keys/options lengths")]
    KeyLabelMismatch(String),
    #[error("Value type '{value_type}' has an invalid remove pattern: {error}")]
    BadPattern { value_type: String, error: String },
    #[error("Results policy has an invalid release {field}: '{value}'")]
    BadRelease { field: &'static str, value: String },
}

/// The six question kinds. Adding a kind is a compile-time-checked
/// extension point: every match over this enum is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    PlainText,
    Options,
    OptionsList,
    OptionsMulti,
    Value,
    Type,
}

/// One question in a survey definition.
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub caption: String,
    /// Selectable keys, in submission-index order. A key ending in `:`
    /// takes an accompanying free-text suffix.
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    /// Display labels matching `keys` by index.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Reference answer in the same encoded form submissions use.
    #[serde(default)]
    pub correct: Option<String>,
}

/// One content page: a title, an ordered list of question ids, and an
/// optional code listing shown alongside the questions.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub title: String,
    pub content: Vec<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// A named free-text answer category, e.g. a unit of measurement.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueType {
    pub name: String,
    /// Display template with a `{}` placeholder for the stored text.
    #[serde(default)]
    pub format: Option<String>,
    /// Pattern of characters stripped from free text before storage.
    #[serde(default)]
    pub remove: Option<String>,
    /// Sort key for presenting the type list.
    #[serde(default)]
    pub key: i64,
    #[serde(skip)]
    remove_re: Option<Regex>,
}

impl ValueType {
    /// Strips the characters matched by the `remove` pattern. Requires a
    /// validated definition; an unvalidated pattern is simply not applied.
    pub fn sanitize(&self, text: &str) -> String {
        match &self.remove_re {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        }
    }
}

/// Whether grading results are shown as a bare count or a full
/// per-question summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultsKind {
    Score,
    Timed,
}

/// The effective display mode for a completed record, resolved fresh on
/// every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDisplay {
    Score,
    Summary,
}

/// Configuration governing whether and when reference answers become
/// visible.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsPolicy {
    #[serde(rename = "type")]
    pub kind: ResultsKind,
    /// Score text template with `{score}` and `{max}` placeholders.
    pub text: String,
    /// Release day, `%Y-%m-%d`. Takes precedence over `time`.
    #[serde(default)]
    pub date: Option<String>,
    /// Release instant, `%Y-%m-%d %H:%M`.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub show_correct: bool,
    #[serde(skip)]
    release: Option<NaiveDateTime>,
}

impl ResultsPolicy {
    /// Resolves the display mode at `now`. A `timed` policy with no
    /// configured release instant releases immediately.
    pub fn effective_display(&self, now: NaiveDateTime) -> ResultDisplay {
        match self.kind {
            ResultsKind::Score => ResultDisplay::Score,
            ResultsKind::Timed => {
                if self.release.unwrap_or(now) <= now {
                    ResultDisplay::Summary
                } else {
                    ResultDisplay::Score
                }
            }
        }
    }
}

/// An immutable, validated description of one survey.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyDefinition {
    pub title: String,
    pub open: bool,
    pub pages: Vec<Page>,
    pub questions: HashMap<String, Question>,
    #[serde(default)]
    pub value_types: HashMap<String, ValueType>,
    #[serde(default)]
    pub results: Option<ResultsPolicy>,
    /// Subject line for invitation mail; only the invitation issuer
    /// reads this.
    #[serde(default)]
    pub email_subject: Option<String>,
}

impl SurveyDefinition {
    /// Validates a freshly deserialized definition and compiles the
    /// pieces that must never fail mid-request.
    pub fn validate(&mut self) -> Result<(), DefinitionError> {
        for (pageno, page) in self.pages.iter().enumerate() {
            for q in &page.content {
                if !self.questions.contains_key(q) {
                    return Err(DefinitionError::UnknownQuestion {
                        page: pageno + 1,
                        question: q.clone(),
                    });
                }
            }
        }

        for (id, question) in &self.questions {
            if let (Some(keys), Some(options)) = (&question.keys, &question.options) {
                if keys.len() != options.len() {
                    return Err(DefinitionError::KeyLabelMismatch(id.clone()));
                }
            }
        }

        for (id, vt) in self.value_types.iter_mut() {
            if let Some(pattern) = &vt.remove {
                let re = Regex::new(pattern).map_err(|e| DefinitionError::BadPattern {
                    value_type: id.clone(),
                    error: e.to_string(),
                })?;
                vt.remove_re = Some(re);
            }
        }

        if let Some(results) = &mut self.results {
            if let Some(date) = &results.date {
                let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                    DefinitionError::BadRelease {
                        field: "date",
                        value: date.clone(),
                    }
                })?;
                results.release = day.and_hms_opt(0, 0, 0);
            } else if let Some(time) = &results.time {
                let instant =
                    NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M").map_err(|_| {
                        DefinitionError::BadRelease {
                            field: "time",
                            value: time.clone(),
                        }
                    })?;
                results.release = Some(instant);
            }
        }

        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small two-page definition shared by the codec, flow, and
    /// grading tests.
    pub(crate) fn sample_definition() -> SurveyDefinition {
        let mut def: SurveyDefinition = serde_json::from_value(serde_json::json!({
            "title": "Unit estimation",
            "open": true,
            "pages": [
                {
                    "title": "Basics",
                    "content": ["q_intro", "q_pick", "q_many"],
                    "code": "loop.py"
                },
                {
                    "title": "Measurements",
                    "content": ["q_len", "q_unit"]
                }
            ],
            "questions": {
                "q_intro": { "type": "plain-text", "caption": "Read the code." },
                "q_pick": {
                    "type": "options",
                    "caption": "Pick one",
                    "keys": ["A", "B:"],
                    "options": ["Alpha", "Other"],
                    "correct": "A"
                },
                "q_many": {
                    "type": "options-multi",
                    "caption": "Pick many",
                    "keys": ["A", "B:"],
                    "options": ["Alpha", "Other"]
                },
                "q_len": {
                    "type": "value",
                    "caption": "How long?",
                    "correct": "cm:12"
                },
                "q_unit": { "type": "type", "caption": "Which unit?" }
            },
            "value_types": {
                "cm": { "name": "Centimeters", "remove": "[^0-9]", "format": "{} cm", "key": 1 },
                "in": { "name": "Inches", "key": 2 }
            },
            "results": { "type": "score", "text": "You got {score} of {max}" }
        }))
        .expect("sample definition deserializes");
        def.validate().expect("sample definition validates");
        def
    }

    #[test]
    fn rejects_dangling_question_reference() {
        let mut def = sample_definition();
        def.pages[0].content.push("missing".to_string());
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::UnknownQuestion { page: 1, .. })
        ));
    }

    #[test]
    fn rejects_mismatched_keys_and_labels() {
        let mut def = sample_definition();
        def.questions
            .get_mut("q_pick")
            .unwrap()
            .options
            .as_mut()
            .unwrap()
            .pop();
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::KeyLabelMismatch(id)) if id == "q_pick"
        ));
    }

    #[test]
    fn rejects_bad_remove_pattern() {
        let mut def = sample_definition();
        def.value_types.get_mut("cm").unwrap().remove = Some("[".to_string());
        assert!(matches!(def.validate(), Err(DefinitionError::BadPattern { .. })));
    }

    #[test]
    fn rejects_bad_release_date() {
        let mut def = sample_definition();
        def.results = serde_json::from_value(serde_json::json!({
            "type": "timed",
            "text": "{score}/{max}",
            "date": "tomorrow"
        }))
        .ok();
        assert!(matches!(def.validate(), Err(DefinitionError::BadRelease { field: "date", .. })));
    }

    #[test]
    fn sanitize_strips_pattern_matches() {
        let def = sample_definition();
        assert_eq!(def.value_types["cm"].sanitize("12 cm"), "12");
        assert_eq!(def.value_types["in"].sanitize("12 in"), "12 in");
    }

    #[test]
    fn timed_policy_releases_on_the_configured_day() {
        let mut def = sample_definition();
        def.results = serde_json::from_value(serde_json::json!({
            "type": "timed",
            "text": "{score}/{max}",
            "date": "2024-06-01",
            "show_correct": true
        }))
        .ok();
        def.validate().unwrap();
        let policy = def.results.as_ref().unwrap();

        let before = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(policy.effective_display(before), ResultDisplay::Score);
        assert_eq!(policy.effective_display(after), ResultDisplay::Summary);
    }

    #[test]
    fn timed_policy_without_instant_releases_immediately() {
        let mut def = sample_definition();
        def.results = serde_json::from_value(serde_json::json!({
            "type": "timed",
            "text": "{score}/{max}"
        }))
        .ok();
        def.validate().unwrap();
        let policy = def.results.as_ref().unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(policy.effective_display(now), ResultDisplay::Summary);
    }
}
