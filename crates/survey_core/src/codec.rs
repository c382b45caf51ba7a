//! crates/survey_core/src/codec.rs
//!
//! Encoding and decoding of submitted answers, per question kind.
//!
//! Encoding runs when a page submission is accepted and turns raw form
//! values into the stored string form. Decoding runs for display and
//! grading and is total: malformed stored values fall back to the raw
//! string rather than failing.

use crate::definition::{Question, QuestionKind, SurveyDefinition};

/// The one hard failure the codec can produce. Everything else degrades
/// gracefully to the raw submitted value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unknown value type '{0}'")]
    UnknownValueType(String),
}

/// The posted form fields of one page submission, in arrival order.
/// Repeated names are kept; `options-multi` questions post one pair per
/// selected index.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    pairs: Vec<(String, String)>,
}

impl FormValues {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == name)
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolves one submitted selection index against a question's keys.
///
/// A key ending in the `:` sentinel picks up the free-text companion
/// field `{qid}_text_{index}`. Anything that does not resolve (not an
/// integer, out of range, question without keys) passes through as the
/// literal submitted value.
fn translate_choice(question: &Question, qid: &str, raw: &str, form: &FormValues) -> String {
    let Some(keys) = &question.keys else {
        return raw.to_string();
    };
    let Ok(index) = raw.trim().parse::<usize>() else {
        return raw.to_string();
    };
    let Some(key) = keys.get(index) else {
        return raw.to_string();
    };

    let mut encoded = key.clone();
    if key.ends_with(':') {
        let text_field = format!("{qid}_text_{index}");
        if let Some(text) = form.first(&text_field) {
            encoded.push_str(text.trim());
        }
    }
    encoded
}

/// Encodes the submitted form value(s) for one question into the stored
/// string form. Returns `None` for `plain-text` questions, which are
/// display-only and never submitted.
pub fn encode_answer(
    def: &SurveyDefinition,
    qid: &str,
    question: &Question,
    form: &FormValues,
) -> Result<Option<String>, CodecError> {
    let encoded = match question.kind {
        QuestionKind::PlainText => return Ok(None),
        QuestionKind::Options | QuestionKind::OptionsList => {
            let raw = form.first(qid).unwrap_or("").trim();
            translate_choice(question, qid, raw, form)
        }
        QuestionKind::OptionsMulti => {
            let picked: Vec<String> = form
                .all(qid)
                .map(|raw| translate_choice(question, qid, raw.trim(), form))
                .collect();
            picked.join(",")
        }
        QuestionKind::Value => {
            let type_key = form.first(qid).unwrap_or("").trim().to_string();
            let vt = def
                .value_types
                .get(&type_key)
                .ok_or_else(|| CodecError::UnknownValueType(type_key.clone()))?;
            // Disabled inputs are not posted, so the text field may be absent.
            let text = form.first(&format!("{qid}_val")).unwrap_or("");
            format!("{}:{}", type_key, vt.sanitize(text))
        }
        QuestionKind::Type => form.first(qid).unwrap_or("").trim().to_string(),
    };
    Ok(Some(encoded))
}

/// Decodes one member of an options-family answer for display: splits a
/// trailing `:suffix`, maps the key to its display label by index, and
/// re-appends the suffix. Unknown keys pass through unchanged.
fn decode_choice(question: &Question, stored: &str) -> String {
    let (key, rest) = match stored.find(':') {
        Some(pos) => (&stored[..pos + 1], format!(" {}", &stored[pos + 1..])),
        None => (stored, String::new()),
    };

    let labels = match (&question.keys, &question.options) {
        (Some(keys), Some(options)) => keys.iter().position(|k| k == key).map(|i| &options[i]),
        _ => None,
    };
    match labels {
        Some(label) => format!("{label}{rest}"),
        None => stored.to_string(),
    }
}

/// Renders a stored answer for display. Total: any stored value that
/// does not match its question's expected shape comes back verbatim.
pub fn decode_answer(def: &SurveyDefinition, question: &Question, stored: &str) -> String {
    match question.kind {
        QuestionKind::Value => {
            let Some((type_key, rest)) = stored.split_once(':') else {
                return stored.to_string();
            };
            match def.value_types.get(type_key) {
                Some(vt) => match &vt.format {
                    Some(template) => template.replace("{}", rest),
                    None => format!("{}: {}", vt.name, rest),
                },
                None => stored.to_string(),
            }
        }
        QuestionKind::Type => match def.value_types.get(stored) {
            Some(vt) => vt.name.clone(),
            None => stored.to_string(),
        },
        QuestionKind::Options | QuestionKind::OptionsList => decode_choice(question, stored),
        QuestionKind::OptionsMulti => stored
            .split(',')
            .map(|member| decode_choice(question, member))
            .collect::<Vec<_>>()
            .join(", "),
        QuestionKind::PlainText => stored.to_string(),
    }
}
