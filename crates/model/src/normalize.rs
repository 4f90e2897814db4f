//! Canonicalization of quiz content that arrives in assorted shapes.
//!
//! A raw record is any JSON object carrying a `question` plus some way of telling the right answer
//! apart from the wrong ones. Records that cannot produce a usable question are dropped.

use crate::{
    quiz::Question,
    validate::{self, MIN_OPTIONS},
};
use alloc::{
    collections::BTreeSet,
    format,
    string::{String, ToString},
    vec::Vec,
};
use rand::{seq::SliceRandom, Rng};
use serde_json::{Map, Value};

/// Keys that may hold the correct answer, in order of precedence.
const CORRECT_KEYS: [&str; 4] = ["correct_answer", "answer", "correct", "right_answer"];
/// Keys that may hold the pool of wrong answers, in order of precedence.
const POOL_KEYS: [&str; 3] = ["wrong_answers", "incorrect_answers", "options"];
/// At most this many wrong answers make it into a question.
pub const MAX_WRONG: usize = 3;

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn texts(value: &Value) -> Vec<String> {
    value.as_array().map(|items| items.iter().filter_map(as_text).collect()).unwrap_or_default()
}

fn normalize_record<R: Rng + ?Sized>(record: &Value, map: &Map<String, Value>, rng: &mut R) -> Option<Question> {
    let question = map.get("question").and_then(Value::as_str).filter(|text| !text.is_empty())?;
    let options = map.get("options").filter(|options| options.is_array());

    // Already canonical. Out-of-range indices are dropped rather than reinterpreted.
    if options.is_some() && map.contains_key("answer_index") {
        return validate::check(record).ok();
    }

    let correct = CORRECT_KEYS.iter().find_map(|&key| map.get(key).and_then(as_text));
    let (correct, pool) = match correct {
        Some(correct) => {
            let pool = POOL_KEYS.iter().find_map(|&key| map.get(key).filter(|value| !value.is_null()));
            (correct, pool.map(texts).unwrap_or_default())
        }
        None => {
            // Without an explicit answer, the first listed option is the correct one.
            let mut entries = texts(options?).into_iter();
            (entries.next()?, entries.collect())
        }
    };

    let mut seen = BTreeSet::new();
    let mut choices: Vec<_> = core::iter::once(correct.clone())
        .chain(pool.into_iter().take(MAX_WRONG))
        .filter(|choice| seen.insert(choice.clone()))
        .collect();

    let mut label = choices.len();
    while choices.len() < MIN_OPTIONS {
        label += 1;
        let filler = format!("Option {label}");
        if seen.insert(filler.clone()) {
            choices.push(filler);
        }
    }

    choices.shuffle(rng);
    let answer = choices.iter().position(|choice| *choice == correct)?;
    let explanation = map.get("explanation").and_then(Value::as_str).unwrap_or_default();
    Some(Question { question: question.into(), options: choices, answer, explanation: explanation.into() })
}

/// Converts raw quiz records into canonical questions. Never fails: records that are not objects
/// or that lack a question or any resolvable answer are skipped. The option order of every derived
/// question is shuffled with `rng`.
pub fn normalize<R: Rng + ?Sized>(records: &[Value], rng: &mut R) -> Vec<Question> {
    records
        .iter()
        .filter_map(|record| normalize_record(record, record.as_object()?, &mut *rng))
        .collect()
}
