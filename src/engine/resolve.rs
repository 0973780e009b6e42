// src/engine/resolve.rs

use serde::Serialize;

use crate::engine::generator;
use crate::models::bank::Bank;
use crate::models::question::{GeneratedValues, Question, extract_base_question_id};

/// A session slot bound to concrete question content.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedQuestion {
    /// Slot id as stored on the session (may carry a duplicate suffix).
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub question: Question,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedValues>,
}

fn section_of(bank: &Bank, set_id: Option<&str>, id: &str) -> Option<String> {
    let set = bank.exam_sets.get(set_id?)?;
    set.sections
        .iter()
        .find(|s| s.question_ids.iter().any(|q| q == id))
        .map(|s| s.name.clone())
}

/// Resolves one slot: catalog ids by their base id, template ids by
/// generating with `seed`. Unknown ids resolve to `None`.
pub fn resolve_one(bank: &Bank, key: &str, seed: u32, set_id: Option<&str>) -> Option<ResolvedQuestion> {
    let base = extract_base_question_id(key);
    if let Some(question) = bank.question(base) {
        return Some(ResolvedQuestion {
            key: key.to_string(),
            section: section_of(bank, set_id, base),
            question: question.clone(),
            generated: None,
        });
    }
    let template = bank.template(base)?;
    let generated = generator::generate(template, seed);
    Some(ResolvedQuestion {
        key: key.to_string(),
        section: section_of(bank, set_id, base),
        question: generated.question,
        generated: Some(generated.values),
    })
}

/// Resolves every slot of a session in order, skipping (and logging) ids the
/// catalog no longer knows.
pub fn resolve_questions(
    bank: &Bank,
    ids: &[String],
    seed: u32,
    set_id: Option<&str>,
) -> Vec<ResolvedQuestion> {
    ids.iter()
        .filter_map(|key| {
            let resolved = resolve_one(bank, key, seed, set_id);
            if resolved.is_none() {
                tracing::warn!("Question {} is not in the bank, skipping", key);
            }
            resolved
        })
        .collect()
}
