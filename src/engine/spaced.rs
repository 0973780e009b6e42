// src/engine/spaced.rs

//! Spaced repetition over single-choice questions. Stages 0/1/2 wait 1/3/7
//! calendar days; a correct answer at the top stage graduates the entry.

use std::collections::{BTreeMap, HashSet};

use chrono::{Days, NaiveDate};

use crate::engine::resolve::ResolvedQuestion;
use crate::models::bank::Bank;
use crate::models::question::{QuestionBody, QuestionType, extract_base_question_id};
use crate::models::review::{ReviewEntry, ReviewMap, ReviewStage};
use crate::models::session::AnswerValue;

fn after(today: NaiveDate, stage: ReviewStage) -> NaiveDate {
    today + Days::new(stage.interval_days())
}

/// Applies one graded answer. `id` must already be the base question id.
pub fn update_for_answer(map: &mut ReviewMap, id: &str, topic: &str, is_correct: bool, today: NaiveDate) {
    if !is_correct {
        map.insert(
            id.to_string(),
            ReviewEntry {
                id: id.to_string(),
                topic: topic.to_string(),
                stage: ReviewStage::New,
                next_review: after(today, ReviewStage::New),
            },
        );
        return;
    }

    let Some(entry) = map.get_mut(id) else {
        return;
    };
    match entry.stage.advance() {
        Some(stage) => {
            entry.stage = stage;
            entry.next_review = after(today, stage);
        }
        None => {
            map.remove(id);
        }
    }
}

/// Feeds every answered single-choice question of a submitted session into
/// the map. Unanswered or wrongly-shaped answers are skipped.
pub fn apply_results(
    map: &mut ReviewMap,
    questions: &[ResolvedQuestion],
    answers: &BTreeMap<String, AnswerValue>,
    today: NaiveDate,
) -> usize {
    let mut applied = 0;
    for resolved in questions {
        let QuestionBody::McqSingle { answer_key, .. } = &resolved.question.body else {
            continue;
        };
        let Some(answer) = answers.get(&resolved.key).and_then(AnswerValue::as_text) else {
            continue;
        };
        if answer.is_empty() {
            continue;
        }
        let base = extract_base_question_id(&resolved.key);
        update_for_answer(map, base, &resolved.question.topic, answer == answer_key, today);
        applied += 1;
    }
    applied
}

/// Ids whose next review is on or before `today`, most overdue first.
pub fn due_ids(map: &ReviewMap, today: NaiveDate) -> Vec<String> {
    let mut due: Vec<&ReviewEntry> = map.values().filter(|e| e.next_review <= today).collect();
    due.sort_by_key(|e| e.next_review);
    due.into_iter().map(|e| e.id.clone()).collect()
}

pub fn due_count(map: &ReviewMap, today: NaiveDate) -> usize {
    map.values().filter(|e| e.next_review <= today).count()
}

/// Due questions first, then single-choice questions sharing a due topic,
/// then any single-choice question, until `limit` is reached.
pub fn generate_review_session(bank: &Bank, map: &ReviewMap, limit: usize, today: NaiveDate) -> Vec<String> {
    let due = due_ids(map, today);
    let mut seen: HashSet<String> = HashSet::new();
    let mut selected: Vec<String> = Vec::with_capacity(limit);

    for id in due.iter().take(limit) {
        if seen.insert(id.clone()) {
            selected.push(id.clone());
        }
    }
    if selected.len() >= limit {
        return selected;
    }

    let due_topics: HashSet<&str> = due
        .iter()
        .filter_map(|id| map.get(id).map(|e| e.topic.as_str()))
        .collect();
    let single_choice: Vec<_> = bank.questions_of(QuestionType::McqSingle).collect();

    let similar = single_choice.iter().filter(|q| due_topics.contains(q.topic.as_str()));
    for question in similar.chain(single_choice.iter()) {
        if selected.len() >= limit {
            break;
        }
        if seen.insert(question.id.clone()) {
            selected.push(question.id.clone());
        }
    }
    selected
}
