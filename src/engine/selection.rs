// src/engine/selection.rs

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::engine::category::{Category, Exam1Category, LegacyCategory};
use crate::engine::rng::Mulberry32;
use crate::models::bank::Bank;
use crate::models::question::{Question, QuestionType};

pub const EXAM_TYPE_SESSION_SIZE: usize = 20;
pub const EXAM1_SESSION_SIZE: usize = 20;
pub const EXAM1_CATEGORY_CAP: usize = 8;

/// Per-type targets of the generic balanced session.
pub const BALANCED_TARGETS: [(QuestionType, usize); 4] = [
    (QuestionType::McqSingle, 10),
    (QuestionType::ShortAnswer, 5),
    (QuestionType::Scenario, 2),
    (QuestionType::DiagramLogic, 1),
];

/// A question set could not be assembled. These are user-facing "add more
/// questions / try again" outcomes, not defects.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("Unknown exam set: {0}")]
    UnknownExamSet(String),

    #[error("Unknown question pack: {0}")]
    UnknownPack(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Session {0} has not been submitted yet")]
    NotSubmitted(String),

    #[error("Not enough {kind} questions: need {needed}, found {available}")]
    InsufficientQuestions {
        kind: String,
        needed: usize,
        available: usize,
    },

    #[error("Cannot pick {needed} questions with at most {cap} per category (only {reached} fit)")]
    CategoryCap {
        needed: usize,
        cap: usize,
        reached: usize,
    },

    #[error("Need at least {required} {category} questions, found {found}")]
    CategoryMinimum {
        category: &'static str,
        required: usize,
        found: usize,
    },

    #[error("Could not assemble {needed} unique questions")]
    DuplicateIds { needed: usize },

    #[error("Nothing to practise: {0}")]
    EmptyPool(String),
}

/// Shuffled buckets in `C::BUCKETS` order.
pub(crate) fn bucketize<'a, C: Category>(
    pool: &[&'a Question],
    rng: &mut Mulberry32,
) -> Vec<(C, Vec<&'a Question>)> {
    let mut buckets: Vec<(C, Vec<&'a Question>)> =
        C::BUCKETS.iter().map(|c| (*c, Vec::new())).collect();
    for question in pool {
        let category = C::of(question);
        if let Some((_, items)) = buckets.iter_mut().find(|(c, _)| *c == category) {
            items.push(question);
        }
    }
    for (_, items) in buckets.iter_mut() {
        rng.shuffle(items);
    }
    buckets
}

fn bucket_mut<'b, 'a, C: Category>(
    buckets: &'b mut [(C, Vec<&'a Question>)],
    category: C,
) -> Option<&'b mut Vec<&'a Question>> {
    buckets
        .iter_mut()
        .find(|(c, _)| *c == category)
        .map(|(_, items)| items)
}

/// Round-robin across `C::ROUND_ROBIN`, one item per category per pass, then
/// a shuffled fill from every leftover bucket if the target is not reached.
pub fn pick_balanced<'a, C: Category>(
    pool: &[&'a Question],
    count: usize,
    rng: &mut Mulberry32,
) -> Vec<&'a Question> {
    let mut buckets = bucketize::<C>(pool, rng);
    let mut selected = Vec::with_capacity(count);
    let mut progressed = true;

    while selected.len() < count && progressed {
        progressed = false;
        for category in C::ROUND_ROBIN {
            if selected.len() >= count {
                break;
            }
            if let Some(question) = bucket_mut(&mut buckets, *category).and_then(Vec::pop) {
                selected.push(question);
                progressed = true;
            }
        }
    }

    if selected.len() < count {
        let leftovers: Vec<&Question> = buckets.into_iter().flat_map(|(_, items)| items).collect();
        let leftovers = rng.shuffled(&leftovers);
        let missing = count - selected.len();
        selected.extend(leftovers.into_iter().take(missing));
    }

    selected
}

/// Round-robin where each category stops contributing at `cap`. Fails rather
/// than exceed the cap.
pub fn pick_capped<'a, C: Category>(
    pool: &[&'a Question],
    count: usize,
    cap: usize,
    rng: &mut Mulberry32,
) -> Result<Vec<&'a Question>, SelectionError> {
    if pool.len() < count {
        return Err(SelectionError::InsufficientQuestions {
            kind: "multiple-choice".to_string(),
            needed: count,
            available: pool.len(),
        });
    }

    let mut buckets = bucketize::<C>(pool, rng);
    let mut taken: HashMap<C, usize> = HashMap::new();
    let mut selected = Vec::with_capacity(count);
    let mut progressed = true;

    while selected.len() < count && progressed {
        progressed = false;
        for category in C::ROUND_ROBIN {
            if selected.len() >= count {
                break;
            }
            let used = taken.entry(*category).or_insert(0);
            if *used >= cap {
                continue;
            }
            if let Some(question) = bucket_mut(&mut buckets, *category).and_then(Vec::pop) {
                selected.push(question);
                *used += 1;
                progressed = true;
            }
        }
    }

    if selected.len() < count {
        return Err(SelectionError::CategoryCap {
            needed: count,
            cap,
            reached: selected.len(),
        });
    }
    Ok(selected)
}

fn ids(questions: &[&Question]) -> Vec<String> {
    questions.iter().map(|q| q.id.clone()).collect()
}

/// Legacy fixed set: section ids concatenated in order. Ids missing from the
/// catalog (and not templates) are skipped with a warning.
pub fn legacy_set_ids(bank: &Bank, set_id: &str) -> Result<Vec<String>, SelectionError> {
    let set = bank
        .exam_sets
        .get(set_id)
        .ok_or_else(|| SelectionError::UnknownExamSet(set_id.to_string()))?;

    let mut missing = Vec::new();
    let selected: Vec<String> = set
        .sections
        .iter()
        .flat_map(|section| section.question_ids.iter())
        .filter(|id| {
            let known = bank.question(id).is_some() || bank.template(id).is_some();
            if !known {
                missing.push((*id).clone());
            }
            known
        })
        .cloned()
        .collect();

    if !missing.is_empty() {
        tracing::warn!("Exam set {} references missing question ids: {:?}", set_id, missing);
    }
    Ok(selected)
}

/// 10 single-choice, 5 short-answer, 2 scenario, 1 diagram-logic, each type
/// balanced independently.
pub fn generate_balanced_session(bank: &Bank, seed: u32) -> Vec<String> {
    let mut rng = Mulberry32::new(seed);
    let mut used: HashSet<String> = HashSet::new();
    let mut selection = Vec::new();

    for (question_type, count) in BALANCED_TARGETS {
        let pool: Vec<&Question> = bank
            .questions_of(question_type)
            .filter(|q| !used.contains(&q.id))
            .collect();
        for question in pick_balanced::<LegacyCategory>(&pool, count, &mut rng) {
            if used.insert(question.id.clone()) {
                selection.push(question.id.clone());
            }
        }
    }
    selection
}

/// Which half of the catalog an exam-type session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamTypeFilter {
    SingleChoice,
    NonSingleChoice,
}

/// 20 questions, one balanced pick over the filtered pool.
pub fn generate_exam_type_session(bank: &Bank, filter: ExamTypeFilter, seed: u32) -> Vec<String> {
    let mut rng = Mulberry32::new(seed);
    let pool: Vec<&Question> = bank
        .bank
        .iter()
        .filter(|q| match filter {
            ExamTypeFilter::SingleChoice => q.question_type() == QuestionType::McqSingle,
            ExamTypeFilter::NonSingleChoice => q.question_type() != QuestionType::McqSingle,
        })
        .collect();
    ids(&pick_balanced::<LegacyCategory>(&pool, EXAM_TYPE_SESSION_SIZE, &mut rng))
}

/// Exam 1 paper: 20 single-choice questions, at most 8 per category.
pub fn generate_exam1_mcq_session(bank: &Bank, seed: u32) -> Result<Vec<String>, SelectionError> {
    let mut rng = Mulberry32::new(seed);
    let pool: Vec<&Question> = bank.questions_of(QuestionType::McqSingle).collect();
    let picked = pick_capped::<Exam1Category>(&pool, EXAM1_SESSION_SIZE, EXAM1_CATEGORY_CAP, &mut rng)?;
    Ok(ids(&picked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bank::parse_bank;
    use crate::models::bank::tests::{bank_json, mcq};
    use serde_json::json;

    fn written(id: &str, kind: &str, topic: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": kind,
            "topic": topic,
            "points": 4,
            "prompt": format!("Explain {}", topic.to_lowercase()),
            "mark_scheme": ["point"],
            "model_answer": "answer"
        })
    }

    fn test_bank() -> Bank {
        let mut questions = Vec::new();
        let topics = [
            ("Demand", "What happens to demand when income rises?"),
            ("Elasticity", "Price elasticity of a luxury"),
            ("Tax", "Who bears a tax?"),
            ("Equilibrium", "A shortage at a low price"),
            ("Monopoly", "Why is a monopoly a price maker?"),
        ];
        for i in 0..30 {
            let (topic, prompt) = topics[i % topics.len()];
            questions.push(mcq(&format!("MCQ-{}", i + 1), topic, prompt));
        }
        for i in 0..6 {
            questions.push(written(&format!("SA-{}", i + 1), "short_answer", "Supply"));
        }
        for i in 0..3 {
            questions.push(written(&format!("SC-{}", i + 1), "scenario", "Subsidy"));
        }
        questions.push(written("DL-1", "diagram_logic", "Demand"));
        parse_bank(&bank_json(questions).to_string()).unwrap()
    }

    #[test]
    fn test_round_robin_is_balanced() {
        let bank = test_bank();
        let pool: Vec<&Question> = bank.questions_of(QuestionType::McqSingle).collect();
        let mut rng = Mulberry32::new(7);
        let picked = pick_balanced::<LegacyCategory>(&pool, 10, &mut rng);
        let mut counts: HashMap<LegacyCategory, usize> = HashMap::new();
        for q in &picked {
            *counts.entry(LegacyCategory::of(q)).or_default() += 1;
        }
        assert_eq!(picked.len(), 10);
        assert!(counts.values().all(|&c| c == 2), "{:?}", counts);
    }

    #[test]
    fn test_leftover_fill_when_categories_run_dry() {
        let bank = test_bank();
        let pool: Vec<&Question> = bank.questions_of(QuestionType::ShortAnswer).collect();
        let mut rng = Mulberry32::new(3);
        // Only one category; round-robin yields everything from it in turn.
        let picked = pick_balanced::<LegacyCategory>(&pool, 4, &mut rng);
        assert_eq!(picked.len(), 4);
        let picked_all = pick_balanced::<LegacyCategory>(&pool, 50, &mut rng);
        assert_eq!(picked_all.len(), 6);
    }

    #[test]
    fn test_other_bucket_only_used_for_fill() {
        let questions = vec![
            mcq("MCQ-1", "Misc", "Something"),
            mcq("MCQ-2", "Misc", "Something"),
            mcq("MCQ-3", "Demand", "Demand question"),
        ];
        let bank = parse_bank(&bank_json(questions).to_string()).unwrap();
        let pool: Vec<&Question> = bank.bank.iter().collect();
        let mut rng = Mulberry32::new(11);
        let picked = pick_balanced::<LegacyCategory>(&pool, 2, &mut rng);
        assert_eq!(picked[0].id, "MCQ-3");
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_balanced_session_targets() {
        let bank = test_bank();
        let ids = generate_balanced_session(&bank, 42);
        assert_eq!(ids.len(), 18);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 18);
        assert_eq!(ids, generate_balanced_session(&bank, 42));
        assert!(ids[..10].iter().all(|id| id.starts_with("MCQ-")));
        assert!(ids[10..15].iter().all(|id| id.starts_with("SA-")));
        assert_eq!(ids[17], "DL-1");
    }

    #[test]
    fn test_exam_type_session_filters_pool() {
        let bank = test_bank();
        let mcq_ids = generate_exam_type_session(&bank, ExamTypeFilter::SingleChoice, 5);
        assert_eq!(mcq_ids.len(), 20);
        let written_ids = generate_exam_type_session(&bank, ExamTypeFilter::NonSingleChoice, 5);
        assert_eq!(written_ids.len(), 10);
        assert!(written_ids.iter().all(|id| !id.starts_with("MCQ-")));
    }

    #[test]
    fn test_exam1_cap_enforced_or_error() {
        let bank = test_bank();
        let ids = generate_exam1_mcq_session(&bank, 2024).unwrap();
        assert_eq!(ids.len(), 20);

        // Two categories only: 8 + 8 < 20 under the cap.
        let mut questions = Vec::new();
        for i in 0..15 {
            questions.push(mcq(&format!("D-{}", i), "Demand", "Demand shifts"));
            questions.push(mcq(&format!("E-{}", i), "Elasticity", "PED values"));
        }
        let skewed = parse_bank(&bank_json(questions).to_string()).unwrap();
        match generate_exam1_mcq_session(&skewed, 1) {
            Err(SelectionError::CategoryCap { reached, cap, .. }) => {
                assert_eq!(reached, 16);
                assert_eq!(cap, 8);
            }
            other => panic!("expected cap error, got {:?}", other),
        }
    }

    #[test]
    fn test_exam1_under_supplied_pool() {
        let questions = (0..5).map(|i| mcq(&format!("MCQ-{}", i), "Demand", "d")).collect();
        let bank = parse_bank(&bank_json(questions).to_string()).unwrap();
        assert!(matches!(
            generate_exam1_mcq_session(&bank, 1),
            Err(SelectionError::InsufficientQuestions { available: 5, .. })
        ));
    }

    #[test]
    fn test_legacy_set_skips_missing_ids() {
        let bank = parse_bank(&bank_json(vec![mcq("MCQ-1", "Demand", "p")]).to_string()).unwrap();
        assert_eq!(legacy_set_ids(&bank, "A").unwrap(), vec!["MCQ-1".to_string()]);
        assert_eq!(
            legacy_set_ids(&bank, "Z"),
            Err(SelectionError::UnknownExamSet("Z".to_string()))
        );
    }
}
