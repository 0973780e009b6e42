// src/engine/full_sim.rs

//! Full simulated papers. Both generators are deterministic per seed and fail
//! with a `SelectionError` instead of returning a paper that breaks a rule.

use std::collections::{HashMap, HashSet};

use crate::engine::category::{Category, FullSim2Category, FullSimCategory};
use crate::engine::rng::Mulberry32;
use crate::engine::selection::{SelectionError, bucketize};
use crate::models::bank::Bank;
use crate::models::question::{Question, QuestionType};

pub const FULL_SIM1_SIZE: usize = 20;
pub const FULL_SIM1_CATEGORY_CAP: usize = 8;
pub const FULL_SIM1_MULTI_CAP: usize = 3;

/// Id prefixes of the pools that feed the first paper.
pub const FULL_SIM1_SOURCE_PREFIXES: [&str; 4] = ["MCQ-", "W1I-", "W2-", "W2DS-"];

/// Per-type quotas of the written paper, in ensure-pass priority order.
pub const FULL_SIM2_QUOTAS: [(QuestionType, usize); 3] = [
    (QuestionType::ShortAnswer, 5),
    (QuestionType::Scenario, 2),
    (QuestionType::DiagramLogic, 1),
];
pub const FULL_SIM2_MCQ_QUOTA: usize = 5;

pub const FULL_SIM2_MINIMUMS: [(FullSim2Category, usize); 4] = [
    (FullSim2Category::Fundamentals, 1),
    (FullSim2Category::Demand, 2),
    (FullSim2Category::Supply, 2),
    (FullSim2Category::ShiftTrap, 1),
];

fn is_full_sim1_source(question: &Question) -> bool {
    matches!(
        question.question_type(),
        QuestionType::McqSingle | QuestionType::McqMulti
    ) && FULL_SIM1_SOURCE_PREFIXES
        .iter()
        .any(|prefix| question.id.starts_with(prefix))
}

struct Exam1Picker<'a> {
    selected: Vec<&'a Question>,
    per_category: HashMap<FullSimCategory, usize>,
    multi: usize,
}

impl<'a> Exam1Picker<'a> {
    fn fits(&self, question: &Question) -> bool {
        let category = FullSimCategory::of(question);
        let used = self.per_category.get(&category).copied().unwrap_or(0);
        let multi_ok = question.question_type() != QuestionType::McqMulti
            || self.multi < FULL_SIM1_MULTI_CAP;
        used < FULL_SIM1_CATEGORY_CAP && multi_ok
    }

    fn take(&mut self, question: &'a Question) {
        *self.per_category.entry(FullSimCategory::of(question)).or_insert(0) += 1;
        if question.question_type() == QuestionType::McqMulti {
            self.multi += 1;
        }
        self.selected.push(question);
    }

    fn full(&self) -> bool {
        self.selected.len() >= FULL_SIM1_SIZE
    }
}

/// 20 multiple-choice questions from the configured source pools.
///
/// Six-way round-robin with at most 8 per category and at most 3
/// multi-choice; items that would break a cap are deferred to a shuffled
/// fallback scan that applies the same caps.
pub fn generate_full_sim_exam1(bank: &Bank, seed: u32) -> Result<Vec<String>, SelectionError> {
    let mut rng = Mulberry32::new(seed);
    let pool: Vec<&Question> = bank.bank.iter().filter(|q| is_full_sim1_source(q)).collect();
    if pool.len() < FULL_SIM1_SIZE {
        return Err(SelectionError::InsufficientQuestions {
            kind: "full simulation multiple-choice".to_string(),
            needed: FULL_SIM1_SIZE,
            available: pool.len(),
        });
    }

    let mut buckets = bucketize::<FullSimCategory>(&pool, &mut rng);
    let mut picker = Exam1Picker {
        selected: Vec::with_capacity(FULL_SIM1_SIZE),
        per_category: HashMap::new(),
        multi: 0,
    };
    let mut deferred: Vec<&Question> = Vec::new();
    let mut progressed = true;

    while !picker.full() && progressed {
        progressed = false;
        for (_, items) in buckets.iter_mut() {
            if picker.full() {
                break;
            }
            while let Some(question) = items.pop() {
                if picker.fits(question) {
                    picker.take(question);
                    progressed = true;
                    break;
                }
                deferred.push(question);
            }
        }
    }

    if !picker.full() {
        tracing::debug!(
            "Full simulation 1 round-robin stopped at {}, scanning leftovers",
            picker.selected.len()
        );
        let mut leftovers: Vec<&Question> = buckets.into_iter().flat_map(|(_, items)| items).collect();
        leftovers.extend(deferred);
        for question in rng.shuffled(&leftovers) {
            if picker.full() {
                break;
            }
            if picker.fits(question) {
                picker.take(question);
            }
        }
    }

    if !picker.full() {
        return Err(SelectionError::CategoryCap {
            needed: FULL_SIM1_SIZE,
            cap: FULL_SIM1_CATEGORY_CAP,
            reached: picker.selected.len(),
        });
    }

    let ids: Vec<String> = picker.selected.iter().map(|q| q.id.clone()).collect();
    let unique: HashSet<&String> = ids.iter().collect();
    if unique.len() != ids.len() {
        return Err(SelectionError::DuplicateIds { needed: FULL_SIM1_SIZE });
    }
    Ok(ids)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullSim2Options {
    pub include_mcq: bool,
}

struct TypePool<'a> {
    question_type: QuestionType,
    quota: usize,
    items: Vec<&'a Question>,
    chosen: Vec<&'a Question>,
}

impl TypePool<'_> {
    fn open(&self) -> bool {
        self.chosen.len() < self.quota
    }
}

/// Written paper: 5 short-answer, 2 scenario, 1 diagram-logic, plus 5
/// single-choice when `include_mcq` is set.
///
/// Category minimums are met first by scanning the type pools in quota order
/// (the earliest type with a matching item always wins), then the remaining
/// quotas are filled from each shuffled pool. Output is grouped by type.
pub fn generate_full_sim_exam2(
    bank: &Bank,
    seed: u32,
    options: FullSim2Options,
) -> Result<Vec<String>, SelectionError> {
    let mut rng = Mulberry32::new(seed);

    let mut quotas: Vec<(QuestionType, usize)> = FULL_SIM2_QUOTAS.to_vec();
    if options.include_mcq {
        quotas.push((QuestionType::McqSingle, FULL_SIM2_MCQ_QUOTA));
    }

    let mut pools = Vec::with_capacity(quotas.len());
    for (question_type, quota) in quotas {
        let items: Vec<&Question> = bank.questions_of(question_type).collect();
        if items.len() < quota {
            return Err(SelectionError::InsufficientQuestions {
                kind: question_type.to_string(),
                needed: quota,
                available: items.len(),
            });
        }
        let items = rng.shuffled(&items);
        pools.push(TypePool {
            question_type,
            quota,
            items,
            chosen: Vec::with_capacity(quota),
        });
    }

    let mut used: HashSet<&str> = HashSet::new();

    for (category, required) in FULL_SIM2_MINIMUMS {
        let mut found = pools
            .iter()
            .flat_map(|p| p.chosen.iter())
            .filter(|q| FullSim2Category::of(q) == category)
            .count();

        while found < required {
            let mut taken = false;
            for pool in pools.iter_mut().filter(|p| p.open()) {
                let candidate = pool
                    .items
                    .iter()
                    .copied()
                    .find(|q| !used.contains(q.id.as_str()) && FullSim2Category::of(q) == category);
                if let Some(question) = candidate {
                    used.insert(question.id.as_str());
                    pool.chosen.push(question);
                    taken = true;
                    break;
                }
            }
            if !taken {
                return Err(SelectionError::CategoryMinimum {
                    category: category.label(),
                    required,
                    found,
                });
            }
            found += 1;
        }
    }

    for pool in pools.iter_mut() {
        let mut cursor = 0;
        while pool.open() {
            let Some(question) = pool.items.get(cursor).copied() else {
                return Err(SelectionError::InsufficientQuestions {
                    kind: pool.question_type.to_string(),
                    needed: pool.quota,
                    available: pool.chosen.len(),
                });
            };
            cursor += 1;
            if used.insert(question.id.as_str()) {
                pool.chosen.push(question);
            }
        }
    }

    let ids: Vec<String> = pools
        .iter()
        .flat_map(|p| p.chosen.iter().map(|q| q.id.clone()))
        .collect();
    let unique: HashSet<&String> = ids.iter().collect();
    if unique.len() != ids.len() {
        return Err(SelectionError::DuplicateIds { needed: ids.len() });
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bank::parse_bank;
    use crate::models::bank::tests::{bank_json, mcq};
    use serde_json::{Value, json};

    fn multi(id: &str, topic: &str) -> Value {
        json!({
            "id": id,
            "type": "mcq_multi",
            "topic": topic,
            "points": 2,
            "prompt": format!("Select all about {}", topic.to_lowercase()),
            "options": {"A": "a", "B": "b", "C": "c"},
            "correct_answers": ["A", "C"]
        })
    }

    fn written(id: &str, kind: &str, topic: &str, prompt: &str) -> Value {
        json!({
            "id": id,
            "type": kind,
            "topic": topic,
            "points": 4,
            "prompt": prompt,
            "mark_scheme": ["point"],
            "model_answer": "answer"
        })
    }

    fn sim1_bank() -> Bank {
        let topics = [
            ("Scarcity", "Opportunity cost of time"),
            ("Demand", "Consumer income rises"),
            ("Supply", "Producer costs fall"),
            ("Elasticity", "PED of a necessity"),
            ("Markets", "A shortage appears"),
        ];
        let mut questions = Vec::new();
        for i in 0..25 {
            let (topic, prompt) = topics[i % topics.len()];
            questions.push(mcq(&format!("MCQ-{}", i), topic, prompt));
        }
        for i in 0..6 {
            questions.push(multi(&format!("W2-M{}", i), "Demand"));
        }
        // Outside the source prefixes; never selected.
        questions.push(mcq("X-1", "Demand", "Consumer"));
        parse_bank(&bank_json(questions).to_string()).unwrap()
    }

    #[test]
    fn test_full_sim1_invariants_across_seeds() {
        let bank = sim1_bank();
        for seed in 1..60 {
            let ids = generate_full_sim_exam1(&bank, seed).unwrap();
            assert_eq!(ids.len(), 20);
            let unique: HashSet<_> = ids.iter().collect();
            assert_eq!(unique.len(), 20);
            assert!(!ids.contains(&"X-1".to_string()));
            let multi = ids.iter().filter(|id| id.starts_with("W2-M")).count();
            assert!(multi <= 3, "seed {} picked {} multi", seed, multi);
            let mut counts: HashMap<FullSimCategory, usize> = HashMap::new();
            for id in &ids {
                *counts.entry(FullSimCategory::of(bank.question(id).unwrap())).or_default() += 1;
            }
            assert!(counts.values().all(|&c| c <= 8), "{:?}", counts);
        }
    }

    #[test]
    fn test_full_sim1_deterministic() {
        let bank = sim1_bank();
        assert_eq!(
            generate_full_sim_exam1(&bank, 12345).unwrap(),
            generate_full_sim_exam1(&bank, 12345).unwrap()
        );
    }

    #[test]
    fn test_full_sim1_fails_when_caps_cannot_be_met() {
        let mut questions = Vec::new();
        for i in 0..12 {
            questions.push(mcq(&format!("MCQ-{}", i), "Demand", "Consumer income"));
            questions.push(mcq(&format!("W1I-{}", i), "Supply", "Producer costs"));
        }
        let bank = parse_bank(&bank_json(questions).to_string()).unwrap();
        assert!(matches!(
            generate_full_sim_exam1(&bank, 9),
            Err(SelectionError::CategoryCap { reached: 16, .. })
        ));
    }

    fn sim2_bank() -> Bank {
        let mut questions = vec![
            written("SA-1", "short_answer", "Basics", "Explain opportunity cost"),
            written("SA-2", "short_answer", "Demand", "Why do consumers buy more?"),
            written("SA-3", "short_answer", "Demand", "Explain a normal good"),
            written("SA-4", "short_answer", "Supply", "Why do producers sell more?"),
            written("SA-5", "short_answer", "Misc", "Describe a market"),
            written("SA-6", "short_answer", "Misc", "Describe a firm"),
            written("SC-1", "scenario", "Supply", "A producer faces higher costs"),
            written("SC-2", "scenario", "Misc", "A town market"),
            written("SC-3", "scenario", "Misc", "A festival"),
            written("DL-1", "diagram_logic", "Demand", "Show a shift of the demand curve"),
            written("DL-2", "diagram_logic", "Misc", "Draw a market"),
        ];
        for i in 0..8 {
            questions.push(mcq(&format!("MCQ-{}", i), "Misc", "General"));
        }
        parse_bank(&bank_json(questions).to_string()).unwrap()
    }

    #[test]
    fn test_full_sim2_minimums_and_quotas() {
        let bank = sim2_bank();
        for seed in 1..40 {
            let ids = generate_full_sim_exam2(&bank, seed, FullSim2Options::default()).unwrap();
            assert_eq!(ids.len(), 8);
            assert!(ids[..5].iter().all(|id| id.starts_with("SA-")));
            assert!(ids[5..7].iter().all(|id| id.starts_with("SC-")));
            assert!(ids[7].starts_with("DL-"));
            let mut counts: HashMap<FullSim2Category, usize> = HashMap::new();
            for id in &ids {
                *counts.entry(FullSim2Category::of(bank.question(id).unwrap())).or_default() += 1;
            }
            for (category, required) in FULL_SIM2_MINIMUMS {
                assert!(counts.get(&category).copied().unwrap_or(0) >= required, "{:?}", counts);
            }
        }
    }

    #[test]
    fn test_full_sim2_with_mcq_and_determinism() {
        let bank = sim2_bank();
        let options = FullSim2Options { include_mcq: true };
        let a = generate_full_sim_exam2(&bank, 42, options).unwrap();
        let b = generate_full_sim_exam2(&bank, 42, options).unwrap();
        assert_eq!(a.len(), 13);
        assert_eq!(a, b);
        assert!(a[8..].iter().all(|id| id.starts_with("MCQ-")));
    }

    #[test]
    fn test_full_sim2_missing_category_is_reported() {
        let questions = vec![
            written("SA-1", "short_answer", "Demand", "Consumers"),
            written("SA-2", "short_answer", "Demand", "Consumers"),
            written("SA-3", "short_answer", "Supply", "Producers"),
            written("SA-4", "short_answer", "Supply", "Producers"),
            written("SA-5", "short_answer", "Misc", "Other"),
            written("SC-1", "scenario", "Misc", "Other"),
            written("SC-2", "scenario", "Misc", "Other"),
            written("DL-1", "diagram_logic", "Misc", "Other"),
        ];
        let bank = parse_bank(&bank_json(questions).to_string()).unwrap();
        assert_eq!(
            generate_full_sim_exam2(&bank, 1, FullSim2Options::default()),
            Err(SelectionError::CategoryMinimum {
                category: "fundamentals",
                required: 1,
                found: 0
            })
        );
    }
}
