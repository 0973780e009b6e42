// src/engine/drill.rs

use std::collections::HashMap;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use crate::engine::selection::SelectionError;
use crate::models::bank::Bank;
use crate::models::question::{DUPLICATE_SUFFIX, Question};

pub const DRILL_SESSION_SIZE: usize = 10;

/// Adds `bonus` when any of `keywords` occurs in the lower-cased
/// `"{topic} {prompt}"` text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordBonus {
    pub keywords: Vec<String>,
    pub bonus: u32,
}

/// Additive keyword weighting for drill draws. Loadable from JSON so the
/// content can be tuned without touching selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillWeighting {
    #[serde(default = "default_base")]
    pub base: u32,
    #[serde(default)]
    pub rules: Vec<KeywordBonus>,
}

fn default_base() -> u32 {
    1
}

impl Default for DrillWeighting {
    fn default() -> Self {
        let rule = |keywords: &[&str], bonus| KeywordBonus {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            bonus,
        };
        Self {
            base: 1,
            rules: vec![
                rule(&["shift"], 2),
                rule(&["normal good"], 1),
                rule(&["market supply"], 2),
                rule(&["supply curve", "along the supply"], 1),
            ],
        }
    }
}

impl DrillWeighting {
    pub fn weight(&self, question: &Question) -> u32 {
        let text = format!("{} {}", question.topic, question.prompt).to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|k| text.contains(&k.to_lowercase())))
            .fold(self.base, |acc, rule| acc + rule.bonus)
    }
}

/// Weighted draw with replacement from a pack. Repeated draws of the same
/// question get a `__{n}` suffix so every slot has its own id.
pub fn generate_drill_session<R: Rng + ?Sized>(
    bank: &Bank,
    pack: &str,
    weighting: &DrillWeighting,
    count: usize,
    rng: &mut R,
) -> Result<Vec<String>, SelectionError> {
    let members = bank
        .packs
        .get(pack)
        .ok_or_else(|| SelectionError::UnknownPack(pack.to_string()))?;
    let candidates: Vec<&Question> = members.iter().filter_map(|id| bank.question(id)).collect();
    if candidates.is_empty() {
        return Err(SelectionError::EmptyPool(format!("pack {} has no questions", pack)));
    }

    // An all-zero table (base 0, no hits) falls back to uniform.
    let weights: Vec<u32> = candidates.iter().map(|q| weighting.weight(q)).collect();
    let weights = if weights.iter().all(|&w| w == 0) {
        vec![1; candidates.len()]
    } else {
        weights
    };
    let distribution = WeightedIndex::new(&weights)
        .map_err(|e| SelectionError::EmptyPool(format!("pack {}: {}", pack, e)))?;

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let ids = (0..count)
        .map(|_| {
            let question = candidates[distribution.sample(rng)];
            let n = seen.entry(question.id.as_str()).or_insert(0);
            *n += 1;
            if *n == 1 {
                question.id.clone()
            } else {
                format!("{}{}{}", question.id, DUPLICATE_SUFFIX, n)
            }
        })
        .collect();
    Ok(ids)
}
