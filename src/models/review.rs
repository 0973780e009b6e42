// src/models/review.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Retention confidence, low to high. Serialized as 0, 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReviewStage {
    New,
    Familiar,
    Confident,
}

impl ReviewStage {
    /// Days until the next check-in at this stage.
    pub fn interval_days(self) -> u64 {
        match self {
            ReviewStage::New => 1,
            ReviewStage::Familiar => 3,
            ReviewStage::Confident => 7,
        }
    }

    /// Next stage, or `None` once graduated past the top stage.
    pub fn advance(self) -> Option<ReviewStage> {
        match self {
            ReviewStage::New => Some(ReviewStage::Familiar),
            ReviewStage::Familiar => Some(ReviewStage::Confident),
            ReviewStage::Confident => None,
        }
    }
}

impl TryFrom<u8> for ReviewStage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReviewStage::New),
            1 => Ok(ReviewStage::Familiar),
            2 => Ok(ReviewStage::Confident),
            other => Err(format!("invalid review stage {}", other)),
        }
    }
}

impl From<ReviewStage> for u8 {
    fn from(stage: ReviewStage) -> u8 {
        match stage {
            ReviewStage::New => 0,
            ReviewStage::Familiar => 1,
            ReviewStage::Confident => 2,
        }
    }
}

/// Per-question scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub id: String,
    pub topic: String,
    pub stage: ReviewStage,
    /// Calendar-date key (`YYYY-MM-DD`), not a timestamp.
    pub next_review: NaiveDate,
}

/// Global map keyed by base question id.
pub type ReviewMap = BTreeMap<String, ReviewEntry>;
