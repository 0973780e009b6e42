// src/models/mistake.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Why a question was missed, chosen by the learner on the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MistakeReason {
    #[serde(rename = "Concept gap")]
    ConceptGap,
    #[serde(rename = "Misread question")]
    MisreadQuestion,
    #[serde(rename = "Rushed / time pressure")]
    Rushed,
    #[serde(rename = "Diagram confusion")]
    DiagramConfusion,
    #[serde(rename = "Careless mistake")]
    Careless,
}

/// Question id -> reason.
pub type MistakeMap = BTreeMap<String, MistakeReason>;

/// Session id -> question key -> self-awarded points for written answers.
pub type SelfMarkMap = BTreeMap<String, BTreeMap<String, f64>>;
