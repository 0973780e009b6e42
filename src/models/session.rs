// src/models/session.rs

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, IntoDeserializer, value::StringDeserializer};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Current persisted record version.
pub const SESSION_VERSION: u32 = 2;

/// `practice` shows feedback immediately; `real_exam` hides it until
/// submission and locks the record on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExamMode {
    Practice,
    #[default]
    RealExam,
}

/// How the question list of a session was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    LegacySet,
    Balanced,
    Exam1Mcq,
    Exam2Written,
    FullSimExam1,
    FullSimExam2,
    Review,
    Drill,
    Pack,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    Manual,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Curve {
    Demand,
    Supply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Up,
    Down,
    Uncertain,
}

/// Blank strings are stored for unset selections. Unknown labels read as
/// unset too, so any object carrying `curve` stays a diagram answer.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(s) if !s.trim().is_empty() => {
            let de: StringDeserializer<D::Error> = s.trim().to_string().into_deserializer();
            Ok(T::deserialize(de).ok())
        }
        _ => Ok(None),
    }
}

fn none_as_blank<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

/// Structured answer for diagram-logic questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DiagramResponse {
    /// Always present, so a stored diagram object is recognisable by shape.
    #[serde(deserialize_with = "blank_as_none", serialize_with = "none_as_blank")]
    pub curve: Option<Curve>,
    #[serde(default, deserialize_with = "blank_as_none", serialize_with = "none_as_blank")]
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "blank_as_none", serialize_with = "none_as_blank")]
    pub price_effect: Option<Effect>,
    #[serde(default, deserialize_with = "blank_as_none", serialize_with = "none_as_blank")]
    pub quantity_effect: Option<Effect>,
    #[serde(default)]
    pub justification: String,
}

/// Polymorphic answer value. The variant is detected from the stored shape,
/// not from a tag: string, list of strings, object with `curve` (diagram),
/// any other object of strings (table). Anything else is kept verbatim and
/// treated as unanswered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
    Diagram(DiagramResponse),
    Table(BTreeMap<String, String>),
    Unrecognized(serde_json::Value),
}

impl AnswerValue {
    pub fn is_answered(&self) -> bool {
        match self {
            AnswerValue::Text(s) => !s.trim().is_empty(),
            AnswerValue::Choices(list) => !list.is_empty(),
            AnswerValue::Diagram(d) => {
                d.curve.is_some()
                    || d.direction.is_some()
                    || d.price_effect.is_some()
                    || d.quantity_effect.is_some()
                    || !d.justification.trim().is_empty()
            }
            AnswerValue::Table(rows) => rows.values().any(|v| !v.trim().is_empty()),
            AnswerValue::Unrecognized(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Choices(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            AnswerValue::Table(rows) => Some(rows),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_mcq: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<String>,
}

/// The mutable unit of progress, persisted as a whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub version: u32,
    pub id: String,
    pub exam_type: ExamType,
    pub mode: ExamMode,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub time_limit_seconds: i64,
    #[serde(default)]
    pub locked: bool,
    pub set_id: String,
    pub question_ids: Vec<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerValue>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_reason: Option<SubmitReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SessionMeta>,
}

impl Session {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Terminal for mutation: submitted, or locked by a real exam.
    pub fn is_locked(&self) -> bool {
        self.submitted_at.is_some() || self.locked
    }

    pub fn current_question_id(&self) -> Option<&str> {
        if self.question_ids.is_empty() {
            return None;
        }
        let index = self.current_index.min(self.question_ids.len() - 1);
        Some(self.question_ids[index].as_str())
    }

    /// True when any answer is non-blank by its shape, or any question is
    /// flagged.
    pub fn has_progress(&self) -> bool {
        self.answers.values().any(AnswerValue::is_answered) || !self.flags.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.question_ids
            .iter()
            .filter(|id| self.answers.get(*id).is_some_and(AnswerValue::is_answered))
            .count()
    }
}

/// Pre-history single-session record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySession {
    pub set_id: String,
    #[serde(default)]
    pub question_ids: Vec<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerValue>,
    #[serde(default)]
    pub flags: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub current_index: usize,
}

impl LegacySession {
    /// Lifts the legacy record into the history format without dropping data.
    pub fn into_session(self) -> Session {
        let id = format!("legacy-{}-{}", self.set_id, self.started_at.timestamp_millis());
        Session {
            version: SESSION_VERSION,
            id,
            exam_type: ExamType::LegacySet,
            mode: ExamMode::RealExam,
            created_at: self.started_at,
            started_at: Some(self.started_at),
            time_limit_seconds: self.duration_minutes.unwrap_or(50) * 60,
            locked: self.submitted_at.is_some(),
            set_id: self.set_id.clone(),
            question_ids: self.question_ids,
            answers: self.answers,
            flags: self.flags.into_iter().collect(),
            current_index: self.current_index,
            seed: None,
            shuffle: None,
            submitted_at: self.submitted_at,
            submit_reason: None,
            meta: Some(SessionMeta {
                legacy_set_id: Some(self.set_id),
                ..SessionMeta::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> AnswerValue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_answer_shape_detection() {
        assert!(matches!(parse(json!("A")), AnswerValue::Text(_)));
        assert!(matches!(parse(json!(["A", "C"])), AnswerValue::Choices(_)));
        assert!(matches!(
            parse(json!({"curve": "Demand", "direction": "", "justification": ""})),
            AnswerValue::Diagram(_)
        ));
        assert!(matches!(parse(json!({"£5": "10"})), AnswerValue::Table(_)));
        assert!(matches!(parse(json!(42)), AnswerValue::Unrecognized(_)));
        assert!(matches!(parse(json!({"curve": 3})), AnswerValue::Unrecognized(_)));
    }

    #[test]
    fn test_unknown_diagram_labels_stay_diagram_and_unanswered() {
        let value = parse(json!({"curve": "up", "direction": "left"}));
        assert_eq!(value, AnswerValue::Diagram(DiagramResponse::default()));
        assert!(!value.is_answered());

        let partly = parse(json!({"curve": "Supply", "priceEffect": "sideways"}));
        let AnswerValue::Diagram(diagram) = &partly else {
            panic!("expected a diagram answer, got {:?}", partly);
        };
        assert_eq!(diagram.curve, Some(Curve::Supply));
        assert_eq!(diagram.price_effect, None);
        assert!(partly.is_answered());
    }

    #[test]
    fn test_answered_per_shape() {
        assert!(!parse(json!("   ")).is_answered());
        assert!(parse(json!("B")).is_answered());
        assert!(!parse(json!([])).is_answered());
        assert!(parse(json!(["A"])).is_answered());
        assert!(!parse(json!({"curve": "", "justification": " "})).is_answered());
        assert!(parse(json!({"curve": "", "priceEffect": "Up"})).is_answered());
        assert!(!parse(json!({"£5": "", "£4": " "})).is_answered());
        assert!(parse(json!({"£5": "", "£4": "12"})).is_answered());
        assert!(!parse(json!(null)).is_answered());
    }

    #[test]
    fn test_diagram_round_trips_with_curve_present() {
        let value = AnswerValue::Diagram(DiagramResponse {
            price_effect: Some(Effect::Down),
            ..DiagramResponse::default()
        });
        let raw = serde_json::to_value(&value).unwrap();
        assert_eq!(raw["curve"], json!(""));
        assert_eq!(parse(raw), value);
    }

    #[test]
    fn test_legacy_session_lifts_into_history_format() {
        let legacy: LegacySession = serde_json::from_value(json!({
            "setId": "A",
            "questionIds": ["MCQ-1"],
            "answers": {"MCQ-1": "B"},
            "flags": [],
            "startedAt": "2026-01-01T10:00:00.000Z",
            "durationMinutes": 50,
            "currentIndex": 0
        }))
        .unwrap();
        let session = legacy.into_session();
        assert_eq!(session.exam_type, ExamType::LegacySet);
        assert_eq!(session.meta.unwrap().legacy_set_id.as_deref(), Some("A"));
        assert_eq!(session.time_limit_seconds, 3000);
        assert_eq!(session.answers["MCQ-1"], AnswerValue::Text("B".into()));
        assert!(!session.locked);
    }
}
