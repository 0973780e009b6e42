// src/service.rs

//! Orchestration over the pure engine: builds sessions from a plan, runs the
//! lifecycle against the persisted record, and feeds submissions into the
//! review schedule.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::engine::drill::{DRILL_SESSION_SIZE, DrillWeighting, generate_drill_session};
use crate::engine::full_sim::{FullSim2Options, generate_full_sim_exam1, generate_full_sim_exam2};
use crate::engine::lifecycle::{self, ExitChoice, ExitOutcome, Navigation, NewSession, SessionError, Tick};
use crate::engine::pacing::{PaceStatus, pace_status};
use crate::engine::resolve::{ResolvedQuestion, resolve_one, resolve_questions};
use crate::engine::rng::{SeedInput, fresh_seed, hash_string_to_seed};
use crate::engine::scoring::{
    QuestionScore, RowResult, ScoreSummary, score_calculation_table, score_mcq_question, score_session,
};
use crate::engine::selection::{
    ExamTypeFilter, SelectionError, generate_balanced_session, generate_exam1_mcq_session,
    generate_exam_type_session, legacy_set_ids,
};
use crate::engine::spaced::{apply_results, due_count, due_ids, generate_review_session};
use crate::engine::timer::{self, time_limit_minutes};
use crate::models::bank::Bank;
use crate::models::mistake::MistakeReason;
use crate::models::question::{GeneratedValues, Question, extract_base_question_id};
use crate::models::session::{AnswerValue, ExamMode, ExamType, Session, SessionMeta, SubmitReason};
use crate::store::{
    KeyValueStore, MistakeRepository, ReviewRepository, SelfMarkRepository, SessionHistory, StoreError,
};

/// Fields stripped from question payloads while an exam is still hidden.
const SOLUTION_FIELDS: [&str; 5] = [
    "answer_key",
    "correct_answers",
    "rationale",
    "mark_scheme",
    "model_answer",
];

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Invalid(String),
}

/// How to assemble a session's question list, tagged by `examType`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "examType", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SessionPlan {
    LegacySet {
        set_id: String,
    },
    Balanced,
    Exam1Mcq {
        /// Plain round-robin over all single-choice questions, no cap.
        #[serde(default)]
        uncapped: bool,
    },
    Exam2Written,
    FullSimExam1,
    FullSimExam2 {
        #[serde(default)]
        include_mcq: bool,
    },
    Review,
    Drill {
        pack: String,
    },
    Pack {
        pack: String,
        #[serde(default)]
        shuffle: bool,
    },
    Retry {
        session_id: String,
    },
}

impl SessionPlan {
    pub fn exam_type(&self) -> ExamType {
        match self {
            SessionPlan::LegacySet { .. } => ExamType::LegacySet,
            SessionPlan::Balanced => ExamType::Balanced,
            SessionPlan::Exam1Mcq { .. } => ExamType::Exam1Mcq,
            SessionPlan::Exam2Written => ExamType::Exam2Written,
            SessionPlan::FullSimExam1 => ExamType::FullSimExam1,
            SessionPlan::FullSimExam2 { .. } => ExamType::FullSimExam2,
            SessionPlan::Review => ExamType::Review,
            SessionPlan::Drill { .. } => ExamType::Drill,
            SessionPlan::Pack { .. } => ExamType::Pack,
            SessionPlan::Retry { .. } => ExamType::Retry,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(flatten)]
    pub plan: SessionPlan,
    #[serde(default)]
    pub mode: ExamMode,
    #[serde(default)]
    pub seed: Option<SeedInput>,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub history_limit: usize,
    pub review_session_size: usize,
    pub drill_weighting: DrillWeighting,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            history_limit: crate::store::history::DEFAULT_HISTORY_LIMIT,
            review_session_size: 10,
            drill_weighting: DrillWeighting::default(),
        }
    }
}

struct Selection {
    ids: Vec<String>,
    set_id: String,
    set_minutes: Option<i64>,
    shuffle: Option<bool>,
    meta: Option<SessionMeta>,
}

impl Selection {
    fn plain(ids: Vec<String>, set_id: impl Into<String>) -> Self {
        Self {
            ids,
            set_id: set_id.into(),
            set_minutes: None,
            shuffle: None,
            meta: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session: Session,
    pub remaining_seconds: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub reveal_solutions: bool,
    pub questions: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub remaining_seconds: i64,
    pub expired: bool,
    pub auto_submitted: bool,
    pub submitted: bool,
    pub locked: bool,
    pub pace: PaceStatus,
    pub answered: usize,
    pub total: usize,
    pub current_index: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub question: Question,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedValues>,
    pub answer: Option<AnswerValue>,
    pub flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<QuestionScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<BTreeMap<String, RowResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_mark: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistake: Option<MistakeReason>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub session_id: String,
    pub exam_type: ExamType,
    pub mode: ExamMode,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submit_reason: Option<SubmitReason>,
    pub summary: ScoreSummary,
    pub questions: Vec<QuestionReview>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSummary {
    pub ids: Vec<String>,
    pub count: usize,
}

/// Calendar date in local time; review scheduling has day granularity.
pub fn local_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Seed used to materialise templates. Migrated legacy sessions carry none,
/// so their id is hashed instead.
pub fn session_seed(session: &Session) -> u32 {
    session.seed.unwrap_or_else(|| hash_string_to_seed(&session.id))
}

fn question_payload(resolved: &ResolvedQuestion, reveal: bool) -> Result<Value, ServiceError> {
    let mut value = serde_json::to_value(resolved).map_err(StoreError::from)?;
    if reveal {
        return Ok(value);
    }
    if let Some(object) = value.as_object_mut() {
        object.remove("generated");
        if let Some(question) = object.get_mut("question").and_then(Value::as_object_mut) {
            for field in SOLUTION_FIELDS {
                question.remove(field);
            }
            // Table row labels are needed to answer; the expected values are not.
            if let Some(data) = question.remove("answer_data") {
                let rows: Vec<String> = data
                    .get("market_supply")
                    .and_then(Value::as_object)
                    .map(|m| m.keys().cloned().collect())
                    .unwrap_or_default();
                question.insert("rows".to_string(), json!(rows));
            }
        }
    }
    Ok(value)
}

pub struct ExamService {
    history: SessionHistory,
    reviews: ReviewRepository,
    mistakes: MistakeRepository,
    self_marks: SelfMarkRepository,
    settings: ServiceSettings,
    // One guard per session id, held from load to save.
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ExamService {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: ServiceSettings) -> Self {
        Self {
            history: SessionHistory::new(store.clone(), settings.history_limit),
            reviews: ReviewRepository::new(store.clone()),
            mistakes: MistakeRepository::new(store.clone()),
            self_marks: SelfMarkRepository::new(store),
            settings,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn reviews(&self) -> &ReviewRepository {
        &self.reviews
    }

    async fn select(
        &self,
        bank: &Bank,
        plan: &SessionPlan,
        seed: u32,
        seed_input: Option<&SeedInput>,
        now: DateTime<Utc>,
    ) -> Result<Selection, ServiceError> {
        let selection = match plan {
            SessionPlan::LegacySet { set_id } => {
                let ids = legacy_set_ids(bank, set_id)?;
                Selection {
                    ids,
                    set_id: set_id.clone(),
                    set_minutes: bank.exam_sets.get(set_id).map(|s| s.duration_minutes),
                    shuffle: None,
                    meta: Some(SessionMeta {
                        legacy_set_id: Some(set_id.clone()),
                        ..SessionMeta::default()
                    }),
                }
            }
            SessionPlan::Balanced => Selection::plain(generate_balanced_session(bank, seed), "balanced"),
            SessionPlan::Exam1Mcq { uncapped } => {
                let ids = if *uncapped {
                    generate_exam_type_session(bank, ExamTypeFilter::SingleChoice, seed)
                } else {
                    generate_exam1_mcq_session(bank, seed)?
                };
                Selection::plain(ids, "exam1_mcq")
            }
            SessionPlan::Exam2Written => Selection::plain(
                generate_exam_type_session(bank, ExamTypeFilter::NonSingleChoice, seed),
                "exam2_written",
            ),
            SessionPlan::FullSimExam1 => {
                Selection::plain(generate_full_sim_exam1(bank, seed)?, "full_sim_exam1")
            }
            SessionPlan::FullSimExam2 { include_mcq } => {
                let options = FullSim2Options {
                    include_mcq: *include_mcq,
                };
                let mut selection =
                    Selection::plain(generate_full_sim_exam2(bank, seed, options)?, "full_sim_exam2");
                selection.meta = Some(SessionMeta {
                    include_mcq: Some(*include_mcq),
                    ..SessionMeta::default()
                });
                selection
            }
            SessionPlan::Review => {
                let map = self.reviews.load().await?;
                let ids = generate_review_session(bank, &map, self.settings.review_session_size, local_today(now));
                if ids.is_empty() {
                    return Err(SelectionError::EmptyPool("no single-choice questions to review".to_string()).into());
                }
                Selection::plain(ids, "review")
            }
            SessionPlan::Drill { pack } => {
                let mut rng = match seed_input {
                    Some(input) => StdRng::seed_from_u64(u64::from(input.resolve())),
                    None => StdRng::from_os_rng(),
                };
                let ids = generate_drill_session(
                    bank,
                    pack,
                    &self.settings.drill_weighting,
                    DRILL_SESSION_SIZE,
                    &mut rng,
                )?;
                let mut selection = Selection::plain(ids, format!("drill-{}", pack));
                selection.meta = Some(SessionMeta {
                    pack: Some(pack.clone()),
                    ..SessionMeta::default()
                });
                selection
            }
            SessionPlan::Pack { pack, shuffle } => {
                let members = bank
                    .packs
                    .get(pack)
                    .ok_or_else(|| SelectionError::UnknownPack(pack.clone()))?;
                let mut ids: Vec<String> = members
                    .iter()
                    .filter(|id| bank.question(id).is_some())
                    .cloned()
                    .collect();
                if *shuffle {
                    ids.shuffle(&mut StdRng::from_os_rng());
                }
                Selection {
                    ids,
                    set_id: format!("pack-{}", pack),
                    set_minutes: None,
                    shuffle: Some(*shuffle),
                    meta: Some(SessionMeta {
                        pack: Some(pack.clone()),
                        ..SessionMeta::default()
                    }),
                }
            }
            SessionPlan::Retry { session_id } => {
                let ids = self.retry_ids(bank, session_id).await?;
                let mut selection = Selection::plain(ids, format!("retry-{}", session_id));
                selection.meta = Some(SessionMeta {
                    retry_of: Some(session_id.clone()),
                    ..SessionMeta::default()
                });
                selection
            }
        };
        Ok(selection)
    }

    /// Auto-gradable questions of a submitted session that were not fully
    /// correct, by base id, in original order.
    async fn retry_ids(&self, bank: &Bank, session_id: &str) -> Result<Vec<String>, ServiceError> {
        let source = self
            .history
            .get(session_id)
            .await?
            .ok_or_else(|| SelectionError::UnknownSession(session_id.to_string()))?;
        if !source.is_submitted() {
            return Err(SelectionError::NotSubmitted(session_id.to_string()).into());
        }

        let questions = resolve_questions(bank, &source.question_ids, session_seed(&source), None);
        let mut seen = HashSet::new();
        let ids: Vec<String> = questions
            .iter()
            .filter(|rq| {
                score_mcq_question(&rq.question, source.answers.get(&rq.key), source.mode)
                    .is_some_and(|score| !score.is_correct)
            })
            .map(|rq| extract_base_question_id(&rq.key).to_string())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        if ids.is_empty() {
            return Err(SelectionError::EmptyPool(format!("session {} has no wrong answers", session_id)).into());
        }
        Ok(ids)
    }

    pub async fn create_session(
        &self,
        bank: &Bank,
        request: CreateSessionRequest,
        now: DateTime<Utc>,
    ) -> Result<Session, ServiceError> {
        let seed = request
            .seed
            .as_ref()
            .map(SeedInput::resolve)
            .unwrap_or_else(fresh_seed);
        let exam_type = request.plan.exam_type();
        let selection = self
            .select(bank, &request.plan, seed, request.seed.as_ref(), now)
            .await?;

        let minutes = time_limit_minutes(exam_type, selection.ids.len(), selection.set_minutes);
        let mut session = lifecycle::create(
            NewSession {
                id: Uuid::new_v4().to_string(),
                exam_type,
                mode: request.mode,
                set_id: selection.set_id,
                question_ids: selection.ids,
                time_limit_seconds: minutes * 60,
                seed: Some(seed),
                shuffle: selection.shuffle,
                meta: selection.meta,
            },
            now,
        )?;
        lifecycle::start(&mut session, now);

        self.history.save(&session).await?;
        self.history.set_active(Some(&session.id)).await?;
        tracing::info!(
            "Created {:?} session {} with {} questions ({} min, seed {})",
            exam_type,
            session.id,
            session.question_ids.len(),
            minutes,
            seed
        );
        Ok(session)
    }

    async fn load(&self, id: &str) -> Result<Session, ServiceError> {
        self.history
            .get(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()).into())
    }

    async fn session_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.session_locks
            .lock()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Ticks the session, applies `apply`, and persists if anything changed.
    /// Only the call that moves the stored record into the submitted state
    /// grades it, and only after that record is saved.
    async fn with_session<F>(
        &self,
        bank: &Bank,
        id: &str,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<(Session, Tick), ServiceError>
    where
        F: FnOnce(&mut Session) -> bool + Send,
    {
        let lock = self.session_lock(id).await;
        let _guard = lock.lock().await;

        let mut session = self.load(id).await?;
        let was_submitted = session.is_submitted();
        let tick = lifecycle::tick(&mut session, now);
        let changed = apply(&mut session) || tick.auto_submitted;

        if changed {
            self.history.save(&session).await?;
        }
        if !was_submitted && session.is_submitted() {
            self.finalize(bank, &session, now).await?;
        }
        Ok((session, tick))
    }

    async fn finalize(&self, bank: &Bank, session: &Session, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let questions = resolve_questions(bank, &session.question_ids, session_seed(session), None);
        let today = local_today(now);
        let applied = self
            .reviews
            .update(|map| apply_results(map, &questions, &session.answers, today))
            .await?;
        if self.history.active_id().await?.as_deref() == Some(session.id.as_str()) {
            self.history.set_active(None).await?;
        }
        tracing::info!(
            "Submitted session {} ({:?}), {} review updates",
            session.id,
            session.submit_reason,
            applied
        );
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Session>, ServiceError> {
        Ok(self.history.load().await?)
    }

    pub async fn active(&self) -> Result<Option<Session>, ServiceError> {
        Ok(self.history.active().await?)
    }

    pub async fn view(&self, bank: &Bank, id: &str, now: DateTime<Utc>) -> Result<SessionView, ServiceError> {
        let (session, tick) = self.with_session(bank, id, now, |_| false).await?;
        let reveal = session.mode == ExamMode::Practice || session.is_submitted();
        let questions = resolve_questions(bank, &session.question_ids, session_seed(&session), Some(&session.set_id))
            .iter()
            .map(|rq| question_payload(rq, reveal))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SessionView {
            expires_at: lifecycle::expires_at(&session),
            remaining_seconds: tick.remaining_seconds,
            reveal_solutions: reveal,
            questions,
            session,
        })
    }

    pub async fn answer(
        &self,
        bank: &Bank,
        id: &str,
        value: AnswerValue,
        now: DateTime<Utc>,
    ) -> Result<Session, ServiceError> {
        let (session, _) = self
            .with_session(bank, id, now, |s| lifecycle::record_answer(s, value))
            .await?;
        Ok(session)
    }

    pub async fn toggle_flag(&self, bank: &Bank, id: &str, now: DateTime<Utc>) -> Result<Session, ServiceError> {
        let (session, _) = self.with_session(bank, id, now, lifecycle::toggle_flag).await?;
        Ok(session)
    }

    pub async fn navigate(
        &self,
        bank: &Bank,
        id: &str,
        navigation: Navigation,
        now: DateTime<Utc>,
    ) -> Result<Session, ServiceError> {
        let (session, _) = self
            .with_session(bank, id, now, |s| lifecycle::navigate(s, navigation))
            .await?;
        Ok(session)
    }

    pub async fn status(&self, bank: &Bank, id: &str, now: DateTime<Utc>) -> Result<SessionStatus, ServiceError> {
        let (session, tick) = self.with_session(bank, id, now, |_| false).await?;
        let types: Vec<_> = resolve_questions(bank, &session.question_ids, session_seed(&session), None)
            .iter()
            .map(|rq| rq.question.question_type())
            .collect();
        let pace = pace_status(&types, session.current_index, timer::elapsed_seconds(&session, now));
        Ok(SessionStatus {
            remaining_seconds: tick.remaining_seconds,
            expired: tick.expired,
            auto_submitted: tick.auto_submitted,
            submitted: session.is_submitted(),
            locked: session.is_locked(),
            pace,
            answered: session.answered_count(),
            total: session.question_ids.len(),
            current_index: session.current_index,
        })
    }

    /// Manual submission. Repeated calls return the stored record unchanged.
    pub async fn submit(&self, bank: &Bank, id: &str, now: DateTime<Utc>) -> Result<Session, ServiceError> {
        let (session, _) = self
            .with_session(bank, id, now, |s| lifecycle::submit(s, SubmitReason::Manual, now))
            .await?;
        Ok(session)
    }

    pub async fn exit(&self, id: &str, choice: Option<ExitChoice>) -> Result<ExitOutcome, ServiceError> {
        let lock = self.session_lock(id).await;
        let _guard = lock.lock().await;

        let session = self.load(id).await?;
        let outcome = lifecycle::plan_exit(&session, choice)?;
        match outcome {
            ExitOutcome::Discarded => {
                self.remove_record(id).await?;
                tracing::info!("Discarded practice session {} on exit", id);
            }
            ExitOutcome::Saved => {
                tracing::info!("Saved practice session {} on exit", id);
            }
            ExitOutcome::ChoiceRequired | ExitOutcome::Cancelled => {}
        }
        Ok(outcome)
    }

    pub async fn discard(&self, id: &str) -> Result<(), ServiceError> {
        let lock = self.session_lock(id).await;
        let _guard = lock.lock().await;
        self.remove_record(id).await
    }

    /// Caller holds the session guard.
    async fn remove_record(&self, id: &str) -> Result<(), ServiceError> {
        if !self.history.remove(id).await? {
            return Err(SessionError::NotFound(id.to_string()).into());
        }
        self.self_marks.remove_session(id).await?;
        self.session_locks.lock().await.remove(id);
        Ok(())
    }

    pub async fn results(&self, bank: &Bank, id: &str) -> Result<ResultsView, ServiceError> {
        let session = self.load(id).await?;
        if session.mode == ExamMode::RealExam && !session.is_submitted() {
            return Err(SelectionError::NotSubmitted(id.to_string()).into());
        }

        let questions = resolve_questions(bank, &session.question_ids, session_seed(&session), Some(&session.set_id));
        let summary = score_session(&questions, &session.answers, session.mode);
        let marks = self.self_marks.for_session(id).await?;
        let mistakes = self.mistakes.load().await?;

        let reviews = questions
            .into_iter()
            .map(|rq| {
                let answer = session.answers.get(&rq.key).cloned();
                let score = score_mcq_question(&rq.question, answer.as_ref(), session.mode);
                let rows = score_calculation_table(&rq.question, answer.as_ref());
                let self_mark = rq
                    .question
                    .written()
                    .and_then(|_| marks.get(&rq.key).copied());
                let mistake = mistakes.get(extract_base_question_id(&rq.key)).copied();
                QuestionReview {
                    flagged: session.flags.contains(&rq.key),
                    key: rq.key,
                    section: rq.section,
                    question: rq.question,
                    generated: rq.generated,
                    answer,
                    score,
                    rows,
                    self_mark,
                    mistake,
                }
            })
            .collect();

        Ok(ResultsView {
            session_id: session.id,
            exam_type: session.exam_type,
            mode: session.mode,
            submitted_at: session.submitted_at,
            submit_reason: session.submit_reason,
            summary,
            questions: reviews,
        })
    }

    pub async fn set_self_mark(&self, bank: &Bank, id: &str, key: &str, points: f64) -> Result<(), ServiceError> {
        let session = self.load(id).await?;
        if !session.question_ids.iter().any(|q| q == key) {
            return Err(ServiceError::Invalid(format!("Question {} is not part of session {}", key, id)));
        }
        let resolved = resolve_one(bank, key, session_seed(&session), None)
            .ok_or_else(|| ServiceError::Invalid(format!("Question {} is not in the bank", key)))?;
        if resolved.question.written().is_none() {
            return Err(ServiceError::Invalid(format!("Question {} is marked automatically", key)));
        }
        let max = resolved.question.points;
        if !points.is_finite() || !(0.0..=max).contains(&points) {
            return Err(ServiceError::Invalid(format!("Self-mark must be between 0 and {}", max)));
        }
        self.self_marks.set(id, key, points).await?;
        Ok(())
    }

    pub async fn due(&self, now: DateTime<Utc>) -> Result<DueSummary, ServiceError> {
        let map = self.reviews.load().await?;
        let today = local_today(now);
        Ok(DueSummary {
            ids: due_ids(&map, today),
            count: due_count(&map, today),
        })
    }

    pub async fn set_mistake(&self, question_id: &str, reason: Option<MistakeReason>) -> Result<(), ServiceError> {
        self.mistakes.set(question_id, reason).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bank::parse_bank;
    use crate::models::bank::tests::{bank_json, mcq};
    use crate::engine::spaced::update_for_answer;
    use crate::models::review::ReviewStage;
    use crate::store::MemoryStore;
    use crate::store::memory::YieldingStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap()
    }

    fn bank() -> Bank {
        parse_bank(&bank_json(vec![mcq("MCQ-1", "Demand", "p"), mcq("MCQ-2", "Supply", "q")]).to_string()).unwrap()
    }

    fn service() -> ExamService {
        ExamService::new(Arc::new(MemoryStore::new()), ServiceSettings::default())
    }

    fn legacy_request(mode: ExamMode) -> CreateSessionRequest {
        CreateSessionRequest {
            plan: SessionPlan::LegacySet { set_id: "A".to_string() },
            mode,
            seed: Some(SeedInput::Number(5)),
        }
    }

    #[test]
    fn test_plan_deserializes_by_exam_type_tag() {
        let request: CreateSessionRequest = serde_json::from_value(json!({
            "examType": "full_sim_exam2",
            "includeMcq": true,
            "mode": "practice",
            "seed": "abc"
        }))
        .unwrap();
        assert_eq!(request.plan, SessionPlan::FullSimExam2 { include_mcq: true });
        assert_eq!(request.mode, ExamMode::Practice);
        assert_eq!(request.seed, Some(SeedInput::Text("abc".to_string())));

        let request: CreateSessionRequest = serde_json::from_value(json!({"examType": "exam1_mcq"})).unwrap();
        assert_eq!(request.plan, SessionPlan::Exam1Mcq { uncapped: false });
        assert_eq!(request.mode, ExamMode::RealExam);
    }

    #[tokio::test]
    async fn test_submit_grades_once_and_schedules_review() {
        let service = service();
        let bank = bank();
        let session = service.create_session(&bank, legacy_request(ExamMode::RealExam), now()).await.unwrap();
        assert_eq!(service.active().await.unwrap().map(|s| s.id), Some(session.id.clone()));

        service
            .answer(&bank, &session.id, AnswerValue::Text("B".into()), now())
            .await
            .unwrap();
        let submitted = service.submit(&bank, &session.id, now()).await.unwrap();
        assert!(submitted.locked);

        let map = service.reviews().load().await.unwrap();
        assert!(map.contains_key("MCQ-1"));
        assert!(!map.contains_key("MCQ-2"), "unanswered questions are not scheduled");

        let again = service.submit(&bank, &session.id, now() + Duration::minutes(1)).await.unwrap();
        assert_eq!(again.submitted_at, submitted.submitted_at);
        assert!(service.active().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_submits_grade_once() {
        let service = ExamService::new(Arc::new(YieldingStore::default()), ServiceSettings::default());
        let bank = bank();
        let today = local_today(now());
        service
            .reviews()
            .update(|map| update_for_answer(map, "MCQ-1", "Demand", false, today))
            .await
            .unwrap();

        let session = service.create_session(&bank, legacy_request(ExamMode::RealExam), now()).await.unwrap();
        service
            .answer(&bank, &session.id, AnswerValue::Text("A".into()), now())
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            service.submit(&bank, &session.id, now()),
            service.submit(&bank, &session.id, now() + Duration::seconds(1)),
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.submitted_at, second.submitted_at);

        let map = service.reviews().load().await.unwrap();
        assert_eq!(map.get("MCQ-1").map(|e| e.stage), Some(ReviewStage::Familiar));
    }

    #[tokio::test]
    async fn test_auto_submit_racing_manual_submit_grades_once() {
        let service = ExamService::new(Arc::new(YieldingStore::default()), ServiceSettings::default());
        let bank = bank();
        let today = local_today(now());
        service
            .reviews()
            .update(|map| update_for_answer(map, "MCQ-1", "Demand", false, today))
            .await
            .unwrap();

        let session = service.create_session(&bank, legacy_request(ExamMode::RealExam), now()).await.unwrap();
        service
            .answer(&bank, &session.id, AnswerValue::Text("A".into()), now())
            .await
            .unwrap();

        let expiry = now() + Duration::minutes(50);
        let (status, submitted) = tokio::join!(
            service.status(&bank, &session.id, expiry),
            service.submit(&bank, &session.id, expiry),
        );
        assert!(status.unwrap().submitted);
        assert!(submitted.unwrap().is_submitted());

        let map = service.reviews().load().await.unwrap();
        assert_eq!(map.get("MCQ-1").map(|e| e.stage), Some(ReviewStage::Familiar));
    }

    #[tokio::test]
    async fn test_timeout_auto_submits_on_status() {
        let service = service();
        let bank = bank();
        let session = service.create_session(&bank, legacy_request(ExamMode::RealExam), now()).await.unwrap();
        let status = service
            .status(&bank, &session.id, now() + Duration::minutes(50))
            .await
            .unwrap();
        assert!(status.auto_submitted);
        assert_eq!(status.remaining_seconds, 0);
        let stored = service.history().get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.submit_reason, Some(SubmitReason::Timeout));
    }

    #[tokio::test]
    async fn test_hidden_solutions_until_submitted() {
        let service = service();
        let bank = bank();
        let session = service.create_session(&bank, legacy_request(ExamMode::RealExam), now()).await.unwrap();
        let view = service.view(&bank, &session.id, now()).await.unwrap();
        assert!(!view.reveal_solutions);
        assert!(view.questions[0]["question"].get("answer_key").is_none());
        assert!(view.questions[0]["question"].get("options").is_some());
        assert!(matches!(
            service.results(&bank, &session.id).await,
            Err(ServiceError::Selection(SelectionError::NotSubmitted(_)))
        ));
    }

    #[tokio::test]
    async fn test_retry_collects_wrong_and_unanswered() {
        let service = service();
        let bank = bank();
        let session = service.create_session(&bank, legacy_request(ExamMode::Practice), now()).await.unwrap();
        service
            .answer(&bank, &session.id, AnswerValue::Text("A".into()), now())
            .await
            .unwrap();
        service.submit(&bank, &session.id, now()).await.unwrap();

        let retry = service
            .create_session(
                &bank,
                CreateSessionRequest {
                    plan: SessionPlan::Retry {
                        session_id: session.id.clone(),
                    },
                    mode: ExamMode::Practice,
                    seed: None,
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(retry.question_ids, vec!["MCQ-2".to_string()]);
        assert_eq!(retry.meta.and_then(|m| m.retry_of), Some(session.id));
    }

    #[tokio::test]
    async fn test_exit_without_progress_discards() {
        let service = service();
        let bank = bank();
        let session = service.create_session(&bank, legacy_request(ExamMode::Practice), now()).await.unwrap();
        assert_eq!(service.exit(&session.id, None).await.unwrap(), ExitOutcome::Discarded);
        assert!(service.history().get(&session.id).await.unwrap().is_none());
    }
}
