// src/engine/lifecycle.rs

//! Session state machine: created -> active -> submitted. Every mutation is a
//! no-op once the session is locked, and `submit` takes effect at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::timer::{self, should_auto_submit};
use crate::models::session::{
    AnswerValue, ExamMode, ExamType, SESSION_VERSION, Session, SessionMeta, SubmitReason,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Only practice sessions can be exited before submission")]
    ExitNotAllowed,

    #[error("The session has no questions")]
    EmptySession,
}

/// Everything needed to construct a fresh session record.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub exam_type: ExamType,
    pub mode: ExamMode,
    pub set_id: String,
    pub question_ids: Vec<String>,
    pub time_limit_seconds: i64,
    pub seed: Option<u32>,
    pub shuffle: Option<bool>,
    pub meta: Option<SessionMeta>,
}

pub fn create(new: NewSession, now: DateTime<Utc>) -> Result<Session, SessionError> {
    if new.question_ids.is_empty() {
        return Err(SessionError::EmptySession);
    }
    Ok(Session {
        version: SESSION_VERSION,
        id: new.id,
        exam_type: new.exam_type,
        mode: new.mode,
        created_at: now,
        started_at: None,
        time_limit_seconds: new.time_limit_seconds,
        locked: false,
        set_id: new.set_id,
        question_ids: new.question_ids,
        answers: Default::default(),
        flags: Default::default(),
        current_index: 0,
        seed: new.seed,
        shuffle: new.shuffle,
        submitted_at: None,
        submit_reason: None,
        meta: new.meta,
    })
}

/// Starts the clock. Starting twice keeps the original instant.
pub fn start(session: &mut Session, now: DateTime<Utc>) -> bool {
    if session.started_at.is_some() || session.is_locked() {
        return false;
    }
    session.started_at = Some(now);
    true
}

pub fn expires_at(session: &Session) -> Option<DateTime<Utc>> {
    session
        .started_at
        .map(|s| s + chrono::Duration::seconds(session.time_limit_seconds))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub remaining_seconds: i64,
    pub expired: bool,
    /// True only on the tick that performed the timeout submission.
    pub auto_submitted: bool,
}

/// Recomputes remaining time. A real exam observed at zero is submitted with
/// reason `timeout`; practice sessions just stop at zero.
pub fn tick(session: &mut Session, now: DateTime<Utc>) -> Tick {
    let remaining_seconds = timer::session_remaining_seconds(session, now);
    let expired = session.started_at.is_some() && should_auto_submit(remaining_seconds);
    let auto_submitted = expired
        && session.mode == ExamMode::RealExam
        && submit(session, SubmitReason::Timeout, now);
    Tick {
        remaining_seconds,
        expired,
        auto_submitted,
    }
}

/// Upserts the answer for the current question. Returns whether anything
/// changed.
pub fn record_answer(session: &mut Session, value: AnswerValue) -> bool {
    if session.is_locked() {
        return false;
    }
    let Some(id) = session.current_question_id().map(str::to_string) else {
        return false;
    };
    session.answers.insert(id, value);
    true
}

pub fn toggle_flag(session: &mut Session) -> bool {
    if session.is_locked() {
        return false;
    }
    let Some(id) = session.current_question_id().map(str::to_string) else {
        return false;
    };
    if !session.flags.remove(&id) {
        session.flags.insert(id);
    }
    true
}

/// Moves to `index`, clamped to the question list.
pub fn go_to(session: &mut Session, index: usize) -> bool {
    if session.is_locked() || session.question_ids.is_empty() {
        return false;
    }
    let clamped = index.min(session.question_ids.len() - 1);
    let changed = clamped != session.current_index;
    session.current_index = clamped;
    changed
}

pub fn next(session: &mut Session) -> bool {
    go_to(session, session.current_index.saturating_add(1))
}

pub fn previous(session: &mut Session) -> bool {
    go_to(session, session.current_index.saturating_sub(1))
}

/// Navigation request: `{"to": 3}`, `"next"` or `"previous"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    To(usize),
    Next,
    Previous,
}

pub fn navigate(session: &mut Session, navigation: Navigation) -> bool {
    match navigation {
        Navigation::To(index) => go_to(session, index),
        Navigation::Next => next(session),
        Navigation::Previous => previous(session),
    }
}

/// Freezes the session. Returns `false` (and changes nothing) when it was
/// already submitted or has no questions.
pub fn submit(session: &mut Session, reason: SubmitReason, now: DateTime<Utc>) -> bool {
    if session.is_submitted() || session.question_ids.is_empty() {
        return false;
    }
    session.submitted_at = Some(now);
    session.submit_reason = Some(reason);
    if session.mode == ExamMode::RealExam {
        session.locked = true;
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitChoice {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitOutcome {
    /// Progress exists and the caller has not chosen yet.
    ChoiceRequired,
    Saved,
    Discarded,
    Cancelled,
}

/// Resolves an exit request. Exiting never scores anything.
pub fn plan_exit(session: &Session, choice: Option<ExitChoice>) -> Result<ExitOutcome, SessionError> {
    if session.is_submitted() {
        return Ok(ExitOutcome::Saved);
    }
    if session.mode != ExamMode::Practice {
        return Err(SessionError::ExitNotAllowed);
    }
    if !session.has_progress() {
        return Ok(ExitOutcome::Discarded);
    }
    Ok(match choice {
        None => ExitOutcome::ChoiceRequired,
        Some(ExitChoice::Save) => ExitOutcome::Saved,
        Some(ExitChoice::Discard) => ExitOutcome::Discarded,
        Some(ExitChoice::Cancel) => ExitOutcome::Cancelled,
    })
}
