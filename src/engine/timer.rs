// src/engine/timer.rs

use chrono::{DateTime, Utc};

use crate::models::session::{ExamType, Session};

pub const EXAM1_MINUTES: i64 = 25;
pub const EXAM2_MINUTES: i64 = 50;
pub const FULL_SIM1_MINUTES: i64 = 25;
pub const FULL_SIM2_MINUTES: i64 = 50;
pub const DEFAULT_SET_MINUTES: i64 = 50;

/// Remaining time is always recomputed from the stored start instant, so a
/// reloaded process resumes the countdown correctly.
pub fn compute_remaining_seconds(started_at: DateTime<Utc>, limit_seconds: i64, now: DateTime<Utc>) -> i64 {
    let elapsed = (now - started_at).num_milliseconds().div_euclid(1000);
    (limit_seconds - elapsed).max(0)
}

/// Remaining seconds for a session; an unstarted session reports its full
/// limit.
pub fn session_remaining_seconds(session: &Session, now: DateTime<Utc>) -> i64 {
    match session.started_at {
        Some(started_at) => compute_remaining_seconds(started_at, session.time_limit_seconds, now),
        None => session.time_limit_seconds.max(0),
    }
}

pub fn elapsed_seconds(session: &Session, now: DateTime<Utc>) -> i64 {
    session
        .started_at
        .map(|s| (now - s).num_milliseconds().div_euclid(1000).max(0))
        .unwrap_or(0)
}

pub fn should_auto_submit(remaining_seconds: i64) -> bool {
    remaining_seconds <= 0
}

/// Either side reporting submitted or locked wins.
pub fn derive_lock_state<'a>(inputs: impl IntoIterator<Item = Option<&'a Session>>) -> bool {
    inputs.into_iter().flatten().any(Session::is_locked)
}

pub fn compute_exam_duration_minutes(question_count: usize) -> i64 {
    if question_count <= 2 {
        return 5;
    }
    (question_count as i64 * 3).clamp(5, 50)
}

/// Fixed limit for kinds that have one, otherwise derived from the count.
pub fn time_limit_minutes(exam_type: ExamType, question_count: usize, set_minutes: Option<i64>) -> i64 {
    match exam_type {
        ExamType::LegacySet => set_minutes.unwrap_or(DEFAULT_SET_MINUTES),
        ExamType::Exam1Mcq => EXAM1_MINUTES,
        ExamType::Exam2Written => EXAM2_MINUTES,
        ExamType::FullSimExam1 => FULL_SIM1_MINUTES,
        ExamType::FullSimExam2 => FULL_SIM2_MINUTES,
        _ => compute_exam_duration_minutes(question_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_remaining_reaches_zero_exactly_at_limit() {
        let start = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
        let limit = 30 * 60;
        assert_eq!(compute_remaining_seconds(start, limit, start + Duration::minutes(30)), 0);
        assert_eq!(
            compute_remaining_seconds(start, limit, start + Duration::minutes(30) - Duration::seconds(1)),
            1
        );
        assert_eq!(compute_remaining_seconds(start, limit, start + Duration::hours(2)), 0);
        assert_eq!(compute_remaining_seconds(start, limit, start + Duration::milliseconds(1500)), limit - 1);
    }

    #[test]
    fn test_auto_submit_threshold() {
        assert!(should_auto_submit(0));
        assert!(should_auto_submit(-3));
        assert!(!should_auto_submit(1));
    }

    #[test]
    fn test_exam_duration() {
        assert_eq!(compute_exam_duration_minutes(0), 5);
        assert_eq!(compute_exam_duration_minutes(2), 5);
        assert_eq!(compute_exam_duration_minutes(3), 9);
        assert_eq!(compute_exam_duration_minutes(10), 30);
        assert_eq!(compute_exam_duration_minutes(40), 50);
    }

    #[test]
    fn test_fixed_limits() {
        assert_eq!(time_limit_minutes(ExamType::Exam1Mcq, 20, None), 25);
        assert_eq!(time_limit_minutes(ExamType::FullSimExam2, 13, None), 50);
        assert_eq!(time_limit_minutes(ExamType::LegacySet, 18, Some(45)), 45);
        assert_eq!(time_limit_minutes(ExamType::Review, 10, None), 30);
    }
}
