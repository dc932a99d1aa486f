//! Quiz status rules and the batch transition job run by the worker.

use anyhow::Context;
use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::core::metrics;
use crate::db::types::QuizStatus;
use crate::repositories;
use crate::services::quiz_timing::QuizTiming;

/// One week.
pub(crate) const MAX_TIME_LIMIT: i32 = 10_080;
/// One day.
pub(crate) const MAX_TIME_WINDOW: i32 = 1_440;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum QuizRuleError {
    #[error("open_time_date is required for competition quizzes")]
    MissingOpenTime,
    #[error("time_window is required for competition quizzes")]
    MissingTimeWindow,
    #[error("time_limit must be positive")]
    NonPositiveTimeLimit,
    #[error("time_window must not be negative")]
    NegativeTimeWindow,
    #[error("time_limit must be at most 10080 minutes")]
    TimeLimitTooLong,
    #[error("time_window must be at most 1440 minutes")]
    TimeWindowTooLong,
}

/// Checks the timing fields a quiz is about to be saved with.
pub(crate) fn validate_quiz_rules(
    is_comp: bool,
    open_time: Option<PrimitiveDateTime>,
    time_limit: i32,
    time_window: Option<i32>,
) -> Result<(), QuizRuleError> {
    if time_limit <= 0 {
        return Err(QuizRuleError::NonPositiveTimeLimit);
    }
    if time_limit > MAX_TIME_LIMIT {
        return Err(QuizRuleError::TimeLimitTooLong);
    }
    if time_window.is_some_and(|window| window < 0) {
        return Err(QuizRuleError::NegativeTimeWindow);
    }
    if time_window.is_some_and(|window| window > MAX_TIME_WINDOW) {
        return Err(QuizRuleError::TimeWindowTooLong);
    }
    if is_comp {
        if open_time.is_none() {
            return Err(QuizRuleError::MissingOpenTime);
        }
        if time_window.is_none() {
            return Err(QuizRuleError::MissingTimeWindow);
        }
    }
    Ok(())
}

/// Status a scheduled quiz should be in at `now`, or `None` when it stays put.
pub(crate) fn next_status(
    current: QuizStatus,
    timing: &QuizTiming,
    now: PrimitiveDateTime,
) -> Option<QuizStatus> {
    let (Some(open), Some(close)) = (timing.open_time, timing.close_time()) else {
        return None;
    };

    match current {
        QuizStatus::Upcoming if now > close => Some(QuizStatus::Finished),
        QuizStatus::Upcoming if now >= open => Some(QuizStatus::Ongoing),
        QuizStatus::Ongoing if now > close => Some(QuizStatus::Finished),
        _ => None,
    }
}

/// Applies every due transition. Returns how many quizzes changed.
pub(crate) async fn run_transitions(pool: &PgPool, now: PrimitiveDateTime) -> anyhow::Result<usize> {
    let quizzes = repositories::quizzes::list_scheduled(pool)
        .await
        .context("Failed to list scheduled quizzes")?;

    let mut changed = 0;
    for quiz in quizzes {
        let Some(to) = next_status(quiz.status, &QuizTiming::from_quiz(&quiz), now) else {
            continue;
        };

        let applied =
            repositories::quizzes::transition_status(pool, &quiz.id, quiz.status, to, now)
                .await
                .with_context(|| format!("Failed to update status of quiz {}", quiz.id))?;
        if applied {
            changed += 1;
            metrics::record_status_transition(to.as_str());
            tracing::info!(
                quiz_id = %quiz.id,
                from = quiz.status.as_str(),
                to = to.as_str(),
                "Quiz status changed"
            );
        }
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Duration, Month, Time};

    fn t0() -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, Month::August, 1).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(10, 0, 0).unwrap())
    }

    fn timing() -> QuizTiming {
        QuizTiming { open_time: Some(t0()), time_limit: 60, time_window: Some(15) }
    }

    #[test]
    fn upcoming_quiz_waits_for_open_time() {
        let now = t0() - Duration::minutes(1);
        assert_eq!(next_status(QuizStatus::Upcoming, &timing(), now), None);
    }

    #[test]
    fn upcoming_quiz_starts_at_open_time() {
        assert_eq!(next_status(QuizStatus::Upcoming, &timing(), t0()), Some(QuizStatus::Ongoing));
    }

    #[test]
    fn ongoing_quiz_finishes_after_limit_and_window() {
        let close = t0() + Duration::minutes(75);
        assert_eq!(next_status(QuizStatus::Ongoing, &timing(), close), None);
        assert_eq!(
            next_status(QuizStatus::Ongoing, &timing(), close + Duration::seconds(1)),
            Some(QuizStatus::Finished)
        );
    }

    #[test]
    fn overdue_upcoming_quiz_goes_straight_to_finished() {
        let now = t0() + Duration::hours(3);
        assert_eq!(next_status(QuizStatus::Upcoming, &timing(), now), Some(QuizStatus::Finished));
    }

    #[test]
    fn practice_and_unscheduled_quizzes_never_change() {
        let now = t0() + Duration::hours(3);
        assert_eq!(next_status(QuizStatus::Practice, &timing(), now), None);
        assert_eq!(next_status(QuizStatus::Finished, &timing(), now), None);

        let unscheduled = QuizTiming { open_time: None, time_limit: 60, time_window: None };
        assert_eq!(next_status(QuizStatus::Upcoming, &unscheduled, now), None);
    }

    #[test]
    fn competition_requires_open_time_and_window() {
        assert_eq!(
            validate_quiz_rules(true, None, 60, Some(10)),
            Err(QuizRuleError::MissingOpenTime)
        );
        assert_eq!(
            validate_quiz_rules(true, Some(t0()), 60, None),
            Err(QuizRuleError::MissingTimeWindow)
        );
        assert_eq!(validate_quiz_rules(true, Some(t0()), 60, Some(0)), Ok(()));
    }

    #[test]
    fn practice_quiz_timing_is_optional() {
        assert_eq!(validate_quiz_rules(false, None, 120, None), Ok(()));
        assert_eq!(
            validate_quiz_rules(false, None, 0, None),
            Err(QuizRuleError::NonPositiveTimeLimit)
        );
        assert_eq!(
            validate_quiz_rules(false, None, 30, Some(-1)),
            Err(QuizRuleError::NegativeTimeWindow)
        );
    }

    #[test]
    fn oversized_timing_is_rejected() {
        assert_eq!(
            validate_quiz_rules(false, None, MAX_TIME_LIMIT + 1, None),
            Err(QuizRuleError::TimeLimitTooLong)
        );
        assert_eq!(
            validate_quiz_rules(true, Some(t0()), 60, Some(i32::MAX)),
            Err(QuizRuleError::TimeWindowTooLong)
        );
        assert_eq!(validate_quiz_rules(true, Some(t0()), MAX_TIME_LIMIT, Some(MAX_TIME_WINDOW)), Ok(()));
    }

    #[test]
    fn extreme_stored_timing_does_not_panic() {
        let extreme = QuizTiming { open_time: Some(t0()), time_limit: i32::MAX, time_window: Some(i32::MAX) };
        assert_eq!(next_status(QuizStatus::Upcoming, &extreme, t0()), Some(QuizStatus::Ongoing));
        assert_eq!(next_status(QuizStatus::Ongoing, &extreme, t0() + Duration::days(365)), None);
    }
}
