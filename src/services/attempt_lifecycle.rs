//! Attempt state transitions and the single-writer availability path.

use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics;
use crate::db::models::{QuestionAttempt, Quiz, QuizAttempt, Student};
use crate::db::types::{AttemptState, StudentStatus};
use crate::repositories;
use crate::services::quiz_timing::{
    can_open_attempt, evaluate_availability, Availability, AvailabilityInput, AvailabilityOutcome,
    QuizTiming,
};

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("Quiz attempt not found")]
    AttemptNotFound,
    #[error("Quiz not found")]
    QuizNotFound,
    #[error("Student not found")]
    StudentNotFound,
    #[error("Student account is inactive")]
    StudentInactive,
    #[error("Quiz attempt has already been submitted")]
    AlreadySubmitted,
    #[error("Quiz attempt has already been completed")]
    AlreadyCompleted,
    #[error("{}", .0.message())]
    Unavailable(Availability),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// The state a submit request moves the attempt into.
pub(crate) fn submit_transition(current: AttemptState) -> Result<AttemptState, AttemptError> {
    match current {
        AttemptState::Submitted => Err(AttemptError::AlreadySubmitted),
        AttemptState::Completed => Err(AttemptError::AlreadyCompleted),
        AttemptState::Unattempted | AttemptState::InProgress => Ok(AttemptState::Submitted),
    }
}

/// Rejects writes against attempts that reached a terminal state.
pub(crate) fn ensure_writable(state: AttemptState) -> Result<(), AttemptError> {
    match state {
        AttemptState::Submitted => Err(AttemptError::AlreadySubmitted),
        AttemptState::Completed => Err(AttemptError::AlreadyCompleted),
        AttemptState::Unattempted | AttemptState::InProgress => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CheckedAttempt {
    pub(crate) attempt: QuizAttempt,
    pub(crate) outcome: AvailabilityOutcome,
}

/// Runs the availability calculator for one attempt and persists its outcome.
///
/// The attempt row and then the student row are locked for the duration of the
/// transaction, so concurrent checks for the same attempt are applied one after another
/// and an extension is never spent twice.
pub(crate) async fn check_availability(
    pool: &PgPool,
    attempt_id: &str,
    now: PrimitiveDateTime,
) -> Result<CheckedAttempt, AttemptError> {
    let mut tx = pool.begin().await?;

    let attempt = repositories::quiz_attempts::lock_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound)?;
    let quiz = repositories::quizzes::find_by_id(&mut *tx, &attempt.quiz_id)
        .await?
        .ok_or(AttemptError::QuizNotFound)?;
    let student = repositories::students::lock_by_id(&mut *tx, &attempt.student_id)
        .await?
        .ok_or(AttemptError::StudentNotFound)?;

    let input = AvailabilityInput {
        timing: QuizTiming::from_quiz(&quiz),
        state: attempt.state,
        time_start: attempt.time_start,
        dead_line: attempt.dead_line,
        extension_minutes: student.extension_time,
    };
    let outcome = evaluate_availability(&input, now);

    let attempt = if outcome.state != attempt.state || outcome.dead_line != attempt.dead_line {
        repositories::quiz_attempts::apply_availability(
            &mut *tx,
            &attempt.id,
            outcome.state,
            outcome.dead_line,
            now,
        )
        .await?
    } else {
        attempt
    };

    if outcome.consumed_extension {
        repositories::students::set_extension(&mut *tx, &student.id, 0, now).await?;
        tracing::info!(
            attempt_id = %attempt.id,
            student_id = %student.id,
            extension_minutes = student.extension_time,
            "Consumed student extension"
        );
    }

    tx.commit().await?;

    metrics::record_availability_check(outcome.availability.as_str());
    tracing::debug!(
        attempt_id = %attempt.id,
        outcome = outcome.availability.as_str(),
        state = ?attempt.state,
        "Checked quiz attempt availability"
    );

    Ok(CheckedAttempt { attempt, outcome })
}

/// Returns the student's attempt for the quiz, creating it when the quiz is open.
/// The flag is true when a new attempt was created.
pub(crate) async fn open_attempt(
    pool: &PgPool,
    quiz: &Quiz,
    student: &Student,
    now: PrimitiveDateTime,
) -> Result<(QuizAttempt, bool), AttemptError> {
    if let Some(existing) =
        repositories::quiz_attempts::find_by_quiz_student(pool, &quiz.id, &student.id).await?
    {
        return Ok((existing, false));
    }

    if student.status == StudentStatus::Inactive {
        return Err(AttemptError::StudentInactive);
    }

    let availability = can_open_attempt(&QuizTiming::from_quiz(quiz), now);
    if availability != Availability::Available {
        return Err(AttemptError::Unavailable(availability));
    }

    let team_id = repositories::students::primary_team_id(pool, &student.id).await?;
    let id = Uuid::new_v4().to_string();
    let created = repositories::quiz_attempts::create(
        pool,
        repositories::quiz_attempts::CreateAttempt {
            id: &id,
            quiz_id: &quiz.id,
            student_id: &student.id,
            team_id: team_id.as_deref(),
            shuffle_seed: rand::random::<i64>(),
            time_start: now,
        },
    )
    .await?;

    match created {
        Some(attempt) => {
            tracing::info!(
                attempt_id = %attempt.id,
                quiz_id = %quiz.id,
                student_id = %student.id,
                "Created quiz attempt"
            );
            Ok((attempt, true))
        }
        None => {
            let attempt =
                repositories::quiz_attempts::find_by_quiz_student(pool, &quiz.id, &student.id)
                    .await?
                    .ok_or(AttemptError::AttemptNotFound)?;
            Ok((attempt, false))
        }
    }
}

/// Explicit student submission. Rejected once the attempt is terminal.
pub(crate) async fn submit(
    pool: &PgPool,
    attempt_id: &str,
    now: PrimitiveDateTime,
) -> Result<QuizAttempt, AttemptError> {
    let mut tx = pool.begin().await?;

    let attempt = repositories::quiz_attempts::lock_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound)?;
    submit_transition(attempt.state)?;

    let attempt = repositories::quiz_attempts::submit(&mut *tx, &attempt.id, now).await?;
    tx.commit().await?;

    tracing::info!(attempt_id = %attempt.id, quiz_id = %attempt.quiz_id, "Submitted quiz attempt");
    Ok(attempt)
}

/// Saves an answer under the attempt row lock. The flag is true when the answer is new.
///
/// A submit that commits first leaves the attempt terminal and the answer is refused.
pub(crate) async fn record_answer(
    pool: &PgPool,
    answer: repositories::question_attempts::UpsertAnswer<'_>,
) -> Result<(QuestionAttempt, bool), AttemptError> {
    let mut tx = pool.begin().await?;

    let attempt = repositories::quiz_attempts::lock_by_id(&mut *tx, answer.quiz_attempt_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound)?;
    ensure_writable(attempt.state)?;

    let saved = repositories::question_attempts::upsert(&mut *tx, answer).await?;
    tx.commit().await?;
    Ok(saved)
}

/// Moves the attempt's page pointer under the attempt row lock.
pub(crate) async fn update_page(
    pool: &PgPool,
    attempt_id: &str,
    current_page: i32,
    now: PrimitiveDateTime,
) -> Result<QuizAttempt, AttemptError> {
    let mut tx = pool.begin().await?;

    let attempt = repositories::quiz_attempts::lock_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound)?;
    ensure_writable(attempt.state)?;

    let attempt =
        repositories::quiz_attempts::update_current_page(&mut *tx, &attempt.id, current_page, now)
            .await?;
    tx.commit().await?;
    Ok(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    use crate::core::time::primitive_now_utc;
    use crate::db::types::QuizStatus;
    use crate::test_support;

    /// Whole-second clock so stored timestamps compare exactly.
    fn now_seconds() -> PrimitiveDateTime {
        primitive_now_utc().replace_nanosecond(0).expect("whole second")
    }

    async fn start_attempt(pool: &PgPool, quiz: &Quiz, student: &Student) -> QuizAttempt {
        repositories::quiz_attempts::create(
            pool,
            repositories::quiz_attempts::CreateAttempt {
                id: &Uuid::new_v4().to_string(),
                quiz_id: &quiz.id,
                student_id: &student.id,
                team_id: None,
                shuffle_seed: 11,
                time_start: quiz.open_time_date.unwrap_or_else(now_seconds),
            },
        )
        .await
        .expect("insert attempt")
        .expect("new attempt")
    }

    #[test]
    fn submit_moves_open_attempts_to_submitted() {
        assert_eq!(submit_transition(AttemptState::Unattempted).unwrap(), AttemptState::Submitted);
        assert_eq!(submit_transition(AttemptState::InProgress).unwrap(), AttemptState::Submitted);
    }

    #[test]
    fn terminal_states_reject_submit() {
        assert!(matches!(
            submit_transition(AttemptState::Submitted),
            Err(AttemptError::AlreadySubmitted)
        ));
        assert!(matches!(
            submit_transition(AttemptState::Completed),
            Err(AttemptError::AlreadyCompleted)
        ));
    }

    #[test]
    fn writes_are_only_allowed_before_a_terminal_state() {
        assert!(ensure_writable(AttemptState::Unattempted).is_ok());
        assert!(ensure_writable(AttemptState::InProgress).is_ok());
        assert!(ensure_writable(AttemptState::Submitted).is_err());
        assert!(ensure_writable(AttemptState::Completed).is_err());
    }

    #[test]
    fn unavailable_error_uses_the_availability_message() {
        let err = AttemptError::Unavailable(Availability::NotStarted);
        assert_eq!(err.to_string(), "Quiz has not started yet");
    }

    #[tokio::test]
    async fn writes_after_submit_are_refused() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let db = ctx.state.db();
        let school = test_support::insert_school(db, "Quayside").await;
        let (_user, student) = test_support::insert_student(db, "closer", &school.id, 8).await;
        let quiz = test_support::insert_quiz(db, "Sealed", false).await;
        let question = test_support::insert_question(db, "q-sealed", 1, vec![3]).await;
        let attempt = start_attempt(db, &quiz, &student).await;

        submit(db, &attempt.id, now_seconds()).await.expect("submit");

        let answer = record_answer(
            db,
            repositories::question_attempts::UpsertAnswer {
                id: "late-answer",
                quiz_attempt_id: &attempt.id,
                question_id: &question.id,
                student_id: &student.id,
                answer_student: Some(3),
                is_correct: Some(true),
                now: now_seconds(),
            },
        )
        .await;
        assert!(matches!(answer, Err(AttemptError::AlreadySubmitted)));

        let page = update_page(db, &attempt.id, 4, now_seconds()).await;
        assert!(matches!(page, Err(AttemptError::AlreadySubmitted)));

        let stored = repositories::quiz_attempts::find_by_id(db, &attempt.id)
            .await
            .expect("load attempt")
            .expect("attempt");
        assert_eq!(stored.current_page, attempt.current_page);
        let answers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM question_attempts")
            .fetch_one(db)
            .await
            .expect("count answers");
        assert_eq!(answers, 0);
    }

    #[tokio::test]
    async fn concurrent_checks_spend_an_extension_once() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let db = ctx.state.db();
        let now = now_seconds();
        let school = test_support::insert_school(db, "Twin Peaks").await;
        let (_user, student) = test_support::insert_student(db, "racer", &school.id, 10).await;
        let quiz = test_support::insert_quiz_with(
            db,
            "Long gone",
            true,
            Some(now - Duration::minutes(90)),
            Some(10),
            QuizStatus::Finished,
        )
        .await;
        let attempt = start_attempt(db, &quiz, &student).await;
        repositories::students::set_extension(db, &student.id, 20, now)
            .await
            .expect("grant extension");

        let (first, second) = tokio::join!(
            check_availability(db, &attempt.id, now),
            check_availability(db, &attempt.id, now),
        );
        let (first, second) = (first.expect("first check"), second.expect("second check"));

        let spent = [&first, &second].iter().filter(|c| c.outcome.consumed_extension).count();
        assert_eq!(spent, 1);
        assert!(first.outcome.is_available());
        assert!(second.outcome.is_available());

        let expected = now + Duration::minutes(20);
        let stored = repositories::quiz_attempts::find_by_id(db, &attempt.id)
            .await
            .expect("load attempt")
            .expect("attempt");
        assert_eq!(stored.dead_line, Some(expected));
        assert_eq!(stored.state, AttemptState::InProgress);

        let student = repositories::students::find_by_id(db, &student.id)
            .await
            .expect("load student")
            .expect("student");
        assert_eq!(student.extension_time, 0);
    }

    #[tokio::test]
    async fn completed_attempt_keeps_a_pending_extension() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let db = ctx.state.db();
        let now = now_seconds();
        let school = test_support::insert_school(db, "Endpoint").await;
        let (_user, student) = test_support::insert_student(db, "timed-out", &school.id, 9).await;
        let quiz = test_support::insert_quiz_with(
            db,
            "Closed early",
            true,
            Some(now - Duration::minutes(90)),
            Some(10),
            QuizStatus::Finished,
        )
        .await;
        let attempt = start_attempt(db, &quiz, &student).await;

        let expired = check_availability(db, &attempt.id, now).await.expect("first check");
        assert_eq!(expired.attempt.state, AttemptState::Completed);

        repositories::students::set_extension(db, &student.id, 30, now)
            .await
            .expect("grant extension");
        let checked = check_availability(db, &attempt.id, now).await.expect("second check");
        assert!(!checked.outcome.is_available());
        assert!(!checked.outcome.consumed_extension);
        assert_eq!(checked.attempt.state, AttemptState::Completed);

        let student = repositories::students::find_by_id(db, &student.id)
            .await
            .expect("load student")
            .expect("student");
        assert_eq!(student.extension_time, 30);
    }
}
