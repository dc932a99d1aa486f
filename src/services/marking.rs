use std::collections::{BTreeMap, HashMap};

use sqlx::PgPool;
use thiserror::Error;

use crate::core::metrics;
use crate::db::models::QuestionAttempt;
use crate::repositories;
use crate::repositories::questions::AnswerKey;

#[derive(Debug, Error)]
pub(crate) enum MarkingError {
    #[error("Quiz not found")]
    QuizNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// True only for a present answer found in a non-empty accepted set.
pub(crate) fn mark_answer(answer: Option<i64>, accepted: &[i64]) -> bool {
    match answer {
        Some(value) => accepted.contains(&value),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MarkedQuiz {
    /// `(question_attempt_id, is_correct)` for every answer.
    pub(crate) answers: Vec<(String, bool)>,
    /// Total per attempt; attempts without answers score zero.
    pub(crate) totals: BTreeMap<String, i32>,
}

/// Scores every answer from scratch. Answers to unknown questions score nothing.
pub(crate) fn mark_quiz(
    attempt_ids: &[String],
    answers: &[QuestionAttempt],
    keys: &HashMap<String, AnswerKey>,
) -> MarkedQuiz {
    let mut totals: BTreeMap<String, i32> =
        attempt_ids.iter().map(|id| (id.clone(), 0)).collect();
    let mut marked = Vec::with_capacity(answers.len());

    for answer in answers {
        let key = keys.get(&answer.question_id);
        let is_correct =
            key.is_some_and(|key| mark_answer(answer.answer_student, &key.answers));
        if is_correct {
            let mark = key.map_or(0, |key| key.mark);
            let total = totals.entry(answer.quiz_attempt_id.clone()).or_insert(0);
            *total = total.saturating_add(mark);
        }
        marked.push((answer.id.clone(), is_correct));
    }

    MarkedQuiz { answers: marked, totals }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MarkingSummary {
    pub(crate) attempts: usize,
    pub(crate) answers: usize,
    pub(crate) correct: usize,
}

/// Recomputes `is_correct` and `total_marks` for every attempt of the quiz.
pub(crate) async fn run_marking_pass(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<MarkingSummary, MarkingError> {
    let mut tx = pool.begin().await?;

    repositories::quizzes::find_by_id(&mut *tx, quiz_id)
        .await?
        .ok_or(MarkingError::QuizNotFound)?;

    let attempts = repositories::quiz_attempts::list_by_quiz(&mut *tx, quiz_id).await?;
    let answers = repositories::question_attempts::list_by_quiz(&mut *tx, quiz_id).await?;

    let mut question_ids: Vec<String> =
        answers.iter().map(|answer| answer.question_id.clone()).collect();
    question_ids.sort();
    question_ids.dedup();
    let keys = repositories::questions::answer_keys(&mut *tx, &question_ids).await?;

    let attempt_ids: Vec<String> = attempts.iter().map(|attempt| attempt.id.clone()).collect();
    let marked = mark_quiz(&attempt_ids, &answers, &keys);

    let mut correct = 0;
    for (id, is_correct) in &marked.answers {
        if *is_correct {
            correct += 1;
        }
        repositories::question_attempts::set_is_correct(&mut *tx, id, *is_correct).await?;
    }
    for (attempt_id, total) in &marked.totals {
        repositories::quiz_attempts::set_total_marks(&mut *tx, attempt_id, *total).await?;
    }

    tx.commit().await?;

    let summary =
        MarkingSummary { attempts: attempts.len(), answers: marked.answers.len(), correct };
    metrics::record_marking_run(summary.attempts);
    tracing::info!(
        quiz_id = %quiz_id,
        attempts = summary.attempts,
        answers = summary.answers,
        correct = summary.correct,
        "Marked quiz"
    );

    Ok(summary)
}
