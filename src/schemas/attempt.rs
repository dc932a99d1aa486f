use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{QuestionAttempt, QuizAttempt};
use crate::db::types::AttemptState;
use crate::services::quiz_timing::AvailabilityOutcome;

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptCreate {
    #[serde(alias = "quizId", alias = "quiz")]
    pub(crate) quiz_id: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct AttemptUpdate {
    #[serde(default, alias = "currentPage")]
    #[validate(range(min = 0, message = "current_page must not be negative"))]
    pub(crate) current_page: Option<i32>,
    /// Finalises the attempt when set.
    #[serde(default)]
    pub(crate) submit: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) student_id: String,
    pub(crate) team_id: Option<String>,
    pub(crate) current_page: i32,
    pub(crate) state: AttemptState,
    pub(crate) state_code: i16,
    pub(crate) state_label: &'static str,
    pub(crate) total_marks: i32,
    pub(crate) time_start: String,
    pub(crate) time_finish: Option<String>,
    pub(crate) time_modified: String,
    pub(crate) dead_line: Option<String>,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: QuizAttempt) -> Self {
        Self {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            student_id: attempt.student_id,
            team_id: attempt.team_id,
            current_page: attempt.current_page,
            state: attempt.state,
            state_code: attempt.state.code(),
            state_label: attempt.state.label(),
            total_marks: attempt.total_marks,
            time_start: format_primitive(attempt.time_start),
            time_finish: format_optional(attempt.time_finish),
            time_modified: format_primitive(attempt.time_modified),
            dead_line: format_optional(attempt.dead_line),
        }
    }
}

/// Attempt plus a notice when the call resumed an existing attempt.
#[derive(Debug, Serialize)]
pub(crate) struct AttemptCreatedResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<&'static str>,
    #[serde(flatten)]
    pub(crate) attempt: AttemptResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct AvailabilityResponse {
    pub(crate) attempt_id: String,
    pub(crate) available: bool,
    pub(crate) availability: &'static str,
    pub(crate) reason: &'static str,
    pub(crate) state: AttemptState,
    pub(crate) dead_line: Option<String>,
}

impl AvailabilityResponse {
    pub(crate) fn from_outcome(attempt_id: String, outcome: &AvailabilityOutcome) -> Self {
        Self {
            attempt_id,
            available: outcome.is_available(),
            availability: outcome.availability.as_str(),
            reason: outcome.availability.message(),
            state: outcome.state,
            dead_line: format_optional(outcome.dead_line),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "quizAttemptId", alias = "quiz_attempt")]
    pub(crate) quiz_attempt_id: String,
    #[serde(alias = "questionId", alias = "question")]
    pub(crate) question_id: String,
    #[serde(default, alias = "answerStudent")]
    pub(crate) answer_student: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionAttemptResponse {
    pub(crate) id: String,
    pub(crate) quiz_attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) student_id: String,
    pub(crate) answer_student: Option<i64>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) updated_at: String,
}

impl QuestionAttemptResponse {
    pub(crate) fn from_db(answer: QuestionAttempt) -> Self {
        Self {
            id: answer.id,
            quiz_attempt_id: answer.quiz_attempt_id,
            question_id: answer.question_id,
            student_id: answer.student_id,
            answer_student: answer.answer_student,
            is_correct: answer.is_correct,
            updated_at: format_primitive(answer.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;
    use serde_json::json;

    #[test]
    fn resumed_attempt_carries_message_next_to_fields() {
        let now = primitive_now_utc();
        let attempt = QuizAttempt {
            id: "a1".into(),
            quiz_id: "q1".into(),
            student_id: "s1".into(),
            team_id: None,
            current_page: 2,
            state: AttemptState::InProgress,
            shuffle_seed: 7,
            time_start: now,
            time_finish: None,
            time_modified: now,
            total_marks: 0,
            dead_line: None,
        };
        let body = serde_json::to_value(AttemptCreatedResponse {
            message: Some("Quiz attempt already active"),
            attempt: AttemptResponse::from_db(attempt),
        })
        .unwrap();

        assert_eq!(body["message"], "Quiz attempt already active");
        assert_eq!(body["id"], "a1");
        assert_eq!(body["state"], "in_progress");
        assert_eq!(body["state_code"], 2);
        assert!(body.get("shuffle_seed").is_none());
    }

    #[test]
    fn blank_answer_is_accepted() {
        let payload: AnswerSubmit =
            serde_json::from_value(json!({"quiz_attempt": "a1", "question": "q1"})).unwrap();
        assert_eq!(payload.answer_student, None);
        assert_eq!(payload.quiz_attempt_id, "a1");
    }
}
