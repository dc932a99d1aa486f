use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{Quiz, QuizSlot, SlotQuestion};
use crate::db::types::QuizStatus;
use crate::schemas::attempt::AttemptResponse;
use crate::services::marking::MarkingSummary;
use crate::services::quiz_timing::QuizTiming;

/// Status given either by name (`"ongoing"`) or by numeric code (`2`).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(crate) enum QuizStatusValue {
    Code(i16),
    Name(QuizStatus),
}

impl QuizStatusValue {
    pub(crate) fn resolve(self) -> Option<QuizStatus> {
        match self {
            QuizStatusValue::Code(code) => QuizStatus::from_code(code),
            QuizStatusValue::Name(status) => Some(status),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) intro: String,
    #[serde(default)]
    #[serde(alias = "isComp")]
    pub(crate) is_comp: bool,
    #[serde(default)]
    pub(crate) visible: bool,
    #[serde(
        default,
        alias = "openTimeDate",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) open_time_date: Option<OffsetDateTime>,
    #[serde(default = "default_time_limit")]
    #[serde(alias = "timeLimit")]
    #[validate(range(min = 1, max = 10080, message = "time_limit must be between 1 and 10080"))]
    pub(crate) time_limit: i32,
    #[serde(default = "default_time_window")]
    #[serde(alias = "timeWindow")]
    #[validate(range(min = 0, max = 1440, message = "time_window must be between 0 and 1440"))]
    pub(crate) time_window: Option<i32>,
    #[serde(default)]
    pub(crate) status: Option<QuizStatusValue>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) intro: Option<String>,
    #[serde(default)]
    #[serde(alias = "isComp")]
    pub(crate) is_comp: Option<bool>,
    #[serde(default)]
    pub(crate) visible: Option<bool>,
    /// Outer `None`: untouched. `Some(None)`: cleared.
    #[serde(
        default,
        alias = "openTimeDate",
        deserialize_with = "deserialize_nullable_offset_datetime"
    )]
    pub(crate) open_time_date: Option<Option<OffsetDateTime>>,
    #[serde(default)]
    #[serde(alias = "timeLimit")]
    #[validate(range(min = 1, max = 10080, message = "time_limit must be between 1 and 10080"))]
    pub(crate) time_limit: Option<i32>,
    #[serde(default, alias = "timeWindow", deserialize_with = "deserialize_nullable")]
    pub(crate) time_window: Option<Option<i32>>,
    #[serde(default)]
    pub(crate) status: Option<QuizStatusValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizStatusChange {
    pub(crate) status: QuizStatusValue,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) intro: String,
    pub(crate) total_marks: i32,
    pub(crate) is_comp: bool,
    pub(crate) visible: bool,
    pub(crate) open_time_date: Option<String>,
    pub(crate) close_time: Option<String>,
    pub(crate) time_limit: i32,
    pub(crate) time_window: Option<i32>,
    pub(crate) status: QuizStatus,
    pub(crate) status_code: i16,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: Quiz) -> Self {
        let close_time = QuizTiming::from_quiz(&quiz).close_time();
        Self {
            id: quiz.id,
            name: quiz.name,
            intro: quiz.intro,
            total_marks: quiz.total_marks,
            is_comp: quiz.is_comp,
            visible: quiz.visible,
            open_time_date: format_optional(quiz.open_time_date),
            close_time: format_optional(close_time),
            time_limit: quiz.time_limit,
            time_window: quiz.time_window,
            status: quiz.status,
            status_code: quiz.status.code(),
            created_at: format_primitive(quiz.created_at),
            updated_at: format_primitive(quiz.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotItem {
    #[serde(alias = "questionId", alias = "question")]
    pub(crate) question_id: String,
    #[serde(alias = "slotIndex")]
    pub(crate) slot_index: i32,
    #[serde(default)]
    pub(crate) block: i32,
}

/// Accepts either a bare list of slots or `{"slots": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SlotsPayload {
    List(Vec<SlotItem>),
    Wrapped { slots: Vec<SlotItem> },
}

impl SlotsPayload {
    pub(crate) fn into_items(self) -> Vec<SlotItem> {
        match self {
            SlotsPayload::List(items) | SlotsPayload::Wrapped { slots: items } => items,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizSlotResponse {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) slot_index: i32,
    pub(crate) block: i32,
}

impl QuizSlotResponse {
    pub(crate) fn from_db(slot: QuizSlot) -> Self {
        Self {
            id: slot.id,
            question_id: slot.question_id,
            slot_index: slot.slot_index,
            block: slot.block,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReplacedSlotsResponse {
    pub(crate) quiz_id: String,
    pub(crate) total_marks: i32,
    pub(crate) slots: Vec<QuizSlotResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SlotQuestionResponse {
    pub(crate) slot_index: i32,
    pub(crate) block: i32,
    pub(crate) question_id: String,
    pub(crate) name: String,
    pub(crate) question_text: String,
    pub(crate) image: Option<String>,
    pub(crate) mark: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) answers: Option<Vec<i64>>,
}

impl SlotQuestionResponse {
    pub(crate) fn from_db(slot: SlotQuestion, with_answers: bool) -> Self {
        Self {
            slot_index: slot.slot_index,
            block: slot.block,
            question_id: slot.question_id,
            name: slot.name,
            question_text: slot.question_text,
            image: slot.image,
            mark: slot.mark,
            answers: with_answers.then_some(slot.answers.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizSlotsResponse {
    pub(crate) quiz_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) attempt: Option<AttemptResponse>,
    pub(crate) slots: Vec<SlotQuestionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkingResponse {
    pub(crate) quiz_id: String,
    pub(crate) attempts: usize,
    pub(crate) answers: usize,
    pub(crate) correct: usize,
}

impl MarkingResponse {
    pub(crate) fn from_summary(quiz_id: String, summary: MarkingSummary) -> Self {
        Self {
            quiz_id,
            attempts: summary.attempts,
            answers: summary.answers,
            correct: summary.correct,
        }
    }
}

fn default_time_limit() -> i32 {
    120
}

fn default_time_window() -> Option<i32> {
    Some(10)
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // datetime-local inputs come without seconds or offset; read them as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

fn deserialize_nullable_offset_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_option_offset_datetime_flexible(deserializer).map(Some)
}

fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
