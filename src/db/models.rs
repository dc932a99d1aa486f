use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{AttemptState, QuizStatus, SchoolType, StudentStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) is_staff: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct School {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: Option<String>,
    pub(crate) school_type: SchoolType,
    pub(crate) is_country: bool,
    pub(crate) address: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) school_id: String,
    pub(crate) attendant_year: i32,
    pub(crate) year_level: i32,
    pub(crate) extension_time: i32,
    pub(crate) status: StudentStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Student joined with the owning user's names, as most listings need them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct StudentProfile {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) school_id: String,
    pub(crate) school_name: String,
    pub(crate) attendant_year: i32,
    pub(crate) year_level: i32,
    pub(crate) extension_time: i32,
    pub(crate) status: StudentStatus,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Teacher {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) school_id: String,
    pub(crate) phone: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TeacherProfile {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) school_id: String,
    pub(crate) school_name: String,
    pub(crate) phone: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Team {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) school_id: Option<String>,
    pub(crate) description: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TeamMember {
    pub(crate) team_id: String,
    pub(crate) student_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) year_level: i32,
    pub(crate) joined_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Category {
    pub(crate) id: String,
    pub(crate) genre: String,
    pub(crate) info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) category_id: Option<String>,
    pub(crate) year: i32,
    pub(crate) year_level: i32,
    pub(crate) question_text: String,
    pub(crate) image: Option<String>,
    pub(crate) mark: i32,
    pub(crate) answers: Json<Vec<i64>>,
    pub(crate) solution_text: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Quiz {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) intro: String,
    pub(crate) total_marks: i32,
    pub(crate) is_comp: bool,
    pub(crate) visible: bool,
    pub(crate) open_time_date: Option<PrimitiveDateTime>,
    pub(crate) time_limit: i32,
    pub(crate) time_window: Option<i32>,
    pub(crate) status: QuizStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuizSlot {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) question_id: String,
    pub(crate) slot_index: i32,
    pub(crate) block: i32,
}

/// A slot joined with its question, the unit served to quiz takers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SlotQuestion {
    pub(crate) slot_id: String,
    pub(crate) slot_index: i32,
    pub(crate) block: i32,
    pub(crate) question_id: String,
    pub(crate) name: String,
    pub(crate) question_text: String,
    pub(crate) image: Option<String>,
    pub(crate) mark: i32,
    pub(crate) answers: Json<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuizAttempt {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) student_id: String,
    pub(crate) team_id: Option<String>,
    pub(crate) current_page: i32,
    pub(crate) state: AttemptState,
    pub(crate) shuffle_seed: i64,
    pub(crate) time_start: PrimitiveDateTime,
    pub(crate) time_finish: Option<PrimitiveDateTime>,
    pub(crate) time_modified: PrimitiveDateTime,
    pub(crate) total_marks: i32,
    pub(crate) dead_line: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionAttempt {
    pub(crate) id: String,
    pub(crate) quiz_attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) student_id: String,
    pub(crate) answer_student: Option<i64>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AppSetting {
    pub(crate) id: String,
    pub(crate) key: String,
    pub(crate) value: Json<serde_json::Value>,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Invoice {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) issued_on: Date,
    pub(crate) address: String,
    pub(crate) student_count: i32,
    pub(crate) cost: i64,
    pub(crate) subject: String,
    pub(crate) created_at: PrimitiveDateTime,
}
