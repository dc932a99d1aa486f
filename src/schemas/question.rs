use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Question;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    #[serde(alias = "categoryId")]
    pub(crate) category_id: Option<String>,
    #[validate(range(min = 1900, max = 2100, message = "year is out of range"))]
    pub(crate) year: i32,
    #[serde(alias = "yearLevel")]
    #[validate(range(min = 7, max = 9, message = "year_level must be between 7 and 9"))]
    pub(crate) year_level: i32,
    #[serde(alias = "questionText")]
    pub(crate) question_text: String,
    #[serde(default)]
    pub(crate) image: Option<String>,
    #[validate(range(min = 0, message = "mark must be non-negative"))]
    pub(crate) mark: i32,
    /// Accepted answers; an empty list never matches.
    #[serde(default)]
    pub(crate) answers: Vec<i64>,
    #[serde(default)]
    #[serde(alias = "solutionText")]
    pub(crate) solution_text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[serde(alias = "categoryId")]
    pub(crate) category_id: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1900, max = 2100, message = "year is out of range"))]
    pub(crate) year: Option<i32>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    #[validate(range(min = 7, max = 9, message = "year_level must be between 7 and 9"))]
    pub(crate) year_level: Option<i32>,
    #[serde(default)]
    #[serde(alias = "questionText")]
    pub(crate) question_text: Option<String>,
    #[serde(default)]
    pub(crate) image: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "mark must be non-negative"))]
    pub(crate) mark: Option<i32>,
    #[serde(default)]
    pub(crate) answers: Option<Vec<i64>>,
    #[serde(default)]
    #[serde(alias = "solutionText")]
    pub(crate) solution_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) category_id: Option<String>,
    pub(crate) year: i32,
    pub(crate) year_level: i32,
    pub(crate) question_text: String,
    pub(crate) image: Option<String>,
    pub(crate) mark: i32,
    pub(crate) answers: Vec<i64>,
    pub(crate) solution_text: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            name: question.name,
            category_id: question.category_id,
            year: question.year,
            year_level: question.year_level,
            question_text: question.question_text,
            image: question.image,
            mark: question.mark,
            answers: question.answers.0,
            solution_text: question.solution_text,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}
