use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::QuizSlot;
use crate::db::types::SchoolType;
use crate::repositories::results::{
    AnswerResultRow, AttemptResultRow, StudentInsightRow, TeamInsightRow,
};

/// One row of the insights table.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct InsightCounts {
    pub(crate) category: &'static str,
    pub(crate) total: i64,
    pub(crate) public_count: i64,
    pub(crate) catholic_count: i64,
    pub(crate) independent_count: i64,
    pub(crate) country: i64,
    pub(crate) year_7: i64,
    pub(crate) year_8: i64,
    pub(crate) year_9: i64,
}

/// What the insights tally needs to know about a student or a team.
pub(crate) struct InsightSubject<'a> {
    pub(crate) school_type: Option<SchoolType>,
    pub(crate) is_country: bool,
    /// A team counts once for every year level present among its members.
    pub(crate) year_levels: &'a [i32],
}

impl InsightCounts {
    pub(crate) fn tally<'a>(
        category: &'static str,
        subjects: impl IntoIterator<Item = InsightSubject<'a>>,
    ) -> Self {
        let mut counts = InsightCounts { category, ..Default::default() };
        for subject in subjects {
            counts.total += 1;
            match subject.school_type {
                Some(SchoolType::Public) => counts.public_count += 1,
                Some(SchoolType::Catholic) => counts.catholic_count += 1,
                Some(SchoolType::Independent) => counts.independent_count += 1,
                None => {}
            }
            if subject.is_country {
                counts.country += 1;
            }
            let has = |level: i32| subject.year_levels.contains(&level);
            counts.year_7 += i64::from(has(7));
            counts.year_8 += i64::from(has(8));
            counts.year_9 += i64::from(has(9));
        }
        counts
    }

    pub(crate) fn for_students<'a>(
        category: &'static str,
        rows: impl IntoIterator<Item = &'a StudentInsightRow>,
    ) -> Self {
        Self::tally(
            category,
            rows.into_iter().map(|row| InsightSubject {
                school_type: Some(row.school_type),
                is_country: row.is_country,
                year_levels: std::slice::from_ref(&row.year_level),
            }),
        )
    }

    pub(crate) fn for_teams<'a>(
        category: &'static str,
        rows: impl IntoIterator<Item = &'a TeamInsightRow>,
    ) -> Self {
        Self::tally(
            category,
            rows.into_iter().map(|row| InsightSubject {
                school_type: row.school_type,
                is_country: row.is_country.unwrap_or(false),
                year_levels: &row.year_levels,
            }),
        )
    }
}

/// The four insight rows: every student/team in scope and those with a positive score.
pub(crate) fn insights(
    students: &[StudentInsightRow],
    teams: &[TeamInsightRow],
) -> Vec<InsightCounts> {
    vec![
        InsightCounts::for_students("All Students", students),
        InsightCounts::for_students("Students with scores", students.iter().filter(|s| s.scored)),
        InsightCounts::for_teams("All Teams", teams),
        InsightCounts::for_teams("Teams with scores", teams.iter().filter(|t| t.scored)),
    ]
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResultResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_name: String,
    pub(crate) student_id: String,
    pub(crate) student_firstname: String,
    pub(crate) student_lastname: String,
    pub(crate) student_year_level: i32,
    pub(crate) school: String,
    pub(crate) state: &'static str,
    pub(crate) started_on: String,
    pub(crate) completed: Option<String>,
    pub(crate) time_taken_seconds: Option<i64>,
    pub(crate) total_marks: i32,
    /// Answer per `slot_index`; `null` where the student gave none.
    pub(crate) student_responses: BTreeMap<i32, Option<i64>>,
}

impl AttemptResultResponse {
    pub(crate) fn from_row(
        row: AttemptResultRow,
        slots: &[QuizSlot],
        answers: &[AnswerResultRow],
    ) -> Self {
        let student_responses = slots
            .iter()
            .filter(|slot| slot.quiz_id == row.quiz_id)
            .map(|slot| {
                let answer = answers
                    .iter()
                    .find(|a| a.quiz_attempt_id == row.id && a.question_id == slot.question_id)
                    .and_then(|a| a.answer_student);
                (slot.slot_index, answer)
            })
            .collect();

        Self {
            time_taken_seconds: row
                .time_finish
                .map(|finish| (finish - row.time_start).whole_seconds()),
            id: row.id,
            quiz_id: row.quiz_id,
            quiz_name: row.quiz_name,
            student_id: row.student_id,
            student_firstname: row.first_name,
            student_lastname: row.last_name,
            student_year_level: row.year_level,
            school: row.school_name,
            state: row.state.label(),
            started_on: format_primitive(row.time_start),
            completed: format_optional(row.time_finish),
            total_marks: row.total_marks,
            student_responses,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResultResponse {
    pub(crate) quiz_attempt_id: String,
    pub(crate) quiz_name: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) student_year_level: i32,
    pub(crate) question_id: String,
    pub(crate) question_name: String,
    pub(crate) question_text: String,
    pub(crate) slot_index: Option<i32>,
    pub(crate) answer_student: Option<i64>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_awarded: i32,
}

impl AnswerResultResponse {
    pub(crate) fn from_row(row: AnswerResultRow) -> Self {
        let marks_awarded = if row.is_correct == Some(true) { row.mark } else { 0 };
        Self {
            quiz_attempt_id: row.quiz_attempt_id,
            quiz_name: row.quiz_name,
            student_id: row.student_id,
            student_name: format!("{} {}", row.first_name, row.last_name).trim().to_string(),
            student_year_level: row.year_level,
            question_id: row.question_id,
            question_name: row.question_name,
            question_text: row.question_text,
            slot_index: row.slot_index,
            answer_student: row.answer_student,
            is_correct: row.is_correct,
            marks_awarded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::AttemptState;
    use time::macros::datetime;

    fn student(school_type: SchoolType, is_country: bool, year_level: i32, scored: bool) -> StudentInsightRow {
        StudentInsightRow { year_level, school_type, is_country, scored }
    }

    #[test]
    fn insights_split_by_school_type_country_and_year() {
        let students = [
            student(SchoolType::Public, false, 7, true),
            student(SchoolType::Catholic, true, 8, false),
            student(SchoolType::Public, true, 9, true),
        ];
        let teams = [TeamInsightRow {
            school_type: None,
            is_country: None,
            year_levels: vec![7, 7, 9],
            scored: false,
        }];

        let rows = insights(&students, &teams);
        assert_eq!(rows.len(), 4);

        let all = &rows[0];
        assert_eq!((all.total, all.public_count, all.catholic_count), (3, 2, 1));
        assert_eq!(all.country, 2);
        assert_eq!((all.year_7, all.year_8, all.year_9), (1, 1, 1));

        let scored = &rows[1];
        assert_eq!((scored.total, scored.public_count, scored.country), (2, 2, 1));

        let teams_all = &rows[2];
        assert_eq!((teams_all.total, teams_all.year_7, teams_all.year_8, teams_all.year_9), (1, 1, 0, 1));
        assert_eq!(rows[3].total, 0);
        assert_eq!(rows[3].category, "Teams with scores");
    }

    #[test]
    fn attempt_result_lists_every_slot() {
        let row = AttemptResultRow {
            id: "a1".into(),
            quiz_id: "q1".into(),
            quiz_name: "Round 1".into(),
            student_id: "s1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            year_level: 9,
            school_name: "North High".into(),
            state: AttemptState::Submitted,
            time_start: datetime!(2025-03-01 09:00),
            time_finish: Some(datetime!(2025-03-01 09:42)),
            time_modified: datetime!(2025-03-01 09:42),
            total_marks: 3,
        };
        let slot = |index: i32, question: &str| QuizSlot {
            id: format!("slot-{index}"),
            quiz_id: "q1".into(),
            question_id: question.into(),
            slot_index: index,
            block: 0,
        };
        let answer = AnswerResultRow {
            quiz_attempt_id: "a1".into(),
            quiz_name: "Round 1".into(),
            student_id: "s1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            year_level: 9,
            question_id: "qa".into(),
            question_name: "A".into(),
            question_text: "1+1".into(),
            slot_index: Some(1),
            answer_student: Some(2),
            is_correct: Some(true),
            mark: 3,
        };

        let result =
            AttemptResultResponse::from_row(row, &[slot(1, "qa"), slot(2, "qb")], &[answer]);
        assert_eq!(result.state, "Submitted");
        assert_eq!(result.time_taken_seconds, Some(42 * 60));
        assert_eq!(result.student_responses.get(&1), Some(&Some(2)));
        assert_eq!(result.student_responses.get(&2), Some(&None));
    }
}
