use serde::Serialize;

use crate::db::models::TeamMember;
use crate::db::types::SchoolType;
use crate::repositories::leaderboard::{IndividualRow, TeamRow};

#[derive(Debug, Serialize)]
pub(crate) struct IndividualEntry {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) student_id: String,
    pub(crate) name: String,
    pub(crate) year_level: i32,
    pub(crate) school: String,
    pub(crate) school_type: SchoolType,
    pub(crate) is_country: bool,
    pub(crate) total_marks: i32,
}

impl IndividualEntry {
    pub(crate) fn from_row(row: IndividualRow) -> Self {
        Self {
            attempt_id: row.attempt_id,
            quiz_id: row.quiz_id,
            student_id: row.student_id,
            name: format!("{} {}", row.first_name, row.last_name).trim().to_string(),
            year_level: row.year_level,
            school: row.school_name,
            school_type: row.school_type,
            is_country: row.is_country,
            total_marks: row.total_marks,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TeamStudent {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) year_level: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeamEntry {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) school: Option<String>,
    pub(crate) is_country: Option<bool>,
    pub(crate) total_marks: i64,
    pub(crate) max_year: Option<i32>,
    pub(crate) students: Vec<TeamStudent>,
}

impl TeamEntry {
    /// Attaches the members of this team, ordered by student id.
    pub(crate) fn from_row(row: TeamRow, members: &[TeamMember]) -> Self {
        let mut students: Vec<TeamStudent> = members
            .iter()
            .filter(|member| member.team_id == row.team_id)
            .map(|member| TeamStudent {
                id: member.student_id.clone(),
                name: format!("{} {}", member.first_name, member.last_name).trim().to_string(),
                year_level: member.year_level,
            })
            .collect();
        students.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            id: row.team_id,
            name: row.team_name,
            school: row.school_name,
            is_country: row.is_country,
            total_marks: row.total_marks,
            max_year: row.max_year,
            students,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn member(team_id: &str, student_id: &str) -> TeamMember {
        TeamMember {
            team_id: team_id.into(),
            student_id: student_id.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            year_level: 8,
            joined_at: primitive_now_utc(),
        }
    }

    #[test]
    fn team_entry_keeps_only_its_members_sorted() {
        let row = TeamRow {
            team_id: "t1".into(),
            team_name: "Primes".into(),
            school_name: Some("North High".into()),
            is_country: Some(false),
            total_marks: 42,
            max_year: Some(8),
        };
        let members = [member("t1", "s3"), member("t2", "s2"), member("t1", "s1")];

        let entry = TeamEntry::from_row(row, &members);
        let ids: Vec<&str> = entry.students.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s1", "s3"]);
        assert_eq!(entry.students[0].name, "Ada Lovelace");
    }
}
