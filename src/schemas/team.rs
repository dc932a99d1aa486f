use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Team, TeamMember};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TeamCreate {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: String,
    /// Ignored for teachers, whose teams always belong to their school.
    #[serde(default)]
    #[serde(alias = "schoolId")]
    pub(crate) school_id: Option<String>,
    #[serde(default)]
    pub(crate) description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TeamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamMemberAdd {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeamMemberResponse {
    pub(crate) student_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) year_level: i32,
    pub(crate) joined_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeamResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) school_id: Option<String>,
    pub(crate) description: String,
    pub(crate) created_at: String,
    pub(crate) members: Vec<TeamMemberResponse>,
}

impl TeamResponse {
    /// Builds the response, keeping only the members that belong to this team.
    pub(crate) fn from_db(team: Team, members: &[TeamMember]) -> Self {
        let members = members
            .iter()
            .filter(|member| member.team_id == team.id)
            .map(|member| TeamMemberResponse {
                student_id: member.student_id.clone(),
                first_name: member.first_name.clone(),
                last_name: member.last_name.clone(),
                year_level: member.year_level,
                joined_at: format_primitive(member.joined_at),
            })
            .collect();

        Self {
            id: team.id,
            name: team.name,
            school_id: team.school_id,
            description: team.description,
            created_at: format_primitive(team.created_at),
            members,
        }
    }
}
