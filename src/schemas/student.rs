use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::StudentProfile;
use crate::db::types::StudentStatus;
use crate::schemas::user::{AccountCreate, AccountUpdate};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[serde(flatten)]
    #[validate(nested)]
    pub(crate) account: AccountCreate,
    /// Ignored for teachers, who always enrol into their own school.
    #[serde(default)]
    #[serde(alias = "schoolId")]
    pub(crate) school_id: Option<String>,
    #[serde(alias = "attendantYear")]
    #[validate(range(min = 2000, max = 2100, message = "attendant_year is out of range"))]
    pub(crate) attendant_year: i32,
    #[serde(alias = "yearLevel")]
    #[validate(range(min = 7, max = 9, message = "year_level must be between 7 and 9"))]
    pub(crate) year_level: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentUpdate {
    #[serde(flatten)]
    #[validate(nested)]
    pub(crate) account: AccountUpdate,
    #[serde(default)]
    #[serde(alias = "schoolId")]
    pub(crate) school_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "attendantYear")]
    #[validate(range(min = 2000, max = 2100, message = "attendant_year is out of range"))]
    pub(crate) attendant_year: Option<i32>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    #[validate(range(min = 7, max = 9, message = "year_level must be between 7 and 9"))]
    pub(crate) year_level: Option<i32>,
    #[serde(default)]
    pub(crate) status: Option<StudentStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExtensionGrant {
    #[validate(range(min = 1, max = 1440, message = "minutes must be between 1 and 1440"))]
    pub(crate) minutes: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
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
    pub(crate) created_at: String,
}

impl StudentResponse {
    pub(crate) fn from_profile(profile: StudentProfile) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            school_id: profile.school_id,
            school_name: profile.school_name,
            attendant_year: profile.attendant_year,
            year_level: profile.year_level,
            extension_time: profile.extension_time,
            status: profile.status,
            created_at: format_primitive(profile.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn year_level_outside_seven_to_nine_is_rejected() {
        let payload: StudentCreate = serde_json::from_value(json!({
            "username": "kid",
            "password": "longenough",
            "first_name": "Kid",
            "last_name": "Smith",
            "attendant_year": 2025,
            "year_level": 10
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn extension_must_be_positive() {
        assert!(ExtensionGrant { minutes: 0 }.validate().is_err());
        assert!(ExtensionGrant { minutes: 15 }.validate().is_ok());
    }
}
