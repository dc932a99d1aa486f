use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::TeacherProfile;
use crate::schemas::user::{AccountCreate, AccountUpdate};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TeacherCreate {
    #[serde(flatten)]
    #[validate(nested)]
    pub(crate) account: AccountCreate,
    #[serde(alias = "schoolId")]
    pub(crate) school_id: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "phone must be at most 50 characters"))]
    pub(crate) phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TeacherUpdate {
    #[serde(flatten)]
    #[validate(nested)]
    pub(crate) account: AccountUpdate,
    #[serde(default)]
    #[serde(alias = "schoolId")]
    pub(crate) school_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50, message = "phone must be at most 50 characters"))]
    pub(crate) phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) school_id: String,
    pub(crate) school_name: String,
    pub(crate) phone: String,
    pub(crate) created_at: String,
}

impl TeacherResponse {
    pub(crate) fn from_profile(profile: TeacherProfile) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            school_id: profile.school_id,
            school_name: profile.school_name,
            phone: profile.phone,
            created_at: format_primitive(profile.created_at),
        }
    }
}
