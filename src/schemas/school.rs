use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::School;
use crate::db::types::SchoolType;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SchoolCreate {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "code must be 1-50 characters"))]
    pub(crate) code: Option<String>,
    #[serde(alias = "schoolType")]
    pub(crate) school_type: SchoolType,
    #[serde(default)]
    #[serde(alias = "isCountry")]
    pub(crate) is_country: bool,
    #[serde(default)]
    pub(crate) address: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SchoolUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "code must be 1-50 characters"))]
    pub(crate) code: Option<String>,
    #[serde(default)]
    #[serde(alias = "schoolType")]
    pub(crate) school_type: Option<SchoolType>,
    #[serde(default)]
    #[serde(alias = "isCountry")]
    pub(crate) is_country: Option<bool>,
    #[serde(default)]
    pub(crate) address: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchoolResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: Option<String>,
    pub(crate) school_type: SchoolType,
    pub(crate) school_type_label: &'static str,
    pub(crate) is_country: bool,
    pub(crate) address: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl SchoolResponse {
    pub(crate) fn from_db(school: School) -> Self {
        Self {
            id: school.id,
            name: school.name,
            code: school.code,
            school_type: school.school_type,
            school_type_label: school.school_type.label(),
            is_country: school.is_country,
            address: school.address,
            created_at: format_primitive(school.created_at),
            updated_at: format_primitive(school.updated_at),
        }
    }
}
